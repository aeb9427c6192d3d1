//! Code actions and the commands behind them, end to end: the offered
//! actions, the `workspace/applyEdit` round trip, and commands that arrive
//! for a document that has since moved on.

use serde_json::{Value, json};

use crate::common::{ScriptedLinter, TestClient, URI, semi};

const TEXT: &str = "let a = 1\nlet b = 2\n";

/// A session with [`TEXT`] open at version 1 and two `semi` problems
/// published. Returns the published diagnostics.
async fn two_semis() -> (TestClient, Value) {
    let linter = ScriptedLinter::new();
    linter.answer(vec![semi(1, 10, 9), semi(2, 10, 19)]);
    let mut client = TestClient::initialized(linter).await;
    client.open(1, TEXT).await;
    let published = client.diagnostics().await;
    (client, published["diagnostics"].clone())
}

fn titles(actions: &[Value]) -> Vec<&str> {
    actions.iter().filter_map(|a| a["title"].as_str()).collect()
}

fn action<'a>(actions: &'a [Value], title: &str) -> &'a Value {
    actions
        .iter()
        .find(|a| a["title"] == title)
        .unwrap_or_else(|| panic!("no action titled {title}"))
}

async fn execute(client: &mut TestClient, command: &Value) -> i64 {
    client
        .request(
            "workspace/executeCommand",
            json!({ "command": command["command"], "arguments": command["arguments"] }),
        )
        .await
}

#[tokio::test]
async fn actions_follow_rule_order() {
    let (mut client, diagnostics) = two_semis().await;
    let actions = client.code_actions(&diagnostics).await;

    assert_eq!(
        titles(&actions),
        vec![
            "Fix this semi problem",
            "Fix this semi problem",
            "Disable semi for this line",
            "Fix all semi problems",
            "Disable semi for the entire file",
            "Fix all auto-fixable problems",
        ]
    );
    let fix_all = action(&actions, "Fix all auto-fixable problems");
    assert_eq!(fix_all["command"]["command"], "lintel.applyAllFixes");
    assert_eq!(fix_all["command"]["arguments"][0]["uri"], URI);
    assert_eq!(fix_all["command"]["arguments"][0]["version"], 1);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn fix_all_command_round_trips_through_apply_edit() {
    let (mut client, diagnostics) = two_semis().await;
    let actions = client.code_actions(&diagnostics).await;
    let command = action(&actions, "Fix all auto-fixable problems")["command"].clone();

    let id = execute(&mut client, &command).await;
    let apply = client.server_request("workspace/applyEdit").await;
    assert_eq!(apply["params"]["label"], "Fix all auto-fixable problems");

    let change = &apply["params"]["edit"]["documentChanges"][0];
    assert_eq!(change["textDocument"], json!({ "uri": URI, "version": 1 }));
    assert_eq!(
        change["edits"],
        json!([
            {
                "range": {
                    "start": { "line": 0, "character": 9 },
                    "end": { "line": 0, "character": 9 }
                },
                "newText": ";"
            },
            {
                "range": {
                    "start": { "line": 1, "character": 9 },
                    "end": { "line": 1, "character": 9 }
                },
                "newText": ";"
            }
        ])
    );

    client.reply(&apply["id"], json!({ "applied": true })).await;
    let response = client.response(id).await;
    assert!(response["result"].is_null());
    assert!(response.get("error").is_none());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn single_fix_touches_only_its_diagnostic() {
    let (mut client, diagnostics) = two_semis().await;
    let actions = client.code_actions(&diagnostics).await;
    let second = actions
        .iter()
        .filter(|a| a["title"] == "Fix this semi problem")
        .nth(1)
        .unwrap();

    let id = execute(&mut client, &second["command"]).await;
    let apply = client.server_request("workspace/applyEdit").await;
    let edits = &apply["params"]["edit"]["documentChanges"][0]["edits"];
    assert_eq!(edits.as_array().unwrap().len(), 1);
    assert_eq!(edits[0]["range"]["start"]["line"], 1);

    client.reply(&apply["id"], json!({ "applied": true })).await;
    client.response(id).await;
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn stale_command_applies_nothing() {
    let (mut client, diagnostics) = two_semis().await;
    let actions = client.code_actions(&diagnostics).await;
    let command = action(&actions, "Fix all semi problems")["command"].clone();

    client.change(2, "let a = 1\nlet b = 2\nlet c = 3\n").await;
    client.diagnostics().await;

    let id = execute(&mut client, &command).await;
    let response = client.response(id).await;
    assert!(response["result"].is_null());

    // Round-trip another request so anything the command might have sent
    // is already on the wire.
    client.code_actions(&json!([])).await;
    assert!(
        !client
            .backlog()
            .iter()
            .any(|f| f["method"] == "workspace/applyEdit")
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn auto_fix_command_needs_no_prior_code_action() {
    let (mut client, _) = two_semis().await;

    let id = client
        .request(
            "workspace/executeCommand",
            json!({
                "command": "lintel.applyAutoFix",
                "arguments": [{ "uri": URI, "version": 1 }]
            }),
        )
        .await;
    let apply = client.server_request("workspace/applyEdit").await;
    assert_eq!(
        apply["params"]["edit"]["documentChanges"][0]["edits"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    client.reply(&apply["id"], json!({ "applied": true })).await;
    client.response(id).await;

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn rejected_edit_is_logged() {
    let (mut client, diagnostics) = two_semis().await;
    let actions = client.code_actions(&diagnostics).await;
    let command = action(&actions, "Disable semi for the entire file")["command"].clone();

    let id = execute(&mut client, &command).await;
    let apply = client.server_request("workspace/applyEdit").await;
    assert_eq!(
        apply["params"]["edit"]["documentChanges"][0]["edits"][0]["newText"],
        "/* eslint-disable semi */\n"
    );

    client
        .reply(
            &apply["id"],
            json!({ "applied": false, "failureReason": "document is read-only" }),
        )
        .await;
    let log = client
        .next_matching(|f| {
            f["method"] == "window/logMessage"
                && f["params"]["message"]
                    .as_str()
                    .is_some_and(|m| m.contains("document is read-only"))
        })
        .await;
    assert_eq!(log["params"]["type"], 1);
    assert!(client.response(id).await["result"].is_null());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn source_fix_all_carries_the_edit() {
    let (mut client, _) = two_semis().await;

    let response = client
        .call(
            "textDocument/codeAction",
            json!({
                "textDocument": { "uri": URI },
                "range": {
                    "start": { "line": 0, "character": 0 },
                    "end": { "line": 0, "character": 0 }
                },
                "context": { "diagnostics": [], "only": ["source.fixAll"] }
            }),
        )
        .await;
    let actions = response["result"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["kind"], "source.fixAll.lintel");
    assert!(actions[0].get("command").is_none());
    assert_eq!(
        actions[0]["edit"]["documentChanges"][0]["edits"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_command_is_invalid_params() {
    let (mut client, _) = two_semis().await;
    let response = client
        .call(
            "workspace/executeCommand",
            json!({ "command": "lintel.doSomethingElse", "arguments": [{ "uri": URI, "version": 1 }] }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32602);
    client.shutdown().await.unwrap();
}
