//! Validation passes as the editor sees them: published diagnostics, status
//! notifications, and how backend failures are surfaced.

use serde_json::json;

use crate::common::{ScriptedLinter, TestClient, URI, semi};

const TEXT: &str = "let a = 1\nlet b = 2\n";

#[tokio::test]
async fn open_publishes_diagnostics_for_the_opened_version() {
    let linter = ScriptedLinter::new();
    linter.answer(vec![semi(1, 10, 9)]);
    let mut client = TestClient::initialized(linter.clone()).await;

    client.open(7, TEXT).await;
    let published = client.diagnostics().await;

    assert_eq!(published["version"], 7);
    let diagnostic = &published["diagnostics"][0];
    assert_eq!(diagnostic["message"], "Missing semicolon. (semi)");
    assert_eq!(diagnostic["code"], "semi");
    assert_eq!(diagnostic["severity"], 1);
    assert_eq!(diagnostic["source"], "eslint");
    assert_eq!(
        diagnostic["range"]["start"],
        json!({ "line": 0, "character": 9 })
    );

    let status = client.notification("lintel/status").await;
    assert_eq!(status["params"]["state"], 1);
    assert_eq!(linter.texts(), vec![TEXT.to_string()]);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn change_revalidates_latest_text() {
    let linter = ScriptedLinter::new();
    linter.answer(vec![semi(1, 10, 9)]);
    let mut client = TestClient::initialized(linter.clone()).await;

    client.open(1, TEXT).await;
    client.diagnostics().await;

    linter.answer(Vec::new());
    client.change(2, "let a = 1;\n").await;
    let published = client.diagnostics().await;

    assert_eq!(published["version"], 2);
    assert!(published["diagnostics"].as_array().unwrap().is_empty());
    assert_eq!(linter.texts().last().map(String::as_str), Some("let a = 1;\n"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn close_clears_diagnostics() {
    let linter = ScriptedLinter::new();
    linter.answer(vec![semi(1, 10, 9)]);
    let mut client = TestClient::initialized(linter).await;

    client.open(1, TEXT).await;
    client.diagnostics().await;

    client
        .notify("textDocument/didClose", json!({ "textDocument": { "uri": URI } }))
        .await;
    let published = client.diagnostics().await;
    assert!(published["diagnostics"].as_array().unwrap().is_empty());
    assert!(published.get("version").is_none());

    // Nothing is left to act on.
    assert!(client.code_actions(&json!([])).await.is_empty());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn config_failure_is_shown_once_per_environment() {
    let linter = ScriptedLinter::new();
    linter.fail("No ESLint configuration found in /work/src.");
    let mut client = TestClient::initialized(linter).await;

    client.open(1, TEXT).await;
    let published = client.diagnostics().await;
    assert!(published["diagnostics"].as_array().unwrap().is_empty());
    client.notification("window/showMessage").await;
    let status = client.notification("lintel/status").await;
    assert_eq!(status["params"]["state"], 2);

    client.change(2, "let a = 2\n").await;
    client.diagnostics().await;
    assert!(
        !client
            .backlog()
            .iter()
            .any(|f| f["method"] == "window/showMessage"),
        "second failure must not be shown again"
    );
    client.notification("window/logMessage").await;

    // Watched config files changed: the problem is reported afresh.
    client
        .notify(
            "workspace/didChangeWatchedFiles",
            json!({ "changes": [{ "uri": "file:///work/.eslintrc.json", "type": 2 }] }),
        )
        .await;
    client.diagnostics().await;
    client.notification("window/showMessage").await;

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_failures_are_errors_every_time() {
    let linter = ScriptedLinter::new();
    linter.fail("TypeError: Cannot read properties of undefined");
    let mut client = TestClient::initialized(linter).await;

    client.open(1, TEXT).await;
    client.diagnostics().await;
    let first = client.notification("window/showMessage").await;
    assert!(
        first["params"]["message"]
            .as_str()
            .unwrap()
            .contains("TypeError")
    );
    let status = client.notification("lintel/status").await;
    assert_eq!(status["params"]["state"], 3);

    client.change(2, "let a = 2\n").await;
    client.diagnostics().await;
    client.notification("window/showMessage").await;

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn quiet_setting_drops_warnings() {
    let linter = ScriptedLinter::new();
    let mut warning = semi(1, 10, 9);
    warning.severity = 1;
    linter.answer(vec![warning]);
    let mut client = TestClient::initialized(linter).await;

    client.open(1, TEXT).await;
    let published = client.diagnostics().await;
    assert_eq!(published["diagnostics"][0]["severity"], 2);

    client
        .notify(
            "workspace/didChangeConfiguration",
            json!({ "settings": { "lintel": { "quiet": true } } }),
        )
        .await;
    let published = client.diagnostics().await;
    assert!(published["diagnostics"].as_array().unwrap().is_empty());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn run_on_save_skips_change_validation() {
    let linter = ScriptedLinter::new();
    let mut client = TestClient::start(linter.clone());
    client.initialize(json!({ "run": "onSave" })).await;

    client.open(1, TEXT).await;
    client.diagnostics().await;

    client.change(2, "let a = 2\n").await;
    client
        .notify("textDocument/didSave", json!({ "textDocument": { "uri": URI } }))
        .await;
    let published = client.diagnostics().await;
    assert_eq!(published["version"], 2);
    assert_eq!(
        linter.texts(),
        vec![TEXT.to_string(), "let a = 2\n".to_string()]
    );

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn validate_false_publishes_nothing_to_fix() {
    let linter = ScriptedLinter::new();
    linter.answer(vec![semi(1, 10, 9)]);
    let mut client = TestClient::start(linter.clone());
    client.initialize(json!({ "validate": false })).await;

    client.open(1, TEXT).await;
    let published = client.diagnostics().await;
    assert!(published["diagnostics"].as_array().unwrap().is_empty());
    assert!(linter.texts().is_empty());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn incremental_change_past_line_end_edits_that_line() {
    let linter = ScriptedLinter::new();
    let mut client = TestClient::initialized(linter.clone()).await;

    client.open(1, TEXT).await;
    client.diagnostics().await;

    client
        .notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": URI, "version": 2 },
                "contentChanges": [{
                    "range": {
                        "start": { "line": 0, "character": 40 },
                        "end": { "line": 0, "character": 40 }
                    },
                    "text": ";"
                }]
            }),
        )
        .await;
    let published = client.diagnostics().await;
    assert_eq!(published["version"], 2);
    assert_eq!(
        linter.texts().last().map(String::as_str),
        Some("let a = 1;\nlet b = 2\n")
    );

    client.shutdown().await.unwrap();
}
