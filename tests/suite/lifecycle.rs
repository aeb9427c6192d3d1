//! Session lifecycle: initialize, shutdown, exit, and the error codes the
//! server answers with outside a running session.

use serde_json::{Value, json};

use crate::common::{ScriptedLinter, TestClient};

#[tokio::test]
async fn initialize_advertises_capabilities() {
    let mut client = TestClient::start(ScriptedLinter::new());
    let response = client.initialize(Value::Null).await;

    let caps = &response["result"]["capabilities"];
    assert_eq!(caps["textDocumentSync"]["openClose"], true);
    assert_eq!(caps["textDocumentSync"]["change"], 2);
    assert_eq!(
        caps["codeActionProvider"]["codeActionKinds"],
        json!(["quickfix", "source.fixAll.lintel"])
    );
    let commands: Vec<&str> = caps["executeCommandProvider"]["commands"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(commands.contains(&"lintel.applyAutoFix"));
    assert!(commands.iter().all(|c| c.starts_with("lintel.")));
    assert_eq!(response["result"]["serverInfo"]["name"], "lintel");

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn requests_before_initialize_are_refused() {
    let mut client = TestClient::start(ScriptedLinter::new());
    let response = client
        .call(
            "textDocument/codeAction",
            json!({ "textDocument": { "uri": "file:///a.js" } }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32002);

    client.initialize(Value::Null).await;
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_request_is_method_not_found() {
    let mut client = TestClient::initialized(ScriptedLinter::new()).await;
    let response = client.call("textDocument/hover", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn second_initialize_is_invalid() {
    let mut client = TestClient::initialized(ScriptedLinter::new()).await;
    let response = client.call("initialize", json!({ "capabilities": {} })).await;
    assert_eq!(response["error"]["code"], -32600);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn requests_after_shutdown_are_invalid() {
    let mut client = TestClient::initialized(ScriptedLinter::new()).await;
    let response = client.call("shutdown", Value::Null).await;
    assert!(response["result"].is_null());

    let late = client.call("textDocument/codeAction", json!({})).await;
    assert_eq!(late["error"]["code"], -32600);
}

#[tokio::test]
async fn initialization_options_configure_the_server() {
    let linter = ScriptedLinter::new();
    linter.answer(vec![crate::common::semi(1, 10, 9)]);
    let mut client = TestClient::start(linter);
    client
        .initialize(json!({ "linter": { "command": "/opt/tools/xo" } }))
        .await;

    client.open(1, "let a = 1\n").await;
    let published = client.diagnostics().await;
    assert_eq!(published["diagnostics"][0]["source"], "xo");

    client.shutdown().await.unwrap();
}
