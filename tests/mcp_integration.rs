//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 protocol implementation end to
//! end: envelope parsing, dispatch over the full default registries, and
//! error responses.

use std::sync::Arc;

use serde_json::{json, Value};

use cms_mcp::mcp::protocol::{parse_message, IncomingMessage, JsonRpcRequest, RequestId};
use cms_mcp::mcp::Dispatcher;
use cms_mcp::store::MemoryStore;
use cms_mcp::{resources, tools};

fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_table(
        "sites",
        vec![[
            ("slug".to_string(), json!("main")),
            ("name".to_string(), json!("Main Site")),
        ]
        .into_iter()
        .collect()],
    );
    store.insert_table(
        "pages",
        vec![[
            ("slug".to_string(), json!("welcome")),
            ("body".to_string(), json!("Welcome to the CMS")),
        ]
        .into_iter()
        .collect()],
    );
    store.insert_table(
        "page_versions",
        vec![[
            ("site".to_string(), json!("main")),
            ("slug".to_string(), json!("welcome")),
            ("version".to_string(), json!(1)),
        ]
        .into_iter()
        .collect()],
    );
    store.insert_file("components/button", "<button>{{ label }}</button>");
    store.insert_file("templates/default", "<html/>");
    store.insert_file("packages.json", "{\"packages\": []}");
    Arc::new(store)
}

fn dispatcher() -> Dispatcher {
    let store = seeded_store();
    Dispatcher::new(
        Arc::new(resources::default_registry(&store)),
        Arc::new(tools::default_registry(&store)),
    )
}

fn request(id: RequestId, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id,
        method: method.to_string(),
        params: Some(params),
    }
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_ping_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "ping"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "ping");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_string_id_is_preserved() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "req-42",
        "method": "resources/list"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.id, RequestId::String("req-42".to_string()));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_null_id_is_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": null,
        "method": "notifications/cancelled"
    }"#;

    let result = parse_message(json);
    assert!(matches!(result, Ok(IncomingMessage::Notification(_))));
}

#[test]
fn test_parse_invalid_json() {
    let result = parse_message("not valid json");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().error.code, -32700);
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().error.code, -32600);
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[tokio::test]
async fn test_ping_round_trip() {
    let resp = dispatcher()
        .dispatch(request(RequestId::Number(7), "ping", json!({})))
        .await
        .unwrap();

    assert_eq!(resp.result, json!("pong"));
    assert_eq!(resp.id, RequestId::Number(7));
}

#[tokio::test]
async fn test_resources_list_is_stable() {
    let dispatcher = dispatcher();
    let first = dispatcher
        .dispatch(request(RequestId::Number(1), "resources/list", json!({})))
        .await
        .unwrap();
    let second = dispatcher
        .dispatch(request(RequestId::Number(2), "resources/list", json!({})))
        .await
        .unwrap();

    assert_eq!(first.result["resources"], second.result["resources"]);
}

#[tokio::test]
async fn test_component_sentinel_beats_generic_template() {
    let dispatcher = dispatcher();

    // The exact list URI must hit the inventory resource...
    let list = dispatcher
        .dispatch(request(
            RequestId::Number(1),
            "resources/read",
            json!({ "uri": "cms://components/list" }),
        ))
        .await
        .unwrap();
    let text = list.result["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("button"));

    // ...while any other name hits the source resource.
    let source = dispatcher
        .dispatch(request(
            RequestId::Number(2),
            "resources/read",
            json!({ "uri": "cms://components/button" }),
        ))
        .await
        .unwrap();
    let text = source.result["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("<button>"));
}

#[tokio::test]
async fn test_unmatched_uri_is_resource_not_found() {
    let err = dispatcher()
        .dispatch(request(
            RequestId::Number(1),
            "resources/read",
            json!({ "uri": "cms://no-such/thing" }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.error.code, -32002);
}

#[tokio::test]
async fn test_matched_uri_with_missing_entity_is_not_found() {
    let err = dispatcher()
        .dispatch(request(
            RequestId::Number(1),
            "resources/read",
            json!({ "uri": "cms://components/ghost" }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.error.code, -32002);
}

#[tokio::test]
async fn test_store_failure_surfaces_original_message() {
    let err = dispatcher()
        .dispatch(request(
            RequestId::Number(1),
            "resources/read",
            json!({ "uri": "cms://db/tables/nonexistent" }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.error.code, -32000);
    assert!(err.error.message.contains("nonexistent"));
}

#[tokio::test]
async fn test_unknown_method() {
    let err = dispatcher()
        .dispatch(request(RequestId::Number(1), "prompts/list", json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.error.code, -32601);
}

// =============================================================================
// Tool Invocation Tests
// =============================================================================

#[tokio::test]
async fn test_tools_list_names() {
    let resp = dispatcher()
        .dispatch(request(RequestId::Number(1), "tools/list", json!({})))
        .await
        .unwrap();

    let names: Vec<&str> = resp.result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["get-site-info", "search-content", "clear-cache"]);
}

#[tokio::test]
async fn test_tool_call_with_valid_arguments() {
    let resp = dispatcher()
        .dispatch(request(
            RequestId::Number(1),
            "tools/call",
            json!({ "name": "get-site-info", "arguments": { "site": "main" } }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.result["structuredContent"]["name"], json!("Main Site"));
}

#[tokio::test]
async fn test_tool_schema_mismatch_is_invalid_params() {
    let err = dispatcher()
        .dispatch(request(
            RequestId::Number(1),
            "tools/call",
            json!({ "name": "get-site-info", "arguments": {} }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.error.code, -32602);
}

#[tokio::test]
async fn test_unknown_tool_leaves_dispatcher_usable() {
    let dispatcher = dispatcher();

    let err = dispatcher
        .dispatch(request(
            RequestId::Number(1),
            "tools/call",
            json!({ "name": "get-analytics-stats", "arguments": {} }),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.error.code, -32601);

    // The failure is an error response, not a teardown.
    let resp = dispatcher
        .dispatch(request(RequestId::Number(2), "ping", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.result, json!("pong"));
}
