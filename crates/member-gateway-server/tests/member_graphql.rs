// crates/member-gateway-server/tests/member_graphql.rs
// ============================================================================
// Module: Member GraphQL Endpoint Tests
// Description: Identity matching, projection, and deletion over HTTP.
// Purpose: Ensure members can only reach their own record and that backend
//          documents carry exactly the requested fields.
// Dependencies: member-gateway-server, member-gateway-broker, reqwest, tokio
// ============================================================================
//! ## Overview
//! Uses a scripted backend and the in-memory broker and metadata store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::Gateway;
use common::ScriptedBackend;
use common::UNUSED_LEGACY;
use member_gateway_core::BackendError;
use serde_json::Value;
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn member_query_projects_fields_and_forwards_caller_token() {
    let backend = ScriptedBackend::new(vec![Ok(json!({"member": {"id": "7", "nickname": "kiki"}}))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;

    let response = gateway
        .graphql(
            Some("valid-u1"),
            json!({
                "query": "query Me($id: String!) { me: member(firebaseId: $id) { id nickname } }",
                "variables": {"id": "u1"}
            }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"data": {"me": {"id": "7", "nickname": "kiki"}}}));

    let calls = gateway.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].caller_token.as_deref(), Some("valid-u1"));
    let document = &calls[0].request.document;
    assert!(document.starts_with("query($firebaseId: String!) {"), "{document}");
    assert!(document.contains("member(firebaseId: $firebaseId) {"));
    assert!(document.contains("id"));
    assert!(document.contains("nickname"));
    assert_eq!(Value::Object(calls[0].request.variables.clone()), json!({"firebaseId": "u1"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_selections_reach_the_backend_document() {
    let member = json!({"profile": {"address": {"city": "Taipei"}}});
    let backend = ScriptedBackend::new(vec![Ok(json!({ "member": member.clone() }))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;

    let response = gateway
        .graphql(Some("valid-u1"), json!({"query": "{ member(firebaseId: \"u1\") { profile { address { city } } } }"}))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"data": {"member": member}}));

    let document = gateway.backend.calls()[0].request.document.clone();
    assert!(document.contains("profile {\naddress {\ncity\n}\n}"), "{document}");
}

#[tokio::test(flavor = "multi_thread")]
async fn other_members_are_rejected_before_any_upstream_call() {
    let gateway = Gateway::spawn(UNUSED_LEGACY, ScriptedBackend::new(Vec::new())).await;

    for query in [
        "{ member(firebaseId: \"u2\") { id } }",
        "mutation { updateMember(firebaseId: \"u2\", name: \"x\") { id } }",
        "mutation { deleteMember(firebaseId: \"u2\") { success } }",
    ] {
        let response = gateway.graphql(Some("valid-u1"), json!({ "query": query })).await;
        assert_eq!(response.status(), 403);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["errors"][0]["message"],
            "member id(u1) is not allowed to perform action against member id(u2)"
        );
        assert!(body["errors"][0]["path"].is_array());
    }
    assert!(gateway.backend.calls().is_empty());
    assert!(gateway.identity.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_member_sends_every_declared_variable() {
    let backend = ScriptedBackend::new(vec![Ok(json!({"updateMember": {"id": "7"}}))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;

    let response = gateway
        .graphql(
            Some("valid-u1"),
            json!({
                "query": "mutation Update($firebaseId: String!, $city: String) { updateMember(firebaseId: $firebaseId, city: $city, gender: 1) { id } }",
                "operationName": "Update",
                "variables": {"firebaseId": "u1", "city": "Taipei"}
            }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let calls = gateway.backend.calls();
    let variables = Value::Object(calls[0].request.variables.clone());
    assert_eq!(variables["city"], "Taipei");
    assert_eq!(variables["gender"], 1);
    assert_eq!(variables["phone"], Value::Null);
    assert_eq!(calls[0].request.variables.len(), 11);
    assert!(calls[0].request.document.starts_with("mutation($address: String, $birthday: Date,"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_requests_are_bad_requests() {
    let gateway = Gateway::spawn(UNUSED_LEGACY, ScriptedBackend::new(Vec::new())).await;

    let cases = [
        json!({"query": "{ member(firebaseId: \"u1\") { ...F } }"}),
        json!({"query": "{ members { id } }"}),
        json!({"query": "mutation { createMember(firebaseId: \"u1\") { id } }"}),
        json!({"query": "{ member(firebaseId: 5) { id } }"}),
        json!({"query": "{ member(firebaseId: \"u1\") }"}),
        json!({"nope": true}),
    ];
    for case in cases {
        let response = gateway.graphql(Some("valid-u1"), case.clone()).await;
        assert_eq!(response.status(), 400, "{case}");
    }
    assert!(gateway.backend.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_graphql_errors_surface_as_field_errors() {
    let backend = ScriptedBackend::new(vec![Err(BackendError::GraphQl(vec!["nickname taken".to_string()]))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;

    let response = gateway
        .graphql(
            Some("valid-u1"),
            json!({"query": "mutation { createMember(email: \"a@b.c\", firebaseId: \"u1\", nickname: \"k\") { id } }"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"errors": [{"message": "nickname taken", "path": ["createMember"]}], "data": {"createMember": null}})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_outage_is_bad_gateway() {
    let backend = ScriptedBackend::new(vec![Err(BackendError::Unavailable("connection refused".to_string()))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;
    let response = gateway.graphql(Some("valid-u1"), json!({"query": "{ member(firebaseId: \"u1\") { id } }"})).await;
    assert_eq!(response.status(), 502);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_member_runs_the_workflow() {
    let gateway = Gateway::spawn(UNUSED_LEGACY, ScriptedBackend::new(Vec::new())).await;

    let response =
        gateway.graphql(Some("valid-u1"), json!({"query": "mutation { deleteMember(firebaseId: \"u1\") { success } }"})).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"data": {"deleteMember": {"success": true}}}));

    assert_eq!(gateway.identity.calls(), vec!["revoke:u1", "get_user:u1", "delete_user:u1"]);
    assert_eq!(gateway.metadata.get("metadata/u1").await, Some(json!({"revokeTime": 1_700_000_000})));
    let calls = gateway.backend.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].caller_token.is_none());
    assert!(gateway.broker.published().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_backend_delete_is_deferred_to_the_broker() {
    let backend = ScriptedBackend::new(vec![Err(BackendError::Unavailable("connection refused".to_string()))]);
    let gateway = Gateway::spawn(UNUSED_LEGACY, backend).await;

    let response =
        gateway.graphql(Some("valid-u1"), json!({"query": "mutation { deleteMember(firebaseId: \"u1\") { success } }"})).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["deleteMember"]["success"], true);

    gateway.state.coordinator.drain_detached().await;
    let published = gateway.broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].get("firebaseID").map(String::as_str), Some("u1"));
    assert_eq!(published[0].get("action").map(String::as_str), Some("delete"));
    assert!(gateway.audit.stages().contains(&"backend_delete_failed_enqueued".to_string()));
}
