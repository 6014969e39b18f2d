// brewery-api/tests/http_api.rs
// ============================================================================
// Module: Brewery HTTP API Tests
// Description: End-to-end tests for the /breweries resource.
// Purpose: Validate status codes, bodies, and role gating over real HTTP.
// Dependencies: brewery-api, reqwest, serde_json, tokio
// ============================================================================

//! HTTP tests that spawn the server on an ephemeral loopback port.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;

use crate::common::ADMIN_TOKEN;
use crate::common::BREWER_TOKEN;
use crate::common::TestServer;
use crate::common::bearer_config;
use crate::common::local_config;
use crate::common::spawn_server;

async fn json_body(response: reqwest::Response) -> Value {
    response.json::<Value>().await.expect("json body")
}

async fn create(server: &TestServer, payload: &Value) -> Value {
    let response = server.client.post(server.url("/breweries")).json(payload).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn assert_error(body: &Value, kind: &str) {
    assert_eq!(body["error"]["kind"], kind, "unexpected error body {body}");
}

// ============================================================================
// SECTION: Record Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn hop_house_lifecycle() {
    let server = spawn_server(local_config()).await;
    let owner = server.owner("hophouse");

    let listed = server.client.get(server.url("/breweries")).send().await.unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(json_body(listed).await, json!([]));

    let created = create(&server, &json!({"name": "Hop House", "ownerId": owner})).await;
    let id = created["breweryId"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(created["name"], "Hop House");
    assert_eq!(created["ownerId"], json!(owner));

    let fetched = server.client.get(server.url(&format!("/breweries/{id}"))).send().await.unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let mut record = json_body(fetched).await;
    assert_eq!(record["name"], "Hop House");

    record["name"] = json!("Hop House Brewing");
    record["city"] = json!("Columbus");
    record["hasFood"] = json!(true);
    let updated = server.client.put(server.url("/breweries")).json(&record).send().await.unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(json_body(updated).await, json!(true));

    let refetched = json_body(
        server.client.get(server.url(&format!("/breweries/{id}"))).send().await.unwrap(),
    )
    .await;
    assert_eq!(refetched["name"], "Hop House Brewing");
    assert_eq!(refetched["city"], "Columbus");
    assert_eq!(refetched["hasFood"], json!(true));

    let deleted =
        server.client.delete(server.url(&format!("/breweries/{id}"))).send().await.unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(json_body(deleted).await, json!(true));

    let gone = server.client.get(server.url(&format!("/breweries/{id}"))).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_error(&json_body(gone).await, "not_found");

    let listed = json_body(server.client.get(server.url("/breweries")).send().await.unwrap()).await;
    assert_eq!(listed, json!([]));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn list_returns_every_record_in_id_order() {
    let server = spawn_server(local_config()).await;
    let first = server.owner("first");
    let second = server.owner("second");
    create(&server, &json!({"name": "Alpha", "ownerId": first})).await;
    create(&server, &json!({"name": "Beta", "ownerId": second})).await;

    let listed = json_body(server.client.get(server.url("/breweries")).send().await.unwrap()).await;
    let names: Vec<&str> =
        listed.as_array().unwrap().iter().map(|row| row["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    server.shutdown().await;
}

// ============================================================================
// SECTION: Not Found and Invalid Input
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn absent_records_map_to_404() {
    let server = spawn_server(local_config()).await;

    let missing = server.client.get(server.url("/breweries/999")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body = json_body(missing).await;
    assert_error(&body, "not_found");
    assert_eq!(body["error"]["message"], "brewery with id 999 was not found");

    let update = server
        .client
        .put(server.url("/breweries"))
        .json(&json!({"breweryId": 999, "name": "Ghost", "ownerId": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(update).await["error"]["message"], "Brewery not found to update.");

    let no_id = server
        .client
        .put(server.url("/breweries"))
        .json(&json!({"name": "Nameless", "ownerId": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(no_id.status(), StatusCode::NOT_FOUND);

    let delete = server.client.delete(server.url("/breweries/999")).send().await.unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
    assert_error(&json_body(delete).await, "not_found");
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_input_maps_to_400() {
    let server = spawn_server(local_config()).await;

    let bad_id = server.client.get(server.url("/breweries/hop-house")).send().await.unwrap();
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_error(&json_body(bad_id).await, "invalid_request");

    let bad_json = server
        .client
        .post(server.url("/breweries"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_json.status(), StatusCode::BAD_REQUEST);
    assert_error(&json_body(bad_json).await, "invalid_request");
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_insert_maps_to_store_failure() {
    let server = spawn_server(local_config()).await;
    let response = server
        .client
        .post(server.url("/breweries"))
        .json(&json!({"name": "Orphan", "ownerId": 4242}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_error(&json_body(response).await, "store_failure");

    let listed = json_body(server.client.get(server.url("/breweries")).send().await.unwrap()).await;
    assert_eq!(listed, json!([]));
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_body_maps_to_413() {
    let mut config = local_config();
    config.server.max_body_bytes = 64;
    let server = spawn_server(config).await;
    let payload = json!({"name": "x".repeat(80), "ownerId": 1});
    let response =
        server.client.post(server.url("/breweries")).json(&payload).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_error(&json_body(response).await, "payload_too_large");
    server.shutdown().await;
}

// ============================================================================
// SECTION: Role Gating
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn bearer_roles_gate_writes() {
    let server = spawn_server(bearer_config()).await;
    let owner = server.owner("gated");
    let payload = json!({"name": "Gated", "ownerId": owner});

    let public = server.client.get(server.url("/breweries")).send().await.unwrap();
    assert_eq!(public.status(), StatusCode::OK);

    let anonymous =
        server.client.post(server.url("/breweries")).json(&payload).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_error(&json_body(anonymous).await, "unauthenticated");

    let as_brewer = server
        .client
        .post(server.url("/breweries"))
        .bearer_auth(BREWER_TOKEN)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(as_brewer.status(), StatusCode::FORBIDDEN);
    assert_error(&json_body(as_brewer).await, "unauthorized");

    let as_admin = server
        .client
        .post(server.url("/breweries"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(as_admin.status(), StatusCode::CREATED);
    let mut record = json_body(as_admin).await;
    let id = record["breweryId"].as_i64().unwrap();
    record["city"] = json!("Dayton");

    let update_admin = server
        .client
        .put(server.url("/breweries"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&record)
        .send()
        .await
        .unwrap();
    assert_eq!(update_admin.status(), StatusCode::FORBIDDEN);

    let update_brewer = server
        .client
        .put(server.url("/breweries"))
        .bearer_auth(BREWER_TOKEN)
        .json(&record)
        .send()
        .await
        .unwrap();
    assert_eq!(update_brewer.status(), StatusCode::OK);

    let delete_brewer = server
        .client
        .delete(server.url(&format!("/breweries/{id}")))
        .bearer_auth(BREWER_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_brewer.status(), StatusCode::FORBIDDEN);

    let delete_admin = server
        .client
        .delete(server.url(&format!("/breweries/{id}")))
        .bearer_auth(ADMIN_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_admin.status(), StatusCode::OK);
    server.shutdown().await;
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn requests_and_decisions_are_audited() {
    let server = spawn_server(bearer_config()).await;
    let owner = server.owner("audited");
    let response = server
        .client
        .post(server.url("/breweries"))
        .bearer_auth(ADMIN_TOKEN)
        .header("x-request-id", "req-42")
        .json(&json!({"name": "Audited", "ownerId": owner}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let denied = server
        .client
        .delete(server.url("/breweries/1"))
        .bearer_auth(BREWER_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let events = server.audit.events();
    let request = events
        .iter()
        .find(|event| event["event"] == "brewery_request" && event["request_id"] == "req-42")
        .expect("request event");
    assert_eq!(request["method"], "POST");
    assert_eq!(request["status"], 201);
    assert_eq!(request["outcome"], "ok");
    assert_eq!(request["subject"], "ops");
    assert_eq!(request["peer_ip"], "127.0.0.1");

    let deny = events
        .iter()
        .find(|event| event["event"] == "brewery_authz" && event["decision"] == "deny")
        .expect("deny event");
    assert_eq!(deny["action"], "breweries/delete");

    let failed = events
        .iter()
        .find(|event| event["event"] == "brewery_request" && event["status"] == 403)
        .expect("forbidden request event");
    assert_eq!(failed["outcome"], "error");
    assert_eq!(failed["error_kind"], "unauthorized");
    assert_eq!(failed["brewery_id"], 1);

    for event in &events {
        assert!(!event.to_string().contains(ADMIN_TOKEN));
    }
    server.shutdown().await;
}
