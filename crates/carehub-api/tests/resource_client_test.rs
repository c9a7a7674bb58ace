#![allow(clippy::unwrap_used)]
// Integration tests for `ResourceClient` using wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use carehub_api::{
    ApiClient, Error, ListParams, Resource, ResourceClient, StaticToken, UpdateMethod,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Guardian {
    id: u32,
    full_name: String,
}

impl Resource for Guardian {
    const NAME: &'static str = "Guardian";
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ResourceClient<Guardian>) {
    let server = MockServer::start().await;
    let api = ApiClient::from_reqwest(
        &format!("{}/api", server.uri()),
        reqwest::Client::new(),
        Arc::new(StaticToken::new("secret-token")),
    )
    .unwrap();
    (server, api.typed::<Guardian>())
}

fn guardian(id: u32, name: &str) -> serde_json::Value {
    json!({ "id": id, "fullName": name })
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_paged_camel_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian"))
        .and(query_param("pageNumber", "2"))
        .and(query_param("pageSize", "2"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [guardian(3, "Ana"), guardian(4, "Ben")],
            "totalRecords": 5,
            "pageNumber": 2,
            "pageSize": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.list(&ListParams::paged(2, 2)).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].full_name, "Ana");
    assert_eq!(page.total_records, 5);
    assert_eq!(page.page_number, 2);
    assert_eq!(page.total_pages(), 3);
}

#[tokio::test]
async fn test_list_pascal_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Data": [guardian(1, "Ana")],
            "TotalRecords": 1
        })))
        .mount(&server)
        .await;

    let page = client.list(&ListParams::paged(1, 10)).await.unwrap();
    assert_eq!(page.items, vec![Guardian { id: 1, full_name: "Ana".into() }]);
    assert_eq!(page.total_records, 1);
}

#[tokio::test]
async fn test_list_filters_are_sent_as_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian"))
        .and(query_param("search", "ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([guardian(1, "Ana")])))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .list(&ListParams::paged(1, 5).filter("search", "  ana "))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_list_malformed_envelope_degrades() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let page = client.list(&ListParams::paged(1, 5)).await.unwrap();
    assert!(page.items.is_empty());
    assert!(page.degraded);
    assert_eq!(page.total_pages(), 1);
}

#[tokio::test]
async fn test_get_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian(42, "Dana")))
        .mount(&server)
        .await;

    let g = client.get("42").await.unwrap();
    assert_eq!(g.id, 42);
    assert_eq!(g.full_name, "Dana");
}

#[tokio::test]
async fn test_get_malformed_entity_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.get("1").await;
    assert!(
        matches!(result, Err(Error::MalformedResponse { .. })),
        "expected MalformedResponse, got: {result:?}"
    );
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_posts_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Guardian"))
        .and(body_json(json!({ "fullName": "Eve" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(guardian(9, "Eve")))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.create(&json!({ "fullName": "Eve" })).await.unwrap();
    assert_eq!(created.map(|g| g.id), Some(9));
}

#[tokio::test]
async fn test_update_uses_patch_by_default_and_put_on_request() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/Guardian/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian(9, "Eve P")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/Guardian/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian(9, "Eve Q")))
        .expect(1)
        .mount(&server)
        .await;

    let patched = client.update("9", &json!({ "fullName": "Eve P" })).await.unwrap().unwrap();
    assert_eq!(patched.full_name, "Eve P");

    let put = client
        .clone()
        .with_update_method(UpdateMethod::Put)
        .update("9", &json!({ "fullName": "Eve Q" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(put.full_name, "Eve Q");
}

#[tokio::test]
async fn test_update_without_body_is_success() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/Guardian/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/Guardian"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.update("9", &json!({ "fullName": "Eve P" })).await.unwrap(), None);
    assert_eq!(client.create(&json!({ "fullName": "Eve" })).await.unwrap(), None);
}

#[tokio::test]
async fn test_get_with_empty_body_is_malformed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Guardian/9"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client.get("9").await;
    assert!(matches!(result, Err(Error::MalformedResponse { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_remove() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/Guardian/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.remove("9").await.unwrap();
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_token_fails_fast() {
    let server = MockServer::start().await;
    let api = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new(), Arc::new(StaticToken::none()))
        .unwrap();
    let client = api.resource::<serde_json::Value>("Guardian");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.list(&ListParams::new()).await;
    assert!(matches!(result, Err(Error::Unauthenticated)), "got: {result:?}");
}

#[tokio::test]
async fn test_error_409_conflict_in_use() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/Guardian/3"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "Guardian is assigned to a resident" })),
        )
        .mount(&server)
        .await;

    match client.remove("3").await {
        Err(Error::ConflictInUse { message }) => {
            assert_eq!(message, "Guardian is assigned to a resident");
        }
        other => panic!("expected ConflictInUse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_400_field_errors() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Guardian"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "title": "One or more validation errors occurred.",
            "errors": { "FullName": ["The FullName field is required."] }
        })))
        .mount(&server)
        .await;

    match client.create(&json!({})).await {
        Err(Error::Server {
            status,
            message,
            field_errors,
        }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "One or more validation errors occurred.");
            assert_eq!(field_errors.len(), 1);
            assert_eq!(field_errors[0].field, "FullName");
            assert_eq!(field_errors[0].messages, vec!["The FullName field is required."]);
        }
        other => panic!("expected Server error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_401_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get("1").await;
    assert!(matches!(result, Err(Error::SessionExpired)), "got: {result:?}");
}

#[tokio::test]
async fn test_error_500_plain_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&server)
        .await;

    match client.list(&ListParams::new()).await {
        Err(err @ Error::Server { .. }) => {
            assert!(err.is_transient());
            assert!(err.to_string().contains("database offline"));
        }
        other => panic!("expected Server error, got: {other:?}"),
    }
}
