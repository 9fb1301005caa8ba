//! ProviderClient against a mock subscriptions API.

use flexsub_core::{DesiredState, SubscriptionStatus, UpdateSubscriptionRequest};
use flexsub_provider::{Credentials, ProviderClient, ProviderConfig, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ProviderClient {
    ProviderClient::new(ProviderConfig::new(
        &server.uri(),
        Credentials::new("test-key", "test-secret"),
    ))
}

fn task_accepted(server: &MockServer, task_id: &str) -> serde_json::Value {
    json!({
        "taskId": task_id,
        "commandType": "subscriptionCreateRequest",
        "status": "received",
        "description": "Task request received and is being queued for processing.",
        "links": [{"href": format!("{}/v1/tasks/{task_id}", server.uri()), "rel": "task", "type": "GET"}]
    })
}

#[tokio::test]
async fn test_create_sends_credentials_and_body() {
    let server = MockServer::start().await;

    let raw = json!({
        "baseURL": server.uri(),
        "dryRun": "false",
        "region": "us-east-1",
        "deploymentCIDR": "10.0.0.0/24",
        "dbname": "db1",
        "memoryLimitInGb": "1"
    });
    let desired = DesiredState::from_properties(raw.as_object().unwrap()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/subscriptions/"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-api-secret-key", "test-secret"))
        .and(body_json(json!({
            "dryRun": false,
            "deploymentType": "single-region",
            "cloudProviders": [{"regions": [{"region": "us-east-1", "networking": {"deploymentCIDR": "10.0.0.0/24"}}]}],
            "databases": [{"name": "db1", "memoryLimitInGb": 1}]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(task_accepted(&server, "t-1")))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .create_subscription(&desired.create_request())
        .await
        .unwrap();

    assert_eq!(body["taskId"], "t-1");
    assert_eq!(
        flexsub_core::processing_link(&body),
        Some(format!("{}/v1/tasks/t-1", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_rejected_request_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/subscriptions/101"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "processing-error",
            "links": [{"href": format!("{}/v1/tasks/t-9", server.uri()), "rel": "task", "type": "GET"}]
        })))
        .mount(&server)
        .await;

    let update = UpdateSubscriptionRequest {
        name: Some("renamed".into()),
        payment_method_id: None,
    };
    let err = client(&server)
        .update_subscription("101", &update)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    let body = err.rejection_body().unwrap();
    assert!(flexsub_core::contains_processing_error(body));
    assert!(flexsub_core::processing_link(body).is_some());
}

#[tokio::test]
async fn test_non_json_error_body_is_kept_as_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/7"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client(&server).get_subscription("7").await.unwrap_err();
    match err {
        ProviderError::Status { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, json!("Bad Gateway"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_subscription_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "name": "sub",
            "status": "deleting",
            "paymentMethodId": 1
        })))
        .mount(&server)
        .await;

    let status = client(&server).subscription_status("101").await.unwrap();
    assert_eq!(status, SubscriptionStatus::Deleting);
}

#[tokio::test]
async fn test_list_databases_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/101/databases"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": 1,
            "subscription": [{"subscriptionId": 101, "databases": [{"databaseId": 5001, "name": "db1"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client(&server)
        .list_databases("101", 0, flexsub_provider::DATABASE_PAGE_LIMIT)
        .await
        .unwrap();
    assert_eq!(list.default_database().unwrap().database_id.as_str(), "5001");
}

#[tokio::test]
async fn test_list_subscriptions_and_deletes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/subscriptions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subscriptions": [{"id": 101, "status": "active"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/subscriptions/101/databases/5001"))
        .respond_with(ResponseTemplate::new(202).set_body_json(task_accepted(&server, "t-db")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/subscriptions/101"))
        .respond_with(ResponseTemplate::new(202).set_body_json(task_accepted(&server, "t-sub")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.list_subscriptions().await.unwrap().contains("101"));
    assert_eq!(client.delete_database("101", "5001").await.unwrap()["taskId"], "t-db");
    assert_eq!(client.delete_subscription("101").await.unwrap()["taskId"], "t-sub");
}

#[tokio::test]
async fn test_unreachable_provider() {
    let client = ProviderClient::new(ProviderConfig::new(
        "http://127.0.0.1:1",
        Credentials::new("k", "s"),
    ));
    let err = client.list_subscriptions().await.unwrap_err();
    assert!(matches!(err, ProviderError::Request { .. }));
}
