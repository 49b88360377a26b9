mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use common::{setup_app, DummyJob, WEBHOOK_PATH};
use easypost_webhooks::services::webhook_call_store::WebhookCallStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn valid_request_is_stored_broadcast_and_dispatched() {
    let app = setup_app(&[("my_description", DummyJob::NAME)]);
    let payload = json!({
        "description": "my.description",
        "key": "value",
    });

    let resp = app.router.clone().oneshot(post_json(&payload)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["ok"], json!(true));

    let calls = app.store.list().await.unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(body["id"].as_str(), Some(call.id.to_string().as_str()));
    assert_eq!(call.description, "my.description");
    assert_eq!(call.payload, payload);
    assert!(call.exception.is_none());

    let events = app.events.events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "webhooks::my.description");
    assert_eq!(events[0].1.id, call.id);

    let jobs = app.submitter.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, DummyJob::NAME);
    assert_eq!(jobs[0].1.id, call.id);
}

#[tokio::test]
async fn invalid_payload_is_logged_without_events_or_jobs() {
    let app = setup_app(&[("my_description", DummyJob::NAME)]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json(&json!(["invalid_payload"])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let calls = app.store.list().await.unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.description, "");
    assert_eq!(call.payload, json!(["invalid_payload"]));

    let expected = format!(
        "Webhook call id `{}` did not contain a description. Valid Easypost webhook calls should always contain a description.",
        call.id
    );
    let exception = call.exception.as_ref().expect("exception recorded");
    assert_eq!(exception.message, expected);
    assert_eq!(exception.code, "missing_description");

    let body = json_body(resp).await;
    assert_eq!(body["error"].as_str(), Some(expected.as_str()));

    assert!(app.events.topics().is_empty());
    assert!(app.submitter.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unmapped_description_broadcasts_without_job() {
    let app = setup_app(&[("my_type", DummyJob::NAME)]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json(&json!({ "description": "another.type" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(app.events.topics(), vec!["webhooks::another.type".to_string()]);
    assert!(app.submitter.jobs.lock().unwrap().is_empty());
    let calls = app.store.list().await.unwrap();
    assert!(calls[0].exception.is_none());
}

#[tokio::test]
async fn unregistered_handler_is_a_client_error_and_recorded() {
    let app = setup_app(&[("tracker_updated", "App\\Jobs\\HandleTrackerUpdated")]);

    let resp = app
        .router
        .clone()
        .oneshot(post_json(&json!({ "description": "tracker.updated" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("App\\Jobs\\HandleTrackerUpdated"));

    // the event goes out before handler resolution fails
    assert_eq!(app.events.topics(), vec!["webhooks::tracker.updated".to_string()]);
    assert!(app.submitter.jobs.lock().unwrap().is_empty());

    let calls = app.store.list().await.unwrap();
    assert_eq!(calls[0].exception.as_ref().unwrap().code, "unknown_handler");
}

#[tokio::test]
async fn each_delivery_is_stored_separately() {
    let app = setup_app(&[]);
    let payload = json!({ "description": "batch.created", "id": "batch_1" });

    for _ in 0..2 {
        let resp = app.router.clone().oneshot(post_json(&payload)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let calls = app.store.list().await.unwrap();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].id, calls[1].id);
    assert_eq!(app.events.topics().len(), 2);
}

#[tokio::test]
async fn malformed_json_is_rejected_before_storing() {
    let app = setup_app(&[]);
    let req = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error());
    assert!(app.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app(&[]);
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], json!("ok"));
}
