//! Integration tests for Cistern

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use cistern::{create, Field, Method, Request, RequestClient, RequestOptions, State};

/// Spin up a local server with the fixture routes and return its base url.
async fn serve_fixture() -> String {
    let app = Router::new()
        .route("/json", get(|| async { r#"{"a":1}"# }))
        .route("/empty", get(|| async { "" }))
        .route("/text", get(|| async { "plain, not json" }))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nothing here") }),
        )
        .route("/echo", post(|body: String| async move { body }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[test]
fn container_integration() {
    let container = create(|writer| {
        State::new()
            .set("count", Field::value(0))
            .set("name", Field::value("test"))
            .set(
                "increment",
                Field::action(move |_| {
                    writer.update(|state| {
                        let count = state.value("count").and_then(|v| v.as_i64()).unwrap_or(0);
                        State::new().set("count", Field::value(count + 1))
                    })
                }),
            )
    });

    // Read
    assert_eq!(container.read().value("count"), Some(&json!(0)));

    // Merge write preserves untouched fields
    container.write(State::new().set("count", Field::value(42)));
    assert_eq!(container.read().value("count"), Some(&json!(42)));
    assert_eq!(container.read().value("name"), Some(&json!("test")));

    // Promoted action
    container.call("increment");
    assert_eq!(container.read().value("count"), Some(&json!(43)));

    // Replace drops everything else
    container.replace(State::new().set("value", Field::value(100)));
    let state = container.read();
    assert_eq!(state.value("value"), Some(&json!(100)));
    assert!(!state.contains_key("count"));
    assert!(!state.contains_key("name"));
}

#[test]
fn container_subscription() {
    let container = create(|_| State::new().set("n", Field::value(0)));
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let sub = container.subscribe(move |_, _| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(counter.load(Ordering::SeqCst), 0);

    container.write(State::new().set("n", Field::value(1)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Shallow-equal write is filtered out
    container.write(State::new().set("n", Field::value(1)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    container.write(State::new().set("n", Field::value(2)));
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    sub.unsubscribe();
    container.write(State::new().set("n", Field::value(3)));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn listener_batch_sees_one_consistent_pair() {
    let container = create(|_| State::new().set("n", Field::value(0)));
    let pairs = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..3 {
        let pairs_clone = Arc::clone(&pairs);
        let _ = container.subscribe(move |state, previous| {
            pairs_clone.lock().unwrap().push((
                state.value("n").cloned(),
                previous.value("n").cloned(),
            ));
        });
    }

    container.write(State::new().set("n", Field::value(7)));

    let pairs = pairs.lock().unwrap();
    assert_eq!(pairs.len(), 3);
    for pair in pairs.iter() {
        assert_eq!(pair, &(Some(json!(7)), Some(json!(0))));
    }
}

#[tokio::test]
async fn request_decodes_json_body() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let value = client
        .get(format!("{base}/json"), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(value, json!({ "a": 1 }));
}

#[tokio::test]
async fn request_resolves_empty_body_to_raw_text() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let value = client
        .get(format!("{base}/empty"), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(value, Value::String(String::new()));
}

#[tokio::test]
async fn request_falls_back_to_text_when_not_json() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let value = client
        .get(format!("{base}/text"), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(value, json!("plain, not json"));
}

#[tokio::test]
async fn request_rejects_on_error_status() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let err = client
        .get(format!("{base}/missing"), RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status, 404);
    assert_eq!(err.status_text, "Not Found");
    assert_eq!(err.response, "nothing here");
}

#[tokio::test]
async fn post_serializes_structured_body_as_json() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let echoed = client
        .post(
            format!("{base}/echo"),
            Some(json!({ "k": "v", "n": 2 })),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(echoed, json!({ "k": "v", "n": 2 }));
}

#[tokio::test]
async fn post_sends_string_body_unmodified() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let echoed = client
        .post(
            format!("{base}/echo"),
            Some(Value::String("raw payload".to_string())),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(echoed, json!("raw payload"));
}

#[tokio::test]
async fn request_times_out_with_status_zero() {
    let base = serve_fixture().await;
    let client = RequestClient::new();

    let err = client
        .request(
            Request::new(Method::GET, format!("{base}/slow"))
                .timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status, 0);
    assert_eq!(err.status_text, "request timed out");
    assert!(err.response.is_empty());
}

#[tokio::test]
async fn transport_failure_maps_to_status_zero() {
    // Nothing listens on this port.
    let client = RequestClient::new();

    let err = client
        .get("http://127.0.0.1:9/unreachable", RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status, 0);
    assert!(err.response.is_empty());
}

#[tokio::test]
async fn response_feeds_container_through_writer() {
    let base = serve_fixture().await;
    let container = create(|_| State::new().set("todo", Field::value(Value::Null)));
    let writer = container.writer();

    let notified = Arc::new(AtomicUsize::new(0));
    let notified_clone = Arc::clone(&notified);
    let _sub = container.subscribe(move |_, _| {
        notified_clone.fetch_add(1, Ordering::SeqCst);
    });

    let client = RequestClient::new();
    let body = client
        .get(format!("{base}/json"), RequestOptions::default())
        .await
        .unwrap();
    writer.write(State::new().set("todo", Field::value(body)));

    assert_eq!(container.read().value("todo"), Some(&json!({ "a": 1 })));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}
