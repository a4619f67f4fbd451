//! Drives a session through a real relay to a fake backend, all over
//! loopback sockets.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::stream;
use serde_json::{Value, json};
use streamchat::{
    ChatSession, Role, SessionBuilder, SessionSnapshot, Stage, StreamStatus,
};
use streamchat_relay::{RelayConfig, router};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

fn chunk(content: &str, finish_reason: Option<&str>) -> String {
    let chunk = json!({
        "id": "cmpl-1",
        "choices": [{ "delta": { "content": content }, "finish_reason": finish_reason }],
    });
    format!("data: {chunk}\n\n")
}

/// Replies in three pieces naming the requested model, except for a few
/// magic prompts.
async fn completions(Json(body): Json<Value>) -> Response {
    let last = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|msg| msg["content"].as_str())
        .unwrap_or_default()
        .to_owned();

    match last.as_str() {
        "reject me" => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "message": "Rate limit exceeded" } })),
        )
            .into_response(),
        "drop me" => {
            // Pause before failing so the first chunk makes it through.
            let chunks = stream::unfold(0, |step| async move {
                match step {
                    0 => Some((Ok(Bytes::from(chunk("Hel", None))), 1)),
                    1 => {
                        sleep(Duration::from_millis(200)).await;
                        Some((Err(io::Error::other("backend went away")), 2))
                    }
                    _ => None,
                }
            });
            ([(CONTENT_TYPE, "text/event-stream")], Body::from_stream(chunks))
                .into_response()
        }
        _ => {
            let model = body["model"].as_str().unwrap_or_default();
            let events = [
                ": keep-alive\n\n".to_owned(),
                chunk("Hello", None),
                chunk(" there", None),
                chunk(&format!(" from {model}!"), Some("stop")),
                "data: [DONE]\n\n".to_owned(),
            ]
            .concat();
            ([(CONTENT_TYPE, "text/event-stream")], events).into_response()
        }
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_relay() -> SocketAddr {
    let upstream =
        serve(Router::new().route("/v1/chat/completions", post(completions)))
            .await;
    let config = RelayConfig::new(format!("http://{upstream}/v1"), "test-key");
    serve(router(&config)).await
}

async fn settle(session: &ChatSession) -> SessionSnapshot {
    let mut updates = session.subscribe();
    timeout(
        Duration::from_secs(10),
        updates.wait_for(|snapshot| !snapshot.stage.is_in_flight()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone()
}

#[tokio::test]
async fn test_reply_streams_through_relay() {
    let relay = spawn_relay().await;
    let session = SessionBuilder::with_relay_url(format!("http://{relay}")).build();

    session.submit("Hello").await.unwrap();
    let snapshot = settle(&session).await;

    assert_eq!(snapshot.status, StreamStatus::Idle);
    let messages = snapshot.conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(
        messages[1].content(),
        "Hello there from google/gemma-2b-it!"
    );
    assert_eq!(messages[1].model(), Some("google/gemma-2b-it"));

    session.select_model("mistralai/Mistral-7B-Instruct-v0.2");
    session.submit("And again").await.unwrap();
    let snapshot = settle(&session).await;
    assert_eq!(snapshot.conversation.len(), 4);
    assert_eq!(
        snapshot.conversation.last().unwrap().content(),
        "Hello there from mistralai/Mistral-7B-Instruct-v0.2!"
    );
}

#[tokio::test]
async fn test_backend_rejection_reaches_session() {
    let relay = spawn_relay().await;
    let session = SessionBuilder::with_relay_url(format!("http://{relay}")).build();

    session.submit("reject me").await.unwrap();
    let snapshot = settle(&session).await;

    assert_eq!(snapshot.conversation.len(), 1);
    assert_eq!(snapshot.stage, Stage::Errored);
    assert_eq!(
        snapshot.status,
        StreamStatus::Error("Provider error: Rate limit exceeded".to_owned())
    );

    // The session stays usable.
    session.submit("Hello").await.unwrap();
    let snapshot = settle(&session).await;
    assert_eq!(snapshot.status, StreamStatus::Idle);
    assert_eq!(snapshot.conversation.len(), 3);
}

#[tokio::test]
async fn test_backend_drop_keeps_partial_reply() {
    let relay = spawn_relay().await;
    let session = SessionBuilder::with_relay_url(format!("http://{relay}")).build();

    session.submit("drop me").await.unwrap();
    let snapshot = settle(&session).await;

    assert_eq!(snapshot.stage, Stage::Errored);
    let StreamStatus::Error(message) = &snapshot.status else {
        panic!("unexpected status: {:?}", snapshot.status);
    };
    assert!(message.starts_with("Stream interrupted"), "{message}");
    assert_eq!(snapshot.conversation.last().unwrap().content(), "Hel");
}

#[tokio::test]
async fn test_relay_unreachable() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let session = SessionBuilder::with_relay_url(format!("http://{addr}")).build();

    session.submit("Hello").await.unwrap();
    let snapshot = settle(&session).await;
    let StreamStatus::Error(message) = &snapshot.status else {
        panic!("unexpected status: {:?}", snapshot.status);
    };
    assert!(message.starts_with("Network error"), "{message}");
    assert_eq!(snapshot.conversation.len(), 1);
}
