use std::sync::{Arc, Mutex};
use std::time::Duration;

use streamchat_model::Role;
use streamchat_test_model::{
    PresetEvent, PresetFailure, PresetResponse, TestModelProvider,
};
use tokio::time::{sleep, timeout};

use crate::{
    ChatSession, SessionBuilder, SessionSnapshot, Stage, StreamStatus,
    SubmitError,
};

const MODEL: &str = "google/gemma-2b-it";

fn session_with(provider: TestModelProvider) -> ChatSession {
    SessionBuilder::with_model_provider(provider)
        .with_model(MODEL)
        .build()
}

async fn wait_until(
    session: &ChatSession,
    cond: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut updates = session.subscribe();
    timeout(Duration::from_secs(5), updates.wait_for(cond))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

fn settled(snapshot: &SessionSnapshot) -> bool {
    !snapshot.stage.is_in_flight()
}

fn contents(snapshot: &SessionSnapshot) -> Vec<(Role, String)> {
    snapshot
        .conversation
        .messages()
        .iter()
        .map(|msg| (msg.role(), msg.content().to_owned()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_streamed_reply() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_increments(["H", "He", "Hello"]));

    let seen = Arc::new(Mutex::new(vec![]));
    let session = SessionBuilder::with_model_provider(provider)
        .with_model(MODEL)
        .on_update({
            let seen = Arc::clone(&seen);
            move |snapshot| {
                seen.lock().unwrap().push((
                    snapshot.conversation.len(),
                    snapshot.status.clone(),
                ));
            }
        })
        .build();

    session.submit("Greet me").await.unwrap();
    let snapshot = wait_until(&session, settled).await;

    assert_eq!(
        contents(&snapshot),
        [
            (Role::User, "Greet me".to_owned()),
            (Role::Assistant, "Hello".to_owned()),
        ]
    );
    let reply = snapshot.conversation.last().unwrap();
    assert_eq!(reply.model(), Some(MODEL));
    assert_eq!(snapshot.status, StreamStatus::Idle);

    assert_eq!(
        *seen.lock().unwrap(),
        [
            (1, StreamStatus::Pending),
            (2, StreamStatus::Pending),
            (2, StreamStatus::Pending),
            (2, StreamStatus::Pending),
            (2, StreamStatus::Idle),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_submit() {
    let session = session_with(TestModelProvider::default());
    assert_eq!(session.submit("   ").await, Err(SubmitError::Empty));
    assert_eq!(session.pick_suggestion("").await, Err(SubmitError::Empty));

    let snapshot = session.snapshot().await;
    assert!(snapshot.conversation.is_empty());
    assert_eq!(snapshot.status, StreamStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_provider_error() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::failing(PresetFailure::Provider(
        "Invalid API key".to_owned(),
    )));
    let session = session_with(provider);

    session.submit("Hello").await.unwrap();
    let snapshot = wait_until(&session, settled).await;
    assert_eq!(contents(&snapshot), [(Role::User, "Hello".to_owned())]);
    assert_eq!(snapshot.stage, Stage::Errored);
    assert_eq!(
        snapshot.status,
        StreamStatus::Error("Provider error: Invalid API key".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_stream_then_retry() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::Increment("Hi th".to_owned()),
        PresetEvent::Interrupt("connection reset".to_owned()),
    ]));
    provider.add_response(PresetResponse::with_increments(["Sure", "Sure!"]));
    let session = session_with(provider);

    session.submit("Hello").await.unwrap();
    let snapshot = wait_until(&session, settled).await;
    assert_eq!(
        contents(&snapshot),
        [
            (Role::User, "Hello".to_owned()),
            (Role::Assistant, "Hi th".to_owned()),
        ]
    );
    assert_eq!(
        snapshot.status,
        StreamStatus::Error("Stream interrupted: connection reset".to_owned())
    );

    session.submit("Try again").await.unwrap();
    assert_eq!(session.snapshot().await.status, StreamStatus::Pending);
    let snapshot = wait_until(&session, settled).await;
    assert_eq!(snapshot.status, StreamStatus::Idle);
    assert_eq!(snapshot.conversation.len(), 4);
    assert_eq!(snapshot.conversation.last().unwrap().content(), "Sure!");
}

#[tokio::test(start_paused = true)]
async fn test_busy_while_streaming() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_increments(["One", "One two"]));
    let session = session_with(provider);

    session.submit("First").await.unwrap();
    assert_eq!(session.submit("Second").await, Err(SubmitError::Busy));

    let snapshot = wait_until(&session, settled).await;
    assert_eq!(snapshot.conversation.len(), 2);
    assert_eq!(snapshot.conversation.messages()[0].content(), "First");
}

#[tokio::test(start_paused = true)]
async fn test_clear_while_streaming() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(50));
    provider.add_response(PresetResponse::with_increments([
        "A", "A long", "A long reply", "A long reply indeed",
    ]));
    let session = session_with(provider);

    session.submit("Hello").await.unwrap();
    wait_until(&session, |snapshot| snapshot.stage == Stage::Streaming).await;
    session.clear();

    let snapshot = session.snapshot().await;
    assert!(snapshot.conversation.is_empty());
    assert_eq!(snapshot.status, StreamStatus::Idle);

    // Let the old send run to completion.
    sleep(Duration::from_secs(1)).await;
    let snapshot = session.snapshot().await;
    assert!(snapshot.conversation.is_empty());
    assert_eq!(snapshot.stage, Stage::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_select_model() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_increments(["A"]));
    provider.add_response(PresetResponse::with_increments(["B"]));
    let session = session_with(provider);

    session.submit("One").await.unwrap();
    wait_until(&session, settled).await;

    session.select_model("mistralai/Mistral-7B-Instruct-v0.2");
    session.select_model("");
    assert_eq!(
        session.snapshot().await.selected_model,
        "mistralai/Mistral-7B-Instruct-v0.2"
    );

    session.submit("Two").await.unwrap();
    let snapshot = wait_until(&session, settled).await;
    let models: Vec<_> = snapshot
        .conversation
        .messages()
        .iter()
        .filter_map(|msg| msg.model())
        .collect();
    assert_eq!(models, [MODEL, "mistralai/Mistral-7B-Instruct-v0.2"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_completion() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events(Vec::<PresetEvent>::new()));
    let session = session_with(provider);

    session.submit("Say nothing").await.unwrap();
    let snapshot = wait_until(&session, settled).await;
    assert_eq!(contents(&snapshot), [(Role::User, "Say nothing".to_owned())]);
    assert_eq!(snapshot.status, StreamStatus::Idle);
}
