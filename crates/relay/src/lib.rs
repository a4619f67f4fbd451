//! An HTTP relay between chat clients and an OpenAI-compatible completion
//! backend.
//!
//! `POST /api/chat` takes `{"messages": [...], "model": "..."}`, forwards
//! the conversation upstream with the relay's credentials and streams the
//! upstream event stream back unchanged. The relay keeps no state between
//! requests and retries nothing.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod error;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use streamchat_model::{ChatMessage, ModelRequest};
use streamchat_openai_model::OpenAIProvider;
use tower_http::trace::TraceLayer;

pub use config::{DEFAULT_MODEL, RelayConfig};
use error::AppError;

struct RelayState {
    provider: OpenAIProvider,
    default_model: String,
}

#[derive(Debug, Deserialize)]
struct RelayRequest {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    model: Option<String>,
}

/// Builds the relay's routes.
pub fn router(config: &RelayConfig) -> Router {
    let state = Arc::new(RelayState {
        provider: config.provider(),
        default_model: config.default_model().to_owned(),
    });
    Router::new()
        .route("/api/chat", post(chat))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn chat(
    State(state): State<Arc<RelayState>>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    if payload.messages.is_empty() {
        return Err(AppError::BadRequest(
            "messages must not be empty".to_owned(),
        ));
    }

    let model = payload
        .model
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| state.default_model.clone());
    debug!(
        "relaying {} messages to {model}",
        payload.messages.len()
    );
    let req = ModelRequest {
        messages: payload.messages,
        model,
    };

    let upstream = state.provider.open(&req).await.inspect_err(|err| {
        warn!("upstream failed: {err}");
    })?;
    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/event-stream"));

    let headers = [
        (CONTENT_TYPE, content_type),
        (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
    ];
    Ok((headers, Body::from_stream(upstream.bytes_stream())).into_response())
}

async fn healthz() -> &'static str {
    "ok"
}
