use serde::{Deserialize, Serialize};
use streamchat_model::{ChatMessage, ModelFinishReason, ModelRequest};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

/// Error bodies come in two shapes: the relay's `{"error": "..."}` and
/// the provider's `{"error": {"message": "...", ...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Object { message: String },
}

impl ErrorBody {
    #[inline]
    pub fn into_message(self) -> String {
        match self.error {
            ErrorDetail::Text(message) => message,
            ErrorDetail::Object { message } => message,
        }
    }
}

/// Extracts a human-readable message from a non-success response body.
pub fn error_message(status_line: &str, body: &str) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(body) {
        return body.into_message();
    }
    let body = body.trim();
    if body.is_empty() {
        status_line.to_owned()
    } else {
        body.to_owned()
    }
}

#[inline]
pub fn finish_reason(reason: &str) -> ModelFinishReason {
    match reason {
        "stop" | "eos" => ModelFinishReason::Stop,
        "length" => ModelFinishReason::Length,
        _ => ModelFinishReason::Other,
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[inline]
pub fn create_request(req: &ModelRequest) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: &req.model,
        messages: &req.messages,
        stream: true,
    }
}
