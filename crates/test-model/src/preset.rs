use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    /// Delivered as-is as an increment.
    #[serde(rename = "increment")]
    Increment(String),
    /// The transport drops with the given message. Events after this one
    /// are never delivered.
    #[serde(rename = "interrupt")]
    Interrupt(String),
}

/// Makes the request fail before any byte of the response arrives.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum PresetFailure {
    /// The provider could not be reached.
    Network(String),
    /// The provider answered with a non-success status.
    Provider(String),
}

/// The preset response for one user turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails instead of streaming `events`.
    pub failure: Option<PresetFailure>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a `PresetResponse` streaming one increment per item.
    #[inline]
    pub fn with_increments<I, S>(increments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_events(
            increments
                .into_iter()
                .map(|text| PresetEvent::Increment(text.into()))
                .collect::<Vec<_>>(),
        )
    }

    /// Creates a `PresetResponse` whose request fails up front.
    #[inline]
    pub fn failing(failure: PresetFailure) -> Self {
        Self {
            events: vec![],
            failure: Some(failure),
        }
    }
}
