//! Fixed choices offered to the user.

/// Models the user can pick from. The first one is selected at start.
pub const MODEL_OPTIONS: &[&str] = &[
    "google/gemma-2b-it",
    "mistralai/Mistral-7B-Instruct-v0.2",
];

/// The model selected when a session starts.
pub const DEFAULT_MODEL: &str = MODEL_OPTIONS[0];

/// Prompts offered while the conversation is empty.
pub const SUGGESTIONS: &[&str] = &[
    "What are Newton's Laws and examples of each?",
    "What are the rules for professional cricket?",
    "What are some quick one pot meals for a family of 4?",
    "What is the weather in San Francisco like in July?",
];

/// Headline shown while the conversation is empty.
pub const GREETING: &str = "Hello there!";

/// Second line of the greeting.
pub const GREETING_DETAIL: &str = "How can I help you today?";

/// Returns the suggestion with the given 1-based number, as it is listed
/// to the user.
#[inline]
pub fn suggestion(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|idx| SUGGESTIONS.get(idx))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_numbers() {
        assert_eq!(suggestion(0), None);
        assert_eq!(suggestion(1), Some(SUGGESTIONS[0]));
        assert_eq!(suggestion(4), Some(SUGGESTIONS[3]));
        assert_eq!(suggestion(5), None);
    }

    #[test]
    fn test_default_model() {
        assert_eq!(DEFAULT_MODEL, "google/gemma-2b-it");
        assert!(MODEL_OPTIONS.contains(&DEFAULT_MODEL));
    }
}
