//! Conversation-related types.

use serde::Serialize;
use streamchat_model::{ChatMessage, Role};

/// The ordered messages of one conversation, oldest first.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub(crate) messages: Vec<Message>,
}

impl Conversation {
    /// Returns all messages in chronological order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Renders the whole conversation as plain text, suitable for copying
    /// to the clipboard.
    pub fn to_plain_text(&self) -> String {
        self.messages
            .iter()
            .map(|msg| match (msg.role, msg.model.as_deref()) {
                (Role::User, _) => format!("You: {}", msg.content),
                (Role::Assistant, Some(model)) => {
                    format!("Assistant ({model}): {}", msg.content)
                }
                (Role::Assistant, None) => format!("Assistant: {}", msg.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub(crate) fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role,
                content: msg.content.clone(),
            })
            .collect()
    }
}

/// One turn in the conversation.
///
/// The role and the model are fixed at creation. The content only changes
/// while the message is the assistant reply currently being streamed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub(crate) role: Role,
    pub(crate) content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<String>,
}

impl Message {
    #[inline]
    pub(crate) fn user(content: String) -> Self {
        Self {
            role: Role::User,
            content,
            model: None,
        }
    }

    #[inline]
    pub(crate) fn assistant(content: String, model: String) -> Self {
        Self {
            role: Role::Assistant,
            content,
            model: Some(model),
        }
    }

    /// Returns who wrote this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message text.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the model that produced this message, for assistant
    /// messages.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}
