//! Request validation.

use crate::types::{Message, MessageContent, MessageRole};
use crate::{Error, ErrorContext, Result};

/// Roles accepted by [`validate_messages`].
const ALLOWED_ROLES: &[MessageRole] = &[
    MessageRole::System,
    MessageRole::User,
    MessageRole::Assistant,
    MessageRole::Function,
];

/// Check that `messages` is non-empty, every role is one of
/// `system|user|assistant|function`, and every content is a plain string.
pub fn validate_messages(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::validation_with_context(
            "Invalid messages format",
            ErrorContext::new()
                .with_field_path("params.messages")
                .with_details("at least one message is required")
                .with_source("message_validator"),
        ));
    }

    for (i, msg) in messages.iter().enumerate() {
        if !ALLOWED_ROLES.contains(&msg.role) {
            return Err(Error::validation_with_context(
                "Invalid messages format",
                ErrorContext::new()
                    .with_field_path(format!("params.messages[{}].role", i))
                    .with_details(format!("unsupported role: {}", msg.role.as_str()))
                    .with_source("message_validator"),
            ));
        }
        if !matches!(msg.content, MessageContent::Text(_)) {
            return Err(Error::validation_with_context(
                "Invalid messages format",
                ErrorContext::new()
                    .with_field_path(format!("params.messages[{}].content", i))
                    .with_details("content must be a string")
                    .with_source("message_validator"),
            ));
        }
    }

    Ok(())
}
