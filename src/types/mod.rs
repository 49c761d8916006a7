//! Request types shared by the client resources.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and content |
//! | [`MessageRole`] | `system`, `user`, `assistant`, `function`, `tool` |
//! | [`MessageContent`] | Plain text or pass-through content parts |

pub mod message;

pub use message::{Message, MessageContent, MessageRole};
