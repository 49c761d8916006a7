//! PaxSenix API client.
//!
//! Keep the public surface small: a client, its builder, and the chat resource.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod chat;
pub mod core;
pub mod validation;

pub use builder::PaxSenixClientBuilder;
pub use chat::{Chat, ChatCompletionParams, CHAT_COMPLETIONS_PATH};
pub use core::PaxSenixClient;
pub use validation::validate_messages;
