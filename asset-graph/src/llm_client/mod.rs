//! LLM client abstraction.
//!
//! The extraction collaborator talks to a chat model through [`LlmClient`].
//!
//! # Implementations
//! - [`openai::OpenAiClient`]: OpenAI chat completions via `async-openai`.

pub mod openai;

use std::future::Future;

use serde::Serialize;

use crate::errors::Result;

/// A chat message for the LLM conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Speaker role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Trait for chat-completion clients.
pub trait LlmClient: Send + Sync {
    /// Send the conversation and return the assistant's reply text.
    fn generate(&self, messages: &[Message]) -> impl Future<Output = Result<String>> + Send;

    /// Model identifier reported by health checks.
    fn model(&self) -> &str;
}
