//! Network seam between the controller and the inference backend.

mod http;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde::Serialize;

use crate::images::ImageRequest;
use crate::model::{Message, Role};
use crate::ChatError;

pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_BASE_URL};

/// Raw response body of a streaming chat request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// One prior turn sent as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Body of `POST {chat_path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    /// Turns before `message`; `None` serializes as `null`.
    pub history: Option<Vec<HistoryEntry>>,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Build a request from the conversation's messages preceding the new one.
    pub fn new(
        message: impl Into<String>,
        session_id: impl ToString,
        prior: &[Message],
        max_tokens: u32,
    ) -> Self {
        let history: Vec<HistoryEntry> = prior
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.text.clone(),
            })
            .collect();
        Self {
            message: message.into(),
            session_id: session_id.to_string(),
            history: if history.is_empty() { None } else { Some(history) },
            max_tokens,
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a streaming chat request. Resolves once the response status is
    /// known; a non-success status is returned as [`ChatError::Backend`].
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;

    /// Generate one image and return its location as the backend reports it.
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, ChatError>;
}
