//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::images::{image_error_detail, image_url_from_response, ImageRequest};
use crate::ChatError;

use super::{ByteStream, ChatRequest, ChatTransport};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Endpoint and connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub chat_path: String,
    pub image_path: String,
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_path: "/chat".to_string(),
            image_path: "/generate_image".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    pub fn with_image_path(mut self, path: impl Into<String>) -> Self {
        self.image_path = path.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn image_url(&self) -> String {
        join_url(&self.base_url, &self.image_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub struct HttpTransport {
    config: HttpTransportConfig,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Only the connect phase is bounded; a streaming reply may run as long
    /// as the backend keeps it open.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let url = self.config.chat_url();
        debug!(%url, session = %request.session_id, "opening chat stream");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default();
            let body = response.text().await.unwrap_or_default();
            let detail = backend_error_detail(&body, reason);
            warn!(status = status.as_u16(), %detail, "chat request rejected");
            return Err(ChatError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::Transport(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, ChatError> {
        if request.prompt.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let url = self.config.image_url();
        debug!(%url, size = %request.size, style = %request.style, "requesting image");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ChatError::Image(image_error_detail(&body)));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| ChatError::Image(format!("invalid image response: {e}")))?;
        image_url_from_response(&json)
            .ok_or_else(|| ChatError::Image("No image returned from server".into()))
    }
}

/// Cause text for a non-success chat response: the JSON body's `detail`,
/// else the whole JSON body, else the text body, else the reason phrase.
pub(crate) fn backend_error_detail(body: &str, reason: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null | Value::Bool(false) | Value::String(_)) | None => json.to_string(),
            Some(detail) => detail.to_string(),
        },
        Err(_) if !body.trim().is_empty() => body.to_string(),
        Err(_) => reason.to_string(),
    }
}
