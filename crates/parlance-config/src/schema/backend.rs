use serde::{Deserialize, Serialize};

/// Where the inference backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Scheme, host and port, without a trailing slash.
    pub base_url: String,
    /// Streaming chat endpoint, relative to `base_url`.
    pub chat_path: String,
    /// Image generation endpoint, relative to `base_url`.
    pub image_path: String,
    /// TCP connect timeout in seconds (valid range: 1-300).
    /// The streaming body itself has no timeout.
    pub connect_timeout_secs: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".into(),
            chat_path: "/chat".into(),
            image_path: "/generate_image".into(),
            connect_timeout_secs: 10,
        }
    }
}

impl BackendConfig {
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
