//! Chat request and image generation settings.

use serde::{Deserialize, Serialize};

/// Streaming chat request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Sent as `max_tokens` with every request (valid range: 1-32768).
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_tokens: 800 }
    }
}

/// Sizes the image backend accepts.
pub const IMAGE_SIZES: &[&str] = &["128x128", "256x256", "512x512", "1024x1024"];

/// Image generation defaults and the local image log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub size: String,
    pub style: String,
    /// Entries kept in the generated-image log (valid range: 1-1000).
    pub log_capacity: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            size: "512x512".into(),
            style: "photorealistic".into(),
            log_capacity: 30,
        }
    }
}
