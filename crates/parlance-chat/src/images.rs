//! Generated-image log and the image-generation wire shapes.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use parlance_common::StoreError;

use crate::model::StoredImage;
use crate::store::StoreBackend;

/// Path prefix the backend uses for images it serves itself.
pub const GENERATED_IMAGES_PREFIX: &str = "/generated_images/";

pub const DEFAULT_LOG_CAPACITY: usize = 30;

const FALLBACK_ERROR: &str = "Image generation failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
    pub style: String,
}

/// Make a backend-relative image path absolute. Other URLs pass through.
pub fn resolve_media_url(base_url: &str, url: &str) -> String {
    if url.starts_with(GENERATED_IMAGES_PREFIX) {
        format!("{}{url}", base_url.trim_end_matches('/'))
    } else {
        url.to_string()
    }
}

/// Image location from a successful generation response:
/// `url`, else `image_url`, else `image_data`.
pub fn image_url_from_response(body: &Value) -> Option<String> {
    ["url", "image_url", "image_data"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// Human-readable cause from a failed generation response body.
pub fn image_error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let nested = json
            .get("error")
            .and_then(|e| e.get("detail"))
            .and_then(Value::as_str);
        let flat = json.get("detail").and_then(Value::as_str);
        let plain = json.get("error").and_then(Value::as_str);
        if let Some(detail) = nested.or(flat).or(plain).filter(|d| !d.is_empty()) {
            return detail.to_string();
        }
    }
    let text = body.trim();
    if text.is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        text.to_string()
    }
}

/// Newest-first, capped log of generated images.
pub struct ImageLog<B: StoreBackend> {
    backend: B,
    capacity: usize,
    entries: Vec<StoredImage>,
}

impl<B: StoreBackend> ImageLog<B> {
    pub fn new(backend: B, capacity: usize) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[StoredImage] {
        &self.entries
    }

    /// Re-read the durable log, picking up writes made by other processes.
    pub fn refresh(&mut self) -> Result<&[StoredImage], StoreError> {
        let mut entries = self.backend.load_images()?;
        entries.truncate(self.capacity);
        self.entries = entries;
        Ok(&self.entries)
    }

    /// Put `image` at the front of the log and write it out.
    pub fn record(&mut self, image: StoredImage) -> Result<(), StoreError> {
        if let Err(e) = self.refresh() {
            warn!(error = %e, "image log unreadable; rebuilding from memory");
        }
        debug!(id = %image.id, "recording generated image");
        self.entries.insert(0, image);
        self.entries.truncate(self.capacity);
        self.backend.save_images(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, MemoryRecords};
    use serde_json::json;

    #[test]
    fn resolves_backend_relative_urls() {
        assert_eq!(
            resolve_media_url("http://localhost:8001", "/generated_images/a.png"),
            "http://localhost:8001/generated_images/a.png"
        );
        assert_eq!(
            resolve_media_url("http://host/", "/generated_images/a.png"),
            "http://host/generated_images/a.png"
        );
        assert_eq!(resolve_media_url("http://host", "/img/1.png"), "/img/1.png");
        assert_eq!(
            resolve_media_url("http://host", "data:image/png;base64,AA"),
            "data:image/png;base64,AA"
        );
    }

    #[test]
    fn response_url_fallbacks() {
        assert_eq!(
            image_url_from_response(&json!({"url": "/a", "image_url": "/b"})).as_deref(),
            Some("/a")
        );
        assert_eq!(
            image_url_from_response(&json!({"image_url": "/b"})).as_deref(),
            Some("/b")
        );
        assert_eq!(
            image_url_from_response(&json!({"image_data": "data:x"})).as_deref(),
            Some("data:x")
        );
        assert_eq!(image_url_from_response(&json!({"ok": true})), None);
    }

    #[test]
    fn error_detail_fallbacks() {
        assert_eq!(
            image_error_detail(r#"{"error":{"detail":"nested"},"detail":"flat"}"#),
            "nested"
        );
        assert_eq!(image_error_detail(r#"{"detail":"flat"}"#), "flat");
        assert_eq!(image_error_detail(r#"{"error":"plain"}"#), "plain");
        assert_eq!(image_error_detail("gateway exploded"), "gateway exploded");
        assert_eq!(image_error_detail(""), FALLBACK_ERROR);
    }

    #[test]
    fn record_keeps_newest_first_and_caps() {
        let backend = MemoryBackend::new();
        let mut log = ImageLog::new(backend.clone(), 3);

        for i in 0..5 {
            log.record(StoredImage::new(i, format!("/img/{i}.png"), format!("p{i}")))
                .unwrap();
        }

        let ids: Vec<&str> = log.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3", "2"]);
        assert_eq!(backend.snapshot().images.len(), 3);
    }

    #[test]
    fn refresh_sees_out_of_band_writes() {
        let backend = MemoryBackend::with_records(MemoryRecords::default());
        let mut log = ImageLog::new(backend.clone(), DEFAULT_LOG_CAPACITY);
        assert!(log.refresh().unwrap().is_empty());

        let other = MemoryBackend::clone(&backend);
        other
            .save_images(&[StoredImage::new(1, "/img/1.png", "fox")])
            .unwrap();

        assert_eq!(log.refresh().unwrap().len(), 1);
        assert_eq!(log.entries()[0].prompt, "fox");
    }

    #[test]
    fn record_surfaces_write_failure() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let mut log = ImageLog::new(backend, 5);
        assert!(log.record(StoredImage::new(1, "/img/1.png", "x")).is_err());
        assert_eq!(log.entries().len(), 1);
    }
}
