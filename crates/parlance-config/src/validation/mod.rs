//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects errors into a single `ConfigError`.

mod helpers;


use crate::schema::{ParlanceConfig, IMAGE_SIZES};
use parlance_common::ConfigError;

use helpers::{validate_one_of, validate_range};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ParlanceConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_backend(&mut errors, config);
    validate_chat(&mut errors, config);
    validate_images(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_backend(errors: &mut Vec<String>, config: &ParlanceConfig) {
    let base = &config.backend.base_url;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(format!(
            "backend.base_url = {base:?} must start with http:// or https://"
        ));
    }
    validate_range(
        errors,
        "backend.connect_timeout_secs",
        config.backend.connect_timeout_secs,
        1,
        300,
    );
}

fn validate_chat(errors: &mut Vec<String>, config: &ParlanceConfig) {
    validate_range(errors, "chat.max_tokens", config.chat.max_tokens, 1, 32768);
}

fn validate_images(errors: &mut Vec<String>, config: &ParlanceConfig) {
    validate_one_of(errors, "images.size", &config.images.size, IMAGE_SIZES);
    validate_range(
        errors,
        "images.log_capacity",
        config.images.log_capacity,
        1,
        1000,
    );
}
