//! Parlance configuration system.
//!
//! TOML-based configuration with validation. All sections use defaults so
//! partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parlance_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{ParlanceConfig, CONFIG_SCHEMA_VERSION};

use std::path::{Path, PathBuf};

use parlance_common::ConfigError;

/// Load config from `path`, or from the platform default path when `None`.
///
/// The default path is created from the documented template if missing and
/// validated strictly; an explicit path is loaded leniently.
pub fn load_config(path: Option<&Path>) -> Result<ParlanceConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => {
            let config = toml_loader::load_default()?;
            validation::validate(&config)?;
            Ok(config)
        }
    }
}

/// Directory holding conversation history and the image log.
pub fn resolve_data_dir(config: &ParlanceConfig) -> Result<PathBuf, ConfigError> {
    match &config.storage.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => toml_loader::default_data_dir(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ParlanceConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = ParlanceConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"backend\""));
        assert!(json.contains("\"chat\""));
        assert!(json.contains("\"images\""));
        assert!(json.contains("\"storage\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = ParlanceConfig::default();
        let json = config_to_json(&config);
        let parsed: ParlanceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.backend.base_url, "http://localhost:8001");
        assert_eq!(parsed.chat.max_tokens, 800);
        assert_eq!(parsed.images.style, "photorealistic");
    }

    #[test]
    fn explicit_data_dir_wins() {
        let mut config = ParlanceConfig::default();
        config.storage.data_dir = Some(PathBuf::from("/srv/parlance"));
        assert_eq!(
            resolve_data_dir(&config).unwrap(),
            PathBuf::from("/srv/parlance")
        );
    }

    #[test]
    fn load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[images]\nstyle = \"watercolor\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.images.style, "watercolor");
    }
}
