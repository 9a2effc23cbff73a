use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory when set.
    pub data_dir: Option<PathBuf>,
}
