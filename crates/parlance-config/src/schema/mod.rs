//! Configuration schema types for Parlance.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod backend;
mod chat;
mod storage;
mod system;

pub use backend::*;
pub use chat::*;
pub use storage::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Parlance.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParlanceConfig {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub images: ImagesConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}
