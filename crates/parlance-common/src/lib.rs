pub mod errors;
pub mod id;

pub use errors::{ConfigError, ParlanceError, StoreError};
pub use id::{new_correlation_id, TimeIdGenerator};

pub type Result<T> = std::result::Result<T, ParlanceError>;
