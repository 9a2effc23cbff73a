use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(String),

    #[error("corrupt record {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialize(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParlanceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("chat error: {0}")]
    Chat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("chat.max_tokens = 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: chat.max_tokens = 0"
        );
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::Corrupt {
            path: PathBuf::from("/data/chat_history.json"),
            reason: "expected array".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt record /data/chat_history.json: expected array"
        );

        let err = StoreError::Unavailable("disk full".into());
        assert_eq!(err.to_string(), "store unavailable: disk full");
    }

    #[test]
    fn store_error_from_json() {
        let json_err = serde_json::from_str::<Vec<u32>>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialize(_)));
    }

    #[test]
    fn parlance_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: ParlanceError = config_err.into();
        assert!(matches!(err, ParlanceError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn parlance_error_from_store() {
        let store_err = StoreError::Unavailable("read-only".into());
        let err: ParlanceError = store_err.into();
        assert!(matches!(err, ParlanceError::Store(_)));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn parlance_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ParlanceError = io_err.into();
        assert!(matches!(err, ParlanceError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn parlance_error_chat_display() {
        let err = ParlanceError::Chat("request superseded".into());
        assert_eq!(err.to_string(), "chat error: request superseded");
    }
}
