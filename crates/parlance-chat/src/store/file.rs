//! JSON files under a data directory.
//!
//! Every write goes to a `.tmp` sibling first and is renamed into place, so
//! a crash mid-write leaves the previous record intact.

use std::path::{Path, PathBuf};

use parlance_common::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{Conversation, ConversationId, StoredImage};

use super::backend::StoreBackend;

pub const CONVERSATIONS_FILE: &str = "chat_history.json";
pub const ACTIVE_FILE: &str = "current_chat_id";
pub const IMAGES_FILE: &str = "generated_images.json";

#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path,
            reason: e.to_string(),
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        write_atomic(&self.path(name), json.as_bytes())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes)?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        // Some filesystems refuse to rename over an existing file.
        warn!(path = %path.display(), "atomic rename failed ({e}), writing in place");
        std::fs::write(path, bytes)?;
        let _ = std::fs::remove_file(&tmp_path);
    }

    debug!(path = %path.display(), "record saved");
    Ok(())
}

impl StoreBackend for FileBackend {
    fn load_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.read_json(CONVERSATIONS_FILE)
    }

    fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        self.write_json(CONVERSATIONS_FILE, conversations)
    }

    fn load_active(&self) -> Result<Option<ConversationId>, StoreError> {
        let path = self.path(ACTIVE_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        content
            .parse()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| StoreError::Corrupt {
                path,
                reason: e.to_string(),
            })
    }

    fn save_active(&self, id: Option<ConversationId>) -> Result<(), StoreError> {
        let path = self.path(ACTIVE_FILE);
        match id {
            Some(id) => write_atomic(&path, id.to_string().as_bytes()),
            None => match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn load_images(&self) -> Result<Vec<StoredImage>, StoreError> {
        self.read_json(IMAGES_FILE)
    }

    fn save_images(&self, images: &[StoredImage]) -> Result<(), StoreError> {
        self.write_json(IMAGES_FILE, images)
    }
}
