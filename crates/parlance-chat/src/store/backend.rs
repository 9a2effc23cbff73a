//! Durable record access behind the session store.

use std::sync::{Arc, Mutex, MutexGuard};

use parlance_common::StoreError;

use crate::model::{Conversation, ConversationId, StoredImage};

/// The three independent durable records the client keeps.
///
/// Writes are synchronous: when a call returns `Ok`, the record is durable.
pub trait StoreBackend {
    fn load_conversations(&self) -> Result<Vec<Conversation>, StoreError>;
    fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), StoreError>;

    fn load_active(&self) -> Result<Option<ConversationId>, StoreError>;
    /// `None` removes the record.
    fn save_active(&self, id: Option<ConversationId>) -> Result<(), StoreError>;

    fn load_images(&self) -> Result<Vec<StoredImage>, StoreError>;
    fn save_images(&self, images: &[StoredImage]) -> Result<(), StoreError>;
}

/// Records as last written to a [`MemoryBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRecords {
    pub conversations: Option<Vec<Conversation>>,
    pub active: Option<ConversationId>,
    pub images: Vec<StoredImage>,
    pub conversation_writes: usize,
    pub active_writes: usize,
    pub fail_writes: bool,
}

/// In-process backend. Clones share the same records, so a test can keep
/// one handle to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<MemoryRecords>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: MemoryRecords) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn snapshot(&self) -> MemoryRecords {
        self.lock().clone()
    }

    /// Make every subsequent write fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRecords> {
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(records: &MemoryRecords) -> Result<(), StoreError> {
        if records.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl StoreBackend for MemoryBackend {
    fn load_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.lock().conversations.clone().unwrap_or_default())
    }

    fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        let mut records = self.lock();
        Self::check_writable(&records)?;
        records.conversations = Some(conversations.to_vec());
        records.conversation_writes += 1;
        Ok(())
    }

    fn load_active(&self) -> Result<Option<ConversationId>, StoreError> {
        Ok(self.lock().active)
    }

    fn save_active(&self, id: Option<ConversationId>) -> Result<(), StoreError> {
        let mut records = self.lock();
        Self::check_writable(&records)?;
        records.active = id;
        records.active_writes += 1;
        Ok(())
    }

    fn load_images(&self) -> Result<Vec<StoredImage>, StoreError> {
        Ok(self.lock().images.clone())
    }

    fn save_images(&self, images: &[StoredImage]) -> Result<(), StoreError> {
        let mut records = self.lock();
        Self::check_writable(&records)?;
        records.images = images.to_vec();
        Ok(())
    }
}
