//! Session store: the in-memory conversation list plus its durable record.
//!
//! The list is kept most-recently-active first. Nothing is written before
//! [`SessionStore::hydrate`] has run, so a store that has not loaded yet can
//! never clobber the previous session. After hydration every mutation of the
//! list or the active pointer is written through synchronously.

mod backend;
mod file;

pub use backend::{MemoryBackend, MemoryRecords, StoreBackend};
pub use file::{FileBackend, ACTIVE_FILE, CONVERSATIONS_FILE, IMAGES_FILE};

use tracing::{debug, info, warn};

use crate::model::{Conversation, ConversationId, Message, MessageId};

pub struct SessionStore<B: StoreBackend> {
    backend: B,
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    hydrated: bool,
}

impl<B: StoreBackend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            conversations: Vec::new(),
            active: None,
            hydrated: false,
        }
    }

    /// Load the persisted list and active pointer, then enable writes.
    ///
    /// Unreadable records are logged and treated as empty. An active id that
    /// names no stored conversation is dropped and its record removed.
    pub fn hydrate(&mut self) {
        self.conversations = match self.backend.load_conversations() {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(error = %e, "failed to load conversation history; starting empty");
                Vec::new()
            }
        };

        let active = match self.backend.load_active() {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "failed to load active conversation id");
                None
            }
        };

        self.hydrated = true;

        match active {
            Some(id) if self.conversation(id).is_some() => self.active = Some(id),
            Some(id) => {
                info!(conversation = %id, "active conversation no longer exists; clearing");
                self.active = None;
                self.persist_active();
            }
            None => self.active = None,
        }

        info!(
            conversations = self.conversations.len(),
            active = ?self.active,
            "session store hydrated"
        );
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Every conversation held in memory, including transient ones.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Conversations shown to the user: those with meaningful content.
    pub fn history(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations
            .iter()
            .filter(|c| c.has_meaningful_messages())
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.active
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.and_then(|id| self.conversation(id))
    }

    /// Largest id (conversation or message) held, for seeding id generation.
    pub fn max_id(&self) -> i64 {
        self.conversations
            .iter()
            .flat_map(|c| std::iter::once(c.id.0).chain(c.messages.iter().map(|m| m.id.0)))
            .max()
            .unwrap_or(0)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn set_active(&mut self, id: Option<ConversationId>) {
        if self.active == id {
            return;
        }
        self.active = id;
        self.persist_active();
    }

    /// Insert a new conversation at the head of the list.
    pub fn create_conversation(&mut self, conversation: Conversation) {
        debug!(conversation = %conversation.id, title = %conversation.title, "conversation created");
        self.conversations.insert(0, conversation);
        self.persist_conversations();
    }

    /// Apply `f` to one conversation and write the list through.
    ///
    /// Returns `None` when the conversation does not exist.
    pub fn mutate<R>(
        &mut self,
        id: ConversationId,
        f: impl FnOnce(&mut Conversation) -> R,
    ) -> Option<R> {
        let conversation = self.conversations.iter_mut().find(|c| c.id == id)?;
        let result = f(conversation);
        self.persist_conversations();
        Some(result)
    }

    /// Append a message and move its conversation to the head.
    pub fn append_message(&mut self, id: ConversationId, message: Message) -> bool {
        let Some(pos) = self.conversations.iter().position(|c| c.id == id) else {
            warn!(conversation = %id, "append to unknown conversation ignored");
            return false;
        };
        let mut conversation = self.conversations.remove(pos);
        conversation.messages.push(message);
        self.conversations.insert(0, conversation);
        self.persist_conversations();
        true
    }

    /// Replace the message with `message.id` in place. Order is unchanged.
    ///
    /// Returns `false` when the conversation or message does not exist.
    pub fn replace_message(&mut self, id: ConversationId, message: Message) -> bool {
        let Some(slot) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .and_then(|c| c.messages.iter_mut().find(|m| m.id == message.id))
        else {
            return false;
        };
        if *slot != message {
            *slot = message;
            self.persist_conversations();
        }
        true
    }

    pub fn has_message(&self, id: ConversationId, message: MessageId) -> bool {
        self.conversation(id)
            .is_some_and(|c| c.message(message).is_some())
    }

    /// Write the list and the active pointer.
    pub fn persist(&self) {
        self.persist_conversations();
        self.persist_active();
    }

    fn persist_conversations(&self) {
        if !self.hydrated {
            debug!("skipping conversation write before hydration");
            return;
        }
        let meaningful: Vec<Conversation> = self.history().cloned().collect();
        if let Err(e) = self.backend.save_conversations(&meaningful) {
            warn!(error = %e, "failed to persist conversation history");
        }
    }

    fn persist_active(&self) {
        if !self.hydrated {
            debug!("skipping active id write before hydration");
            return;
        }
        if let Err(e) = self.backend.save_active(self.active) {
            warn!(error = %e, "failed to persist active conversation id");
        }
    }
}
