//! Folds stream events into the conversation that issued the request.
//!
//! Each request owns one pending assistant message whose id is reserved
//! before the first event arrives. Chunks carry the full cumulative text, so
//! applying one is a replace of that message, never an append, and applying
//! the same chunk twice converges to the same state.

use parlance_common::TimeIdGenerator;
use tracing::debug;

use crate::event::StreamEvent;
use crate::model::{ConversationId, Message, MessageId};
use crate::store::{SessionStore, StoreBackend};

/// Text of the assistant message that carries streamed media.
pub const IMAGE_MESSAGE_TEXT: &str = "[IMAGE]";

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Pending message appended with its first non-blank text.
    Created,
    /// Pending message replaced in place.
    Updated,
    /// Blank chunk before any text; nothing changed.
    Suppressed,
    MediaAppended,
    Completed,
    Failed,
    /// The conversation no longer exists.
    Ignored,
}

#[derive(Debug)]
pub struct Reconciler {
    conversation: ConversationId,
    pending: MessageId,
    text: String,
    created: bool,
}

impl Reconciler {
    pub fn new(conversation: ConversationId, pending: MessageId) -> Self {
        Self {
            conversation,
            pending,
            text: String::new(),
            created: false,
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn pending_id(&self) -> MessageId {
        self.pending
    }

    /// Last cumulative text seen.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the pending message has been appended.
    pub fn has_message(&self) -> bool {
        self.created
    }

    pub fn apply<B: StoreBackend>(
        &mut self,
        store: &mut SessionStore<B>,
        ids: &TimeIdGenerator,
        event: StreamEvent,
    ) -> Applied {
        if store.conversation(self.conversation).is_none() {
            debug!(conversation = %self.conversation, "event for missing conversation dropped");
            return Applied::Ignored;
        }

        match event {
            StreamEvent::Chunk { text } => {
                if !text.is_empty() {
                    self.text = text;
                }
                // Blank text only holds back the first message; later chunks
                // always replace it.
                if !self.created && self.text.trim().is_empty() {
                    return Applied::Suppressed;
                }
                let message = Message::assistant(self.pending, self.text.clone());
                if self.created {
                    store.replace_message(self.conversation, message);
                    Applied::Updated
                } else {
                    self.created = store.append_message(self.conversation, message);
                    Applied::Created
                }
            }
            StreamEvent::Image { url } => {
                let message =
                    Message::assistant(MessageId(ids.next_id()), IMAGE_MESSAGE_TEXT).with_image(url);
                store.append_message(self.conversation, message);
                Applied::MediaAppended
            }
            StreamEvent::Done { content } => {
                // An existing message keeps its last chunk text even if the
                // final content differs.
                if !self.created {
                    let final_text = content.unwrap_or_else(|| self.text.clone());
                    if !final_text.trim().is_empty() {
                        self.text = final_text.clone();
                        self.created = store.append_message(
                            self.conversation,
                            Message::assistant(self.pending, final_text),
                        );
                    }
                }
                Applied::Completed
            }
            StreamEvent::Error { detail } => {
                self.append_notice(store, ids, format!("Error: {detail}"));
                Applied::Failed
            }
        }
    }

    /// Append a standalone assistant message (error text, abort marker).
    /// The pending message is left alone.
    pub fn append_notice<B: StoreBackend>(
        &self,
        store: &mut SessionStore<B>,
        ids: &TimeIdGenerator,
        text: impl Into<String>,
    ) -> bool {
        store.append_message(
            self.conversation,
            Message::assistant(MessageId(ids.next_id()), text),
        )
    }
}
