//! Chat engine for Parlance.
//!
//! Turns the streamed reply of one in-flight request into application
//! events and folds them into a persisted, ordered conversation history:
//! - [`frame`]: incremental frame parsing of the response body
//! - [`event`]: payload decoding into [`StreamEvent`]
//! - [`reconciler`]: event application to the request's conversation
//! - [`store`]: conversation list, active pointer, durable backends
//! - [`controller`]: request lifecycle, cancellation, supersession

pub mod controller;
pub mod event;
pub mod frame;
pub mod images;
pub mod model;
pub mod reconciler;
pub mod store;
pub mod transport;

pub use controller::{ChatController, ControllerOptions, RequestState, ABORT_MARKER};
pub use event::StreamEvent;
pub use frame::{Frame, FrameParser};
pub use images::{ImageLog, ImageRequest};
pub use model::{Conversation, ConversationId, Message, MessageId, Role, StoredImage};
pub use reconciler::{Applied, Reconciler};
pub use store::{FileBackend, MemoryBackend, SessionStore, StoreBackend};
pub use transport::{ChatRequest, ChatTransport, HttpTransport, HttpTransportConfig};

use parlance_common::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Transport(String),
    #[error("Backend error: {status} - {detail}")]
    Backend { status: u16, detail: String },
    #[error("invalid request transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RequestState, to: RequestState },
    #[error("event from superseded request (generation {generation})")]
    Superseded { generation: u64 },
    #[error("message is empty")]
    EmptyMessage,
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),
    #[error("{0}")]
    Image(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
