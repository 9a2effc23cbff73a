//! Request lifecycle controller.
//!
//! Owns at most one in-flight request. [`ChatController::send`] records the
//! user message and prepares the request; [`ChatController::pump`] drives
//! it one step at a time (open the connection, or read the next body
//! fragment). Both are cancel-safe, so a caller can race `pump` against user
//! input in `tokio::select!` without losing data.
//!
//! Every request carries a generation number. Starting a new request, or
//! switching conversation, aborts the previous one first, and events tagged
//! with an older generation are rejected.

mod state;

pub use state::RequestState;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use parlance_common::{new_correlation_id, TimeIdGenerator};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::{interpret, StreamEvent};
use crate::frame::FrameParser;
use crate::images::{resolve_media_url, ImageLog, ImageRequest, DEFAULT_LOG_CAPACITY};
use crate::model::{
    derive_title, image_title, Conversation, ConversationId, Message, MessageId, StoredImage,
};
use crate::reconciler::{Applied, Reconciler};
use crate::store::{SessionStore, StoreBackend};
use crate::transport::{ByteStream, ChatRequest, ChatTransport, DEFAULT_BASE_URL};
use crate::ChatError;

/// Marker appended when the user abandons a request.
pub const ABORT_MARKER: &str = "[stream aborted]";

type OpenFuture = Pin<Box<dyn Future<Output = Result<ByteStream, ChatError>> + Send>>;

/// Request and image settings.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub max_tokens: u32,
    /// Base for resolving backend-relative media paths.
    pub media_base_url: String,
    pub image_size: String,
    pub image_style: String,
    pub image_log_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            media_base_url: DEFAULT_BASE_URL.to_string(),
            image_size: "512x512".to_string(),
            image_style: "photorealistic".to_string(),
            image_log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

struct ActiveRequest {
    generation: u64,
    request_id: String,
    opening: Option<OpenFuture>,
    stream: Option<ByteStream>,
    parser: FrameParser,
    reconciler: Reconciler,
    cancel: CancellationToken,
}

enum Step {
    Cancelled,
    Opened(Result<ByteStream, ChatError>),
    Read(Option<Result<Bytes, ChatError>>),
}

pub struct ChatController<T, B>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
{
    transport: Arc<T>,
    store: SessionStore<B>,
    images: ImageLog<B>,
    ids: TimeIdGenerator,
    options: ControllerOptions,
    state: RequestState,
    last_outcome: Option<RequestState>,
    active: Option<ActiveRequest>,
    generation: u64,
    diagnostic: Option<String>,
}

impl<T, B> ChatController<T, B>
where
    T: ChatTransport + 'static,
    B: StoreBackend + Clone,
{
    /// Hydrate the session from `backend` and get ready to send.
    pub fn new(transport: T, backend: B, options: ControllerOptions) -> Self {
        let mut store = SessionStore::new(backend.clone());
        store.hydrate();
        let ids = TimeIdGenerator::starting_after(store.max_id());

        let mut images = ImageLog::new(backend, options.image_log_capacity);
        if let Err(e) = images.refresh() {
            warn!(error = %e, "failed to load image log");
        }

        Self {
            transport: Arc::new(transport),
            store,
            images,
            ids,
            options,
            state: RequestState::Idle,
            last_outcome: None,
            active: None,
            generation: 0,
            diagnostic: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// How the most recent request ended.
    pub fn last_outcome(&self) -> Option<RequestState> {
        self.last_outcome
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_in_flight()
    }

    /// Generation of the most recently started request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Banner text from the last transport or backend failure.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    pub fn images(&self) -> &ImageLog<B> {
        &self.images
    }

    /// Messages of the active conversation.
    pub fn messages(&self) -> &[Message] {
        self.store
            .active_conversation()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default()
    }

    /// Token that cancels the in-flight request from any task.
    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.active.as_ref().map(|a| a.cancel.clone())
    }

    /// Id reserved for the in-flight request's assistant message.
    pub fn pending_message_id(&self) -> Option<MessageId> {
        self.active.as_ref().map(|a| a.reconciler.pending_id())
    }

    /// Cumulative reply text of the in-flight request.
    pub fn streaming_text(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.reconciler.text())
    }

    /// Record a user message and start a request for it.
    ///
    /// An in-flight request is aborted first. Without an active
    /// conversation a new one is created, titled from `text`.
    pub fn send(&mut self, text: &str) -> Result<ConversationId, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.abort_in_flight();
        // Nothing is recorded unless the request can actually start.
        self.state = self.state.transition(RequestState::Sending)?;
        self.diagnostic = None;

        let user = Message::user(MessageId(self.ids.next_id()), text);
        let (conversation_id, prior) = match self.store.active_conversation() {
            Some(conversation) => {
                let id = conversation.id;
                let prior = conversation.messages.clone();
                self.store.append_message(id, user);
                (id, prior)
            }
            None => {
                let id = ConversationId(self.ids.next_id());
                let mut conversation = Conversation::new(id, derive_title(text));
                conversation.messages.push(user);
                self.store.create_conversation(conversation);
                self.store.set_active(Some(id));
                (id, Vec::new())
            }
        };

        let request = ChatRequest::new(text, conversation_id, &prior, self.options.max_tokens);
        self.generation += 1;

        let transport = Arc::clone(&self.transport);
        let opening: OpenFuture = Box::pin(async move { transport.open_chat(&request).await });
        let active = ActiveRequest {
            generation: self.generation,
            request_id: new_correlation_id(),
            opening: Some(opening),
            stream: None,
            parser: FrameParser::new(),
            reconciler: Reconciler::new(conversation_id, MessageId(self.ids.next_id())),
            cancel: CancellationToken::new(),
        };
        info!(
            conversation = %conversation_id,
            generation = active.generation,
            request_id = %active.request_id,
            "chat request started"
        );
        self.active = Some(active);
        Ok(conversation_id)
    }

    /// Advance the in-flight request by one step.
    ///
    /// Returns `false` when there is nothing to drive.
    pub async fn pump(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let generation = active.generation;
        let token = active.cancel.clone();

        let step = if token.is_cancelled() {
            Step::Cancelled
        } else if let Some(opening) = active.opening.as_mut() {
            tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                opened = opening => Step::Opened(opened),
            }
        } else if let Some(stream) = active.stream.as_mut() {
            tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                next = stream.next() => Step::Read(next),
            }
        } else {
            Step::Read(None)
        };

        match step {
            Step::Cancelled => self.abort_in_flight(),
            Step::Opened(Ok(stream)) => self.on_opened(generation, stream),
            Step::Opened(Err(e)) => self.fail(generation, e),
            Step::Read(Some(Ok(bytes))) => self.on_bytes(generation, &bytes),
            Step::Read(Some(Err(e))) => self.fail(generation, e),
            Step::Read(None) => self.on_end(generation),
        }
        true
    }

    /// Drive the in-flight request until it ends.
    pub async fn run_until_idle(&mut self) {
        while self.pump().await {}
    }

    /// Abort the in-flight request, leaving an abort marker.
    pub fn cancel(&mut self) -> Result<(), ChatError> {
        if !self.state.is_in_flight() {
            return Err(ChatError::InvalidTransition {
                from: self.state,
                to: RequestState::Cancelled,
            });
        }
        self.abort_in_flight();
        Ok(())
    }

    /// Clear the active pointer; the next send starts a new conversation.
    pub fn new_conversation(&mut self) {
        self.abort_in_flight();
        self.store.set_active(None);
    }

    pub fn open_conversation(&mut self, id: ConversationId) -> Result<(), ChatError> {
        if self.store.conversation(id).is_none() {
            return Err(ChatError::UnknownConversation(id));
        }
        self.abort_in_flight();
        self.store.set_active(Some(id));
        Ok(())
    }

    /// Apply one event on behalf of request `generation`.
    ///
    /// Only a request whose stream is open accepts events.
    pub fn apply_event(
        &mut self,
        generation: u64,
        event: StreamEvent,
    ) -> Result<Applied, ChatError> {
        let current = self.generation;
        let Some(active) = self
            .active
            .as_mut()
            .filter(|a| a.generation == generation)
        else {
            debug!(generation, current, "stale event rejected");
            return Err(ChatError::Superseded { generation });
        };
        if self.state != RequestState::Streaming {
            return Err(ChatError::InvalidTransition {
                from: self.state,
                to: RequestState::Streaming,
            });
        }

        let event = match event {
            StreamEvent::Image { url } => StreamEvent::Image {
                url: resolve_media_url(&self.options.media_base_url, &url),
            },
            other => other,
        };
        let terminal = event.is_terminal();
        let applied = active.reconciler.apply(&mut self.store, &self.ids, event);
        debug!(generation, ?applied, "event applied");

        if terminal {
            let outcome = if applied == Applied::Failed {
                RequestState::Failed
            } else {
                RequestState::Completed
            };
            self.finish(outcome);
        }
        Ok(applied)
    }

    /// Generate an image, record it in the image log and attach it to the
    /// active conversation.
    pub async fn generate_image(&mut self, prompt: &str) -> Result<StoredImage, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let request = ImageRequest {
            prompt: prompt.to_string(),
            size: self.options.image_size.clone(),
            style: self.options.image_style.clone(),
        };
        let url = self.transport.generate_image(&request).await?;
        let url = resolve_media_url(&self.options.media_base_url, &url);

        let image = StoredImage::new(self.ids.next_id(), url, prompt);
        if let Err(e) = self.images.record(image.clone()) {
            warn!(error = %e, "failed to persist image log");
        }
        self.attach_image(&image, None)?;
        Ok(image)
    }

    /// Attach a stored image to `target`, else the active conversation,
    /// else a new conversation titled from the prompt. The conversation that
    /// receives the image becomes active.
    pub fn attach_image(
        &mut self,
        image: &StoredImage,
        target: Option<ConversationId>,
    ) -> Result<ConversationId, ChatError> {
        let label = if image.prompt.is_empty() {
            "Image"
        } else {
            image.prompt.as_str()
        };
        let message = Message::user(
            MessageId(self.ids.next_id()),
            format!("Generated image: {label}"),
        )
        .with_image(image.url.clone());

        match target.or(self.store.active_id()) {
            Some(id) => {
                if !self.store.append_message(id, message) {
                    return Err(ChatError::UnknownConversation(id));
                }
                self.store.set_active(Some(id));
                Ok(id)
            }
            None => {
                let id = ConversationId(self.ids.next_id());
                let mut conversation = Conversation::new(id, image_title(&image.prompt));
                conversation.messages.push(message);
                self.store.create_conversation(conversation);
                self.store.set_active(Some(id));
                Ok(id)
            }
        }
    }

    /// Re-read the durable image log.
    pub fn refresh_images(&mut self) -> Result<&[StoredImage], ChatError> {
        Ok(self.images.refresh()?)
    }

    fn on_opened(&mut self, generation: u64, stream: ByteStream) {
        let Some(active) = self.current(generation) else {
            return;
        };
        active.opening = None;
        active.stream = Some(stream);
        debug!(generation, "chat stream open");
        self.transition(RequestState::Streaming);
    }

    fn on_bytes(&mut self, generation: u64, bytes: &[u8]) {
        let Some(active) = self.current(generation) else {
            return;
        };
        let frames = active.parser.push_bytes(bytes);
        for frame in frames {
            if !self.apply_payload(generation, &frame.payload()) {
                break;
            }
        }
    }

    fn on_end(&mut self, generation: u64) {
        let Some(active) = self.current(generation) else {
            return;
        };
        if let Some(frame) = active.parser.finish() {
            if !self.apply_payload(generation, &frame.payload()) {
                return;
            }
        }
        debug!(generation, "chat stream ended without a terminal event");
        self.finish(RequestState::Completed);
    }

    /// Returns `false` once the request has ended.
    fn apply_payload(&mut self, generation: u64, payload: &str) -> bool {
        if let Some(event) = interpret(payload) {
            if let Err(e) = self.apply_event(generation, event) {
                debug!(generation, error = %e, "stream event not applied");
            }
        }
        self.current(generation).is_some()
    }

    fn fail(&mut self, generation: u64, error: ChatError) {
        let Some(active) = self.active.as_ref().filter(|a| a.generation == generation) else {
            return;
        };
        let (text, banner) = match &error {
            ChatError::Backend { .. } => {
                let text = format!("[Error] {error}");
                (text.clone(), text)
            }
            ChatError::Transport(cause) => (format!("Error: {cause}"), format!("ERROR: {cause}")),
            other => (format!("Error: {other}"), format!("ERROR: {other}")),
        };
        warn!(generation, request_id = %active.request_id, %error, "chat request failed");
        active
            .reconciler
            .append_notice(&mut self.store, &self.ids, text);
        self.diagnostic = Some(banner);
        self.finish(RequestState::Failed);
    }

    /// Drop the in-flight request, if any, and leave the abort marker.
    fn abort_in_flight(&mut self) {
        if !self.state.is_in_flight() {
            return;
        }
        let Some(active) = self.active.as_ref() else {
            return;
        };
        active.cancel.cancel();
        info!(
            generation = active.generation,
            request_id = %active.request_id,
            conversation = %active.reconciler.conversation(),
            "chat request cancelled"
        );
        active
            .reconciler
            .append_notice(&mut self.store, &self.ids, ABORT_MARKER);
        self.finish(RequestState::Cancelled);
    }

    /// Enter `outcome`, drop the request and its stream, return to idle.
    ///
    /// Idle is reached even if `outcome` is not reachable from the current
    /// state, so a dropped request never leaves the controller busy.
    fn finish(&mut self, outcome: RequestState) {
        self.transition(outcome);
        self.active = None;
        self.last_outcome = Some(outcome);
        if self.state.transition(RequestState::Idle).is_err() {
            warn!(state = ?self.state, ?outcome, "forcing request state back to idle");
        }
        self.state = RequestState::Idle;
    }

    fn transition(&mut self, next: RequestState) {
        match self.state.transition(next) {
            Ok(state) => self.state = state,
            Err(e) => warn!(error = %e, "ignoring invalid request transition"),
        }
    }

    fn current(&mut self, generation: u64) -> Option<&mut ActiveRequest> {
        self.active
            .as_mut()
            .filter(|a| a.generation == generation)
    }
}
