//! Drives one chat exchange from request to end of stream.
//!
//! ```text
//!   idle ──send──▶ buffering ──headers──▶ streaming ──end of body──▶ idle
//!                      │                      │
//!                      └──── failure ─────────┴──▶ error   (note appended)
//!                      └──── cancel ──────────┴──▶ unchanged (silent)
//! ```

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::message::{Conversation, Message, MessageId, MessageUpdate, Role};
use crate::api::{ApiClient, ChatRequest};
use crate::errors::StreamError;
use crate::session::SessionProvider;
use crate::stream::{Citation, Record, RecordDecoder, StreamEvent};

/// Capacity of the observer channel; slow observers lose the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Status of the most recent exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    #[default]
    Idle,
    Buffering,
    Streaming,
    Error,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStatus::Idle => write!(f, "idle"),
            StreamStatus::Buffering => write!(f, "buffering"),
            StreamStatus::Streaming => write!(f, "streaming"),
            StreamStatus::Error => write!(f, "error"),
        }
    }
}

/// Notification sent to observers after each state change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessageAppended { id: MessageId, role: Role },
    ContentUpdated { id: MessageId, content: String },
    CitationsUpdated { id: MessageId, citations: Vec<Citation> },
    StatusChanged(StreamStatus),
    Cleared,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed { assistant_id: MessageId },
    /// The caller cancelled; nothing was changed after the cancellation point
    Cancelled { assistant_id: MessageId },
    /// A transport or stream failure; the assistant message carries an error note
    Failed { assistant_id: MessageId, error: String },
}

impl ExchangeOutcome {
    pub fn assistant_id(&self) -> &MessageId {
        match self {
            ExchangeOutcome::Completed { assistant_id }
            | ExchangeOutcome::Cancelled { assistant_id }
            | ExchangeOutcome::Failed { assistant_id, .. } => assistant_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed { .. })
    }
}

#[derive(Debug, Default)]
struct ChatState {
    conversation: Conversation,
    status: StreamStatus,
}

enum Action {
    Update(MessageUpdate),
    SetStatus(StreamStatus),
}

/// Conversation state plus the machinery to stream answers into it.
///
/// Cloning is cheap and every clone shares the same conversation.
#[derive(Clone)]
pub struct ChatClient {
    api: ApiClient,
    session: SessionProvider,
    state: Arc<Mutex<ChatState>>,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatClient {
    pub fn new(api: ApiClient, session: SessionProvider) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            session,
            state: Arc::new(Mutex::new(ChatState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> StreamStatus {
        self.state.lock().status
    }

    /// Snapshot of all messages in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().conversation.messages().cloned().collect()
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.state.lock().conversation.get(id).cloned()
    }

    /// Drop the whole conversation, e.g. when switching to another project.
    pub fn clear(&self) {
        self.dispatch(Action::Update(MessageUpdate::Clear));
        self.dispatch(Action::SetStatus(StreamStatus::Idle));
    }

    /// Send `content` and stream the answer into a new assistant message.
    ///
    /// The user message and an empty assistant placeholder are appended before the
    /// request goes out and are kept whatever happens next. Cancelling `cancel` ends the
    /// exchange silently at its next suspension point. Failures never escape: they set
    /// the status to [`StreamStatus::Error`] and append a note to the assistant message.
    pub async fn send_message(
        &self,
        content: &str,
        project_id: &str,
        cancel: CancellationToken,
    ) -> ExchangeOutcome {
        self.dispatch(Action::SetStatus(StreamStatus::Buffering));
        self.dispatch(Action::Update(MessageUpdate::Append(Message::user(content))));
        let placeholder = Message::assistant_placeholder();
        let assistant_id = placeholder.id.clone();
        self.dispatch(Action::Update(MessageUpdate::Append(placeholder)));

        info!(%project_id, %assistant_id, "chat exchange started");

        let request = ChatRequest {
            message: content.to_string(),
            project_id: project_id.to_string(),
        };

        match self.run_exchange(&request, &assistant_id, &cancel).await {
            Ok(()) => {
                self.dispatch(Action::SetStatus(StreamStatus::Idle));
                info!(%assistant_id, "chat exchange completed");
                ExchangeOutcome::Completed { assistant_id }
            }
            Err(StreamError::Cancelled) => {
                info!(%assistant_id, "chat exchange cancelled");
                ExchangeOutcome::Cancelled { assistant_id }
            }
            Err(e) => {
                warn!(%assistant_id, error = %e, "chat exchange failed");
                self.dispatch(Action::SetStatus(StreamStatus::Error));
                self.dispatch(Action::Update(MessageUpdate::AppendErrorNote {
                    id: assistant_id.clone(),
                }));
                ExchangeOutcome::Failed {
                    assistant_id,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run_exchange(
        &self,
        request: &ChatRequest,
        assistant_id: &MessageId,
        cancel: &CancellationToken,
    ) -> Result<(), StreamError> {
        let session = self.session.current();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            resp = self.api.open_chat(request, session.as_ref()) => resp?,
        };

        self.dispatch(Action::SetStatus(StreamStatus::Streaming));

        let mut body = std::pin::pin!(response.bytes_stream());
        let mut decoder = RecordDecoder::new();
        let mut accumulated = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                next = body.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    let records = decoder.push(&chunk);
                    self.consume_records(assistant_id, records, &mut accumulated);
                }
                Some(Err(e)) => return Err(StreamError::Body(e)),
                None => break,
            }
        }

        if let Some(record) = decoder.finish() {
            self.consume_records(assistant_id, vec![record], &mut accumulated);
        }
        Ok(())
    }

    /// Apply the records of one chunk. `[DONE]` stops processing of the remaining
    /// records of that chunk only; reading continues with the next chunk.
    fn consume_records(&self, assistant_id: &MessageId, records: Vec<Record>, accumulated: &mut String) {
        for record in records {
            let payload = match record {
                Record::Done => {
                    debug!(%assistant_id, "received [DONE]");
                    break;
                }
                Record::Ignored => continue,
                Record::Data(payload) => payload,
            };

            match StreamEvent::parse(&payload) {
                Ok(StreamEvent::Token(fragment)) => {
                    accumulated.push_str(&fragment);
                }
                Ok(StreamEvent::Citations(citations)) => {
                    debug!(%assistant_id, count = citations.len(), "received citations");
                    self.dispatch(Action::Update(MessageUpdate::SetCitations {
                        id: assistant_id.clone(),
                        citations,
                    }));
                    continue;
                }
                Ok(StreamEvent::Other(kind)) => {
                    debug!(%assistant_id, %kind, "ignoring unknown event type");
                }
                Err(e) => {
                    warn!(%assistant_id, error = %e, "skipping malformed stream record");
                    continue;
                }
            }

            self.dispatch(Action::Update(MessageUpdate::SetContent {
                id: assistant_id.clone(),
                content: accumulated.clone(),
            }));
        }
    }

    /// The single entry point for every state change.
    fn dispatch(&self, action: Action) {
        let event = {
            let mut state = self.state.lock();
            match action {
                Action::SetStatus(status) => {
                    if state.status == status {
                        return;
                    }
                    state.status = status;
                    ChatEvent::StatusChanged(status)
                }
                Action::Update(update) => {
                    let event = match &update {
                        MessageUpdate::Append(msg) => ChatEvent::MessageAppended {
                            id: msg.id.clone(),
                            role: msg.role,
                        },
                        MessageUpdate::SetCitations { id, citations } => ChatEvent::CitationsUpdated {
                            id: id.clone(),
                            citations: citations.clone(),
                        },
                        MessageUpdate::Clear => ChatEvent::Cleared,
                        MessageUpdate::SetContent { id, .. } | MessageUpdate::AppendErrorNote { id } => {
                            ChatEvent::ContentUpdated {
                                id: id.clone(),
                                content: String::new(),
                            }
                        }
                    };
                    if !state.conversation.apply(update) {
                        return;
                    }
                    match event {
                        ChatEvent::ContentUpdated { id, .. } => {
                            let content = state
                                .conversation
                                .get(&id)
                                .map(|m| m.content.clone())
                                .unwrap_or_default();
                            ChatEvent::ContentUpdated { id, content }
                        }
                        other => other,
                    }
                }
            }
        };
        // No observers is fine.
        let _ = self.events.send(event);
    }
}
