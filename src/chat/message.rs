//! Chat messages and the id-keyed conversation they live in.
//!
//! The conversation is an ordered map from [`MessageId`] to [`Message`]. It changes
//! only through [`Conversation::apply`], so every streaming update names the message
//! it targets and two exchanges in flight never touch each other's messages.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::stream::Citation;

/// Appended to an assistant message when its exchange fails.
pub const ERROR_NOTE: &str = "\n\n*[Error generating response]*";

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Locally generated message identifier. Ids sort in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:013}-{:06}", millis, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            citations: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Empty assistant message that streaming updates will fill in.
    pub fn assistant_placeholder() -> Self {
        Self::new(Role::Assistant, String::new())
    }
}

/// A single mutation of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageUpdate {
    Append(Message),
    /// Replace the content with the full accumulated text
    SetContent { id: MessageId, content: String },
    /// Replace (never merge) the citation list
    SetCitations { id: MessageId, citations: Vec<Citation> },
    /// Keep the content and add [`ERROR_NOTE`] after it
    AppendErrorNote { id: MessageId },
    Clear,
}

/// Ordered messages of one conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: IndexMap<MessageId, Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update. Returns `false` when it changed nothing, e.g. the target
    /// message was cleared away while its exchange was still streaming.
    pub fn apply(&mut self, update: MessageUpdate) -> bool {
        match update {
            MessageUpdate::Append(message) => {
                self.messages.insert(message.id.clone(), message);
                true
            }
            MessageUpdate::SetContent { id, content } => match self.messages.get_mut(&id) {
                Some(msg) if msg.content != content => {
                    msg.content = content;
                    true
                }
                _ => false,
            },
            MessageUpdate::SetCitations { id, citations } => match self.messages.get_mut(&id) {
                Some(msg) => {
                    msg.citations = Some(citations);
                    true
                }
                None => false,
            },
            MessageUpdate::AppendErrorNote { id } => match self.messages.get_mut(&id) {
                Some(msg) => {
                    msg.content.push_str(ERROR_NOTE);
                    true
                }
                None => false,
            },
            MessageUpdate::Clear => {
                let changed = !self.messages.is_empty();
                self.messages.clear();
                changed
            }
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last().map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(name: &str) -> Citation {
        Citation {
            file_name: name.to_string(),
            text: "...".to_string(),
        }
    }

    #[test]
    fn test_ids_sort_in_creation_order() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        let c = MessageId::generate();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut conv = Conversation::new();
        let user = Message::user("Explain auth.ts");
        let assistant = Message::assistant_placeholder();
        conv.apply(MessageUpdate::Append(user.clone()));
        conv.apply(MessageUpdate::Append(assistant.clone()));

        let roles: Vec<Role> = conv.messages().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(conv.last().unwrap().id, assistant.id);
        assert!(conv.get(&assistant.id).unwrap().content.is_empty());
    }

    #[test]
    fn test_set_content_replaces() {
        let mut conv = Conversation::new();
        let msg = Message::assistant_placeholder();
        let id = msg.id.clone();
        conv.apply(MessageUpdate::Append(msg));

        assert!(conv.apply(MessageUpdate::SetContent {
            id: id.clone(),
            content: "The ".into()
        }));
        assert!(conv.apply(MessageUpdate::SetContent {
            id: id.clone(),
            content: "The file ".into()
        }));
        assert_eq!(conv.get(&id).unwrap().content, "The file ");
        // Same content again is not a change.
        assert!(!conv.apply(MessageUpdate::SetContent {
            id,
            content: "The file ".into()
        }));
    }

    #[test]
    fn test_set_citations_replaces_not_merges() {
        let mut conv = Conversation::new();
        let msg = Message::assistant_placeholder();
        let id = msg.id.clone();
        conv.apply(MessageUpdate::Append(msg));

        conv.apply(MessageUpdate::SetCitations {
            id: id.clone(),
            citations: vec![citation("a.rs"), citation("b.rs")],
        });
        conv.apply(MessageUpdate::SetCitations {
            id: id.clone(),
            citations: vec![citation("c.rs")],
        });

        let citations = conv.get(&id).unwrap().citations.clone().unwrap();
        assert_eq!(citations, vec![citation("c.rs")]);
    }

    #[test]
    fn test_error_note_preserves_partial_content() {
        let mut conv = Conversation::new();
        let msg = Message::new(Role::Assistant, "partial answer");
        let id = msg.id.clone();
        conv.apply(MessageUpdate::Append(msg));
        conv.apply(MessageUpdate::AppendErrorNote { id: id.clone() });

        assert_eq!(
            conv.get(&id).unwrap().content,
            "partial answer\n\n*[Error generating response]*"
        );
    }

    #[test]
    fn test_updates_to_unknown_id_are_noops() {
        let mut conv = Conversation::new();
        let ghost = MessageId::generate();
        assert!(!conv.apply(MessageUpdate::SetContent {
            id: ghost.clone(),
            content: "x".into()
        }));
        assert!(!conv.apply(MessageUpdate::AppendErrorNote { id: ghost }));
        assert!(conv.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut conv = Conversation::new();
        conv.apply(MessageUpdate::Append(Message::user("hi")));
        assert!(conv.apply(MessageUpdate::Clear));
        assert!(conv.is_empty());
        assert!(!conv.apply(MessageUpdate::Clear));
    }

    #[test]
    fn test_message_serializes_role_lowercase() {
        let msg = Message::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("citations").is_none());
    }
}
