use crate::common::types::{ChatId, issued_at};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat room, named after the title of its first answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: ChatId,
    pub user_id: String,
    pub name: String,
    /// Unix milliseconds, taken from the timestamp embedded in `id`.
    pub created_at: u64,
}

impl ChatRoom {
    pub fn new(id: ChatId, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            name: name.into(),
            created_at: issued_at(id),
        }
    }
}

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    User,
    Assistant,
}

/// One message of a room's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: ChatId,
    pub room_id: ChatId,
    pub content: String,
    pub kind: MessageKind,
    /// Unix milliseconds, taken from the timestamp embedded in `id`.
    pub created_at: u64,
}

impl ChatHistory {
    pub fn new(id: ChatId, room_id: ChatId, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id,
            room_id,
            content: content.into(),
            kind,
            created_at: issued_at(id),
        }
    }

    pub fn user(id: ChatId, room_id: ChatId, content: impl Into<String>) -> Self {
        Self::new(id, room_id, content, MessageKind::User)
    }

    pub fn assistant(id: ChatId, room_id: ChatId, content: impl Into<String>) -> Self {
        Self::new(id, room_id, content, MessageKind::Assistant)
    }
}

/// Failure reported by a [`ChatStore`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A record with this ID already exists.
    #[error("record {id} already exists")]
    Conflict { id: ChatId },

    /// The backing store could not serve the request.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Persistence for rooms and their message history.
///
/// Page queries are cursor based and newest first: results are ordered by
/// descending ID (and therefore by creation time), and `before` excludes
/// every record from that ID on. A client pages backwards by passing the
/// last ID of the previous page.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    async fn save_room(&self, room: ChatRoom) -> Result<(), StoreError>;

    async fn find_room(&self, room_id: ChatId) -> Result<Option<ChatRoom>, StoreError>;

    async fn rooms(
        &self,
        user_id: &str,
        before: Option<ChatId>,
        limit: usize,
    ) -> Result<Vec<ChatRoom>, StoreError>;

    /// Deletes a room together with its history. Deleting an unknown room
    /// succeeds.
    async fn delete_room(&self, room_id: ChatId) -> Result<(), StoreError>;

    /// Saves the two halves of one exchange. Either both are stored or
    /// neither is.
    async fn save_exchange(&self, question: ChatHistory, answer: ChatHistory) -> Result<(), StoreError>;

    async fn histories(
        &self,
        room_id: ChatId,
        before: Option<ChatId>,
        limit: usize,
    ) -> Result<Vec<ChatHistory>, StoreError>;

    /// Whether `user_id` owns `room_id`. Unknown rooms are not accessible.
    async fn can_access(&self, room_id: ChatId, user_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .find_room(room_id)
            .await?
            .is_some_and(|room| room.user_id == user_id))
    }
}
