use crate::common::types::ChatId;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// An ordered stream of text chunks produced by a [`ChatModel`].
pub type ChunkStream = BoxStream<'static, Result<String, ModelError>>;

/// Failure reported by the language model, either when starting a call or
/// in the middle of a stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ModelError {
    message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The language model behind a chat.
///
/// Implementations own prompting and conversation memory; `room_id` names
/// the conversation so a model can keep per-room context.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Streams the opening turn of a new room.
    ///
    /// The response must start with a short title, then exactly one
    /// `separator`, then the answer. Chunk boundaries are arbitrary.
    async fn stream_titled(
        &self,
        room_id: ChatId,
        question: &str,
        separator: char,
    ) -> Result<ChunkStream, ModelError>;

    /// Streams a follow-up answer in an existing room. The response carries
    /// no title and no separator.
    async fn stream_answer(&self, room_id: ChatId, question: &str) -> Result<ChunkStream, ModelError>;
}
