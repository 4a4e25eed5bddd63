//! Error types for the chat service.
//!
//! This module defines the central [`Error`] enum, which captures every
//! reportable failure of a chat turn. Streaming turns deliver it as the last
//! item of the packet stream; non-streaming calls return it directly.
//!
//! ## Error Cases
//! - `IdGeneration`: the ID generator refused to issue an ID (clock moved
//!   backwards, lock poisoned).
//! - `Split`: the model response could not be split into title and answer.
//! - `Upstream`: the model failed to start or broke off mid-stream.
//! - `Store`: the persistence collaborator failed.
//! - `RoomAccessDenied`: the room does not exist or belongs to someone else.
//! - `InvalidRequest`: the request was malformed or exceeded bounds.
//! - `EmptyAnswer`: the model produced no answer text.
//! - `ChannelClosed`: the receiving side of a packet stream went away.
//! - `ServiceShutdown`: the orchestrator is shutting down.

use crate::collaborator::{ModelError, StoreError};
use crate::common::types::ChatId;
use chatflake::SplitError;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the chat service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Underlying ID generation failed.
    #[error("ID error: {0}")]
    IdGeneration(#[from] chatflake::Error),

    /// The model's response did not follow the title/separator/answer shape.
    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    /// The model stream failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] ModelError),

    /// Persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The user may not read or write this room.
    #[error("Room {room_id} is not accessible to user {user_id}")]
    RoomAccessDenied { room_id: ChatId, user_id: String },

    /// The request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The model answered with nothing but whitespace.
    #[error("Model returned an empty answer")]
    EmptyAnswer,

    /// Internal channel send failure, usually a dropped receiver.
    #[error("Channel error: {context}")]
    ChannelClosed { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl<E> From<chatflake::SplitStreamError<E>> for Error
where
    E: Into<Error>,
{
    fn from(err: chatflake::SplitStreamError<E>) -> Self {
        match err {
            chatflake::SplitStreamError::Split(e) => Self::Split(e),
            chatflake::SplitStreamError::Upstream(e) => e.into(),
        }
    }
}
