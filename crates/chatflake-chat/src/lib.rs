//! # `chatflake-chat`: Streaming Chat Turn Orchestration
//!
//! `chatflake-chat` drives chat turns between a language model and a
//! persistence backend. It builds on [`chatflake`] for time-ordered chat IDs
//! and for splitting a streamed response into a room title and an answer.
//!
//! ## Highlights
//!
//! - **IDs First**: room and message IDs are issued before the model is
//!   called and sent to the client in the first packet.
//! - **Streaming Title Split**: the opening answer of a room carries its own
//!   title, separated on the fly without buffering the answer.
//! - **All-or-Nothing Persistence**: a turn stores its room and messages only
//!   after the model stream ends cleanly.
//! - **Cancellation**: a dropped client or a shutdown aborts the turn at the
//!   next await point.
//! - **Backpressure**: every turn feeds a bounded channel.
//!
//! ## Collaborators
//!
//! The model and the store are traits, [`ChatModel`] and [`ChatStore`]. An
//! [`InMemoryStore`] is included.
//!
//! ## Telemetry
//!
//! See [`telemetry`] for the `tracing`, `metrics` and `stdout` features.

pub mod collaborator;
pub mod common;
pub mod config;
pub mod service;
pub mod telemetry;

pub use collaborator::{ChatHistory, ChatModel, ChatRoom, ChatStore, ChunkStream, InMemoryStore, MessageKind, ModelError, StoreError};
pub use common::error::{Error, Result};
pub use common::types::*;
pub use config::{ChatConfig, CliArgs};
pub use service::handler::ChatOrchestrator;
pub use service::packet::{ChatReply, NewChat, PacketStream, StreamPacket};
