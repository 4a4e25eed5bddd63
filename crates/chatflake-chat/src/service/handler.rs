//! The chat service facade.
//!
//! This module defines [`ChatOrchestrator`], the composition root of a chat
//! backend: it owns the ID generator, the model, the store and the shutdown
//! token, and exposes one method per chat operation.
//!
//! ## Responsibilities
//!
//! - Validate requests and enforce room ownership.
//! - Issue the room and message IDs of a turn before the model is called.
//! - Spawn each streaming turn into a tracked task feeding a bounded packet
//!   channel, see [`feed_new_chat`] and [`feed_chat`].
//! - Cancel in-flight turns on shutdown and wait for them to finish.

use crate::{
    collaborator::{ChatHistory, ChatModel, ChatRoom, ChatStore},
    common::{
        error::{Error, Result},
        types::{ChatId, Clock, Generator},
    },
    config::ChatConfig,
    service::{
        packet::{ChatReply, NewChat, PacketStream, StreamPacket},
        streaming::coordinator::{Turn, feed_chat, feed_new_chat},
    },
    telemetry::{
        decrement_turns_inflight, increment_ids_issued, increment_turn_errors, increment_turns,
        increment_turns_inflight, record_turn_duration,
    },
};
use chatflake::{SnowflakeGeneratorAsyncTokioExt, StreamSplitter, TimeSource};
use core::future::Future;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;

/// Coordinates chat turns between a [`ChatModel`] and a [`ChatStore`].
///
/// Cloning is cheap; clones share the generator, collaborators and shutdown
/// state.
pub struct ChatOrchestrator<M, S, C = Clock>
where
    C: TimeSource<u64>,
{
    config: ChatConfig,
    generator: Arc<Generator<C>>,
    model: Arc<M>,
    store: Arc<S>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<M, S, C> Clone for ChatOrchestrator<M, S, C>
where
    C: TimeSource<u64>,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            generator: Arc::clone(&self.generator),
            model: Arc::clone(&self.model),
            store: Arc::clone(&self.store),
            shutdown: self.shutdown.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<M, S> ChatOrchestrator<M, S, Clock>
where
    M: ChatModel,
    S: ChatStore,
{
    /// Creates an orchestrator issuing IDs from the wall clock.
    ///
    /// The generator uses `config.node_id`, or a random node ID when none is
    /// configured.
    pub fn new(config: ChatConfig, model: M, store: S) -> Self {
        Self::with_clock(config, model, store, Clock::default())
    }
}

impl<M, S, C> ChatOrchestrator<M, S, C>
where
    M: ChatModel,
    S: ChatStore,
    C: TimeSource<u64> + Send + Sync + 'static,
{
    /// Creates an orchestrator whose generator reads `clock`.
    pub fn with_clock(config: ChatConfig, model: M, store: S, clock: C) -> Self {
        let generator = match config.node_id {
            Some(node_id) => Generator::new(node_id, clock),
            None => Generator::with_random_node(clock),
        };
        tracing::info!(node_id = generator.node_id(), "chat ID generator ready");
        Self::with_generator(config, Arc::new(generator), model, store)
    }

    /// Creates an orchestrator sharing an existing generator, for processes
    /// that issue chat IDs from more than one place.
    pub fn with_generator(config: ChatConfig, generator: Arc<Generator<C>>, model: M, store: S) -> Self {
        Self {
            config,
            generator,
            model: Arc::new(model),
            store: Arc::new(store),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of streaming turns still running.
    pub fn inflight_turns(&self) -> usize {
        self.tracker.len()
    }

    /// Opens a new room and streams its first answer.
    ///
    /// Issues the room, question and answer IDs up front and returns a
    /// stream that yields `Meta`, then `RoomName`, then `Answer` packets. The
    /// room and both messages are stored only once the model stream ends
    /// cleanly; on any failure the stream's last item is the error and
    /// nothing is stored.
    ///
    /// # Errors
    ///
    /// Fails without starting a turn if the question is blank, the service
    /// is shutting down, or the generator refuses to issue IDs.
    #[tracing::instrument(skip(self, question), fields(len = question.len()))]
    pub async fn start_new_chat_stream(&self, user_id: &str, question: &str) -> Result<PacketStream> {
        self.admit(question)?;

        let room_id = self.next_id().await?;
        let turn = Turn {
            user_id: user_id.to_owned(),
            question: question.to_owned(),
            room_id,
            user_chat_id: self.next_id().await?,
            llm_chat_id: self.next_id().await?,
        };
        let splitter = StreamSplitter::new(self.config.title_separator)
            .with_max_title_len(self.config.max_title_len);

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let model = Arc::clone(&self.model);
        let store = Arc::clone(&self.store);
        let shutdown = self.shutdown.clone();

        self.spawn_turn(
            room_id,
            feed_new_chat(turn, model, store, splitter, resp_tx, shutdown),
        );

        Ok(Box::pin(ReceiverStream::new(resp_rx)))
    }

    /// Streams an answer in an existing room owned by `user_id`.
    ///
    /// Yields `Meta`, then one `Answer` packet per model chunk, and stores
    /// the question and answer once the model stream ends cleanly.
    ///
    /// # Errors
    ///
    /// Fails without starting a turn if the question is blank, the room is
    /// not accessible to the user, the service is shutting down, or the
    /// generator refuses to issue IDs.
    #[tracing::instrument(skip(self, question), fields(len = question.len()))]
    pub async fn chat_stream(&self, user_id: &str, room_id: ChatId, question: &str) -> Result<PacketStream> {
        self.admit(question)?;
        self.ensure_access(user_id, room_id).await?;

        let turn = Turn {
            user_id: user_id.to_owned(),
            question: question.to_owned(),
            room_id,
            user_chat_id: self.next_id().await?,
            llm_chat_id: self.next_id().await?,
        };

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let model = Arc::clone(&self.model);
        let store = Arc::clone(&self.store);
        let shutdown = self.shutdown.clone();

        self.spawn_turn(room_id, feed_chat(turn, model, store, resp_tx, shutdown));

        Ok(Box::pin(ReceiverStream::new(resp_rx)))
    }

    /// Opens a new room and waits for the complete first answer.
    ///
    /// # Errors
    ///
    /// Any error [`start_new_chat_stream`](Self::start_new_chat_stream)
    /// returns or streams.
    pub async fn start_new_chat(&self, user_id: &str, question: &str) -> Result<NewChat> {
        let mut stream = self.start_new_chat_stream(user_id, question).await?;
        let mut reply = NewChat {
            room_id: ChatId::from_raw(0),
            room_name: String::new(),
            answer: String::new(),
            user_chat_id: ChatId::from_raw(0),
            llm_chat_id: ChatId::from_raw(0),
        };

        while let Some(packet) = stream.next().await {
            match packet? {
                StreamPacket::Meta {
                    room_id,
                    user_chat_id,
                    llm_chat_id,
                } => {
                    reply.room_id = room_id;
                    reply.user_chat_id = user_chat_id;
                    reply.llm_chat_id = llm_chat_id;
                }
                StreamPacket::RoomName { name } => reply.room_name = name,
                StreamPacket::Answer { text } => reply.answer.push_str(&text),
            }
        }

        Ok(reply)
    }

    /// Answers in an existing room and waits for the complete answer.
    ///
    /// # Errors
    ///
    /// Any error [`chat_stream`](Self::chat_stream) returns or streams.
    pub async fn chat(&self, user_id: &str, room_id: ChatId, question: &str) -> Result<ChatReply> {
        let mut stream = self.chat_stream(user_id, room_id, question).await?;
        let mut reply = ChatReply {
            room_id,
            answer: String::new(),
            user_chat_id: ChatId::from_raw(0),
            llm_chat_id: ChatId::from_raw(0),
        };

        while let Some(packet) = stream.next().await {
            match packet? {
                StreamPacket::Meta {
                    user_chat_id,
                    llm_chat_id,
                    ..
                } => {
                    reply.user_chat_id = user_chat_id;
                    reply.llm_chat_id = llm_chat_id;
                }
                StreamPacket::Answer { text } => reply.answer.push_str(&text),
                StreamPacket::RoomName { .. } => {}
            }
        }

        Ok(reply)
    }

    /// Returns up to `limit` messages of a room, newest first.
    ///
    /// Without a cursor this is the latest page. Passing the last ID of a page
    /// as `before` returns the page of older messages.
    ///
    /// # Errors
    ///
    /// [`Error::RoomAccessDenied`] unless the user owns the room, and
    /// [`Error::InvalidRequest`] for a limit of zero or above the configured
    /// page size.
    pub async fn histories(
        &self,
        user_id: &str,
        room_id: ChatId,
        before: Option<ChatId>,
        limit: usize,
    ) -> Result<Vec<ChatHistory>> {
        self.check_page(limit)?;
        self.ensure_access(user_id, room_id).await?;
        Ok(self.store.histories(room_id, before, limit).await?)
    }

    /// Returns up to `limit` rooms of a user, newest first, older than the
    /// room ID `before` when given.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for a limit of zero or above the configured
    /// page size.
    pub async fn rooms(&self, user_id: &str, before: Option<ChatId>, limit: usize) -> Result<Vec<ChatRoom>> {
        self.check_page(limit)?;
        Ok(self.store.rooms(user_id, before, limit).await?)
    }

    /// Deletes a room and its history.
    ///
    /// Deleting a room that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// [`Error::RoomAccessDenied`] if the room belongs to another user.
    pub async fn delete_room(&self, user_id: &str, room_id: ChatId) -> Result<()> {
        if let Some(room) = self.store.find_room(room_id).await? {
            if room.user_id != user_id {
                return Err(Error::RoomAccessDenied {
                    room_id,
                    user_id: user_id.to_owned(),
                });
            }
        }
        self.store.delete_room(room_id).await?;
        tracing::info!(%room_id, user_id, "room deleted");
        Ok(())
    }

    /// Cancels every in-flight turn and waits for them to finish.
    ///
    /// Cancelled turns store nothing. Requests arriving afterwards fail with
    /// [`Error::ServiceShutdown`].
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("chat orchestrator shut down");
    }

    fn admit(&self, question: &str) -> Result<()> {
        if self.shutdown.is_cancelled() {
            increment_turn_errors();
            return Err(Error::ServiceShutdown);
        }
        if question.trim().is_empty() {
            increment_turn_errors();
            return Err(Error::InvalidRequest {
                reason: "Question must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn check_page(&self, limit: usize) -> Result<()> {
        if limit == 0 || limit > self.config.max_page_size {
            return Err(Error::InvalidRequest {
                reason: format!(
                    "Page size {} must be between 1 and {}",
                    limit, self.config.max_page_size
                ),
            });
        }
        Ok(())
    }

    async fn ensure_access(&self, user_id: &str, room_id: ChatId) -> Result<()> {
        if !self.store.can_access(room_id, user_id).await? {
            increment_turn_errors();
            return Err(Error::RoomAccessDenied {
                room_id,
                user_id: user_id.to_owned(),
            });
        }
        Ok(())
    }

    async fn next_id(&self) -> Result<ChatId> {
        match self.generator.next_id_async().await {
            Ok(id) => {
                increment_ids_issued(1);
                Ok(id)
            }
            Err(e) => {
                increment_turn_errors();
                tracing::error!(error = %e, "failed to issue chat ID");
                Err(e.into())
            }
        }
    }

    fn spawn_turn<F>(&self, room_id: ChatId, turn: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let start = std::time::Instant::now();
        increment_turns();
        increment_turns_inflight();

        let fut = async move {
            match turn.await {
                Ok(()) => {
                    record_turn_duration(start.elapsed().as_millis() as f64);
                    tracing::info!("turn completed");
                }
                Err(e) => {
                    increment_turn_errors();
                    tracing::warn!(error = %e, "turn ended early");
                }
            }
            decrement_turns_inflight();
        };
        let span = tracing::info_span!("turn", %room_id);

        self.tracker.spawn(fut.instrument(span));
    }
}
