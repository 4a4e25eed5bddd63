//! Drives a single chat turn from model call to persistence.
//!
//! Each turn runs in its own task and talks to the caller only through the
//! packet channel. The functions here own the model stream, the splitter and
//! the accumulated text; when they return, all of it is dropped.

use crate::{
    collaborator::{ChatHistory, ChatModel, ChatRoom, ChatStore},
    common::{
        error::{Error, Result},
        types::ChatId,
    },
    service::packet::StreamPacket,
    telemetry::increment_fragments,
};
use chatflake::{Fragment, SplitStreamExt, StreamSplitter};
use core::future::Future;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub type PacketSender = mpsc::Sender<Result<StreamPacket>>;

/// The identifiers and input of one turn, fixed before the model is called.
#[derive(Clone, Debug)]
pub struct Turn {
    pub user_id: String,
    pub question: String,
    pub room_id: ChatId,
    pub user_chat_id: ChatId,
    pub llm_chat_id: ChatId,
}

impl Turn {
    fn meta(&self) -> StreamPacket {
        StreamPacket::Meta {
            room_id: self.room_id,
            user_chat_id: self.user_chat_id,
            llm_chat_id: self.llm_chat_id,
        }
    }

    fn exchange(&self, answer: String) -> (ChatHistory, ChatHistory) {
        (
            ChatHistory::user(self.user_chat_id, self.room_id, self.question.clone()),
            ChatHistory::assistant(self.llm_chat_id, self.room_id, answer),
        )
    }
}

/// Runs the opening turn of a new room.
///
/// Sends `Meta`, then `RoomName` once the title is complete, then one
/// `Answer` per answer fragment. Once the model stream ends cleanly the room
/// and both messages are persisted and the channel is closed.
///
/// # Behavior
///
/// - Model, split and persistence errors are forwarded to the client as the
///   final item on a best-effort basis and returned.
/// - A dropped receiver or a cancelled `shutdown` token aborts the turn at
///   the next await point.
/// - Nothing is persisted unless the whole turn succeeded.
pub async fn feed_new_chat<M, S>(
    turn: Turn,
    model: Arc<M>,
    store: Arc<S>,
    splitter: StreamSplitter,
    resp_tx: PacketSender,
    shutdown: CancellationToken,
) -> Result<()>
where
    M: ChatModel,
    S: ChatStore,
{
    let outbox = Outbox { resp_tx, shutdown };
    let result = run_new_chat(&turn, &*model, &*store, splitter, &outbox).await;
    if let Err(e) = &result {
        outbox.surface(e).await;
    }
    result
}

/// Runs a follow-up turn in an existing room.
///
/// Sends `Meta`, then one `Answer` per non-empty model chunk, and persists
/// both messages once the model stream ends cleanly.
pub async fn feed_chat<M, S>(
    turn: Turn,
    model: Arc<M>,
    store: Arc<S>,
    resp_tx: PacketSender,
    shutdown: CancellationToken,
) -> Result<()>
where
    M: ChatModel,
    S: ChatStore,
{
    let outbox = Outbox { resp_tx, shutdown };
    let result = run_chat(&turn, &*model, &*store, &outbox).await;
    if let Err(e) = &result {
        outbox.surface(e).await;
    }
    result
}

async fn run_new_chat<M, S>(
    turn: &Turn,
    model: &M,
    store: &S,
    splitter: StreamSplitter,
    outbox: &Outbox,
) -> Result<()>
where
    M: ChatModel,
    S: ChatStore,
{
    outbox.forward(turn.meta()).await?;

    let separator = splitter.separator();
    let chunks = outbox
        .abortable(model.stream_titled(turn.room_id, &turn.question, separator))
        .await??;
    let mut fragments = chunks.split_title(splitter);

    let mut title = String::new();
    let mut answer = String::new();
    while let Some(fragment) = outbox.abortable(fragments.next()).await? {
        increment_fragments();
        match fragment? {
            Fragment::Title(text) => {
                title = text.trim().to_owned();
                tracing::debug!(room_id = %turn.room_id, title = %title, "title complete");
                outbox.forward(StreamPacket::RoomName { name: title.clone() }).await?;
            }
            Fragment::Answer(text) => {
                answer.push_str(&text);
                outbox.forward(StreamPacket::Answer { text }).await?;
            }
        }
    }

    if answer.trim().is_empty() {
        return Err(Error::EmptyAnswer);
    }

    store
        .save_room(ChatRoom::new(turn.room_id, turn.user_id.clone(), title))
        .await?;
    let (question, answer) = turn.exchange(answer);
    if let Err(e) = store.save_exchange(question, answer).await {
        // Undo the room so a failed turn leaves nothing behind.
        if let Err(undo) = store.delete_room(turn.room_id).await {
            tracing::warn!(room_id = %turn.room_id, "Failed to roll back room: {}", undo);
        }
        return Err(e.into());
    }

    tracing::debug!(room_id = %turn.room_id, "persisted new room and exchange");
    Ok(())
}

async fn run_chat<M, S>(turn: &Turn, model: &M, store: &S, outbox: &Outbox) -> Result<()>
where
    M: ChatModel,
    S: ChatStore,
{
    outbox.forward(turn.meta()).await?;

    let mut chunks = outbox
        .abortable(model.stream_answer(turn.room_id, &turn.question))
        .await??;

    let mut answer = String::new();
    while let Some(chunk) = outbox.abortable(chunks.next()).await? {
        let text = chunk?;
        if text.is_empty() {
            continue;
        }
        increment_fragments();
        answer.push_str(&text);
        outbox.forward(StreamPacket::Answer { text }).await?;
    }

    if answer.trim().is_empty() {
        return Err(Error::EmptyAnswer);
    }

    let (question, answer) = turn.exchange(answer);
    store.save_exchange(question, answer).await?;

    tracing::debug!(room_id = %turn.room_id, "persisted exchange");
    Ok(())
}

/// The sending half of a turn together with the token that cancels it.
struct Outbox {
    resp_tx: PacketSender,
    shutdown: CancellationToken,
}

impl Outbox {
    /// Awaits `fut` unless the turn is cancelled or its receiver goes away
    /// first.
    async fn abortable<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(Error::ServiceShutdown),
            () = self.resp_tx.closed() => Err(Error::ChannelClosed {
                context: "packet receiver dropped".to_string(),
            }),
            out = fut => Ok(out),
        }
    }

    /// Sends a packet, waiting for buffer space unless the turn is
    /// cancelled.
    async fn forward(&self, packet: StreamPacket) -> Result<()> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(Error::ServiceShutdown),
            sent = self.resp_tx.send(Ok(packet)) => sent.map_err(|e| Error::ChannelClosed {
                context: format!("Failed to forward packet: {e}"),
            }),
        }
    }

    /// Makes a best effort to deliver `err` to the client, who may already
    /// be gone. Gives up if the buffer is full and the turn is cancelled.
    async fn surface(&self, err: &Error) {
        if matches!(err, Error::ChannelClosed { .. }) {
            return;
        }
        tokio::select! {
            biased;
            sent = self.resp_tx.send(Err(err.clone())) => {
                if let Err(e) = sent {
                    tracing::warn!("Failed to forward err: {}", e);
                }
            }
            () = self.shutdown.cancelled() => {
                tracing::warn!("Dropped err for a full channel during shutdown: {}", err);
            }
        }
    }
}
