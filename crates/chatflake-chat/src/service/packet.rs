use crate::common::{error::Error, types::ChatId};
use core::pin::Pin;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// One message on the wire of a streaming chat turn.
///
/// A turn always opens with [`StreamPacket::Meta`] so the client learns the
/// IDs its room and messages will be stored under before any text arrives.
/// Serialized as `{"type":"answer","text":"..."}` and friends, ready to be
/// used as server-sent event payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamPacket {
    Meta {
        room_id: ChatId,
        user_chat_id: ChatId,
        llm_chat_id: ChatId,
    },
    RoomName {
        name: String,
    },
    Answer {
        text: String,
    },
}

/// The packets of one turn. An `Err` item is always the last one.
pub type PacketStream = Pin<Box<dyn Stream<Item = Result<StreamPacket, Error>> + Send>>;

/// Outcome of [`start_new_chat`](crate::ChatOrchestrator::start_new_chat).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChat {
    pub room_id: ChatId,
    pub room_name: String,
    pub answer: String,
    pub user_chat_id: ChatId,
    pub llm_chat_id: ChatId,
}

/// Outcome of [`chat`](crate::ChatOrchestrator::chat).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub room_id: ChatId,
    pub answer: String,
    pub user_chat_id: ChatId,
    pub llm_chat_id: ChatId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packets_serialize_as_tagged_objects() {
        let meta = StreamPacket::Meta {
            room_id: ChatId::from_raw(1),
            user_chat_id: ChatId::from_raw(2),
            llm_chat_id: ChatId::from_raw(3),
        };
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"type":"meta","room_id":1,"user_chat_id":2,"llm_chat_id":3}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamPacket::RoomName { name: "Hi".into() }).unwrap(),
            r#"{"type":"room_name","name":"Hi"}"#
        );
        let back: StreamPacket = serde_json::from_str(r#"{"type":"answer","text":"x"}"#).unwrap();
        assert_eq!(back, StreamPacket::Answer { text: "x".into() });
    }
}
