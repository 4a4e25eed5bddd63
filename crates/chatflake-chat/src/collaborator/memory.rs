use super::{ChatHistory, ChatRoom, ChatStore, StoreError};
use crate::common::types::ChatId;
use async_trait::async_trait;
use std::collections::{BTreeMap, btree_map::Entry};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    rooms: BTreeMap<ChatId, ChatRoom>,
    // room id -> message id -> message
    histories: BTreeMap<ChatId, BTreeMap<ChatId, ChatHistory>>,
}

/// A [`ChatStore`] kept entirely in process memory.
///
/// Backs tests and embedders without a database. Rows are kept in ID order,
/// so cursor pages are reverse range scans.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms currently stored.
    pub async fn room_count(&self) -> usize {
        self.tables.read().await.rooms.len()
    }

    /// Number of messages stored across all rooms.
    pub async fn history_count(&self) -> usize {
        self.tables
            .read()
            .await
            .histories
            .values()
            .map(BTreeMap::len)
            .sum()
    }
}

/// Rows strictly below `before`, newest first.
fn newest_first<T>(
    rows: &BTreeMap<ChatId, T>,
    before: Option<ChatId>,
) -> impl Iterator<Item = &T> {
    let rows = match before {
        Some(before) => rows.range(..before),
        None => rows.range(..),
    };
    rows.rev().map(|(_, row)| row)
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn save_room(&self, room: ChatRoom) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.rooms.entry(room.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict { id: room.id }),
            Entry::Vacant(slot) => {
                slot.insert(room);
                Ok(())
            }
        }
    }

    async fn find_room(&self, room_id: ChatId) -> Result<Option<ChatRoom>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn rooms(
        &self,
        user_id: &str,
        before: Option<ChatId>,
        limit: usize,
    ) -> Result<Vec<ChatRoom>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.rooms, before)
            .filter(|room| room.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_room(&self, room_id: ChatId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.rooms.remove(&room_id);
        tables.histories.remove(&room_id);
        Ok(())
    }

    async fn save_exchange(&self, question: ChatHistory, answer: ChatHistory) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for record in [&question, &answer] {
            let taken = tables
                .histories
                .get(&record.room_id)
                .is_some_and(|rows| rows.contains_key(&record.id));
            if taken {
                return Err(StoreError::Conflict { id: record.id });
            }
        }
        if question.id == answer.id {
            return Err(StoreError::Conflict { id: answer.id });
        }

        for record in [question, answer] {
            tables
                .histories
                .entry(record.room_id)
                .or_default()
                .insert(record.id, record);
        }
        Ok(())
    }

    async fn histories(
        &self,
        room_id: ChatId,
        before: Option<ChatId>,
        limit: usize,
    ) -> Result<Vec<ChatHistory>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .histories
            .get(&room_id)
            .map(|rows| newest_first(rows, before).take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
