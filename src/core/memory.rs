//! Session memory store
//!
//! Bounded, time-limited cache mapping a sender identity to its recent turn
//! history. Backed by a moka future cache, so concurrent `get`/`put` from
//! many message tasks needs no external locking. Entries expire after a
//! fixed window and the store evicts when it reaches capacity; a context
//! whose serialized turns exceed the per-entry bound is rejected outright
//! rather than truncated.

use std::time::Duration;

use moka::future::Cache;

use crate::conversation::{ChatContext, SenderId};

/// Errors from the session memory store.
///
/// Callers log these and degrade to "no context"; a store failure must never
/// block the reply path.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("context for {sender} serializes to {size} bytes, limit is {limit}")]
    EntryTooLarge {
        sender: SenderId,
        size: usize,
        limit: usize,
    },

    #[error("failed to encode chat context: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct SessionMemory {
    cache: Cache<SenderId, ChatContext>,
    max_entry_bytes: usize,
}

impl SessionMemory {
    /// Create a store holding at most `max_entries` contexts, each living
    /// for `ttl` after its last write.
    pub fn new(max_entries: u64, ttl: Duration, max_entry_bytes: usize) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            max_entry_bytes,
        }
    }

    /// Fetch the stored context for a sender. A miss (never seen, expired,
    /// or evicted) yields an empty context, not an error.
    pub async fn get(&self, sender: &SenderId) -> ChatContext {
        match self.cache.get(sender).await {
            Some(ctx) => ctx,
            None => ChatContext::empty(sender.clone()),
        }
    }

    /// Store a context, replacing whatever was there. Rejects contexts whose
    /// serialized turn list exceeds the per-entry bound.
    pub async fn put(&self, context: ChatContext) -> Result<(), MemoryError> {
        let size = serde_json::to_vec(&context.turns)?.len();
        if size > self.max_entry_bytes {
            return Err(MemoryError::EntryTooLarge {
                sender: context.sender.clone(),
                size,
                limit: self.max_entry_bytes,
            });
        }

        self.cache.insert(context.sender.clone(), context).await;
        Ok(())
    }
}
