//! Bounded conversation memory.
//!
//! Keeps the most recent turns of each `(store_id, conversation_id)` in an
//! LRU so one tenant's chatter cannot evict the whole cache.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// ULID, unique across evictions and restarts
    pub id: String,
    /// 1-based position among the turns this process has seen
    pub turn: usize,
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ConversationLog {
    turns: VecDeque<ConversationTurn>,
    total: usize,
}

/// LRU of recent turns keyed by tenant and conversation.
pub struct ConversationMemory {
    cache: Mutex<LruCache<(String, String), ConversationLog>>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize, max_turns: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn. The number restarts at 1 once the conversation is
    /// evicted; the id never repeats.
    pub fn record(
        &self,
        store_id: &str,
        conversation_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> ConversationTurn {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let key = (store_id.to_string(), conversation_id.to_string());
        let log = cache.get_or_insert_mut(key, ConversationLog::default);

        log.total += 1;
        let turn = ConversationTurn {
            id: Ulid::new().to_string(),
            turn: log.total,
            user: user.into(),
            assistant: assistant.into(),
            at: Utc::now(),
        };
        log.turns.push_back(turn.clone());
        while log.turns.len() > self.max_turns {
            log.turns.pop_front();
        }
        turn
    }

    /// Recent turns, oldest first.
    pub fn history(&self, store_id: &str, conversation_id: &str) -> Vec<ConversationTurn> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .get(&(store_id.to_string(), conversation_id.to_string()))
            .map(|log| log.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget every conversation of a tenant.
    pub fn forget_tenant(&self, store_id: &str) -> usize {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let keys: Vec<(String, String)> = cache
            .iter()
            .filter(|((store, _), _)| store == store_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            cache.pop(key);
        }
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
