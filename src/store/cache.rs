//! Per-conversation snapshot cache.
//!
//! One [`ConversationCache`] lives for one dashboard session and is owned by it.
//! There is no expiry: entries persist until evicted, cleared on a filter change,
//! or dropped with the session at logout.

use crate::model::ConversationKey;
use crate::store::message_store::StoreSnapshot;
use std::collections::HashMap;
use tracing::debug;

/// Where pagination of a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Last page merged (1-based). The next load-more requests `page + 1`.
    pub page: u32,
    /// Server-provided "next" indicator of the last page.
    pub has_more: bool,
}

impl PaginationCursor {
    /// Cursor of a conversation with no page fetched yet.
    pub const fn initial() -> Self {
        Self {
            page: 1,
            has_more: false,
        }
    }

    /// Page number a load-more would request.
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::initial()
    }
}

/// Frozen state of one conversation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationSnapshot {
    /// Message values and display order.
    pub store: StoreSnapshot,
    /// Pagination position.
    pub cursor: PaginationCursor,
    /// Vertical scroll offset of the thread, in pixels.
    pub scroll_offset: f64,
}

/// Keyed store of [`ConversationSnapshot`]s.
///
/// Snapshots are moved in on save and cloned out on load; no caller ever holds a
/// reference into the cached original.
#[derive(Debug, Default)]
pub struct ConversationCache {
    entries: HashMap<ConversationKey, ConversationSnapshot>,
}

impl ConversationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` under `key`, replacing any earlier one.
    pub fn save(&mut self, key: ConversationKey, snapshot: ConversationSnapshot) {
        debug!(
            %key,
            messages = snapshot.store.len(),
            page = snapshot.cursor.page,
            "Saved conversation snapshot"
        );
        self.entries.insert(key, snapshot);
    }

    /// Copy of the snapshot stored under `key`.
    pub fn load(&self, key: &ConversationKey) -> Option<ConversationSnapshot> {
        let snapshot = self.entries.get(key).cloned();
        debug!(%key, hit = snapshot.is_some(), "Conversation cache lookup");
        snapshot
    }

    /// Whether `key` has a snapshot.
    pub fn has(&self, key: &ConversationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop the snapshot for `key`. Absent keys are ignored.
    pub fn evict(&mut self, key: &ConversationKey) {
        if self.entries.remove(key).is_some() {
            debug!(%key, "Evicted conversation snapshot");
        }
    }

    /// Drop every snapshot.
    pub fn clear_all(&mut self) {
        debug!(entries = self.entries.len(), "Cleared conversation cache");
        self.entries.clear();
    }

    /// Number of cached conversations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
