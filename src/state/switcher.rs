//! Active-conversation switching.
//!
//! [`ConversationSwitcher`] owns the live [`MessageStore`], the
//! [`ConversationCache`] and the [`PaginationController`], and is the only place
//! that moves state between them. At most one conversation is active at a time.

use crate::model::ConversationKey;
use crate::state::pagination::{PaginationConfig, PaginationController};
use crate::store::{ConversationCache, ConversationSnapshot, MessageStore, PaginationCursor};
use std::time::{Duration, Instant};
use tracing::info;

/// Default upper bound of cache-priming suppression.
pub const DEFAULT_RESTORE_SUPPRESSION: Duration = Duration::from_millis(500);

/// What [`ConversationSwitcher::switch_to`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Target was already active; nothing changed.
    Unchanged,
    /// No conversation is active any more.
    Deselected,
    /// Target was restored from the cache. A priming page-1 fetch should follow.
    Restored,
    /// Target had no cached state and starts empty. A page-1 fetch should follow.
    Fresh,
}

impl SwitchOutcome {
    /// Whether the caller should now fetch page 1.
    pub fn needs_initial_load(&self) -> bool {
        matches!(self, Self::Restored | Self::Fresh)
    }
}

/// Orchestrates saving and restoring conversations.
#[derive(Debug)]
pub struct ConversationSwitcher {
    store: MessageStore,
    cache: ConversationCache,
    pagination: PaginationController,
    restore_suppression: Duration,
}

impl ConversationSwitcher {
    /// Switcher with an empty store and cache.
    pub fn new(config: PaginationConfig, restore_suppression: Duration) -> Self {
        Self {
            store: MessageStore::new(),
            cache: ConversationCache::new(),
            pagination: PaginationController::new(config),
            restore_suppression,
        }
    }

    /// Make `target` the active conversation, or deselect with `None`.
    ///
    /// The outgoing conversation is saved to the cache before anything about the
    /// incoming one is touched. A restored conversation keeps its cached order,
    /// cursor and scroll offset verbatim, and background refresh and load-more are
    /// suppressed until its priming fetch completes or the suppression window ends.
    pub fn switch_to(&mut self, target: Option<ConversationKey>, now: Instant) -> SwitchOutcome {
        let current = self.pagination.active_key().cloned();
        if current == target {
            return SwitchOutcome::Unchanged;
        }

        if let Some(outgoing) = current {
            let snapshot = self.capture();
            self.cache.save(outgoing, snapshot);
        }

        let Some(key) = target else {
            self.store.clear();
            self.pagination.reset();
            info!("Conversation deselected");
            return SwitchOutcome::Deselected;
        };

        match self.cache.load(&key) {
            Some(snapshot) => {
                info!(%key, messages = snapshot.store.len(), "Restoring cached conversation");
                self.store.restore(snapshot.store);
                self.pagination
                    .activate(key, snapshot.cursor, snapshot.scroll_offset);
                self.pagination.suppress_until(now + self.restore_suppression);
                SwitchOutcome::Restored
            }
            None => {
                info!(%key, "Opening conversation");
                self.store.clear();
                self.pagination
                    .activate(key, PaginationCursor::initial(), 0.0);
                SwitchOutcome::Fresh
            }
        }
    }

    /// Drop every cached conversation and restart the active one from page 1.
    ///
    /// Returns whether a conversation is active and needs a fresh page-1 fetch.
    pub fn invalidate_all(&mut self) -> bool {
        self.cache.clear_all();
        self.store.clear();
        self.pagination.restart();
        self.pagination.active_key().is_some()
    }

    fn capture(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            store: self.store.snapshot(),
            cursor: self.pagination.cursor(),
            scroll_offset: self.pagination.scroll_offset(),
        }
    }

    /// Active conversation.
    pub fn active_key(&self) -> Option<&ConversationKey> {
        self.pagination.active_key()
    }

    /// Live store of the active conversation.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Mutable live store.
    pub fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    /// Snapshot cache.
    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Mutable snapshot cache.
    pub fn cache_mut(&mut self) -> &mut ConversationCache {
        &mut self.cache
    }

    /// Pagination state of the active conversation.
    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    /// Mutable pagination state.
    pub fn pagination_mut(&mut self) -> &mut PaginationController {
        &mut self.pagination
    }

    /// Store and pagination together, for completing page loads.
    pub fn parts_mut(&mut self) -> (&mut MessageStore, &mut PaginationController) {
        (&mut self.store, &mut self.pagination)
    }
}

#[cfg(test)]
#[path = "switcher_tests.rs"]
mod tests;
