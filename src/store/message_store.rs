//! Ordered, deduplicated message collection for one conversation.
//!
//! The store keeps two structures in lockstep:
//!
//! - `values`: id → [`Message`], the authoritative value store
//! - `order`: the authoritative display order of ids
//!
//! Every id in `order` has exactly one entry in `values` and vice versa.
//! Once placed, an id never moves relative to the other ids: new batches are
//! attached wholesale at the top (fresh content) or bottom (older pages), and
//! updates patch values without touching `order`.

use crate::model::{Message, MessageId, MessagePatch};
use crate::store::notify::{NewMessageNotifier, Subscription};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "message_store_tests.rs"]
mod tests;

/// End of the order sequence a merge attaches new ids to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePosition {
    /// Index 0. Freshly polled or refreshed content; marks ids as new.
    Top,
    /// Tail. Paginated, older content.
    Bottom,
}

/// What one merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Ids that were not in the store before.
    pub added: usize,
    /// Ids that were already present and had their value replaced.
    pub updated: usize,
}

/// Frozen copy of a store's values and order.
///
/// Owns its data, so later mutation of the live store cannot reach it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSnapshot {
    order: Vec<MessageId>,
    values: HashMap<MessageId, Message>,
}

impl StoreSnapshot {
    /// Build a snapshot from parts.
    ///
    /// Parts are taken as given; [`MessageStore::restore`] reconciles any mismatch.
    pub fn new(order: Vec<MessageId>, values: HashMap<MessageId, Message>) -> Self {
        Self { order, values }
    }

    /// Display order.
    pub fn order(&self) -> &[MessageId] {
        &self.order
    }

    /// Values by id.
    pub fn values(&self) -> &HashMap<MessageId, Message> {
        &self.values
    }

    /// Number of ordered ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no ids are ordered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Messages in display order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.order.iter().filter_map(|id| self.values.get(id))
    }
}

/// Message store for the active conversation.
///
/// Mutated only through its own methods; the presentation layer reads
/// [`MessageStore::messages`] and [`MessageStore::new_message_ids`].
#[derive(Debug, Default)]
pub struct MessageStore {
    values: HashMap<MessageId, Message>,
    order: VecDeque<MessageId>,
    new_ids: HashSet<MessageId>,
    notifier: NewMessageNotifier,
    revision: u64,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of messages.
    ///
    /// Ids already present have their value replaced in place. Ids not present are
    /// sorted newest first (ties by id ascending) and attached as one contiguous
    /// block at `position`. A top merge also marks the block as new and notifies
    /// subscribers.
    ///
    /// Within `incoming`, the last occurrence of a duplicated id wins.
    pub fn merge(&mut self, incoming: Vec<Message>, position: MergePosition) -> MergeReport {
        if incoming.is_empty() {
            return MergeReport::default();
        }

        let mut updated_ids: HashSet<MessageId> = HashSet::new();
        let mut fresh: HashMap<MessageId, Message> = HashMap::new();

        for message in incoming {
            if let Some(existing) = self.values.get_mut(&message.id) {
                updated_ids.insert(message.id.clone());
                *existing = message;
            } else {
                fresh.insert(message.id.clone(), message);
            }
        }

        let mut block: Vec<Message> = fresh.into_values().collect();
        block.sort_by(Message::newest_first);

        let report = MergeReport {
            added: block.len(),
            updated: updated_ids.len(),
        };

        if !block.is_empty() {
            let ids: Vec<MessageId> = block.iter().map(|m| m.id.clone()).collect();
            match position {
                MergePosition::Top => {
                    for id in ids.iter().rev() {
                        self.order.push_front(id.clone());
                    }
                    self.new_ids.extend(ids.iter().cloned());
                    self.notifier.publish(&block);
                }
                MergePosition::Bottom => {
                    self.order.extend(ids);
                }
            }
            for message in block {
                self.values.insert(message.id.clone(), message);
            }
        }

        self.revision += 1;
        debug!(
            added = report.added,
            updated = report.updated,
            ?position,
            total = self.order.len(),
            "Merged messages"
        );
        report
    }

    /// Replace values of ids already present; ids not present are ignored.
    ///
    /// Returns how many values were replaced. Order and the new-message set are untouched.
    pub fn replace_known(&mut self, incoming: Vec<Message>) -> usize {
        let mut replaced = 0;
        for message in incoming {
            if let Some(existing) = self.values.get_mut(&message.id) {
                *existing = message;
                replaced += 1;
            }
        }
        if replaced > 0 {
            self.revision += 1;
        }
        replaced
    }

    /// Patch the status fields of `id` without moving it.
    ///
    /// Unknown ids are logged and ignored. Returns whether a message was patched.
    pub fn update_fields(&mut self, id: &MessageId, patch: &MessagePatch) -> bool {
        let Some(message) = self.values.get_mut(id) else {
            warn!(%id, "Cannot update unknown message");
            return false;
        };
        patch.apply(message);
        self.revision += 1;
        true
    }

    /// Remove `id` from the store. Idempotent.
    pub fn remove(&mut self, id: &MessageId) -> bool {
        if self.values.remove(id).is_none() {
            debug!(%id, "Remove of absent message ignored");
            return false;
        }
        self.order.retain(|existing| existing != id);
        self.new_ids.remove(id);
        self.revision += 1;
        true
    }

    /// Empty the store, including the new-message set.
    pub fn clear(&mut self) {
        self.values.clear();
        self.order.clear();
        self.new_ids.clear();
        self.revision += 1;
    }

    /// Remove ids from the new-message set. Ids not in the set are ignored;
    /// ids the store does not hold at all are logged.
    ///
    /// Returns how many ids were actually cleared.
    pub fn mark_read<'a>(&mut self, ids: impl IntoIterator<Item = &'a MessageId>) -> usize {
        let mut cleared = 0;
        for id in ids {
            if self.new_ids.remove(id) {
                cleared += 1;
            } else if !self.values.contains_key(id) {
                debug!(%id, "Mark-read of unknown message ignored");
            }
        }
        if cleared > 0 {
            self.revision += 1;
        }
        cleared
    }

    /// Copy out values and order.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            order: self.order.iter().cloned().collect(),
            values: self.values.clone(),
        }
    }

    /// Replace the whole state with `snapshot`, keeping its order verbatim.
    ///
    /// No sorting happens. The new-message set is emptied. Ordered ids without a
    /// value, repeated ids, and values without an ordered id are dropped with a warning.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        let StoreSnapshot { order, mut values } = snapshot;
        let mut seen: HashSet<MessageId> = HashSet::with_capacity(order.len());
        let mut restored_order = VecDeque::with_capacity(order.len());
        let mut restored_values = HashMap::with_capacity(order.len());

        for id in order {
            if seen.contains(&id) {
                warn!(%id, "Duplicate id in snapshot order skipped");
                continue;
            }
            match values.remove(&id) {
                Some(message) => {
                    seen.insert(id.clone());
                    restored_values.insert(id.clone(), message);
                    restored_order.push_back(id);
                }
                None => warn!(%id, "Snapshot order references missing message"),
            }
        }
        if !values.is_empty() {
            warn!(
                orphaned = values.len(),
                "Snapshot values without order position dropped"
            );
        }

        self.values = restored_values;
        self.order = restored_order;
        self.new_ids.clear();
        self.revision += 1;
        debug!(total = self.order.len(), "Restored message store");
    }

    /// Look up a message.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.values.get(id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.values.contains_key(id)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in display order.
    pub fn order(&self) -> impl Iterator<Item = &MessageId> {
        self.order.iter()
    }

    /// Display index of `id`.
    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.order.iter().position(|existing| existing == id)
    }

    /// Flattened message list in display order.
    pub fn messages(&self) -> Vec<&Message> {
        self.order
            .iter()
            .filter_map(|id| self.values.get(id))
            .collect()
    }

    /// Ids inserted at the top since they were last marked read.
    pub fn new_message_ids(&self) -> &HashSet<MessageId> {
        &self.new_ids
    }

    /// Whether `id` is currently flagged new.
    pub fn is_new(&self, id: &MessageId) -> bool {
        self.new_ids.contains(id)
    }

    /// Subscribe to top-merge notifications.
    pub fn subscribe(&mut self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Counter bumped by every mutation; the view re-renders when it changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
