//! Conversation list ordering for the sidebar.

use crate::model::{ConversationSummary, Identity};

/// Pinned SMS senders in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedSenders {
    senders: Vec<Identity>,
}

impl PinnedSenders {
    /// Build from the backend's ordered list. Repeated senders keep their first position.
    pub fn new(senders: impl IntoIterator<Item = Identity>) -> Self {
        let mut unique: Vec<Identity> = Vec::new();
        for sender in senders {
            if !unique.contains(&sender) {
                unique.push(sender);
            }
        }
        Self { senders: unique }
    }

    /// Whether `sender` is pinned.
    pub fn contains(&self, sender: &Identity) -> bool {
        self.senders.contains(sender)
    }

    /// Position of `sender` among the pins.
    pub fn rank(&self, sender: &Identity) -> Option<usize> {
        self.senders.iter().position(|s| s == sender)
    }

    /// Pinned senders in order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.senders.iter()
    }

    /// Number of pins.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// True when nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

/// One sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    /// Conversation counts.
    pub summary: ConversationSummary,
    /// Whether the sender is pinned.
    pub pinned: bool,
}

/// Order SMS senders: pinned first in pin order, then by message count
/// descending, then by identity.
pub fn order_conversations(
    summaries: Vec<ConversationSummary>,
    pinned: &PinnedSenders,
) -> Vec<SidebarEntry> {
    let mut entries: Vec<SidebarEntry> = summaries
        .into_iter()
        .map(|summary| SidebarEntry {
            pinned: pinned.contains(&summary.identity),
            summary,
        })
        .collect();

    entries.sort_by(|a, b| {
        let rank_a = pinned.rank(&a.summary.identity).unwrap_or(usize::MAX);
        let rank_b = pinned.rank(&b.summary.identity).unwrap_or(usize::MAX);
        rank_a
            .cmp(&rank_b)
            .then_with(|| b.summary.message_count.cmp(&a.summary.message_count))
            .then_with(|| a.summary.identity.cmp(&b.summary.identity))
    });
    entries
}

/// Push packages with at least one message, busiest first.
pub fn visible_packages(summaries: Vec<ConversationSummary>) -> Vec<ConversationSummary> {
    let mut packages: Vec<ConversationSummary> = summaries
        .into_iter()
        .filter(|s| s.message_count > 0)
        .collect();
    packages.sort_by(|a, b| {
        b.message_count
            .cmp(&a.message_count)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    packages
}
