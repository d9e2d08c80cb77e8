//! Search and status filters for message lists.

use crate::model::{Message, Status};

/// Filters passed with every message list request.
///
/// Cached conversation snapshots are only valid for the filters they were
/// fetched under, so a change invalidates the whole conversation cache.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filters {
    search: Option<String>,
    status: Option<Status>,
}

impl Filters {
    /// No filtering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Replace the search term. Blank terms clear it.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let trimmed = search.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Replace the status filter.
    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    /// Search term, if any.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Status filter, if any.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// True when any filter narrows the list.
    pub fn is_active(&self) -> bool {
        self.search.is_some() || self.status.is_some()
    }

    /// Whether `message` passes these filters.
    ///
    /// Search is a case-insensitive substring match over content and identity.
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(status) = self.status {
            if message.status != status {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                message.content.to_lowercase().contains(&needle)
                    || message.identity().as_str().to_lowercase().contains(&needle)
            }
        }
    }
}
