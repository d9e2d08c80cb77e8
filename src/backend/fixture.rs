//! JSON-file backed [`Backend`].
//!
//! A fixture file mirrors the records the REST backend serves:
//!
//! ```json
//! {
//!   "sms": [ { "uid": "s1", "sender": "MTN", "received_at": "...", "status": "pending" } ],
//!   "push": [ { "uid": "p1", "package_name": "com.wave", "created_at": "...", "status": "pending" } ],
//!   "pinned_senders": [ { "sender": "MTN", "order": 0 } ],
//!   "max_pinned": 5
//! }
//! ```
//!
//! Records are ingested once at load; malformed ones are logged and skipped.

use crate::backend::{Backend, BearerSigned, ListQuery, Page};
use crate::model::wire::{
    error_message_from_body, ingest_all, FcmLog, PinAck, PinnedSender, SmsLog,
};
use crate::model::{
    Channel, ConversationSummary, FetchError, Identity, Message, MessageId, MessagePatch, Status,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use tracing::{debug, info};

/// On-disk fixture layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    /// SMS records.
    pub sms: Vec<SmsLog>,
    /// Push-notification records.
    pub push: Vec<FcmLog>,
    /// Pinned SMS senders.
    pub pinned_senders: Vec<PinnedSender>,
    /// Server-side pin limit; unlimited when absent.
    pub max_pinned: Option<usize>,
}

/// In-memory backend over ingested fixture records.
///
/// Scripted failures queued with [`FixtureBackend::fail_next`] are returned by the
/// next calls in FIFO order, whatever the operation. Once a token is required
/// with [`FixtureBackend::require_token`], calls signed with any other token get
/// a 401.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    messages: Vec<Message>,
    pinned: Vec<Identity>,
    max_pinned: Option<usize>,
    reviewer: String,
    failures: VecDeque<FetchError>,
    calls: usize,
    accepted_token: Option<String>,
    presented_token: Option<String>,
}

impl FixtureBackend {
    /// Build from already-parsed fixture data.
    pub fn from_data(data: FixtureData) -> Self {
        let mut messages = ingest_all(data.sms);
        messages.extend(ingest_all(data.push));

        let mut pins = data.pinned_senders;
        pins.sort_by_key(|p| p.order);
        let pinned = pins
            .into_iter()
            .filter_map(|p| Identity::new(p.sender).ok())
            .collect();

        Self {
            messages,
            pinned,
            max_pinned: data.max_pinned,
            reviewer: "fixture".to_string(),
            failures: VecDeque::new(),
            calls: 0,
            accepted_token: None,
            presented_token: None,
        }
    }

    /// Parse a fixture from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: FixtureData = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    /// Read and parse a fixture file.
    pub fn load(path: &Path) -> Result<Self, crate::model::AppError> {
        let json = std::fs::read_to_string(path)?;
        let backend = Self::from_json(&json)?;
        info!(path = %path.display(), messages = backend.messages.len(), "Loaded fixture");
        Ok(backend)
    }

    /// Add a message as if it had just arrived at the backend.
    pub fn insert(&mut self, message: Message) {
        self.messages.retain(|m| m.id != message.id);
        self.messages.push(message);
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&mut self, error: FetchError) {
        self.failures.push_back(error);
    }

    /// Make the next call fail the way the REST backend does: HTTP `status` with
    /// a JSON error `body`, reduced to one message (validation errors under
    /// `field` first).
    pub fn fail_next_with_body(
        &mut self,
        status: u16,
        body: &serde_json::Value,
        field: Option<&str>,
    ) {
        let message = error_message_from_body(body, field, status);
        self.fail_next(FetchError::http(status, message));
    }

    /// Accept only requests signed with `token` from now on.
    pub fn require_token(&mut self, token: impl Into<String>) {
        self.accepted_token = Some(token.into());
    }

    /// Name recorded as author of status changes.
    pub fn set_reviewer(&mut self, name: impl Into<String>) {
        self.reviewer = name.into();
    }

    /// Number of backend calls served, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    fn next_call(&mut self) -> Result<(), FetchError> {
        self.calls += 1;
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        match &self.accepted_token {
            Some(accepted) if self.presented_token.as_ref() != Some(accepted) => {
                debug!("Fixture rejected bearer token");
                Err(FetchError::http(401, "Given token not valid for any token type"))
            }
            _ => Ok(()),
        }
    }

    fn not_found(what: &str) -> FetchError {
        FetchError::http(404, format!("{what} not found"))
    }
}

impl BearerSigned for FixtureBackend {
    fn sign(&mut self, access_token: &str) {
        self.presented_token = Some(access_token.to_string());
    }
}

impl Backend for FixtureBackend {
    fn list_messages(&mut self, query: &ListQuery) -> Result<Page, FetchError> {
        self.next_call()?;
        if query.page == 0 || query.page_size == 0 {
            return Err(FetchError::http(400, "Invalid page."));
        }

        let mut matching: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.channel() == query.key.channel())
            .filter(|m| m.identity() == query.key.identity())
            .filter(|m| query.filters.matches(m))
            .collect();
        matching.sort_by(|a, b| Message::newest_first(a, b));

        let size = query.page_size as usize;
        let start = (query.page as usize - 1) * size;
        if start > 0 && start >= matching.len() {
            return Err(Self::not_found("Page"));
        }
        let end = (start + size).min(matching.len());
        let messages: Vec<Message> = matching[start..end].iter().map(|m| (*m).clone()).collect();

        debug!(
            key = %query.key,
            page = query.page,
            returned = messages.len(),
            total = matching.len(),
            "Fixture page served"
        );
        Ok(Page {
            messages,
            has_next: end < matching.len(),
        })
    }

    fn update_status(
        &mut self,
        channel: Channel,
        id: &MessageId,
        status: Status,
    ) -> Result<Message, FetchError> {
        self.next_call()?;
        if !status.is_user_selectable() {
            return Err(FetchError::http(
                400,
                "Status must be either 'approved' or 'no_order'.",
            ));
        }
        let reviewer = self.reviewer.clone();
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.channel() == channel && &m.id == id)
            .ok_or_else(|| Self::not_found("Message"))?;
        if !message.can_change_status {
            return Err(FetchError::http(
                403,
                "You do not have permission to change this status.",
            ));
        }

        let patch = MessagePatch {
            status: Some(status),
            status_display: Some(status.label().to_string()),
            status_changed_at: Some(Utc::now()),
            status_changed_by_name: Some(reviewer),
            can_change_status: None,
        };
        patch.apply(message);
        Ok(message.clone())
    }

    fn list_conversations(
        &mut self,
        channel: Channel,
    ) -> Result<Vec<ConversationSummary>, FetchError> {
        self.next_call()?;
        let mut by_identity: BTreeMap<&Identity, ConversationSummary> = BTreeMap::new();
        for message in self.messages.iter().filter(|m| m.channel() == channel) {
            let summary = by_identity
                .entry(message.identity())
                .or_insert_with(|| ConversationSummary {
                    identity: message.identity().clone(),
                    message_count: 0,
                    unread_count: 0,
                    pending_count: 0,
                });
            summary.message_count += 1;
            if message.status == Status::Pending {
                summary.pending_count += 1;
                summary.unread_count += 1;
            }
        }
        Ok(by_identity.into_values().collect())
    }

    fn pin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError> {
        self.next_call()?;
        if self.pinned.contains(sender) {
            return Err(FetchError::http(400, "Sender is already pinned."));
        }
        if let Some(max) = self.max_pinned {
            if self.pinned.len() >= max {
                return Err(FetchError::http(
                    400,
                    format!("You can pin at most {max} senders."),
                ));
            }
        }
        self.pinned.push(sender.clone());
        Ok(PinAck {
            success: true,
            message: format!("{sender} pinned"),
        })
    }

    fn unpin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError> {
        self.next_call()?;
        let before = self.pinned.len();
        self.pinned.retain(|p| p != sender);
        if self.pinned.len() == before {
            return Err(Self::not_found("Pinned sender"));
        }
        Ok(PinAck {
            success: true,
            message: format!("{sender} unpinned"),
        })
    }

    fn list_pinned(&mut self) -> Result<Vec<Identity>, FetchError> {
        self.next_call()?;
        Ok(self.pinned.clone())
    }
}
