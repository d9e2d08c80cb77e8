//! Backend JSON payloads and their one-time ingestion into [`Message`].
//!
//! The SMS and push endpoints return differently-shaped records. Each record type
//! implements [`Ingest`], which decides the [`MessageKind`] once so that nothing
//! downstream needs to inspect payload shape again.

use crate::model::{
    ConversationSummary, ExtractedData, Identity, InvalidIdentity, InvalidMessageId, Message,
    MessageId, MessageKind, Status,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

fn default_true() -> bool {
    true
}

// ===== Records =====

/// SMS record as served by the SMS log endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsLog {
    /// Unique id.
    pub uid: String,
    /// Capturing device name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Sender address.
    pub sender: String,
    /// SMS body.
    #[serde(default)]
    pub content: String,
    /// Reception time.
    pub received_at: DateTime<Utc>,
    /// Backend classification.
    #[serde(default)]
    pub sms_type: String,
    /// Extracted metadata.
    #[serde(default)]
    pub extracted_data: Option<ExtractedData>,
    /// Explicit amount, when the backend computed one.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Review status.
    pub status: Status,
    /// Status label.
    #[serde(default)]
    pub status_display: String,
    /// Last status change.
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
    /// Last status author.
    #[serde(default)]
    pub status_changed_by_name: Option<String>,
    /// Permission flag.
    #[serde(default = "default_true")]
    pub can_change_status: bool,
}

/// Push-notification record as served by the FCM log endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcmLog {
    /// Unique id.
    pub uid: String,
    /// Capturing device name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Notification title.
    #[serde(default)]
    pub title: String,
    /// Notification body.
    #[serde(default)]
    pub body: String,
    /// Raw payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Posting package.
    pub package_name: String,
    /// Backend external id.
    #[serde(default)]
    pub external_id: String,
    /// Explicit amount, when the backend computed one.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    /// Review status.
    pub status: Status,
    /// Status label.
    #[serde(default)]
    pub status_display: String,
    /// Last status change.
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
    /// Last status author.
    #[serde(default)]
    pub status_changed_by_name: Option<String>,
    /// Permission flag.
    #[serde(default = "default_true")]
    pub can_change_status: bool,
    /// Reception time.
    pub created_at: DateTime<Utc>,
}

/// One page of a paginated list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsPage<T> {
    /// Total matching records.
    #[serde(default)]
    pub count: u64,
    /// URL of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page.
    #[serde(default)]
    pub previous: Option<String>,
    /// Records on this page, newest first.
    pub results: Vec<T>,
}

impl<T> LogsPage<T> {
    /// Whether the server reports a further page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

// ===== Ingestion =====

/// A wire record that could not become a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The record had no usable uid.
    #[error("invalid uid: {0}")]
    Id(#[from] InvalidMessageId),
    /// The record had no usable sender/package.
    #[error("invalid identity: {0}")]
    Identity(#[from] InvalidIdentity),
}

/// Conversion of a backend record into the internal tagged representation.
pub trait Ingest {
    /// Convert, deciding the message variant.
    fn into_message(self) -> Result<Message, IngestError>;
}

fn display_or_label(display: String, status: Status) -> String {
    if display.is_empty() {
        status.label().to_string()
    } else {
        display
    }
}

/// Parse an amount written as a JSON number or a string like `"5 000"`, `"25,000"` or `"12,5"`.
pub fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

fn parse_amount_str(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if compact.is_empty() {
        return None;
    }
    let cleaned = if comma_is_decimal(&compact) {
        compact.replacen(',', ".", 1)
    } else {
        compact.replace(',', "")
    };
    cleaned.parse().ok()
}

/// A comma is a decimal separator only when it is the sole separator and is
/// followed by one or two digits; otherwise it groups thousands.
fn comma_is_decimal(amount: &str) -> bool {
    if amount.contains('.') || amount.matches(',').count() != 1 {
        return false;
    }
    amount.split_once(',').is_some_and(|(_, fraction)| {
        (1..=2).contains(&fraction.len()) && fraction.chars().all(|c| c.is_ascii_digit())
    })
}

impl Ingest for SmsLog {
    fn into_message(self) -> Result<Message, IngestError> {
        let id = MessageId::new(self.uid)?;
        let sender = Identity::new(self.sender)?;
        let amount = self.amount.as_ref().and_then(parse_amount).or_else(|| {
            self.extracted_data
                .as_ref()
                .and_then(|e| e.amount.as_deref())
                .and_then(parse_amount_str)
        });
        Ok(Message {
            id,
            timestamp: self.received_at,
            content: self.content,
            status: self.status,
            status_display: display_or_label(self.status_display, self.status),
            status_changed_at: self.status_changed_at,
            status_changed_by_name: self.status_changed_by_name,
            can_change_status: self.can_change_status,
            amount,
            device_name: self.device_name,
            kind: MessageKind::Sms {
                sender,
                sms_type: self.sms_type,
                extracted: self.extracted_data,
            },
        })
    }
}

impl Ingest for FcmLog {
    fn into_message(self) -> Result<Message, IngestError> {
        let id = MessageId::new(self.uid)?;
        let package_name = Identity::new(self.package_name)?;
        let amount = self
            .amount
            .as_ref()
            .or_else(|| self.data.get("amount"))
            .and_then(parse_amount);
        Ok(Message {
            id,
            timestamp: self.created_at,
            content: self.body,
            status: self.status,
            status_display: display_or_label(self.status_display, self.status),
            status_changed_at: self.status_changed_at,
            status_changed_by_name: self.status_changed_by_name,
            can_change_status: self.can_change_status,
            amount,
            device_name: self.device_name,
            kind: MessageKind::Push {
                package_name,
                title: self.title,
                external_id: self.external_id,
                data: self.data,
            },
        })
    }
}

/// Ingest a batch, logging and skipping records that fail validation.
pub fn ingest_all<T: Ingest>(records: Vec<T>) -> Vec<Message> {
    records
        .into_iter()
        .filter_map(|record| match record.into_message() {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(error = %err, "Skipping malformed log record");
                None
            }
        })
        .collect()
}

// ===== Conversation lists =====

/// Per-sender count in the unique-senders response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStat {
    /// Sender address.
    pub sender: String,
    /// Message count.
    pub count: u64,
}

/// Unique-senders response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueSendersResponse {
    /// Sender addresses.
    #[serde(default)]
    pub senders: Vec<String>,
    /// Number of senders.
    #[serde(default)]
    pub total: u64,
    /// Per-sender counts.
    pub stats: Vec<SenderStat>,
}

/// Per-package counts in the unique-packages response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStat {
    /// Package name.
    pub package_name: String,
    /// Message count.
    pub count: u64,
    /// Pending messages.
    #[serde(default)]
    pub pending_count: u64,
    /// Processed messages.
    #[serde(default)]
    pub processed_count: u64,
    /// Ignored messages.
    #[serde(default)]
    pub ignored_count: u64,
    /// Unread messages.
    #[serde(default)]
    pub unread_count: u64,
}

/// Unique-packages response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquePackagesResponse {
    /// Package names.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Number of packages.
    #[serde(default)]
    pub total: u64,
    /// Per-package counts.
    pub stats: Vec<PackageStat>,
}

impl UniqueSendersResponse {
    /// Convert to summaries, skipping blank senders.
    pub fn into_summaries(self) -> Vec<ConversationSummary> {
        self.stats
            .into_iter()
            .filter_map(|stat| {
                let identity = Identity::new(stat.sender).ok()?;
                Some(ConversationSummary {
                    identity,
                    message_count: stat.count,
                    unread_count: 0,
                    pending_count: 0,
                })
            })
            .collect()
    }
}

impl UniquePackagesResponse {
    /// Convert to summaries, skipping blank packages.
    pub fn into_summaries(self) -> Vec<ConversationSummary> {
        self.stats
            .into_iter()
            .filter_map(|stat| {
                let identity = Identity::new(stat.package_name).ok()?;
                Some(ConversationSummary {
                    identity,
                    message_count: stat.count,
                    unread_count: stat.unread_count,
                    pending_count: stat.pending_count,
                })
            })
            .collect()
    }
}

// ===== Pins =====

/// A pinned sender record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedSender {
    /// Pin id.
    #[serde(default)]
    pub uid: String,
    /// Pinned sender address.
    pub sender: String,
    /// Display position among pins.
    #[serde(default)]
    pub order: i64,
    /// When the pin was created.
    #[serde(default)]
    pub pinned_at: Option<DateTime<Utc>>,
}

/// Pinned-senders response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedSendersResponse {
    /// Pins.
    pub pinned_senders: Vec<PinnedSender>,
    /// Number of pins.
    #[serde(default)]
    pub count: u64,
    /// Server-side pin limit.
    #[serde(default)]
    pub max_allowed: u64,
}

impl PinnedSendersResponse {
    /// Pinned identities in display order.
    pub fn into_identities(mut self) -> Vec<Identity> {
        self.pinned_senders.sort_by_key(|p| p.order);
        self.pinned_senders
            .into_iter()
            .filter_map(|p| Identity::new(p.sender).ok())
            .collect()
    }
}

/// Acknowledgement for pin/unpin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAck {
    /// Whether the server applied the change.
    pub success: bool,
    /// Server message.
    #[serde(default)]
    pub message: String,
}

/// Body of a status update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateBody {
    /// Requested status.
    pub status: Status,
}

// ===== Error bodies =====

/// Reduce a backend error body to one user-facing message.
///
/// Precedence: first entry of the validation array under `field`, then
/// `message`, `error`, `detail`, first of `non_field_errors`, finally the HTTP code.
pub fn error_message_from_body(
    body: &serde_json::Value,
    field: Option<&str>,
    http_status: u16,
) -> String {
    let first_of = |key: &str| -> Option<String> {
        body.get(key)?
            .as_array()?
            .first()?
            .as_str()
            .map(str::to_string)
    };
    let string_at = |key: &str| -> Option<String> {
        body.get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    field
        .and_then(|key| first_of(key))
        .or_else(|| string_at("message"))
        .or_else(|| string_at("error"))
        .or_else(|| string_at("detail"))
        .or_else(|| first_of("non_field_errors"))
        .unwrap_or_else(|| format!("HTTP {http_status}"))
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
