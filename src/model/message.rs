//! Message types for inbound SMS and push-notification logs.
//!
//! A [`Message`] is decided once at ingestion (see [`crate::model::wire`]) to be
//! either an SMS or a push notification; the [`MessageKind`] discriminant carries the
//! variant-specific fields so no access site ever probes for field presence.

use crate::model::{Channel, Identity, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Content longer than this many characters renders collapsed by default.
pub const COLLAPSE_THRESHOLD_CHARS: usize = 300;

// ===== Status =====

/// Review status of a message in the human-in-the-loop workflow.
///
/// `Pending` is the initial state; reviewers move a message to `Approved` or `NoOrder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not reviewed yet.
    #[default]
    Pending,
    /// Matched to an order.
    Approved,
    /// No order corresponds to this message.
    ///
    /// The SMS endpoint historically reported this as `rejected`.
    #[serde(alias = "rejected")]
    NoOrder,
}

impl Status {
    /// Wire representation used in query strings and request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::NoOrder => "no_order",
        }
    }

    /// Human-readable label used when the backend has not supplied one.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::NoOrder => "No order",
        }
    }

    /// Whether a reviewer may pick this status explicitly.
    ///
    /// Only `approved` and `no_order` are accepted by the status endpoint.
    pub fn is_user_selectable(&self) -> bool {
        matches!(self, Status::Approved | Status::NoOrder)
    }

    /// Parse the wire representation (accepts the legacy `rejected` alias).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Status::Pending),
            "approved" => Some(Status::Approved),
            "no_order" | "rejected" => Some(Status::NoOrder),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== ExtractedData =====

/// Metadata the backend extracted from an SMS body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedData {
    /// Counterparty phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Amount as written in the SMS.
    #[serde(default)]
    pub amount: Option<String>,
    /// Mobile-money network.
    #[serde(default)]
    pub network: Option<String>,
}

// ===== MessageKind =====

/// Source-specific part of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Inbound SMS.
    Sms {
        /// Sender address.
        sender: Identity,
        /// Backend classification of the SMS.
        sms_type: String,
        /// Extracted metadata, when the backend produced any.
        extracted: Option<ExtractedData>,
    },
    /// Push notification captured from an app.
    Push {
        /// Package that posted the notification.
        package_name: Identity,
        /// Notification title.
        title: String,
        /// Backend-side external id.
        external_id: String,
        /// Raw notification payload.
        data: serde_json::Value,
    },
}

impl MessageKind {
    /// Channel this variant belongs to.
    pub fn channel(&self) -> Channel {
        match self {
            MessageKind::Sms { .. } => Channel::Sms,
            MessageKind::Push { .. } => Channel::Push,
        }
    }

    /// Sender or package that groups the message into a conversation.
    pub fn identity(&self) -> &Identity {
        match self {
            MessageKind::Sms { sender, .. } => sender,
            MessageKind::Push { package_name, .. } => package_name,
        }
    }
}

// ===== Message =====

/// One inbound SMS or push notification.
///
/// Immutable apart from the status fields, which change only through
/// [`MessagePatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Text body.
    pub content: String,
    /// Review status.
    pub status: Status,
    /// Display label for `status`.
    pub status_display: String,
    /// When the status last changed.
    pub status_changed_at: Option<DateTime<Utc>>,
    /// Who last changed the status.
    pub status_changed_by_name: Option<String>,
    /// Whether the current user may change the status.
    pub can_change_status: bool,
    /// Amount carried by the message, if any.
    pub amount: Option<f64>,
    /// Name of the device that captured the message.
    pub device_name: Option<String>,
    /// Source-specific fields.
    pub kind: MessageKind,
}

impl Message {
    /// Create a pending message with default display fields.
    pub fn new(
        id: MessageId,
        timestamp: DateTime<Utc>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            id,
            timestamp,
            content: content.into(),
            status: Status::Pending,
            status_display: Status::Pending.label().to_string(),
            status_changed_at: None,
            status_changed_by_name: None,
            can_change_status: true,
            amount: None,
            device_name: None,
            kind,
        }
    }

    /// Set status and its default display label.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self.status_display = status.label().to_string();
        self
    }

    /// Set the amount.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Channel of this message.
    pub fn channel(&self) -> Channel {
        self.kind.channel()
    }

    /// Sender or package of this message.
    pub fn identity(&self) -> &Identity {
        self.kind.identity()
    }

    /// Whether the body is long enough to render collapsed.
    pub fn is_collapsible(&self) -> bool {
        self.content.chars().count() > COLLAPSE_THRESHOLD_CHARS
    }

    /// Total display order: newest first, ties broken by id ascending.
    pub fn newest_first(a: &Message, b: &Message) -> Ordering {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    }
}

// ===== MessagePatch =====

/// Partial update of the mutable status fields of a message.
///
/// Identity, timestamp and content are absent: a patch can never
/// change where a message sorts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessagePatch {
    /// New status.
    pub status: Option<Status>,
    /// New display label.
    pub status_display: Option<String>,
    /// New status change time.
    pub status_changed_at: Option<DateTime<Utc>>,
    /// New status author.
    pub status_changed_by_name: Option<String>,
    /// New permission flag.
    pub can_change_status: Option<bool>,
}

impl MessagePatch {
    /// Patch that sets `status` with its default label.
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            status_display: Some(status.label().to_string()),
            ..Self::default()
        }
    }

    /// Patch carrying every status field of a server-returned message.
    pub fn from_updated(updated: &Message) -> Self {
        Self {
            status: Some(updated.status),
            status_display: Some(updated.status_display.clone()),
            status_changed_at: updated.status_changed_at,
            status_changed_by_name: updated.status_changed_by_name.clone(),
            can_change_status: Some(updated.can_change_status),
        }
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply to a message in place.
    pub fn apply(&self, message: &mut Message) {
        if let Some(status) = self.status {
            message.status = status;
        }
        if let Some(display) = &self.status_display {
            message.status_display = display.clone();
        }
        if let Some(at) = self.status_changed_at {
            message.status_changed_at = Some(at);
        }
        if let Some(by) = &self.status_changed_by_name {
            message.status_changed_by_name = Some(by.clone());
        }
        if let Some(can) = self.can_change_status {
            message.can_change_status = can;
        }
    }
}
