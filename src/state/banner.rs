//! Dismissable inline banner for user-visible errors.

use crate::model::FetchError;

/// Severity of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// A request failed; retry is manual.
    Error,
    /// The session ended; the user must log in again.
    SessionExpired,
    /// An action was refused locally.
    Notice,
}

/// One banner message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Severity.
    pub kind: BannerKind,
    /// Text shown to the user.
    pub message: String,
}

/// Holds at most one banner; a newer one replaces the older.
#[derive(Debug, Default)]
pub struct ErrorBanner {
    current: Option<Banner>,
}

impl ErrorBanner {
    /// Empty banner slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the user-facing form of `err`.
    pub fn show_error(&mut self, err: &FetchError) {
        let kind = if err.is_session_fatal() {
            BannerKind::SessionExpired
        } else {
            BannerKind::Error
        };
        self.current = Some(Banner {
            kind,
            message: err.to_string(),
        });
    }

    /// Show a locally generated notice.
    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.current = Some(Banner {
            kind: BannerKind::Notice,
            message: message.into(),
        });
    }

    /// Hide the banner.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Banner currently shown.
    pub fn current(&self) -> Option<&Banner> {
        self.current.as_ref()
    }
}
