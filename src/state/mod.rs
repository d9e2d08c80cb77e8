//! Client state machine (pure).
//!
//! Everything here reacts to explicit events (selection, scroll, refresh,
//! backend responses) and is testable without a network or a UI. Time enters
//! only as `Instant` arguments.

pub mod banner;
pub mod filters;
pub mod pagination;
pub mod prefs;
pub mod session;
pub mod sidebar;
pub mod switcher;

// Re-export for convenience
pub use banner::{Banner, BannerKind, ErrorBanner};
pub use filters::Filters;
pub use pagination::{
    LoadOutcome, LoadPurpose, PageRequest, PaginationConfig, PaginationController, Phase,
    ScrollMetrics,
};
pub use prefs::{default_prefs_path, ExpandedMessages, PrefsError};
pub use session::{DashboardSession, RefreshOrigin, RefreshOutcome, StatusOutcome};
pub use sidebar::{order_conversations, visible_packages, PinnedSenders, SidebarEntry};
pub use switcher::{ConversationSwitcher, SwitchOutcome};
