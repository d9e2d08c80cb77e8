//! Scroll-driven "load more" state machine (pure).
//!
//! The controller never performs I/O. It hands out [`PageRequest`] tokens when a
//! load should start and takes the response back through
//! [`PaginationController::complete`]. Every token carries the generation of the
//! conversation it was issued for; switching conversation bumps the generation,
//! so a late response for an abandoned conversation is recognised and dropped.
//!
//! ```text
//!        on_scroll / begin_initial          complete (ok | err)
//! Idle ───────────────────────────▶ Loading ───────────────────▶ Idle (+ cooldown)
//! ```

use crate::backend::Page;
use crate::model::{ConversationKey, FetchError};
use crate::store::{MergePosition, MessageStore, PaginationCursor};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default fraction of scroll height under which load-more triggers.
pub const DEFAULT_LOAD_MORE_THRESHOLD: f64 = 0.7;

/// Default pause after a load before another may trigger.
pub const DEFAULT_LOAD_COOLDOWN: Duration = Duration::from_millis(300);

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Tuning of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginationConfig {
    /// Records per page.
    pub page_size: u32,
    /// Load when distance from bottom < `load_more_threshold` × scroll height.
    pub load_more_threshold: f64,
    /// Pause after a completed load.
    pub cooldown: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_threshold: DEFAULT_LOAD_MORE_THRESHOLD,
            cooldown: DEFAULT_LOAD_COOLDOWN,
        }
    }
}

/// Geometry of the scrolled thread at one scroll event, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Offset of the viewport from the top of the content.
    pub scroll_top: f64,
    /// Total content height.
    pub scroll_height: f64,
    /// Viewport height.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Content left below the viewport.
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }
}

/// What a page request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPurpose {
    /// First page of a conversation that had nothing cached.
    Initial,
    /// First page re-fetched after a cache restore; only patches known ids.
    Prime,
    /// Next older page.
    More,
}

/// Token for one outstanding page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    key: ConversationKey,
    page: u32,
    generation: u64,
    purpose: LoadPurpose,
}

impl PageRequest {
    /// Conversation the page belongs to.
    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Why the page is fetched.
    pub fn purpose(&self) -> LoadPurpose {
        self.purpose
    }
}

/// Phase of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No fetch outstanding.
    Idle,
    /// `request` is outstanding; further triggers are ignored.
    Loading(PageRequest),
}

/// Result of handing a response to [`PaginationController::complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Page merged into the store.
    Merged {
        /// Ids that were new to the store.
        added: usize,
        /// Ids already present whose values were refreshed.
        updated: usize,
    },
    /// Response belonged to a context that is no longer active; nothing changed.
    Stale,
    /// Fetch failed; the store is untouched and the controller is idle again.
    Failed(FetchError),
}

/// Load-more controller for the active conversation.
#[derive(Debug)]
pub struct PaginationController {
    config: PaginationConfig,
    active: Option<ConversationKey>,
    cursor: PaginationCursor,
    phase: Phase,
    generation: u64,
    cooldown_until: Option<Instant>,
    suppressed_until: Option<Instant>,
    scroll_offset: f64,
}

impl PaginationController {
    /// Create an idle controller with no active conversation.
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config,
            active: None,
            cursor: PaginationCursor::initial(),
            phase: Phase::Idle,
            generation: 0,
            cooldown_until: None,
            suppressed_until: None,
            scroll_offset: 0.0,
        }
    }

    /// Controller tuning.
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Make `key` the active conversation, resuming from `cursor` and `scroll_offset`.
    ///
    /// Any outstanding request becomes stale.
    pub fn activate(
        &mut self,
        key: ConversationKey,
        cursor: PaginationCursor,
        scroll_offset: f64,
    ) {
        self.generation += 1;
        debug!(
            %key,
            page = cursor.page,
            has_more = cursor.has_more,
            generation = self.generation,
            "Pagination activated"
        );
        self.active = Some(key);
        self.cursor = cursor;
        self.scroll_offset = scroll_offset;
        self.phase = Phase::Idle;
        self.cooldown_until = None;
        self.suppressed_until = None;
    }

    /// Drop the active conversation: idle, page 1, nothing more to load.
    ///
    /// Any outstanding request becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.active = None;
        self.cursor = PaginationCursor::initial();
        self.scroll_offset = 0.0;
        self.phase = Phase::Idle;
        self.cooldown_until = None;
        self.suppressed_until = None;
    }

    /// Restart pagination of the active conversation from page 1.
    ///
    /// Used when filters change. Any outstanding request becomes stale.
    pub fn restart(&mut self) {
        match self.active.take() {
            Some(key) => self.activate(key, PaginationCursor::initial(), 0.0),
            None => self.reset(),
        }
    }

    /// Feed a scroll event. Returns a request when a load-more should start.
    ///
    /// Ignored while loading, cooling down, suppressed, without an active
    /// conversation, or when the last page reported no successor.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> Option<PageRequest> {
        self.scroll_offset = metrics.scroll_top;

        let key = self.active.clone()?;
        if !self.cursor.has_more || matches!(self.phase, Phase::Loading(_)) {
            return None;
        }
        if self.is_cooling_down(now) || self.is_suppressed(now) {
            return None;
        }
        let trigger = self.config.load_more_threshold * metrics.scroll_height;
        if metrics.distance_from_bottom() >= trigger {
            return None;
        }

        let next = self.cursor.next_page();
        debug!(
            distance = metrics.distance_from_bottom(),
            trigger,
            page = next,
            "Load more triggered"
        );
        Some(self.start(key, next, LoadPurpose::More))
    }

    /// Issue the page-1 request for the active conversation.
    ///
    /// After a cache restore the request only primes known ids; otherwise it
    /// populates an empty store. Returns `None` without an active conversation
    /// or while another request is outstanding.
    pub fn begin_initial(&mut self, primed: bool) -> Option<PageRequest> {
        let key = self.active.clone()?;
        if matches!(self.phase, Phase::Loading(_)) {
            return None;
        }
        let purpose = if primed {
            LoadPurpose::Prime
        } else {
            LoadPurpose::Initial
        };
        Some(self.start(key, 1, purpose))
    }

    fn start(&mut self, key: ConversationKey, page: u32, purpose: LoadPurpose) -> PageRequest {
        let request = PageRequest {
            key,
            page,
            generation: self.generation,
            purpose,
        };
        self.phase = Phase::Loading(request.clone());
        request
    }

    /// Whether `request` is the one this controller is waiting for.
    pub fn is_current(&self, request: &PageRequest) -> bool {
        request.generation == self.generation
            && matches!(&self.phase, Phase::Loading(outstanding) if outstanding == request)
    }

    /// Apply the response to `request`.
    ///
    /// Stale responses are dropped. Successful pages are merged at the bottom
    /// (initial and load-more) or patched over known ids (prime). Failures leave
    /// the store as it was. Every non-stale completion returns to idle and starts
    /// the cooldown; completing a prime request, successfully or not, also ends
    /// suppression.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: Result<Page, FetchError>,
        store: &mut MessageStore,
        now: Instant,
    ) -> LoadOutcome {
        if !self.is_current(request) {
            warn!(
                key = %request.key,
                page = request.page,
                "Dropping stale page response"
            );
            return LoadOutcome::Stale;
        }

        self.phase = Phase::Idle;
        self.cooldown_until = Some(now + self.config.cooldown);
        if request.purpose == LoadPurpose::Prime {
            self.suppressed_until = None;
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(key = %request.key, page = request.page, error = %err, "Page load failed");
                return LoadOutcome::Failed(err);
            }
        };

        match request.purpose {
            LoadPurpose::Prime => {
                let updated = store.replace_known(page.messages);
                LoadOutcome::Merged { added: 0, updated }
            }
            LoadPurpose::Initial | LoadPurpose::More => {
                let report = store.merge(page.messages, MergePosition::Bottom);
                self.cursor = PaginationCursor {
                    page: request.page,
                    has_more: page.has_next,
                };
                LoadOutcome::Merged {
                    added: report.added,
                    updated: report.updated,
                }
            }
        }
    }

    /// Suppress load-more and background refresh until `deadline`.
    pub fn suppress_until(&mut self, deadline: Instant) {
        self.suppressed_until = Some(deadline);
    }

    /// End suppression early.
    pub fn lift_suppression(&mut self) {
        self.suppressed_until = None;
    }

    /// Whether suppression is in effect at `now`.
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppressed_until.is_some_and(|deadline| now < deadline)
    }

    fn is_cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Active conversation.
    pub fn active_key(&self) -> Option<&ConversationKey> {
        self.active.as_ref()
    }

    /// Current cursor.
    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a load is outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading(_))
    }

    /// Whether the last page reported a successor.
    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    /// Last scroll offset seen.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
