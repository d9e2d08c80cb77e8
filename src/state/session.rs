//! Dashboard session: the single owner of all client-side state.
//!
//! A [`DashboardSession`] is created at login and dropped at logout. It owns the
//! backend handle, the [`ConversationSwitcher`] (store, cache, pagination), the
//! active filters, the banner, pinned senders and UI preferences. The
//! presentation layer reads from it and feeds it selection, scroll, refresh and
//! status events; these are the only mutation entry points.

use crate::backend::{Backend, ListQuery, Page};
use crate::config::ResolvedConfig;
use crate::model::{
    Channel, ConversationKey, FetchError, Identity, Message, MessageId, MessagePatch, Status,
};
use crate::state::banner::ErrorBanner;
use crate::state::filters::Filters;
use crate::state::pagination::{LoadOutcome, PageRequest, PaginationController, ScrollMetrics};
use crate::state::prefs::ExpandedMessages;
use crate::state::sidebar::{order_conversations, visible_packages, PinnedSenders, SidebarEntry};
use crate::state::switcher::{ConversationSwitcher, SwitchOutcome};
use crate::store::{ConversationCache, MergePosition, MessageStore, Subscription};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// At most this many visible new messages are marked read per acknowledgement.
pub const MARK_READ_BATCH: usize = 5;

/// Who asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOrigin {
    /// Periodic polling.
    Background,
    /// The user pressed refresh.
    Manual,
}

/// Result of [`DashboardSession::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Page 1 merged at the top.
    Merged {
        /// Ids that were new; they are now flagged new.
        added: usize,
        /// Ids already present whose values were refreshed in place.
        updated: usize,
    },
    /// Background refresh dropped during cache-priming suppression.
    Suppressed,
    /// No conversation is active.
    NoConversation,
    /// The fetch failed; shown on the banner.
    Failed(FetchError),
}

/// Result of [`DashboardSession::update_status`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    /// Backend accepted the change and the store was patched in place.
    Applied,
    /// Refused locally without calling the backend; reason shown on the banner.
    Refused,
    /// The backend call failed; shown on the banner.
    Failed(FetchError),
}

/// All client-side state of one logged-in user.
#[derive(Debug)]
pub struct DashboardSession<B> {
    backend: B,
    switcher: ConversationSwitcher,
    filters: Filters,
    banner: ErrorBanner,
    pinned: PinnedSenders,
    pinned_limit: Option<usize>,
    prefs: ExpandedMessages,
    logged_out: bool,
}

impl<B: Backend> DashboardSession<B> {
    /// Start a session over `backend`.
    pub fn new(backend: B, config: &ResolvedConfig) -> Self {
        Self {
            backend,
            switcher: ConversationSwitcher::new(config.pagination(), config.restore_suppression),
            filters: Filters::none(),
            banner: ErrorBanner::new(),
            pinned: PinnedSenders::default(),
            pinned_limit: config.pinned_limit,
            prefs: ExpandedMessages::new(),
            logged_out: false,
        }
    }

    /// Replace the expanded-message preferences (loaded from disk by the shell).
    pub fn with_prefs(mut self, prefs: ExpandedMessages) -> Self {
        self.prefs = prefs;
        self
    }

    // ===== Conversations =====

    /// Make `target` the active conversation (or deselect with `None`).
    ///
    /// Returns the page-1 request the caller should fetch and
    /// [`deliver`](DashboardSession::deliver), if any.
    pub fn switch(
        &mut self,
        target: Option<ConversationKey>,
        now: Instant,
    ) -> (SwitchOutcome, Option<PageRequest>) {
        let outcome = self.switcher.switch_to(target, now);
        let request = if outcome.needs_initial_load() {
            let primed = outcome == SwitchOutcome::Restored;
            self.switcher.pagination_mut().begin_initial(primed)
        } else {
            None
        };
        (outcome, request)
    }

    /// [`switch`](DashboardSession::switch) with the page-1 load performed inline.
    pub fn select(&mut self, target: Option<ConversationKey>, now: Instant) -> SwitchOutcome {
        let (outcome, request) = self.switch(target, now);
        if let Some(request) = request {
            let result = self.fetch(&request);
            self.deliver(&request, result, now);
        }
        outcome
    }

    /// Active conversation.
    pub fn active_key(&self) -> Option<&ConversationKey> {
        self.switcher.active_key()
    }

    /// Sidebar rows for `channel`.
    ///
    /// SMS senders come pinned first; push packages without messages are hidden.
    pub fn conversations(&mut self, channel: Channel) -> Result<Vec<SidebarEntry>, FetchError> {
        let summaries = self
            .backend
            .list_conversations(channel)
            .inspect_err(|err| self.report(err))?;
        Ok(match channel {
            Channel::Sms => order_conversations(summaries, &self.pinned),
            Channel::Push => visible_packages(summaries)
                .into_iter()
                .map(|summary| SidebarEntry {
                    summary,
                    pinned: false,
                })
                .collect(),
        })
    }

    // ===== Pagination =====

    /// Scroll event: decide whether a load-more starts. The caller fetches the
    /// page and hands it to [`DashboardSession::deliver`].
    pub fn load_more_request(
        &mut self,
        metrics: ScrollMetrics,
        now: Instant,
    ) -> Option<PageRequest> {
        self.switcher.pagination_mut().on_scroll(metrics, now)
    }

    /// Fetch the page `request` asks for.
    pub fn fetch(&mut self, request: &PageRequest) -> Result<Page, FetchError> {
        let query = ListQuery {
            key: request.key().clone(),
            filters: self.filters.clone(),
            page: request.page(),
            page_size: self.switcher.pagination().config().page_size,
        };
        self.backend.list_messages(&query)
    }

    /// Hand a fetched page (or its failure) back. Stale responses are dropped.
    pub fn deliver(
        &mut self,
        request: &PageRequest,
        result: Result<Page, FetchError>,
        now: Instant,
    ) -> LoadOutcome {
        let (store, pagination) = self.switcher.parts_mut();
        let outcome = pagination.complete(request, result, store, now);
        if let LoadOutcome::Failed(err) = &outcome {
            self.report(err);
        }
        outcome
    }

    /// Scroll event with the fetch performed inline.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> Option<LoadOutcome> {
        let request = self.load_more_request(metrics, now)?;
        let result = self.fetch(&request);
        Some(self.deliver(&request, result, now))
    }

    // ===== Refresh =====

    /// Fetch page 1 of the active conversation and merge it at the top.
    ///
    /// Background refreshes are dropped while a restored conversation is being
    /// primed. A manual refresh always runs and ends that suppression.
    pub fn refresh(&mut self, now: Instant, origin: RefreshOrigin) -> RefreshOutcome {
        let Some(key) = self.switcher.active_key().cloned() else {
            return RefreshOutcome::NoConversation;
        };
        match origin {
            RefreshOrigin::Background if self.switcher.pagination().is_suppressed(now) => {
                debug!(%key, "Background refresh suppressed after restore");
                return RefreshOutcome::Suppressed;
            }
            RefreshOrigin::Background => {}
            RefreshOrigin::Manual => self.switcher.pagination_mut().lift_suppression(),
        }

        let query = ListQuery {
            key,
            filters: self.filters.clone(),
            page: 1,
            page_size: self.switcher.pagination().config().page_size,
        };
        match self.backend.list_messages(&query) {
            Ok(page) => {
                let report = self
                    .switcher
                    .store_mut()
                    .merge(page.messages, MergePosition::Top);
                RefreshOutcome::Merged {
                    added: report.added,
                    updated: report.updated,
                }
            }
            Err(err) => {
                self.report(&err);
                RefreshOutcome::Failed(err)
            }
        }
    }

    // ===== Filters =====

    /// Replace the filters.
    ///
    /// Cached snapshots were fetched under the old filters, so the whole cache is
    /// dropped and the active conversation reloads from page 1. Returns whether
    /// anything changed.
    pub fn set_filters(&mut self, filters: Filters, now: Instant) -> bool {
        if filters == self.filters {
            return false;
        }
        info!(search = ?filters.search(), status = ?filters.status(), "Filters changed");
        self.filters = filters;
        if self.switcher.invalidate_all() {
            if let Some(request) = self.switcher.pagination_mut().begin_initial(false) {
                let result = self.fetch(&request);
                self.deliver(&request, result, now);
            }
        }
        true
    }

    /// Active filters.
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    // ===== Status workflow =====

    /// Move message `id` of the active conversation to `status`.
    ///
    /// Only `approved` and `no_order` may be chosen, and only on messages whose
    /// `can_change_status` is set; anything else is refused without a backend
    /// call. On success the stored message is patched in place.
    pub fn update_status(&mut self, id: &MessageId, status: Status) -> StatusOutcome {
        let Some(channel) = self.switcher.active_key().map(ConversationKey::channel) else {
            warn!(%id, "Status change without active conversation");
            return StatusOutcome::Refused;
        };
        let Some(message) = self.switcher.store().get(id) else {
            warn!(%id, "Status change for unknown message");
            return StatusOutcome::Refused;
        };
        if !status.is_user_selectable() {
            self.banner
                .show_notice("Status must be either 'approved' or 'no_order'.");
            return StatusOutcome::Refused;
        }
        if !message.can_change_status {
            self.banner
                .show_notice("You do not have permission to change this status.");
            return StatusOutcome::Refused;
        }

        match self.backend.update_status(channel, id, status) {
            Ok(updated) => {
                self.switcher
                    .store_mut()
                    .update_fields(id, &MessagePatch::from_updated(&updated));
                info!(%id, %status, "Status updated");
                StatusOutcome::Applied
            }
            Err(err) => {
                self.report(&err);
                StatusOutcome::Failed(err)
            }
        }
    }

    // ===== Pins =====

    /// Reload pinned senders from the backend.
    pub fn load_pins(&mut self) -> Result<(), FetchError> {
        let senders = self
            .backend
            .list_pinned()
            .inspect_err(|err| self.report(err))?;
        self.pinned = PinnedSenders::new(senders);
        Ok(())
    }

    /// Pin `sender`, or unpin it if already pinned. Returns whether it is pinned
    /// afterwards.
    pub fn toggle_pin(&mut self, sender: &Identity) -> Result<bool, FetchError> {
        let pinning = !self.pinned.contains(sender);
        if pinning {
            if let Some(limit) = self.pinned_limit {
                if self.pinned.len() >= limit {
                    self.banner
                        .show_notice(format!("You can pin at most {limit} senders."));
                    return Ok(false);
                }
            }
        }

        let ack = if pinning {
            self.backend.pin_sender(sender)
        } else {
            self.backend.unpin_sender(sender)
        }
        .inspect_err(|err| self.report(err))?;
        if !ack.success {
            self.banner.show_notice(ack.message);
        }

        self.load_pins()?;
        Ok(self.pinned.contains(sender))
    }

    /// Pinned senders.
    pub fn pinned(&self) -> &PinnedSenders {
        &self.pinned
    }

    // ===== New messages =====

    /// Clear the "new" flag of `ids`.
    pub fn mark_read(&mut self, ids: &[MessageId]) -> usize {
        self.switcher.store_mut().mark_read(ids)
    }

    /// Clear the "new" flag of the first few new messages among `visible`.
    pub fn mark_visible_read(&mut self, visible: &[MessageId]) -> usize {
        let store = self.switcher.store();
        let batch: Vec<MessageId> = visible
            .iter()
            .filter(|id| store.is_new(id))
            .take(MARK_READ_BATCH)
            .cloned()
            .collect();
        self.switcher.store_mut().mark_read(&batch)
    }

    /// Subscribe to messages arriving at the top of the active store.
    pub fn subscribe(&mut self) -> Subscription {
        self.switcher.store_mut().subscribe()
    }

    // ===== Expanded messages =====

    /// Flip the expanded state of a long message of the active conversation.
    ///
    /// Returns the new state, or `None` for unknown or short messages.
    pub fn toggle_expanded(&mut self, id: &MessageId) -> Option<bool> {
        let message = self.switcher.store().get(id)?;
        if !message.is_collapsible() {
            return None;
        }
        let sender = message.identity().clone();
        Some(self.prefs.toggle(&sender, id))
    }

    /// Expanded-message preferences.
    pub fn prefs(&self) -> &ExpandedMessages {
        &self.prefs
    }

    // ===== Banner & lifecycle =====

    fn report(&mut self, err: &FetchError) {
        self.banner.show_error(err);
        if err.is_session_fatal() {
            self.end_session();
        }
    }

    /// Drop every conversation and mark the session logged out.
    pub fn end_session(&mut self) {
        if self.logged_out {
            return;
        }
        warn!("Session ended, credentials must be re-entered");
        self.switcher.switch_to(None, Instant::now());
        self.switcher.cache_mut().clear_all();
        self.logged_out = true;
    }

    /// Whether an auth failure ended the session.
    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    /// Banner state.
    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    /// Hide the banner.
    pub fn dismiss_banner(&mut self) {
        self.banner.dismiss();
    }

    // ===== Read access =====

    /// Messages of the active conversation in display order.
    pub fn messages(&self) -> Vec<&Message> {
        self.switcher.store().messages()
    }

    /// Ids flagged new in the active conversation.
    pub fn new_message_ids(&self) -> &HashSet<MessageId> {
        self.switcher.store().new_message_ids()
    }

    /// Live store.
    pub fn store(&self) -> &MessageStore {
        self.switcher.store()
    }

    /// Snapshot cache.
    pub fn cache(&self) -> &ConversationCache {
        self.switcher.cache()
    }

    /// Pagination state.
    pub fn pagination(&self) -> &PaginationController {
        self.switcher.pagination()
    }

    /// Backend handle.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
