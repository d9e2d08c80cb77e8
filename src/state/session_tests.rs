//! Tests for DashboardSession against the fixture backend.

use super::*;
use crate::backend::{
    AuthenticatedBackend, Authenticator, FixtureBackend, FixtureData, TokenPair,
    TokenRefresher,
};
use crate::model::wire::PinnedSender;
use crate::model::{AuthError, MessageKind};
use crate::state::banner::BannerKind;
use crate::state::pagination::ScrollMetrics;
use chrono::{TimeZone, Utc};
use std::time::Duration;

// ===== Test Helpers =====

fn sender(name: &str) -> Identity {
    Identity::new(name).unwrap()
}

fn mtn() -> ConversationKey {
    ConversationKey::sms(sender("MTN"))
}

fn orange() -> ConversationKey {
    ConversationKey::sms(sender("Orange"))
}

fn id(raw: &str) -> MessageId {
    MessageId::new(raw).unwrap()
}

fn sms(uid: &str, from: &str, ts: i64, content: &str) -> Message {
    Message::new(
        id(uid),
        Utc.timestamp_opt(ts, 0).unwrap(),
        content,
        MessageKind::Sms {
            sender: sender(from),
            sms_type: "incoming".into(),
            extracted: None,
        },
    )
}

/// Five MTN messages (m1 oldest .. m5 newest) and two Orange messages.
fn backend() -> FixtureBackend {
    let mut backend = FixtureBackend::from_data(FixtureData {
        pinned_senders: vec![PinnedSender {
            uid: "pin-1".into(),
            sender: "Orange".into(),
            order: 0,
            pinned_at: None,
        }],
        ..FixtureData::default()
    });
    for n in 1..=5 {
        backend.insert(sms(&format!("m{n}"), "MTN", n * 10, "Transfer received"));
    }
    backend.insert(sms("o1", "Orange", 5, "Hello"));
    backend.insert(sms("o2", "Orange", 6, "Balance"));
    backend
}

fn config() -> ResolvedConfig {
    ResolvedConfig {
        page_size: 2,
        ..ResolvedConfig::default()
    }
}

fn session() -> DashboardSession<FixtureBackend> {
    DashboardSession::new(backend(), &config())
}

fn ids(session: &DashboardSession<FixtureBackend>) -> Vec<String> {
    session
        .messages()
        .iter()
        .map(|m| m.id.as_str().to_string())
        .collect()
}

fn at_bottom() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 900.0,
        scroll_height: 1000.0,
        client_height: 100.0,
    }
}

fn later(t0: Instant, secs: u64) -> Instant {
    t0 + Duration::from_secs(secs)
}

// ===== Selection and pagination =====

#[test]
fn selecting_loads_first_page() {
    let mut session = session();
    let outcome = session.select(Some(mtn()), Instant::now());

    assert_eq!(outcome, SwitchOutcome::Fresh);
    assert_eq!(ids(&session), vec!["m5", "m4"]);
    assert!(session.pagination().has_more());
    assert!(session.new_message_ids().is_empty());
}

#[test]
fn scrolling_appends_older_pages_until_exhausted() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);

    session.on_scroll(at_bottom(), later(t0, 1));
    session.on_scroll(at_bottom(), later(t0, 2));
    let exhausted = session.on_scroll(at_bottom(), later(t0, 3));

    assert_eq!(ids(&session), vec!["m5", "m4", "m3", "m2", "m1"]);
    assert!(exhausted.is_none(), "no page after the last one");
    assert!(!session.pagination().has_more());
}

#[test]
fn stale_page_after_switch_is_dropped() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    let in_flight = session.load_more_request(at_bottom(), later(t0, 1)).unwrap();
    let response = session.fetch(&in_flight);

    session.select(Some(orange()), later(t0, 1));
    let outcome = session.deliver(&in_flight, response, later(t0, 2));

    assert_eq!(outcome, LoadOutcome::Stale);
    assert_eq!(ids(&session), vec!["o2", "o1"]);
}

#[test]
fn failed_page_shows_banner_and_keeps_messages() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    session
        .backend_mut()
        .fail_next(FetchError::network("connection reset"));

    let outcome = session.on_scroll(at_bottom(), later(t0, 1));

    assert!(matches!(outcome, Some(LoadOutcome::Failed(_))));
    assert_eq!(ids(&session), vec!["m5", "m4"]);
    assert_eq!(session.banner().current().unwrap().kind, BannerKind::Error);

    session.dismiss_banner();
    assert!(session.banner().current().is_none());
    assert!(session.on_scroll(at_bottom(), later(t0, 2)).is_some(), "retry by scrolling");
    assert_eq!(ids(&session).len(), 4);
}

// ===== Cache restore =====

#[test]
fn switching_back_restores_without_reordering() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    session.on_scroll(at_bottom(), later(t0, 1));
    let before = ids(&session);
    let cursor_before = session.pagination().cursor();

    session.select(Some(orange()), later(t0, 2));
    // A newer message arrives for MTN while the user looks elsewhere
    session
        .backend_mut()
        .insert(sms("m6", "MTN", 60, "Transfer received"));
    let outcome = session.select(Some(mtn()), later(t0, 3));

    assert_eq!(outcome, SwitchOutcome::Restored);
    assert_eq!(ids(&session), before, "priming fetch does not insert new ids");
    assert_eq!(session.pagination().cursor(), cursor_before);
    assert_eq!(session.pagination().scroll_offset(), 900.0);
}

#[test]
fn background_refresh_is_suppressed_while_priming() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    session.select(Some(orange()), t0);
    session
        .backend_mut()
        .insert(sms("m6", "MTN", 60, "Transfer received"));

    let (outcome, priming) = session.switch(Some(mtn()), t0);
    assert_eq!(outcome, SwitchOutcome::Restored);
    assert!(priming.is_some());

    assert_eq!(
        session.refresh(t0, RefreshOrigin::Background),
        RefreshOutcome::Suppressed
    );
    assert!(!session.store().contains(&id("m6")));
}

#[test]
fn background_refresh_resumes_after_window() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    session.select(Some(orange()), t0);
    let (_, _priming) = session.switch(Some(mtn()), t0);

    let outcome = session.refresh(t0 + Duration::from_millis(500), RefreshOrigin::Background);

    assert!(matches!(outcome, RefreshOutcome::Merged { .. }));
}

#[test]
fn manual_refresh_is_never_suppressed() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    session.select(Some(orange()), t0);
    session
        .backend_mut()
        .insert(sms("m6", "MTN", 60, "Transfer received"));
    let (_, _priming) = session.switch(Some(mtn()), t0);

    let outcome = session.refresh(t0, RefreshOrigin::Manual);

    assert_eq!(outcome, RefreshOutcome::Merged { added: 1, updated: 1 });
    assert_eq!(ids(&session)[0], "m6");
    assert!(!session.pagination().is_suppressed(t0), "manual refresh ends suppression");
}

// ===== Refresh and new messages =====

#[test]
fn refresh_puts_new_messages_on_top_and_notifies() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    let subscription = session.subscribe();
    session
        .backend_mut()
        .insert(sms("m6", "MTN", 60, "Transfer received"));

    let outcome = session.refresh(later(t0, 1), RefreshOrigin::Background);

    assert_eq!(outcome, RefreshOutcome::Merged { added: 1, updated: 1 });
    assert_eq!(ids(&session), vec!["m6", "m5", "m4"]);
    assert!(session.new_message_ids().contains(&id("m6")));
    let event = subscription.try_next().expect("new message event");
    assert_eq!(event.messages.len(), 1);
}

#[test]
fn refresh_without_conversation_does_nothing() {
    let mut session = session();
    assert_eq!(
        session.refresh(Instant::now(), RefreshOrigin::Manual),
        RefreshOutcome::NoConversation
    );
}

#[test]
fn mark_visible_read_clears_at_most_a_batch() {
    let wide = ResolvedConfig {
        page_size: 20,
        ..config()
    };
    let mut session = DashboardSession::new(backend(), &wide);
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    for n in 6..=12 {
        session
            .backend_mut()
            .insert(sms(&format!("m{n}"), "MTN", n * 10, "Transfer received"));
    }
    session.refresh(later(t0, 1), RefreshOrigin::Manual);
    assert_eq!(session.new_message_ids().len(), 7);
    let visible: Vec<MessageId> = session.messages().iter().map(|m| m.id.clone()).collect();

    assert_eq!(session.mark_visible_read(&visible), MARK_READ_BATCH);
    assert_eq!(session.mark_visible_read(&visible), 2);
    assert!(session.new_message_ids().is_empty());
    assert_eq!(session.mark_read(&[id("m12")]), 0, "already read");
}

// ===== Filters =====

#[test]
fn filter_change_clears_cache_and_reloads() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(orange()), t0);
    session.select(Some(mtn()), t0);
    assert!(session.cache().has(&orange()));

    let changed = session.set_filters(Filters::none().with_search("balance"), t0);

    assert!(changed);
    assert!(session.cache().is_empty());
    assert!(ids(&session).is_empty(), "no MTN message mentions balance");

    session.select(Some(orange()), t0);
    assert_eq!(ids(&session), vec!["o2"]);
}

#[test]
fn setting_same_filters_is_a_no_op() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    let calls = session.backend_mut().call_count();

    assert!(!session.set_filters(Filters::none(), t0));
    assert_eq!(session.backend_mut().call_count(), calls);
}

// ===== Status workflow =====

#[test]
fn status_update_patches_in_place() {
    let mut session = session();
    session.select(Some(mtn()), Instant::now());

    let outcome = session.update_status(&id("m4"), Status::Approved);

    assert_eq!(outcome, StatusOutcome::Applied);
    assert_eq!(ids(&session), vec!["m5", "m4"]);
    let m4 = session.store().get(&id("m4")).unwrap();
    assert_eq!(m4.status, Status::Approved);
    assert_eq!(m4.status_display, "Approved");
    assert!(m4.status_changed_at.is_some());
}

#[test]
fn pending_is_not_user_selectable() {
    let mut session = session();
    session.select(Some(mtn()), Instant::now());
    let calls = session.backend_mut().call_count();

    assert_eq!(
        session.update_status(&id("m4"), Status::Pending),
        StatusOutcome::Refused
    );
    assert_eq!(session.backend_mut().call_count(), calls);
    assert_eq!(session.banner().current().unwrap().kind, BannerKind::Notice);
}

#[test]
fn locked_message_is_refused_locally() {
    let mut backend = backend();
    let mut locked = sms("m9", "MTN", 999, "Locked");
    locked.can_change_status = false;
    backend.insert(locked);
    let mut session = DashboardSession::new(backend, &config());
    session.select(Some(mtn()), Instant::now());
    let calls = session.backend_mut().call_count();

    let outcome = session.update_status(&id("m9"), Status::Approved);

    assert_eq!(outcome, StatusOutcome::Refused);
    assert_eq!(session.backend_mut().call_count(), calls);
    assert_eq!(session.store().get(&id("m9")).unwrap().status, Status::Pending);
}

#[test]
fn failed_status_update_leaves_message_untouched() {
    let mut session = session();
    session.select(Some(mtn()), Instant::now());
    session
        .backend_mut()
        .fail_next(FetchError::http(400, "Invalid transition"));

    let outcome = session.update_status(&id("m5"), Status::NoOrder);

    assert_eq!(
        outcome,
        StatusOutcome::Failed(FetchError::http(400, "Invalid transition"))
    );
    assert_eq!(session.store().get(&id("m5")).unwrap().status, Status::Pending);
    assert_eq!(
        session.banner().current().unwrap().message,
        "Invalid transition"
    );
}

// ===== Auth =====

#[test]
fn auth_failure_ends_session() {
    let mut session = session();
    let t0 = Instant::now();
    session.select(Some(orange()), t0);
    session.select(Some(mtn()), t0);
    session
        .backend_mut()
        .fail_next(AuthError::SessionExpired.into());

    let outcome = session.refresh(later(t0, 1), RefreshOrigin::Manual);

    assert!(matches!(outcome, RefreshOutcome::Failed(_)));
    assert!(session.is_logged_out());
    assert!(session.cache().is_empty());
    assert!(session.active_key().is_none());
    assert_eq!(
        session.banner().current().unwrap().kind,
        BannerKind::SessionExpired
    );
}

// ===== Token refresh =====

/// Refresher answering with a fixed result.
#[derive(Debug)]
struct ScriptedRefresher(Result<TokenPair, FetchError>);

impl TokenRefresher for ScriptedRefresher {
    fn refresh(&mut self, _refresh_token: &str) -> Result<TokenPair, FetchError> {
        self.0.clone()
    }
}

type SignedBackend = AuthenticatedBackend<FixtureBackend, ScriptedRefresher>;

fn signed_session(refresh: Result<TokenPair, FetchError>) -> DashboardSession<SignedBackend> {
    let mut fixture = backend();
    fixture.require_token("access-1");
    let auth = Authenticator::with_tokens(
        TokenPair::new("access-1", "refresh-1"),
        ScriptedRefresher(refresh),
    );
    DashboardSession::new(AuthenticatedBackend::new(fixture, auth), &config())
}

#[test]
fn expired_access_token_is_refreshed_and_request_retried_once() {
    let mut session = signed_session(Ok(TokenPair::new("access-2", "refresh-2")));
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);
    assert_eq!(session.messages().len(), 2);
    let calls = session.backend_mut().inner().call_count();

    session.backend_mut().inner_mut().require_token("access-2");
    let outcome = session.on_scroll(at_bottom(), later(t0, 1));

    assert_eq!(outcome, Some(LoadOutcome::Merged { added: 2, updated: 0 }));
    assert_eq!(session.backend_mut().inner().call_count(), calls + 2);
    let tokens = session.backend_mut().authenticator().tokens().cloned();
    assert_eq!(tokens, Some(TokenPair::new("access-2", "refresh-2")));
    assert!(!session.is_logged_out());
}

#[test]
fn failed_token_refresh_logs_out() {
    let mut session = signed_session(Err(FetchError::http(401, "refresh token expired")));
    let t0 = Instant::now();
    session.select(Some(mtn()), t0);

    session.backend_mut().inner_mut().require_token("access-2");
    let outcome = session.on_scroll(at_bottom(), later(t0, 1));

    assert_eq!(
        outcome,
        Some(LoadOutcome::Failed(AuthError::SessionExpired.into()))
    );
    assert!(session.is_logged_out());
    assert!(session.messages().is_empty());
    assert!(!session.backend_mut().authenticator().is_authenticated());
    assert_eq!(
        session.banner().current().unwrap().kind,
        BannerKind::SessionExpired
    );
}

// ===== Sidebar and pins =====

#[test]
fn sidebar_lists_pinned_senders_first() {
    let mut session = session();
    session.load_pins().unwrap();

    let rows = session.conversations(Channel::Sms).unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.summary.identity.as_str()).collect();
    assert_eq!(names, vec!["Orange", "MTN"]);
    assert!(rows[0].pinned);
}

#[test]
fn toggle_pin_round_trip() {
    let mut session = session();
    session.load_pins().unwrap();

    assert_eq!(session.toggle_pin(&sender("MTN")), Ok(true));
    assert!(session.pinned().contains(&sender("MTN")));

    assert_eq!(session.toggle_pin(&sender("MTN")), Ok(false));
    assert!(!session.pinned().contains(&sender("MTN")));
}

#[test]
fn pin_limit_is_enforced_locally() {
    let limited = ResolvedConfig {
        pinned_limit: Some(1),
        ..config()
    };
    let mut session = DashboardSession::new(backend(), &limited);
    session.load_pins().unwrap();
    let calls = session.backend_mut().call_count();

    assert_eq!(session.toggle_pin(&sender("MTN")), Ok(false));
    assert_eq!(session.backend_mut().call_count(), calls);
    assert_eq!(session.banner().current().unwrap().kind, BannerKind::Notice);
}

// ===== Expanded messages =====

#[test]
fn only_long_messages_can_be_expanded() {
    let mut backend = backend();
    backend.insert(sms("long", "MTN", 1_000, &"x".repeat(301)));
    let mut session = DashboardSession::new(backend, &config());
    session.select(Some(mtn()), Instant::now());

    assert_eq!(session.toggle_expanded(&id("long")), Some(true));
    assert!(session.prefs().is_expanded(&sender("MTN"), &id("long")));
    assert_eq!(session.toggle_expanded(&id("m5")), None, "short message");
    assert_eq!(session.toggle_expanded(&id("ghost")), None);
}
