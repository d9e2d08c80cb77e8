//! Tests for conversation switching.

use super::*;
use crate::backend::Page;
use crate::model::{Identity, Message, MessageId, MessageKind};
use crate::state::pagination::{LoadOutcome, ScrollMetrics};
use crate::store::MergePosition;
use chrono::{TimeZone, Utc};

// ===== Test Helpers =====

fn sms(identity: &str) -> ConversationKey {
    ConversationKey::sms(Identity::new(identity).unwrap())
}

fn push(identity: &str) -> ConversationKey {
    ConversationKey::push(Identity::new(identity).unwrap())
}

fn msg(uid: &str, ts: i64) -> Message {
    Message::new(
        MessageId::new(uid).unwrap(),
        Utc.timestamp_opt(ts, 0).unwrap(),
        "body",
        MessageKind::Sms {
            sender: Identity::new("MTN").unwrap(),
            sms_type: String::new(),
            extracted: None,
        },
    )
}

fn switcher() -> ConversationSwitcher {
    ConversationSwitcher::new(PaginationConfig::default(), DEFAULT_RESTORE_SUPPRESSION)
}

fn order(switcher: &ConversationSwitcher) -> Vec<String> {
    switcher
        .store()
        .order()
        .map(|id| id.as_str().to_string())
        .collect()
}

/// Open `key` fresh and complete its page 1 with `messages`.
fn open_with(
    switcher: &mut ConversationSwitcher,
    key: ConversationKey,
    messages: Vec<Message>,
    has_next: bool,
    now: Instant,
) {
    assert_eq!(switcher.switch_to(Some(key), now), SwitchOutcome::Fresh);
    let request = switcher.pagination_mut().begin_initial(false).unwrap();
    let (store, pagination) = switcher.parts_mut();
    let outcome = pagination.complete(&request, Ok(Page { messages, has_next }), store, now);
    assert!(matches!(outcome, LoadOutcome::Merged { .. }));
}

fn scrolled_to(offset: f64) -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: offset,
        scroll_height: 100_000.0,
        client_height: 500.0,
    }
}

// ===== Tests =====

#[test]
fn first_selection_starts_fresh() {
    let mut switcher = switcher();
    let outcome = switcher.switch_to(Some(sms("MTN")), Instant::now());

    assert_eq!(outcome, SwitchOutcome::Fresh);
    assert!(outcome.needs_initial_load());
    assert_eq!(switcher.active_key(), Some(&sms("MTN")));
    assert!(switcher.store().is_empty());
    assert!(switcher.cache().is_empty());
}

#[test]
fn switching_saves_outgoing_conversation() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 2), msg("b", 1)], true, now);

    switcher.switch_to(Some(sms("Orange")), now);

    assert!(switcher.cache().has(&sms("MTN")));
    assert!(switcher.store().is_empty());
    let saved = switcher.cache().load(&sms("MTN")).unwrap();
    assert_eq!(saved.store.len(), 2);
    assert_eq!(saved.cursor, PaginationCursor { page: 1, has_more: true });
}

#[test]
fn switching_away_and_back_restores_order_scroll_and_cursor() {
    let mut switcher = switcher();
    let t0 = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 30), msg("b", 20)], true, t0);
    switcher
        .store_mut()
        .merge(vec![msg("z", 99)], MergePosition::Top);
    switcher.pagination_mut().on_scroll(scrolled_to(740.0), t0);
    let order_before = order(&switcher);
    let cursor_before = switcher.pagination().cursor();

    switcher.switch_to(Some(sms("Orange")), t0);
    let outcome = switcher.switch_to(Some(sms("MTN")), t0);

    assert_eq!(outcome, SwitchOutcome::Restored);
    assert_eq!(order(&switcher), order_before);
    assert_eq!(switcher.pagination().cursor(), cursor_before);
    assert_eq!(switcher.pagination().scroll_offset(), 740.0);
    assert!(
        switcher.store().new_message_ids().is_empty(),
        "restore starts with nothing flagged new"
    );
}

#[test]
fn restore_suppresses_until_window_ends() {
    let mut switcher = switcher();
    let t0 = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 1)], true, t0);
    switcher.switch_to(Some(sms("Orange")), t0);

    switcher.switch_to(Some(sms("MTN")), t0);

    assert!(switcher.pagination().is_suppressed(t0));
    assert!(!switcher
        .pagination()
        .is_suppressed(t0 + DEFAULT_RESTORE_SUPPRESSION));
}

#[test]
fn fresh_open_is_not_suppressed() {
    let mut switcher = switcher();
    let t0 = Instant::now();
    switcher.switch_to(Some(sms("MTN")), t0);
    assert!(!switcher.pagination().is_suppressed(t0));
}

#[test]
fn selecting_active_conversation_is_a_no_op() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 1)], false, now);

    assert_eq!(
        switcher.switch_to(Some(sms("MTN")), now),
        SwitchOutcome::Unchanged
    );
    assert_eq!(order(&switcher), vec!["a"]);
    assert!(switcher.cache().is_empty());
}

#[test]
fn same_identity_on_other_channel_is_a_different_conversation() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("Wave"), vec![msg("a", 1)], false, now);

    let outcome = switcher.switch_to(Some(push("Wave")), now);

    assert_eq!(outcome, SwitchOutcome::Fresh);
    assert!(switcher.store().is_empty());
    assert!(switcher.cache().has(&sms("Wave")));
}

#[test]
fn deselect_saves_then_clears() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 1)], true, now);

    let outcome = switcher.switch_to(None, now);

    assert_eq!(outcome, SwitchOutcome::Deselected);
    assert!(!outcome.needs_initial_load());
    assert_eq!(switcher.active_key(), None);
    assert!(switcher.store().is_empty());
    assert!(!switcher.pagination().has_more());
    assert!(switcher.cache().has(&sms("MTN")));
}

#[test]
fn live_mutation_after_switch_back_does_not_alter_cache() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 1)], false, now);
    switcher.switch_to(Some(sms("Orange")), now);
    switcher.switch_to(Some(sms("MTN")), now);

    switcher
        .store_mut()
        .merge(vec![msg("b", 2)], MergePosition::Top);

    assert_eq!(switcher.cache().load(&sms("MTN")).unwrap().store.len(), 1);
}

#[test]
fn invalidate_all_clears_cache_and_restarts_active() {
    let mut switcher = switcher();
    let now = Instant::now();
    open_with(&mut switcher, sms("MTN"), vec![msg("a", 1)], true, now);
    switcher.switch_to(Some(sms("Orange")), now);
    open_with(&mut switcher, sms("Moov"), vec![msg("m", 1)], true, now);

    assert!(switcher.invalidate_all());

    assert!(switcher.cache().is_empty());
    assert!(switcher.store().is_empty());
    assert_eq!(switcher.active_key(), Some(&sms("Moov")));
    assert_eq!(switcher.pagination().cursor(), PaginationCursor::initial());
}

#[test]
fn invalidate_all_without_active_conversation() {
    let mut switcher = switcher();
    assert!(!switcher.invalidate_all());
}
