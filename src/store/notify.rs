//! New-message notifications.
//!
//! A top merge posts a [`NewMessages`] event onto every live subscription's
//! queue. Posting never blocks and never runs subscriber code inside the merge;
//! the event loop drains its [`Subscription`] on its next turn. Dropping a
//! `Subscription` ends it; the notifier prunes it on the next publish.

use crate::model::Message;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Messages that were inserted at the top of a store by one merge.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessages {
    /// The inserted messages, newest first.
    pub messages: Vec<Message>,
}

/// Fan-out of [`NewMessages`] events to subscriptions.
#[derive(Debug, Default)]
pub struct NewMessageNotifier {
    subscribers: Vec<Sender<NewMessages>>,
}

impl NewMessageNotifier {
    /// Create a notifier without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription. Events published after this call are queued on it.
    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Queue `messages` on every live subscription.
    ///
    /// Subscriptions whose receiving half was dropped are removed.
    pub fn publish(&mut self, messages: &[Message]) {
        if messages.is_empty() || self.subscribers.is_empty() {
            return;
        }
        let event = NewMessages {
            messages: messages.to_vec(),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Number of subscriptions that have not been observed as dropped yet.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of a new-message subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<NewMessages>,
}

impl Subscription {
    /// Take the next queued event without waiting.
    pub fn try_next(&self) -> Option<NewMessages> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<NewMessages> {
        self.rx.try_iter().collect()
    }
}
