//! Client-side message storage (pure).
//!
//! [`MessageStore`] holds the active conversation; [`ConversationCache`] holds
//! frozen snapshots of the others.

pub mod cache;
pub mod message_store;
pub mod notify;

pub use cache::{ConversationCache, ConversationSnapshot, PaginationCursor};
pub use message_store::{MergePosition, MergeReport, MessageStore, StoreSnapshot};
pub use notify::{NewMessageNotifier, NewMessages, Subscription};
