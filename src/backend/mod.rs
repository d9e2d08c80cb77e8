//! Backend collaborator (impure shell).
//!
//! The dashboard core never talks HTTP itself. Everything it needs from the REST
//! backend goes through [`Backend`]; [`FixtureBackend`] serves the same contract
//! from a JSON file for the CLI and for tests.

pub mod auth;
pub mod fixture;

pub use auth::{AuthenticatedBackend, Authenticator, BearerSigned, TokenPair, TokenRefresher};
pub use fixture::{FixtureBackend, FixtureData};

use crate::model::{
    Channel, ConversationKey, ConversationSummary, FetchError, Identity, Message, MessageId,
    Status,
};
use crate::model::wire::PinAck;
use crate::state::filters::Filters;

/// Arguments of one message list request. Results are always newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Conversation to list.
    pub key: ConversationKey,
    /// Search/status filters.
    pub filters: Filters,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub page_size: u32,
}

/// One page of messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Messages on the page, newest first.
    pub messages: Vec<Message>,
    /// Whether the server reports a further page.
    pub has_next: bool,
}

/// Operations consumed from the REST backend.
///
/// Calls are blocking from the caller's point of view; a response that arrives
/// after the user moved on is dropped by the pagination state machine, not here.
pub trait Backend {
    /// List one page of a conversation's messages.
    fn list_messages(&mut self, query: &ListQuery) -> Result<Page, FetchError>;

    /// Change the review status of a message. Returns the updated message.
    fn update_status(
        &mut self,
        channel: Channel,
        id: &MessageId,
        status: Status,
    ) -> Result<Message, FetchError>;

    /// List conversations of one channel with their counts.
    fn list_conversations(&mut self, channel: Channel)
        -> Result<Vec<ConversationSummary>, FetchError>;

    /// Pin an SMS sender.
    fn pin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError>;

    /// Unpin an SMS sender.
    fn unpin_sender(&mut self, sender: &Identity) -> Result<PinAck, FetchError>;

    /// Pinned SMS senders in display order.
    fn list_pinned(&mut self) -> Result<Vec<Identity>, FetchError>;
}
