//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod conversation;
pub mod error;
pub mod identifiers;
pub mod message;
pub mod wire;

// Re-export for convenience
pub use conversation::{Channel, ConversationKey, ConversationSummary, InvalidChannel};
pub use error::{AppError, AuthError, FetchError};
pub use identifiers::{Identity, InvalidIdentity, InvalidMessageId, MessageId};
pub use message::{ExtractedData, Message, MessageKind, MessagePatch, Status};
