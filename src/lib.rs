//! SMS/push review dashboard client (smsview)
//!
//! Client-side state for reviewing SMS and push-notification messages grouped
//! into per-sender conversations: an order-preserving message store, a
//! per-conversation snapshot cache, scroll-driven pagination with stale-response
//! protection, and the status workflow.
//!
//! Pure Core / Impure Shell: `model`, `store` and `state` never perform I/O;
//! `backend`, `config` and `logging` do.

pub mod backend;
pub mod config;
pub mod logging;
pub mod model;
pub mod state;
pub mod store;
