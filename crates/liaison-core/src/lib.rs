//! Domain layer of the Liaison interaction and relationship coordination core.
//!
//! This crate holds the vocabulary (interactions, relationship states,
//! actions, coin accounts), the pure relationship resolver, and the traits
//! that infrastructure implements (`InteractionStore`, `Ledger`,
//! `IdentityProvider`). It performs no I/O.

pub mod action;
pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod interaction;
pub mod ledger;
pub mod notification;
pub mod relationship;

// Re-export common error type
pub use error::{CoreError, Result};
pub use ids::{ChannelId, EventId, PairKey, UserId};
