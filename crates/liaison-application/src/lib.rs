//! Application layer for Liaison.
//!
//! This crate provides the use cases that coordinate the domain and
//! infrastructure layers: the action gateway, relationship caching, real-time
//! fan-out and the `Coordinator` facade in front of them.

pub mod coordinator;
pub mod fanout;
pub mod gateway;
pub mod relationship_cache;

pub use coordinator::{ActivityView, Coordinator};
pub use fanout::{EventBus, SessionRegistry, SessionStream};
pub use gateway::ActionGateway;
pub use relationship_cache::RelationshipCache;
