//! Relationship domain module.
//!
//! `RelationshipState` is the single source of truth for "where do these two
//! participants stand"; every call site consults [`resolve`] instead of
//! re-deriving status from individual events.

mod resolver;
mod state;

pub use resolver::resolve;
pub use state::RelationshipState;
