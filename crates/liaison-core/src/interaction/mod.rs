//! Interaction domain module.
//!
//! # Module Structure
//!
//! - `model`: immutable interaction events and their vocabulary
//! - `filter`: activity query filters
//! - `store`: the `InteractionStore` trait and proposal-slot helpers

mod filter;
mod model;
mod store;

pub use filter::{ActivityFilter, Direction};
pub use model::{
    InteractionEvent, InteractionKind, InteractionStatus, Metadata, NewInteraction,
    ProposalFamily,
};
pub use store::{
    InteractionStore, check_proposal_slot, open_proposal_in_family, open_proposals,
    sort_pair_events,
};
