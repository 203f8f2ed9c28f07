//! Interaction store trait.
//!
//! Defines the interface for the durable, append-only interaction log.

use super::filter::ActivityFilter;
use super::model::{InteractionEvent, NewInteraction, ProposalFamily};
use crate::error::{CoreError, Result};
use crate::ids::{EventId, UserId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashSet;

/// An abstract, append-only store of interaction events.
///
/// # Implementation Notes
///
/// Implementations must:
/// - Serialize appends per participant pair and enforce the
///   "at most one open proposal per pair per family" invariant inside the
///   same critical section as the write (see [`check_proposal_slot`]).
/// - Stamp `created_at` and `sequence` strictly monotonically per store.
/// - Report infrastructure failures as `CoreError::TransientStoreFailure`.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Appends a new event and returns it as stored.
    ///
    /// # Errors
    ///
    /// - `DuplicateProposal` if the draft opens a proposal while another one of
    ///   the same family is open for the pair (and the draft does not
    ///   supersede it).
    /// - `TransientStoreFailure` if the write could not be persisted.
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent>;

    /// Returns every event between `a` and `b`, ordered by `(created_at, id)` ascending.
    async fn query_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<InteractionEvent>>;

    /// Returns `user`'s activity, newest first, restricted by `filter`.
    ///
    /// The sequence is produced lazily from a snapshot taken at call time.
    async fn query_actor(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, InteractionEvent>>;

    /// Looks up a single event by id.
    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<InteractionEvent>>;
}

/// Returns the proposals in `events` that are still open.
///
/// A proposal is open while it is `Pending` and no later event references it
/// through `responds_to` (a response, a withdrawal or a superseding upgrade).
/// `events` must be in pair order; the result keeps that order.
pub fn open_proposals(events: &[InteractionEvent]) -> Vec<&InteractionEvent> {
    let closed: HashSet<EventId> = events.iter().filter_map(|e| e.responds_to).collect();
    events
        .iter()
        .filter(|e| e.is_open_proposal_candidate() && !closed.contains(&e.id))
        .collect()
}

/// Returns the open proposal of `family`, if any.
pub fn open_proposal_in_family(
    events: &[InteractionEvent],
    family: ProposalFamily,
) -> Option<&InteractionEvent> {
    open_proposals(events)
        .into_iter()
        .rev()
        .find(|e| e.kind.proposal_family() == Some(family))
}

/// Enforces the single-open-proposal invariant for a draft about to be appended.
///
/// Stores call this with the pair's current history while holding the pair's
/// write lock.
pub fn check_proposal_slot(existing: &[InteractionEvent], new: &NewInteraction) -> Result<()> {
    if !new.opens_proposal() {
        return Ok(());
    }
    let Some(family) = new.kind.proposal_family() else {
        return Ok(());
    };
    match open_proposal_in_family(existing, family) {
        Some(open) if new.responds_to != Some(open.id) => Err(CoreError::DuplicateProposal {
            pair: new.pair().to_string(),
        }),
        _ => Ok(()),
    }
}

/// Stable pair ordering used by every store implementation.
pub fn sort_pair_events(events: &mut [InteractionEvent]) {
    events.sort_by_key(|e| e.order_key());
}
