//! Pure relationship resolution.

use super::state::RelationshipState;
use crate::ids::{EventId, UserId};
use crate::interaction::{InteractionEvent, InteractionKind, InteractionStatus};
use std::collections::HashSet;

/// Folds a pair's interaction history into the viewer's relationship state.
///
/// `events` must be the pair's history in `(created_at, id)` ascending order,
/// as returned by `InteractionStore::query_pair`. The function is pure: the
/// same sequence and viewer always yield the same state.
///
/// The scan runs from the newest event backwards:
/// - a `Block` by the viewer resolves to `Blocked`; a block by the other
///   party is invisible to the viewer, who keeps their prior state;
/// - `Accepted` resolves to `Accepted`, `Declined` to `DeclinedByMe` or
///   `DeclinedByThem` depending on who declined;
/// - `Ignored` resolves to `Ignored` for the ignorer and silently closes the
///   proposal for the proposer;
/// - withdrawals and superseding upgrades close the proposal they reference;
/// - an open `Pending` proposal resolves to `InterestSent`/`InterestReceived`.
///
/// Without any of the above the state is `Shortlisted` if the viewer has
/// shortlisted the other participant, otherwise `None`.
pub fn resolve(events: &[InteractionEvent], viewer: &UserId) -> RelationshipState {
    let mut closed: HashSet<EventId> = HashSet::new();
    let mut shortlisted = false;

    for event in events.iter().rev() {
        let viewer_is_actor = &event.actor_id == viewer;

        if event.kind == InteractionKind::Block {
            if viewer_is_actor {
                return RelationshipState::Blocked;
            }
            continue;
        }

        match event.status {
            InteractionStatus::Accepted => return RelationshipState::Accepted,
            InteractionStatus::Declined => {
                return if viewer_is_actor {
                    RelationshipState::DeclinedByMe
                } else {
                    RelationshipState::DeclinedByThem
                };
            }
            InteractionStatus::Ignored => {
                if viewer_is_actor {
                    return RelationshipState::Ignored;
                }
                if let Some(proposal) = event.responds_to {
                    closed.insert(proposal);
                }
                continue;
            }
            _ => {}
        }

        if event.kind.is_proposal() && event.status == InteractionStatus::Pending {
            if !closed.contains(&event.id) {
                return if viewer_is_actor {
                    RelationshipState::InterestSent
                } else {
                    RelationshipState::InterestReceived
                };
            }
            // A superseded proposal may itself supersede an older one.
            if let Some(previous) = event.responds_to {
                closed.insert(previous);
            }
            continue;
        }

        if let Some(proposal) = event.responds_to {
            closed.insert(proposal);
        }

        if event.kind == InteractionKind::Shortlist && viewer_is_actor {
            shortlisted = true;
        }
    }

    if shortlisted {
        RelationshipState::Shortlisted
    } else {
        RelationshipState::None
    }
}
