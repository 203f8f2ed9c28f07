//! Transition rules of the action gateway.
//!
//! Everything here is a pure function of the pair history and the request,
//! evaluated while the gateway holds the pair lock.

use liaison_core::action::{Action, ActionFamily, ActionRequest};
use liaison_core::config::CostSchedule;
use liaison_core::interaction::{
    InteractionEvent, InteractionKind, InteractionStatus, NewInteraction, ProposalFamily,
    open_proposal_in_family, open_proposals,
};
use liaison_core::relationship::{RelationshipState, resolve};
use liaison_core::{CoreError, EventId, PairKey, Result, UserId};

/// Both participants' view of the pair before the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairView {
    pub actor: RelationshipState,
    pub target: RelationshipState,
}

impl PairView {
    pub fn resolve(events: &[InteractionEvent], actor: &UserId, target: &UserId) -> Self {
        Self {
            actor: resolve(events, actor),
            target: resolve(events, target),
        }
    }

    /// A block by either participant.
    pub fn is_blocked(&self) -> bool {
        self.actor == RelationshipState::Blocked || self.target == RelationshipState::Blocked
    }
}

/// Validates `request` against the pair history and builds the event to append.
///
/// The returned draft carries the cost to reserve.
///
/// # Errors
///
/// - `InvalidTransition` when the action is not legal in the current state
/// - `DuplicateProposal` when the actor already has an open proposal of the family
/// - `NoPendingProposal` when a response or withdrawal has nothing to close
/// - `NotAuthorizedForAction` when the actor is on the wrong side of the proposal
pub fn plan(
    request: &ActionRequest,
    events: &[InteractionEvent],
    costs: &CostSchedule,
) -> Result<NewInteraction> {
    let action = request.action;
    if request.actor == request.target {
        return Err(CoreError::invalid_transition(action, "self"));
    }

    let view = PairView::resolve(events, &request.actor, &request.target);
    tracing::debug!(
        actor = %request.actor,
        target = %request.target,
        %action,
        actor_state = %view.actor,
        target_state = %view.target,
        "Validating action"
    );

    let draft = match action.family() {
        ActionFamily::FreeStanding => plan_free_standing(request, events, view, costs)?,
        ActionFamily::Proposal => plan_proposal(request, events, view, costs)?,
        ActionFamily::Response => plan_response(request, events, view)?,
    };
    Ok(draft.with_metadata(request.metadata.clone()))
}

fn plan_free_standing(
    request: &ActionRequest,
    events: &[InteractionEvent],
    view: PairView,
    costs: &CostSchedule,
) -> Result<NewInteraction> {
    let kind = initiating_kind(request.action)?;

    let allowed_when_blocked = matches!(
        kind,
        InteractionKind::Visit | InteractionKind::Report | InteractionKind::Block
    );
    if view.is_blocked() && !allowed_when_blocked {
        return Err(CoreError::invalid_transition(
            request.action,
            RelationshipState::Blocked,
        ));
    }

    if kind == InteractionKind::Chat
        && view.actor != RelationshipState::Accepted
        && !conversation_exists(events, &request.actor, &request.target)
    {
        return Err(CoreError::invalid_transition(request.action, view.actor));
    }

    let status = if kind == InteractionKind::Block {
        InteractionStatus::Blocked
    } else {
        InteractionStatus::Completed
    };
    Ok(draft(request, kind, status).with_cost(costs.cost_of(kind)))
}

fn plan_proposal(
    request: &ActionRequest,
    events: &[InteractionEvent],
    view: PairView,
    costs: &CostSchedule,
) -> Result<NewInteraction> {
    let kind = initiating_kind(request.action)?;
    if view.is_blocked() {
        return Err(CoreError::invalid_transition(
            request.action,
            RelationshipState::Blocked,
        ));
    }

    if kind == InteractionKind::SuperInterest {
        // Only an upgrade of the actor's own open interest.
        return match open_proposal_in_family(events, ProposalFamily::Interest) {
            Some(open) if open.actor_id == request.actor && open.kind == InteractionKind::Interest => {
                Ok(draft(request, kind, InteractionStatus::Pending)
                    .with_cost(costs.cost_of(kind))
                    .responding_to(open.id))
            }
            _ => Err(CoreError::invalid_transition(request.action, view.actor)),
        };
    }

    let family = kind
        .proposal_family()
        .ok_or_else(|| CoreError::internal(format!("{kind} is not a proposal")))?;
    if let Some(open) = open_proposal_in_family(events, family) {
        if open.actor_id == request.actor {
            return Err(CoreError::DuplicateProposal {
                pair: PairKey::new(&request.actor, &request.target).to_string(),
            });
        }
    }
    if !view.actor.allows_proposal() {
        return Err(CoreError::invalid_transition(request.action, view.actor));
    }

    Ok(draft(request, kind, InteractionStatus::Pending).with_cost(costs.cost_of(kind)))
}

fn plan_response(
    request: &ActionRequest,
    events: &[InteractionEvent],
    view: PairView,
) -> Result<NewInteraction> {
    if view.is_blocked() {
        return Err(CoreError::invalid_transition(
            request.action,
            RelationshipState::Blocked,
        ));
    }

    let pair = || PairKey::new(&request.actor, &request.target).to_string();
    let open = open_proposals(events);

    match request.action {
        Action::Respond {
            decision,
            proposal_id,
        } => {
            let proposal = pick_proposal(&open, proposal_id, |p| p.target_id == request.actor)
                .ok_or_else(|| CoreError::NoPendingProposal { pair: pair() })?;
            if proposal.target_id != request.actor {
                return Err(CoreError::not_authorized(
                    request.actor.as_str(),
                    request.action,
                ));
            }
            Ok(draft(request, proposal.kind, decision.status()).responding_to(proposal.id))
        }
        Action::Withdraw { proposal_id } => {
            let proposal = pick_proposal(&open, proposal_id, |p| p.actor_id == request.actor)
                .ok_or_else(|| CoreError::NoPendingProposal { pair: pair() })?;
            if proposal.actor_id != request.actor {
                return Err(CoreError::not_authorized(
                    request.actor.as_str(),
                    request.action,
                ));
            }
            Ok(draft(request, proposal.kind, InteractionStatus::Completed).responding_to(proposal.id))
        }
        other => Err(CoreError::internal(format!("{other} is not a response"))),
    }
}

/// Selects the proposal a response or withdrawal closes.
///
/// An explicit id must name an open proposal. Without one, the newest open
/// proposal on the actor's side wins, then any open proposal (so the caller
/// gets `NotAuthorizedForAction` rather than `NoPendingProposal` when the
/// proposal exists but belongs to the other side).
fn pick_proposal<'a>(
    open: &[&'a InteractionEvent],
    proposal_id: Option<EventId>,
    on_actor_side: impl Fn(&InteractionEvent) -> bool,
) -> Option<&'a InteractionEvent> {
    match proposal_id {
        Some(id) => open.iter().copied().find(|p| p.id == id),
        None => open
            .iter()
            .rev()
            .copied()
            .find(|p| on_actor_side(p))
            .or_else(|| open.last().copied()),
    }
}

/// Both participants have already written in this conversation.
fn conversation_exists(events: &[InteractionEvent], actor: &UserId, target: &UserId) -> bool {
    let chatted = |user: &UserId| {
        events
            .iter()
            .any(|e| e.kind == InteractionKind::Chat && &e.actor_id == user)
    };
    chatted(actor) && chatted(target)
}

fn initiating_kind(action: Action) -> Result<InteractionKind> {
    action
        .kind()
        .ok_or_else(|| CoreError::internal(format!("{action} has no interaction kind")))
}

fn draft(request: &ActionRequest, kind: InteractionKind, status: InteractionStatus) -> NewInteraction {
    NewInteraction::new(request.actor.clone(), request.target.clone(), kind, status)
}
