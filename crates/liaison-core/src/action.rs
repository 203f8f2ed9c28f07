//! Action vocabulary accepted by the gateway.

use crate::ids::{EventId, UserId};
use crate::interaction::{InteractionKind, InteractionStatus, Metadata};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the target answers an open proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Decline,
    Ignore,
}

impl Decision {
    pub fn status(self) -> InteractionStatus {
        match self {
            Self::Accept => InteractionStatus::Accepted,
            Self::Decline => InteractionStatus::Declined,
            Self::Ignore => InteractionStatus::Ignored,
        }
    }
}

/// What an actor asks to do towards a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Visit,
    Interest,
    /// Upgrade of the actor's own open `Interest`; never standalone.
    SuperInterest,
    MeetRequest,
    Shortlist,
    Chat,
    ViewContact,
    Block,
    Report,
    /// Answer an open proposal addressed to the actor.
    Respond {
        decision: Decision,
        #[serde(default)]
        proposal_id: Option<EventId>,
    },
    /// Retract the actor's own open proposal.
    Withdraw {
        #[serde(default)]
        proposal_id: Option<EventId>,
    },
}

/// Coarse grouping used by the gateway's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFamily {
    Proposal,
    Response,
    FreeStanding,
}

impl Action {
    /// The event kind written for initiating actions.
    ///
    /// Responses and withdrawals reuse the kind of the proposal they close,
    /// so they have no kind of their own.
    pub fn kind(self) -> Option<InteractionKind> {
        match self {
            Self::Visit => Some(InteractionKind::Visit),
            Self::Interest => Some(InteractionKind::Interest),
            Self::SuperInterest => Some(InteractionKind::SuperInterest),
            Self::MeetRequest => Some(InteractionKind::MeetRequest),
            Self::Shortlist => Some(InteractionKind::Shortlist),
            Self::Chat => Some(InteractionKind::Chat),
            Self::ViewContact => Some(InteractionKind::ViewContact),
            Self::Block => Some(InteractionKind::Block),
            Self::Report => Some(InteractionKind::Report),
            Self::Respond { .. } | Self::Withdraw { .. } => None,
        }
    }

    pub fn family(self) -> ActionFamily {
        match self {
            Self::Interest | Self::SuperInterest | Self::MeetRequest => ActionFamily::Proposal,
            Self::Respond { .. } | Self::Withdraw { .. } => ActionFamily::Response,
            _ => ActionFamily::FreeStanding,
        }
    }

    /// Parses the CLI/collaborator spelling of an action.
    pub fn parse(name: &str) -> Option<Self> {
        let action = match name.to_ascii_lowercase().as_str() {
            "visit" => Self::Visit,
            "interest" => Self::Interest,
            "super_interest" => Self::SuperInterest,
            "meet_request" => Self::MeetRequest,
            "shortlist" => Self::Shortlist,
            "chat" => Self::Chat,
            "view_contact" => Self::ViewContact,
            "block" => Self::Block,
            "report" => Self::Report,
            "accept" => Self::Respond {
                decision: Decision::Accept,
                proposal_id: None,
            },
            "decline" => Self::Respond {
                decision: Decision::Decline,
                proposal_id: None,
            },
            "ignore" => Self::Respond {
                decision: Decision::Ignore,
                proposal_id: None,
            },
            "withdraw" => Self::Withdraw { proposal_id: None },
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Respond { decision, .. } => match decision {
                Decision::Accept => f.write_str("accept"),
                Decision::Decline => f.write_str("decline"),
                Decision::Ignore => f.write_str("ignore"),
            },
            Self::Withdraw { .. } => f.write_str("withdraw"),
            other => match other.kind() {
                Some(kind) => write!(f, "{kind}"),
                None => f.write_str("unknown"),
            },
        }
    }
}

/// A request to the gateway: `Execute(actor, target, action, metadata)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor: UserId,
    pub target: UserId,
    pub action: Action,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ActionRequest {
    pub fn new(actor: impl Into<UserId>, target: impl Into<UserId>, action: Action) -> Self {
        Self {
            actor: actor.into(),
            target: target.into(),
            action,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
