//! Interaction domain model.
//!
//! Interaction events are immutable once written. A response or withdrawal is
//! a new event that references the original through `responds_to`.

use crate::ids::{EventId, PairKey, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Open key-value payload attached to an interaction (e.g. requested service label).
///
/// The core never interprets it; recognized keys per kind are documented in
/// configuration (`[metadata]`), not in code branches.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// What kind of interaction an event records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InteractionKind {
    Visit,
    Interest,
    SuperInterest,
    Shortlist,
    Chat,
    MeetRequest,
    Block,
    Report,
    ViewContact,
}

/// Proposal slots: at most one open proposal per pair per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalFamily {
    /// `Interest` and `SuperInterest` share one slot.
    Interest,
    MeetRequest,
}

impl InteractionKind {
    /// Proposals require a response from the target.
    pub fn is_proposal(self) -> bool {
        self.proposal_family().is_some()
    }

    pub fn proposal_family(self) -> Option<ProposalFamily> {
        match self {
            Self::Interest | Self::SuperInterest => Some(ProposalFamily::Interest),
            Self::MeetRequest => Some(ProposalFamily::MeetRequest),
            _ => None,
        }
    }

    /// Whether events of this kind can influence the relationship state.
    ///
    /// `Visit`, `ViewContact`, `Chat` and `Report` only feed the ledger and the
    /// activity history.
    pub fn is_relational(self) -> bool {
        self.is_proposal() || matches!(self, Self::Block | Self::Shortlist)
    }
}

/// Lifecycle status of an event at write time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InteractionStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
    Ignored,
    Completed,
}

impl InteractionStatus {
    /// Accepted/Declined/Ignored are responses to a proposal.
    pub fn is_response(self) -> bool {
        matches!(self, Self::Accepted | Self::Declined | Self::Ignored)
    }
}

/// An interaction as submitted for append, before the store stamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub actor_id: UserId,
    pub target_id: UserId,
    pub kind: InteractionKind,
    pub status: InteractionStatus,
    pub cost: u64,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub responds_to: Option<EventId>,
}

impl NewInteraction {
    pub fn new(
        actor_id: UserId,
        target_id: UserId,
        kind: InteractionKind,
        status: InteractionStatus,
    ) -> Self {
        Self {
            actor_id,
            target_id,
            kind,
            status,
            cost: 0,
            metadata: Metadata::new(),
            responds_to: None,
        }
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn responding_to(mut self, event_id: EventId) -> Self {
        self.responds_to = Some(event_id);
        self
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.actor_id, &self.target_id)
    }

    /// Whether this draft would occupy a proposal slot once stored.
    pub fn opens_proposal(&self) -> bool {
        self.kind.is_proposal() && self.status == InteractionStatus::Pending
    }
}

/// A stored, immutable interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: EventId,
    /// Store-wide commit sequence, strictly increasing.
    pub sequence: u64,
    pub actor_id: UserId,
    pub target_id: UserId,
    pub kind: InteractionKind,
    pub status: InteractionStatus,
    pub cost: u64,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub responds_to: Option<EventId>,
    pub created_at: DateTime<Utc>,
}

impl InteractionEvent {
    /// Stamps a draft with identity and commit position.
    pub fn from_new(new: NewInteraction, sequence: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            sequence,
            actor_id: new.actor_id,
            target_id: new.target_id,
            kind: new.kind,
            status: new.status,
            cost: new.cost,
            metadata: new.metadata,
            responds_to: new.responds_to,
            created_at,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.actor_id, &self.target_id)
    }

    pub fn is_open_proposal_candidate(&self) -> bool {
        self.kind.is_proposal() && self.status == InteractionStatus::Pending
    }

    /// Canonical pair ordering key: `(created_at, id)`.
    pub fn order_key(&self) -> (DateTime<Utc>, EventId) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_interest_and_super_interest_share_a_family() {
        assert_eq!(
            InteractionKind::Interest.proposal_family(),
            InteractionKind::SuperInterest.proposal_family()
        );
        assert_ne!(
            InteractionKind::Interest.proposal_family(),
            InteractionKind::MeetRequest.proposal_family()
        );
        assert!(!InteractionKind::Chat.is_proposal());
    }

    #[test]
    fn test_kind_parses_from_snake_case() {
        assert_eq!(
            InteractionKind::from_str("super_interest").unwrap(),
            InteractionKind::SuperInterest
        );
        assert_eq!(
            InteractionKind::from_str("INTEREST").unwrap(),
            InteractionKind::Interest
        );
        assert_eq!(InteractionKind::ViewContact.to_string(), "view_contact");
    }

    #[test]
    fn test_non_relational_kinds() {
        for kind in [
            InteractionKind::Visit,
            InteractionKind::ViewContact,
            InteractionKind::Chat,
            InteractionKind::Report,
        ] {
            assert!(!kind.is_relational(), "{kind} should not be relational");
        }
        assert!(InteractionKind::Block.is_relational());
    }
}
