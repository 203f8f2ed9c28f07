use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Canonical relationship status between a viewer and another participant.
///
/// Always derived from the immutable interaction history by
/// [`resolve`](super::resolve); never stored as a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipState {
    None,
    InterestSent,
    InterestReceived,
    Accepted,
    DeclinedByMe,
    DeclinedByThem,
    Blocked,
    Shortlisted,
    Ignored,
}

impl RelationshipState {
    /// The state the other participant sees, for the symmetric states.
    ///
    /// `Blocked`, `Shortlisted` and `Ignored` are one-sided and have no mirror.
    pub fn mirror(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::None),
            Self::InterestSent => Some(Self::InterestReceived),
            Self::InterestReceived => Some(Self::InterestSent),
            Self::Accepted => Some(Self::Accepted),
            Self::DeclinedByMe => Some(Self::DeclinedByThem),
            Self::DeclinedByThem => Some(Self::DeclinedByMe),
            Self::Blocked | Self::Shortlisted | Self::Ignored => None,
        }
    }

    /// States from which the viewer may open a new proposal.
    pub fn allows_proposal(self) -> bool {
        matches!(
            self,
            Self::None | Self::DeclinedByMe | Self::Shortlisted | Self::Ignored
        )
    }
}

impl Default for RelationshipState {
    fn default() -> Self {
        Self::None
    }
}
