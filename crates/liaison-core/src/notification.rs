//! Domain notifications pushed to live sessions.

use crate::ids::{EventId, PairKey, UserId};
use crate::interaction::{InteractionEvent, InteractionKind, InteractionStatus};
use crate::relationship::RelationshipState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Published after every committed action, once per affected user.
///
/// Clients treat any notification as "something changed, refetch";
/// `relationship` is a convenience snapshot, not an authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient-local sequence; gaps mean notifications were dropped.
    pub user_sequence: u64,
    pub recipient: UserId,
    pub event_id: EventId,
    pub pair: PairKey,
    pub kind: InteractionKind,
    pub status: InteractionStatus,
    pub actor_id: UserId,
    pub target_id: UserId,
    pub occurred_at: DateTime<Utc>,
    /// The recipient's relationship state right after the commit.
    pub relationship: RelationshipState,
}

/// Recipient-independent part of a notification, built once per commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event: InteractionEvent,
    /// Freshly resolved state per affected user.
    pub relationships: Vec<(UserId, RelationshipState)>,
}

impl DomainEvent {
    pub fn affected_users(&self) -> Vec<UserId> {
        self.relationships.iter().map(|(user, _)| user.clone()).collect()
    }

    /// Materializes the notification for one recipient.
    pub fn notification_for(&self, recipient: &UserId, user_sequence: u64) -> Notification {
        let relationship = self
            .relationships
            .iter()
            .find(|(user, _)| user == recipient)
            .map(|(_, state)| *state)
            .unwrap_or_default();
        Notification {
            user_sequence,
            recipient: recipient.clone(),
            event_id: self.event.id,
            pair: self.event.pair(),
            kind: self.event.kind,
            status: self.event.status,
            actor_id: self.event.actor_id.clone(),
            target_id: self.event.target_id.clone(),
            occurred_at: self.event.created_at,
            relationship,
        }
    }
}
