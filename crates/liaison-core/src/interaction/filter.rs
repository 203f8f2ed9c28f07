//! Activity query filters.

use super::model::{InteractionEvent, InteractionKind, InteractionStatus};
use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of an event the queried user must be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The user initiated the event.
    Sent,
    /// The user was the target of the event.
    Received,
    #[default]
    Any,
}

/// Filter for `InteractionStore::query_actor` and `ListActivity`.
///
/// Empty `kinds`/`statuses` mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub kinds: Vec<InteractionKind>,
    #[serde(default)]
    pub statuses: Vec<InteractionStatus>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub counterpart: Option<UserId>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ActivityFilter {
    pub fn sent() -> Self {
        Self {
            direction: Direction::Sent,
            ..Self::default()
        }
    }

    pub fn received() -> Self {
        Self {
            direction: Direction::Received,
            ..Self::default()
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = InteractionKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = InteractionStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_counterpart(mut self, counterpart: UserId) -> Self {
        self.counterpart = Some(counterpart);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` belongs in `user`'s activity under this filter.
    pub fn matches(&self, user: &UserId, event: &InteractionEvent) -> bool {
        let is_sender = &event.actor_id == user;
        let is_target = &event.target_id == user;
        let side_ok = match self.direction {
            Direction::Sent => is_sender,
            Direction::Received => is_target,
            Direction::Any => is_sender || is_target,
        };
        if !side_ok {
            return false;
        }

        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&event.status) {
            return false;
        }
        if let Some(counterpart) = &self.counterpart {
            let other = if is_sender {
                &event.target_id
            } else {
                &event.actor_id
            };
            if other != counterpart {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        true
    }
}
