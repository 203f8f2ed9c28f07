//! Ledger domain model.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's coin account.
///
/// Invariant: `balance == total_received - total_used`, and `reserved <= balance`.
/// Reservations hold coins without changing `balance`; only a commit debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub user_id: UserId,
    pub balance: u64,
    /// Coins held by uncommitted reservations.
    #[serde(default)]
    pub reserved: u64,
    pub total_received: u64,
    pub total_used: u64,
}

impl LedgerAccount {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            reserved: 0,
            total_received: 0,
            total_used: 0,
        }
    }

    /// Coins that a new reservation may still claim.
    pub fn available(&self) -> u64 {
        self.balance.saturating_sub(self.reserved)
    }

    /// Checks the audit invariant.
    pub fn is_consistent(&self) -> bool {
        self.total_received.checked_sub(self.total_used) == Some(self.balance)
            && self.reserved <= self.balance
    }
}

/// Handle for coins held by `Ledger::reserve`.
///
/// Settled exactly once by `commit` or `rollback`; committing twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub amount: u64,
}

impl ReservationToken {
    pub fn new(user_id: UserId, amount: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
        }
    }
}

/// Where a reservation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationState {
    Held,
    Committed,
    RolledBack,
}
