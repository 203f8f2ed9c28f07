//! Ledger domain module.
//!
//! The ledger is the only writer of coin balances. Every mutation goes
//! through `reserve`/`commit`/`rollback`/`credit`.

mod model;

pub use model::{LedgerAccount, ReservationState, ReservationToken};

use crate::error::Result;
use crate::ids::UserId;

/// Atomic per-user coin balance store with reservation semantics.
///
/// # Implementation Notes
///
/// - `reserve` must be atomic with respect to concurrent reservations for the
///   same user: two reservations that would jointly overdraw the account
///   result in exactly one success and one `InsufficientBalance`.
/// - `commit` is idempotent; `rollback` of a committed token is ignored.
/// - Operations are synchronous: they only wait on a per-user lock, so the
///   gateway can settle a reservation without an await point in between.
pub trait Ledger: Send + Sync {
    /// Holds `amount` coins for `user`.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if the available balance does not cover `amount`.
    fn reserve(&self, user: &UserId, amount: u64) -> Result<ReservationToken>;

    /// Converts a reservation into a permanent debit.
    fn commit(&self, token: &ReservationToken) -> Result<()>;

    /// Releases a reservation without changing the balance.
    fn rollback(&self, token: &ReservationToken) -> Result<()>;

    /// Adds coins (top-up or grant) and returns the updated account.
    fn credit(&self, user: &UserId, amount: u64) -> Result<LedgerAccount>;

    /// Returns the account, or an empty one for users never credited.
    fn account(&self, user: &UserId) -> LedgerAccount;

    fn balance(&self, user: &UserId) -> u64 {
        self.account(user).balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_invariant() {
        let mut account = LedgerAccount::empty(UserId::from("a"));
        assert!(account.is_consistent());

        account.total_received = 5;
        account.balance = 5;
        account.reserved = 2;
        assert!(account.is_consistent());
        assert_eq!(account.available(), 3);

        account.balance = 4;
        assert!(!account.is_consistent());
    }
}
