//! In-memory ledger with TOML snapshot persistence.

use crate::storage::AtomicTomlFile;
use dashmap::DashMap;
use liaison_core::ledger::{Ledger, LedgerAccount, ReservationState, ReservationToken};
use liaison_core::{CoreError, Result, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// How many settled reservation ids are remembered for idempotent
/// commit/rollback. Older ids are forgotten and report `NotFound`.
const SETTLED_CAPACITY: usize = 4096;

/// Outcomes of recently settled reservations, oldest evicted first.
#[derive(Default)]
struct SettledReservations {
    states: HashMap<Uuid, ReservationState>,
    order: VecDeque<Uuid>,
}

impl SettledReservations {
    fn record(&mut self, id: Uuid, state: ReservationState) {
        if self.states.insert(id, state).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > SETTLED_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    fn get(&self, id: &Uuid) -> Option<ReservationState> {
        self.states.get(id).copied()
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}

/// Ledger keeping accounts and reservations in concurrent maps.
///
/// Each account lives in its own map slot, so operations on one user only
/// contend with other operations on users hashed to the same shard. When both
/// maps are needed, `reservations` is locked before `accounts`, and `settled`
/// last.
///
/// Only held reservations stay in `reservations`; a settled one moves to a
/// bounded log so a repeated commit or rollback still gets the same answer.
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: DashMap<UserId, LedgerAccount>,
    reservations: DashMap<Uuid, (ReservationToken, ReservationState)>,
    settled: Mutex<SettledReservations>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a snapshot.
    ///
    /// # Errors
    ///
    /// `Serialization` if an account violates `balance == total_received - total_used`.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        let ledger = Self::new();
        for mut account in snapshot.accounts {
            account.reserved = 0;
            if !account.is_consistent() {
                return Err(CoreError::Serialization {
                    format: "TOML".to_string(),
                    message: format!("inconsistent ledger account '{}'", account.user_id),
                });
            }
            ledger.accounts.insert(account.user_id.clone(), account);
        }
        Ok(ledger)
    }

    /// Captures every account; held reservations are not part of a snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut accounts: Vec<LedgerAccount> = self
            .accounts
            .iter()
            .map(|entry| LedgerAccount {
                reserved: 0,
                ..entry.value().clone()
            })
            .collect();
        accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        LedgerSnapshot { accounts }
    }

    /// Re-applies debits the journal recorded but the snapshot missed.
    ///
    /// `charged` holds, per actor, the coins charged by every journaled
    /// event. An account whose `total_used` is behind that figure was saved
    /// before a crash lost later debits; it is debited the difference.
    /// Returns the users whose accounts changed.
    ///
    /// # Errors
    ///
    /// `Serialization` if the missing debits exceed the account's balance.
    pub fn reconcile_usage(&self, charged: &HashMap<UserId, u64>) -> Result<Vec<UserId>> {
        let mut adjusted = Vec::new();
        for (user, &used) in charged {
            if used == 0 {
                continue;
            }
            let mut account = self
                .accounts
                .entry(user.clone())
                .or_insert_with(|| LedgerAccount::empty(user.clone()));

            if used < account.total_used {
                tracing::warn!(
                    user_id = %user,
                    journal = used,
                    ledger = account.total_used,
                    "Ledger records more usage than the journal"
                );
                continue;
            }
            let missing = used - account.total_used;
            if missing == 0 {
                continue;
            }
            if account.available() < missing {
                return Err(CoreError::Serialization {
                    format: "journal".to_string(),
                    message: format!(
                        "journal charges {} coins to '{}' but only {} are available",
                        missing,
                        user,
                        account.available()
                    ),
                });
            }
            account.balance -= missing;
            account.total_used = used;
            tracing::warn!(user_id = %user, missing, balance = account.balance, "Recovered unsaved debits");
            adjusted.push(user.clone());
        }
        adjusted.sort();
        Ok(adjusted)
    }

    /// Reservations not yet committed or rolled back.
    pub fn held_reservations(&self) -> usize {
        self.reservations
            .iter()
            .filter(|entry| entry.value().1 == ReservationState::Held)
            .count()
    }

    fn unknown_token(token: &ReservationToken) -> CoreError {
        CoreError::not_found("reservation", token.id.to_string())
    }

    fn settled_state(&self, token: &ReservationToken) -> Result<ReservationState> {
        self.settled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&token.id)
            .ok_or_else(|| Self::unknown_token(token))
    }

    /// Moves a reservation out of the live map once its state is final.
    fn settle(&self, token: &ReservationToken, state: ReservationState) {
        self.settled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(token.id, state);
    }

    /// `Ok(true)` when a reservation in `state` still has to be debited.
    fn should_commit(state: ReservationState, token: &ReservationToken) -> Result<bool> {
        match state {
            ReservationState::Held => Ok(true),
            ReservationState::Committed => Ok(false),
            ReservationState::RolledBack => Err(CoreError::internal(format!(
                "reservation {} was already rolled back",
                token.id
            ))),
        }
    }

    /// `true` when a reservation in `state` still has to be released.
    fn should_rollback(state: ReservationState, token: &ReservationToken) -> bool {
        match state {
            ReservationState::Held => true,
            ReservationState::RolledBack => false,
            ReservationState::Committed => {
                tracing::warn!(reservation = %token.id, "Ignoring rollback of committed reservation");
                false
            }
        }
    }
}

impl Ledger for InMemoryLedger {
    fn reserve(&self, user: &UserId, amount: u64) -> Result<ReservationToken> {
        if amount > 0 {
            let Some(mut account) = self.accounts.get_mut(user) else {
                return Err(CoreError::InsufficientBalance {
                    user_id: user.to_string(),
                    required: amount,
                    available: 0,
                });
            };
            let available = account.available();
            if available < amount {
                return Err(CoreError::InsufficientBalance {
                    user_id: user.to_string(),
                    required: amount,
                    available,
                });
            }
            account.reserved += amount;
        }

        let token = ReservationToken::new(user.clone(), amount);
        self.reservations
            .insert(token.id, (token.clone(), ReservationState::Held));
        tracing::debug!(user_id = %user, amount, reservation = %token.id, "Reserved coins");
        Ok(token)
    }

    fn commit(&self, token: &ReservationToken) -> Result<()> {
        let Some(mut reservation) = self.reservations.get_mut(&token.id) else {
            Self::should_commit(self.settled_state(token)?, token)?;
            return Ok(());
        };
        if !Self::should_commit(reservation.1, token)? {
            return Ok(());
        }

        if token.amount > 0 {
            let mut account = self
                .accounts
                .get_mut(&token.user_id)
                .ok_or_else(|| CoreError::not_found("ledger account", token.user_id.to_string()))?;
            account.reserved -= token.amount;
            account.balance -= token.amount;
            account.total_used += token.amount;
        }
        reservation.1 = ReservationState::Committed;
        self.settle(token, ReservationState::Committed);
        drop(reservation);
        self.reservations.remove(&token.id);

        tracing::debug!(user_id = %token.user_id, amount = token.amount, reservation = %token.id, "Committed reservation");
        Ok(())
    }

    fn rollback(&self, token: &ReservationToken) -> Result<()> {
        let Some(mut reservation) = self.reservations.get_mut(&token.id) else {
            Self::should_rollback(self.settled_state(token)?, token);
            return Ok(());
        };
        if !Self::should_rollback(reservation.1, token) {
            return Ok(());
        }

        if token.amount > 0 {
            if let Some(mut account) = self.accounts.get_mut(&token.user_id) {
                account.reserved -= token.amount;
            }
        }
        reservation.1 = ReservationState::RolledBack;
        self.settle(token, ReservationState::RolledBack);
        drop(reservation);
        self.reservations.remove(&token.id);

        tracing::warn!(user_id = %token.user_id, amount = token.amount, reservation = %token.id, "Rolled back reservation");
        Ok(())
    }

    fn credit(&self, user: &UserId, amount: u64) -> Result<LedgerAccount> {
        let mut account = self
            .accounts
            .entry(user.clone())
            .or_insert_with(|| LedgerAccount::empty(user.clone()));

        let (Some(balance), Some(total_received)) = (
            account.balance.checked_add(amount),
            account.total_received.checked_add(amount),
        ) else {
            return Err(CoreError::internal(format!("balance overflow for '{}'", user)));
        };
        account.balance = balance;
        account.total_received = total_received;

        tracing::info!(user_id = %user, amount, balance, "Credited coins");
        Ok(account.clone())
    }

    fn account(&self, user: &UserId) -> LedgerAccount {
        self.accounts
            .get(user)
            .map(|account| account.value().clone())
            .unwrap_or_else(|| LedgerAccount::empty(user.clone()))
    }
}

/// Persisted form of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub accounts: Vec<LedgerAccount>,
}

/// `ledger.toml` in the data directory.
pub struct LedgerSnapshotFile {
    file: AtomicTomlFile<LedgerSnapshot>,
}

impl LedgerSnapshotFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the ledger, or an empty one when no snapshot exists yet.
    pub fn load(&self) -> Result<InMemoryLedger> {
        match self.file.load()? {
            Some(snapshot) => InMemoryLedger::from_snapshot(snapshot),
            None => Ok(InMemoryLedger::new()),
        }
    }

    pub fn save(&self, ledger: &InMemoryLedger) -> Result<()> {
        self.file.save(&ledger.snapshot())?;
        tracing::debug!(path = %self.file.path().display(), "Saved ledger snapshot");
        Ok(())
    }
}
