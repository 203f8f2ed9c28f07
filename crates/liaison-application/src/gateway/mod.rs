//! Action gateway: the only write path into the interaction store and ledger.
//!
//! # Module Structure
//!
//! - `validation`: pure transition rules
//! - `locks`: keyed async locks for pairs and fan-out ordering
//!
//! # Execution
//!
//! 1. lock the pair, load its history, validate, reserve the cost
//!    (bounded by `gateway.execute_timeout_ms`)
//! 2. on a detached task: append, commit the reservation (or roll it back
//!    when the append fails), refresh the relationship cache, publish
//!
//! Step 2 always runs to completion once started, so dropping the caller's
//! future cannot separate the append from the ledger settlement.
//!
//! # Ordering and contention
//!
//! Step 2 holds the fan-out lock of every notified participant from the
//! append until the publish, so each user's notifications follow the
//! store's commit order. The cost is that a slow append (a journal fsync)
//! also delays every other action notifying either user; pairs with
//! disjoint participants never wait on each other here. The journal adds
//! its own ordering: it writes through a single file mutex, so durable
//! appends are serialized store-wide regardless of these locks.
//!
//! A `Block` is only published to the blocker. The blocked party gets no
//! notification, matching the one-way nature of a block.

mod locks;
mod validation;

pub use locks::KeyedLocks;
pub use validation::{PairView, plan};

use crate::fanout::EventBus;
use crate::relationship_cache::RelationshipCache;
use liaison_core::action::ActionRequest;
use liaison_core::config::{CoreConfig, CostSchedule, GatewaySettings, MetadataSettings};
use liaison_core::interaction::{InteractionEvent, InteractionKind, InteractionStore, NewInteraction};
use liaison_core::ledger::{Ledger, ReservationToken};
use liaison_core::notification::DomainEvent;
use liaison_core::{CoreError, PairKey, Result, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::OwnedMutexGuard;

/// Commits between two sweeps of idle lock entries.
const LOCK_PRUNE_INTERVAL: u64 = 256;

/// Validates and executes actions atomically.
#[derive(Clone)]
pub struct ActionGateway {
    store: Arc<dyn InteractionStore>,
    ledger: Arc<dyn Ledger>,
    bus: Arc<EventBus>,
    cache: Arc<RelationshipCache>,
    costs: Arc<CostSchedule>,
    settings: GatewaySettings,
    metadata: Arc<MetadataSettings>,
    pair_locks: Arc<KeyedLocks<PairKey>>,
    /// Held during append + publish so each user's notifications follow commit order.
    /// Only the users being notified are locked.
    fanout_locks: Arc<KeyedLocks<UserId>>,
    commits: Arc<AtomicU64>,
}

/// State carried from the validation phase into the commit phase.
struct Prepared {
    _pair_guard: OwnedMutexGuard<()>,
    history: Vec<InteractionEvent>,
    draft: NewInteraction,
    reservation: ReservationGuard,
}

impl ActionGateway {
    /// Creates a new `ActionGateway`.
    ///
    /// # Arguments
    ///
    /// * `store` - Interaction store events are appended to
    /// * `ledger` - Ledger holding coin balances
    /// * `bus` - Fan-out bus committed actions are published on
    /// * `cache` - Relationship cache refreshed after every commit
    /// * `config` - Cost schedule, timeouts and retry bounds
    pub fn new(
        store: Arc<dyn InteractionStore>,
        ledger: Arc<dyn Ledger>,
        bus: Arc<EventBus>,
        cache: Arc<RelationshipCache>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            bus,
            cache,
            costs: Arc::new(config.costs.clone()),
            settings: config.gateway.clone(),
            metadata: Arc::new(config.metadata.clone()),
            pair_locks: Arc::new(KeyedLocks::new()),
            fanout_locks: Arc::new(KeyedLocks::new()),
            commits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Executes `request` and returns the stored event.
    ///
    /// Either the event is stored and the ledger reflects its cost, or
    /// nothing happened.
    ///
    /// # Errors
    ///
    /// - Business outcomes from validation (`InvalidTransition`,
    ///   `DuplicateProposal`, `NoPendingProposal`, `NotAuthorizedForAction`)
    /// - `InsufficientBalance` from the ledger
    /// - `TransientStoreFailure` after the configured retries are exhausted
    /// - `Timeout` if the validation phase did not finish in time
    pub async fn execute(&self, request: ActionRequest) -> Result<InteractionEvent> {
        let started = Instant::now();
        let timeout = self.settings.execute_timeout();

        let prepared = match tokio::time::timeout(timeout, self.prepare(&request)).await {
            Ok(prepared) => prepared?,
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(
                    actor = %request.actor,
                    target = %request.target,
                    action = %request.action,
                    elapsed_ms,
                    "Execution timed out before commit"
                );
                return Err(CoreError::Timeout { elapsed_ms });
            }
        };

        let gateway = self.clone();
        tokio::spawn(async move { gateway.commit(prepared).await })
            .await
            .map_err(|e| CoreError::internal(format!("commit task failed: {}", e)))?
    }

    /// Phase 1: lock, resolve, validate, reserve.
    async fn prepare(&self, request: &ActionRequest) -> Result<Prepared> {
        let pair = PairKey::new(&request.actor, &request.target);
        let pair_guard = self.pair_locks.lock(&pair).await;

        let history = self
            .store
            .query_pair(&request.actor, &request.target)
            .await?;
        let draft = plan(request, &history, &self.costs)?;

        let unknown = self
            .metadata
            .unrecognized_keys(draft.kind, draft.metadata.keys());
        if !unknown.is_empty() {
            tracing::debug!(kind = %draft.kind, keys = ?unknown, "Unrecognized metadata keys");
        }

        let reservation = ReservationGuard::reserve(self.ledger.clone(), &draft.actor_id, draft.cost)?;

        Ok(Prepared {
            _pair_guard: pair_guard,
            history,
            draft,
            reservation,
        })
    }

    /// Phase 2: append, settle, refresh, publish.
    async fn commit(&self, prepared: Prepared) -> Result<InteractionEvent> {
        let Prepared {
            _pair_guard,
            mut history,
            draft,
            reservation,
        } = prepared;

        let recipients = notified_users(&draft);
        let _fanout_guards = self.fanout_locks.lock_all(&recipients).await;

        let event = match self.append_with_retry(draft).await {
            Ok(event) => event,
            Err(err) => {
                reservation.rollback();
                return Err(err);
            }
        };

        if let Err(err) = reservation.commit() {
            tracing::error!(event_id = %event.id, error = %err, "Ledger commit failed after append");
            return Err(err);
        }

        history.push(event.clone());
        let (actor_state, target_state) =
            self.cache
                .refresh_pair(&history, &event.actor_id, &event.target_id);

        let relationships = recipients
            .into_iter()
            .map(|user| {
                let state = if user == event.actor_id {
                    actor_state
                } else {
                    target_state
                };
                (user, state)
            })
            .collect();
        self.bus.publish(&DomainEvent {
            event: event.clone(),
            relationships,
        });

        tracing::info!(
            event_id = %event.id,
            actor = %event.actor_id,
            target = %event.target_id,
            kind = %event.kind,
            status = %event.status,
            cost = event.cost,
            actor_state = %actor_state,
            "Action committed"
        );

        if self.commits.fetch_add(1, Ordering::Relaxed) % LOCK_PRUNE_INTERVAL == LOCK_PRUNE_INTERVAL - 1 {
            self.pair_locks.prune();
            self.fanout_locks.prune();
        }

        Ok(event)
    }

    async fn append_with_retry(&self, draft: NewInteraction) -> Result<InteractionEvent> {
        let mut retries_left = self.settings.transient_retries;
        loop {
            match self.store.append(draft.clone()).await {
                Err(err) if err.is_transient() && retries_left > 0 => {
                    retries_left -= 1;
                    tracing::warn!(error = %err, retries_left, "Retrying append after transient failure");
                }
                result => return result,
            }
        }
    }
}

/// Users told about `draft` once it commits.
fn notified_users(draft: &NewInteraction) -> Vec<UserId> {
    if draft.kind == InteractionKind::Block {
        vec![draft.actor_id.clone()]
    } else {
        vec![draft.actor_id.clone(), draft.target_id.clone()]
    }
}

/// Reservation that rolls itself back unless settled.
struct ReservationGuard {
    ledger: Arc<dyn Ledger>,
    token: Option<ReservationToken>,
}

impl ReservationGuard {
    /// Reserves `amount`; free actions hold no reservation at all.
    fn reserve(ledger: Arc<dyn Ledger>, user: &UserId, amount: u64) -> Result<Self> {
        let token = if amount > 0 {
            Some(ledger.reserve(user, amount)?)
        } else {
            None
        };
        Ok(Self { ledger, token })
    }

    fn commit(mut self) -> Result<()> {
        match self.token.take() {
            Some(token) => self.ledger.commit(&token),
            None => Ok(()),
        }
    }

    fn rollback(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(err) = self.ledger.rollback(&token) {
                tracing::error!(reservation = %token.id, error = %err, "Failed to roll back reservation");
            }
        }
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liaison_infrastructure::InMemoryLedger;

    #[test]
    fn test_dropped_reservation_rolls_back() {
        let ledger = Arc::new(InMemoryLedger::new());
        let alice = UserId::from("alice");
        ledger.credit(&alice, 2).unwrap();

        let guard = ReservationGuard::reserve(ledger.clone(), &alice, 2).unwrap();
        assert_eq!(ledger.account(&alice).available(), 0);
        drop(guard);

        assert_eq!(ledger.account(&alice).available(), 2);
        assert_eq!(ledger.held_reservations(), 0);
    }

    #[test]
    fn test_committed_reservation_is_not_rolled_back() {
        let ledger = Arc::new(InMemoryLedger::new());
        let alice = UserId::from("alice");
        ledger.credit(&alice, 2).unwrap();

        ReservationGuard::reserve(ledger.clone(), &alice, 1)
            .unwrap()
            .commit()
            .unwrap();

        assert_eq!(ledger.balance(&alice), 1);
        assert_eq!(ledger.held_reservations(), 0);
    }

    #[test]
    fn test_free_action_holds_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let guard = ReservationGuard::reserve(ledger.clone(), &UserId::from("ghost"), 0).unwrap();
        assert!(guard.token.is_none());
        assert!(guard.commit().is_ok());
    }
}
