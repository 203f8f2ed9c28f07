#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::BoxStream;
use liaison_application::Coordinator;
use liaison_core::config::CoreConfig;
use liaison_core::interaction::{ActivityFilter, InteractionEvent, InteractionStore, NewInteraction};
use liaison_core::{CoreError, EventId, Result, UserId};
use liaison_infrastructure::{InMemoryInteractionStore, InMemoryLedger};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct Harness {
    pub coordinator: Coordinator,
    pub ledger: Arc<InMemoryLedger>,
}

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}

pub fn harness() -> Harness {
    harness_with(CoreConfig::default(), Arc::new(InMemoryInteractionStore::new()))
}

pub fn harness_with(config: CoreConfig, store: Arc<dyn InteractionStore>) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    let coordinator = Coordinator::new(store, ledger.clone(), &config);
    Harness {
        coordinator,
        ledger,
    }
}

impl Harness {
    pub fn fund(&self, id: &str, amount: u64) {
        self.coordinator
            .credit(&user(id), amount)
            .expect("Should credit coins");
    }
}

/// Store whose next `failures` appends fail with a transient error.
pub struct FlakyStore {
    inner: InMemoryInteractionStore,
    failures: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryInteractionStore::new(),
            failures: AtomicU32::new(failures),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl InteractionStore for FlakyStore {
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent> {
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CoreError::transient("injected append failure"));
        }
        self.inner.append(new).await
    }

    async fn query_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<InteractionEvent>> {
        self.inner.query_pair(a, b).await
    }

    async fn query_actor(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, InteractionEvent>> {
        self.inner.query_actor(user, filter).await
    }

    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<InteractionEvent>> {
        self.inner.find_by_id(event_id).await
    }
}

/// Store whose pair reads take `delay`.
pub struct SlowStore {
    inner: InMemoryInteractionStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryInteractionStore::new(),
            delay,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl InteractionStore for SlowStore {
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent> {
        self.inner.append(new).await
    }

    async fn query_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<InteractionEvent>> {
        tokio::time::sleep(self.delay).await;
        self.inner.query_pair(a, b).await
    }

    async fn query_actor(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, InteractionEvent>> {
        self.inner.query_actor(user, filter).await
    }

    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<InteractionEvent>> {
        self.inner.find_by_id(event_id).await
    }
}

/// Store whose appends by one actor wait until the gate is opened.
pub struct GatedStore {
    inner: InMemoryInteractionStore,
    gated: UserId,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new(gated: &str) -> Self {
        Self {
            inner: InMemoryInteractionStore::new(),
            gated: user(gated),
            gate: Semaphore::new(0),
        }
    }

    /// Lets every waiting and future append through.
    pub fn open(&self) {
        self.gate.close();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl InteractionStore for GatedStore {
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent> {
        if new.actor_id == self.gated {
            // Closing the semaphore wakes every waiter with an error
            let _ = self.gate.acquire().await;
        }
        self.inner.append(new).await
    }

    async fn query_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<InteractionEvent>> {
        self.inner.query_pair(a, b).await
    }

    async fn query_actor(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, InteractionEvent>> {
        self.inner.query_actor(user, filter).await
    }

    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<InteractionEvent>> {
        self.inner.find_by_id(event_id).await
    }
}
