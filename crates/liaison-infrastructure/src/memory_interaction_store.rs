//! In-memory interaction store.
//!
//! Events are kept per participant pair. Each pair has its own write lock, so
//! appends for different pairs never contend; readers take a cheap `Arc`
//! snapshot of the pair's log and never wait on writers.

use crate::storage::Journal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream::BoxStream;
use liaison_core::interaction::{
    ActivityFilter, InteractionEvent, InteractionStore, NewInteraction, check_proposal_slot,
    sort_pair_events,
};
use liaison_core::{EventId, PairKey, Result, UserId};
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

/// Append log of a single pair.
#[derive(Default)]
struct PairLog {
    /// Serializes appends for the pair (check + stamp + persist + publish).
    write: tokio::sync::Mutex<()>,
    events: RwLock<Arc<Vec<InteractionEvent>>>,
}

impl PairLog {
    fn snapshot(&self) -> Arc<Vec<InteractionEvent>> {
        self.events.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, event: InteractionEvent) {
        let mut guard = self.events.write().unwrap_or_else(|e| e.into_inner());
        Arc::make_mut(&mut guard).push(event);
    }
}

/// Store-wide stamp source: `sequence` and `created_at` both strictly increase.
#[derive(Default)]
struct StoreClock {
    /// (last sequence, last created_at in microseconds)
    last: Mutex<(u64, i64)>,
}

impl StoreClock {
    fn stamp(&self) -> (u64, DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now().timestamp_micros();
        let micros = now.max(last.1 + 1);
        *last = (last.0 + 1, micros);
        let created_at = DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now);
        (last.0, created_at)
    }

    /// Advances past an already-stored event (journal replay).
    fn observe(&self, event: &InteractionEvent) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.0 = last.0.max(event.sequence);
        last.1 = last.1.max(event.created_at.timestamp_micros());
    }
}

/// Interaction store that keeps every event in memory.
///
/// When constructed with a [`Journal`], each append is persisted before it
/// becomes visible to readers; see `JournalInteractionStore`.
#[derive(Default)]
pub struct InMemoryInteractionStore {
    pairs: DashMap<PairKey, Arc<PairLog>>,
    /// Pairs each user participates in, for actor queries.
    partners: DashMap<UserId, BTreeSet<PairKey>>,
    index: DashMap<EventId, PairKey>,
    clock: StoreClock,
    journal: Option<Journal>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store over a journal and the events replayed from it.
    pub(crate) fn with_journal(journal: Journal, replayed: Vec<InteractionEvent>) -> Self {
        let store = Self {
            journal: Some(journal),
            ..Self::default()
        };
        for event in replayed {
            store.clock.observe(&event);
            let key = event.pair();
            store.index_event(&event, &key);
            store.log_for(&key).push(event);
        }
        for entry in store.pairs.iter() {
            let mut guard = entry.value().events.write().unwrap_or_else(|e| e.into_inner());
            sort_pair_events(Arc::make_mut(&mut *guard).as_mut_slice());
        }
        store
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Coins charged per actor across every stored event.
    pub fn charged_by_actor(&self) -> HashMap<UserId, u64> {
        let mut charged: HashMap<UserId, u64> = HashMap::new();
        for entry in self.pairs.iter() {
            for event in entry.value().snapshot().iter().filter(|e| e.cost > 0) {
                *charged.entry(event.actor_id.clone()).or_default() += event.cost;
            }
        }
        charged
    }

    fn log_for(&self, key: &PairKey) -> Arc<PairLog> {
        self.pairs.entry(key.clone()).or_default().clone()
    }

    fn index_event(&self, event: &InteractionEvent, key: &PairKey) {
        self.index.insert(event.id, key.clone());
        for user in [key.low(), key.high()] {
            self.partners
                .entry(user.clone())
                .or_default()
                .insert(key.clone());
        }
    }
}

/// Newest-first merge of per-pair snapshots.
///
/// Every snapshot is already in ascending `order_key` order, so the merge
/// only ever compares the last unread event of each pair and clones one
/// event per item pulled.
struct NewestFirst {
    snapshots: Vec<Arc<Vec<InteractionEvent>>>,
    /// Unread events left in each snapshot, counted from the front.
    unread: Vec<usize>,
    heads: BinaryHeap<((DateTime<Utc>, EventId), usize)>,
}

impl NewestFirst {
    fn new(snapshots: Vec<Arc<Vec<InteractionEvent>>>) -> Self {
        let unread: Vec<usize> = snapshots.iter().map(|events| events.len()).collect();
        let heads = snapshots
            .iter()
            .enumerate()
            .filter_map(|(i, events)| events.last().map(|last| (last.order_key(), i)))
            .collect();
        Self {
            snapshots,
            unread,
            heads,
        }
    }
}

impl Iterator for NewestFirst {
    type Item = InteractionEvent;

    fn next(&mut self) -> Option<InteractionEvent> {
        let (_, i) = self.heads.pop()?;
        self.unread[i] -= 1;
        let events = &self.snapshots[i];
        let event = events[self.unread[i]].clone();
        if let Some(next) = self.unread[i].checked_sub(1) {
            self.heads.push((events[next].order_key(), i));
        }
        Some(event)
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent> {
        let key = new.pair();
        let log = self.log_for(&key);
        let _write = log.write.lock().await;

        check_proposal_slot(&log.snapshot(), &new)?;

        let (sequence, created_at) = self.clock.stamp();
        let event = InteractionEvent::from_new(new, sequence, created_at);

        if let Some(journal) = &self.journal {
            journal.append(&event).await?;
        }

        self.index_event(&event, &key);
        log.push(event.clone());

        tracing::debug!(
            event_id = %event.id,
            sequence = event.sequence,
            pair = %key,
            kind = %event.kind,
            status = %event.status,
            "Interaction appended"
        );
        Ok(event)
    }

    async fn query_pair(&self, a: &UserId, b: &UserId) -> Result<Vec<InteractionEvent>> {
        let key = PairKey::new(a, b);
        let snapshot = self.pairs.get(&key).map(|log| log.snapshot());
        Ok(snapshot.map(|events| (*events).clone()).unwrap_or_default())
    }

    async fn query_actor(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, InteractionEvent>> {
        let keys: Vec<PairKey> = match &filter.counterpart {
            Some(other) => vec![PairKey::new(user, other)],
            None => self
                .partners
                .get(user)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default(),
        };

        let snapshots: Vec<Arc<Vec<InteractionEvent>>> = keys
            .iter()
            .filter_map(|key| self.pairs.get(key).map(|log| log.snapshot()))
            .collect();

        let user = user.clone();
        let limit = filter.limit.unwrap_or(usize::MAX);
        let events = NewestFirst::new(snapshots)
            .filter(move |event| filter.matches(&user, event))
            .take(limit);
        Ok(futures::stream::iter(events).boxed())
    }

    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<InteractionEvent>> {
        let Some(key) = self.index.get(event_id).map(|key| key.value().clone()) else {
            return Ok(None);
        };
        let snapshot = self.pairs.get(&key).map(|log| log.snapshot());
        Ok(snapshot.and_then(|events| events.iter().find(|e| &e.id == event_id).cloned()))
    }
}
