//! Durable interaction store backed by a JSON-lines journal.

use crate::memory_interaction_store::InMemoryInteractionStore;
use crate::storage::Journal;
use async_trait::async_trait;
use futures::stream::BoxStream;
use liaison_core::interaction::{ActivityFilter, InteractionEvent, InteractionStore, NewInteraction};
use liaison_core::{EventId, Result, UserId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Interaction store that survives restarts.
///
/// All queries are served from memory; the journal is only read once, when
/// the store is opened. Appends reach the journal (written and synced) before
/// they become visible to readers.
pub struct JournalInteractionStore {
    path: PathBuf,
    inner: InMemoryInteractionStore,
}

impl JournalInteractionStore {
    /// Opens the journal at `path`, replaying every stored event.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (journal, replayed) = Journal::open(path).await?;
        tracing::info!(
            path = %path.display(),
            events = replayed.len(),
            "Opened interaction journal"
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryInteractionStore::with_journal(journal, replayed),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Coins charged per actor by every journaled event; the ledger snapshot
    /// is reconciled against this on startup.
    pub fn charged_by_actor(&self) -> HashMap<UserId, u64> {
        self.inner.charged_by_actor()
    }
}

#[async_trait]
impl InteractionStore for JournalInteractionStore {
    async fn append(&self, new: NewInteraction) -> Result<InteractionEvent> {
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
