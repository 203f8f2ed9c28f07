use dashmap::DashMap;
use liaison_core::UserId;
use liaison_core::interaction::InteractionEvent;
use liaison_core::relationship::{RelationshipState, resolve};

/// In-memory cache of resolved relationship states.
///
/// Keyed by `(viewer, other)`. Entries are recomputed from the pair history
/// after every commit on that pair, so a cached value is never older than
/// the last write the gateway acknowledged.
pub struct RelationshipCache {
    states: DashMap<(UserId, UserId), RelationshipState>,
}

impl RelationshipCache {
    /// Creates a new empty RelationshipCache.
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Gets the cached state of `viewer` towards `other`.
    ///
    /// # Returns
    ///
    /// `Some(state)` if cached, `None` if the pair has not been resolved yet.
    pub fn get(&self, viewer: &UserId, other: &UserId) -> Option<RelationshipState> {
        self.states
            .get(&(viewer.clone(), other.clone()))
            .map(|state| *state)
    }

    /// Inserts a resolved state.
    pub fn insert(&self, viewer: &UserId, other: &UserId, state: RelationshipState) {
        self.states.insert((viewer.clone(), other.clone()), state);
    }

    /// Caches `state` unless an entry already exists; returns the cached value.
    ///
    /// Readers use this instead of `insert` so a state resolved from an older
    /// snapshot never overwrites one written by a later commit.
    pub fn fill(&self, viewer: &UserId, other: &UserId, state: RelationshipState) -> RelationshipState {
        *self
            .states
            .entry((viewer.clone(), other.clone()))
            .or_insert(state)
    }

    /// Resolves both directions of a pair from `events` and caches them.
    ///
    /// # Arguments
    ///
    /// * `events` - The pair's full history in store order
    /// * `a`, `b` - The two participants
    ///
    /// # Returns
    ///
    /// `(state of a towards b, state of b towards a)`.
    pub fn refresh_pair(
        &self,
        events: &[InteractionEvent],
        a: &UserId,
        b: &UserId,
    ) -> (RelationshipState, RelationshipState) {
        let for_a = resolve(events, a);
        let for_b = resolve(events, b);
        self.insert(a, b, for_a);
        self.insert(b, a, for_b);
        (for_a, for_b)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for RelationshipCache {
    fn default() -> Self {
        Self::new()
    }
}
