//! Coordinator facade.
//!
//! This module provides the `Coordinator`, the outbound interface collaborators
//! (transport, presentation, top-up flows) talk to. It wires the gateway, the
//! relationship cache, the fan-out bus and the session registry around one
//! interaction store and one ledger.

use crate::fanout::{EventBus, SessionRegistry, SessionStream};
use crate::gateway::ActionGateway;
use crate::relationship_cache::RelationshipCache;
use futures::StreamExt;
use futures::stream::BoxStream;
use liaison_core::action::{Action, ActionRequest};
use liaison_core::config::CoreConfig;
use liaison_core::identity::IdentityProvider;
use liaison_core::interaction::{
    ActivityFilter, InteractionEvent, InteractionStore, Metadata,
};
use liaison_core::ledger::{Ledger, LedgerAccount};
use liaison_core::relationship::{RelationshipState, resolve};
use liaison_core::{ChannelId, CoreError, EventId, Result, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One entry of a user's activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityView {
    pub event: InteractionEvent,
    /// Whether the queried user initiated the event.
    pub is_sender: bool,
    /// The other participant.
    pub counterpart: UserId,
}

impl ActivityView {
    pub fn new(user: &UserId, event: InteractionEvent) -> Self {
        let is_sender = &event.actor_id == user;
        let counterpart = if is_sender {
            event.target_id.clone()
        } else {
            event.actor_id.clone()
        };
        Self {
            event,
            is_sender,
            counterpart,
        }
    }
}

/// Entry point of the coordination core.
///
/// # Responsibilities
///
/// - Executing actions through the `ActionGateway`
/// - Answering relationship and balance queries
/// - Listing a user's activity
/// - Connecting and disconnecting live sessions
///
/// # Thread Safety
///
/// Every component is shared behind `Arc`; the coordinator is `Clone` and
/// can be handed to as many request handlers as needed.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn InteractionStore>,
    ledger: Arc<dyn Ledger>,
    identity: Option<Arc<dyn IdentityProvider>>,
    gateway: ActionGateway,
    cache: Arc<RelationshipCache>,
    bus: Arc<EventBus>,
    registry: Arc<SessionRegistry>,
}

impl Coordinator {
    /// Creates a new `Coordinator`.
    ///
    /// # Arguments
    ///
    /// * `store` - Interaction store (in-memory or journaled)
    /// * `ledger` - Coin ledger
    /// * `config` - Core configuration (costs, gateway bounds, fan-out capacity)
    pub fn new(
        store: Arc<dyn InteractionStore>,
        ledger: Arc<dyn Ledger>,
        config: &CoreConfig,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(config.fanout.channel_capacity));
        let bus = Arc::new(EventBus::new(registry.clone()));
        let cache = Arc::new(RelationshipCache::new());
        let gateway = ActionGateway::new(
            store.clone(),
            ledger.clone(),
            bus.clone(),
            cache.clone(),
            config,
        );
        Self {
            store,
            ledger,
            identity: None,
            gateway,
            cache,
            bus,
            registry,
        }
    }

    /// Attaches the auth collaborator used by [`Coordinator::execute_as`].
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn gateway(&self) -> &ActionGateway {
        &self.gateway
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// `Execute(actor, target, action, metadata)`.
    pub async fn execute(
        &self,
        actor: &UserId,
        target: &UserId,
        action: Action,
        metadata: Metadata,
    ) -> Result<EventId> {
        let request =
            ActionRequest::new(actor.clone(), target.clone(), action).with_metadata(metadata);
        Ok(self.gateway.execute(request).await?.id)
    }

    /// Executes a prepared request and returns the stored event.
    pub async fn execute_request(&self, request: ActionRequest) -> Result<InteractionEvent> {
        self.gateway.execute(request).await
    }

    /// Executes on behalf of the user behind `session_token`.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` if no identity provider is attached or the token is unknown.
    pub async fn execute_as(
        &self,
        session_token: &str,
        target: &UserId,
        action: Action,
        metadata: Metadata,
    ) -> Result<EventId> {
        let actor = self.current_user(session_token).await?;
        self.execute(&actor, target, action, metadata).await
    }

    /// Resolves the user behind `session_token`.
    pub async fn current_user(&self, session_token: &str) -> Result<UserId> {
        match &self.identity {
            Some(identity) => identity.current_user(session_token).await,
            None => Err(CoreError::Unauthenticated),
        }
    }

    /// `GetRelationship(viewer, other)`.
    ///
    /// Served from the cache when possible; otherwise resolved from the pair
    /// history and cached.
    pub async fn get_relationship(
        &self,
        viewer: &UserId,
        other: &UserId,
    ) -> Result<RelationshipState> {
        if let Some(state) = self.cache.get(viewer, other) {
            return Ok(state);
        }
        let events = self.store.query_pair(viewer, other).await?;
        Ok(self.cache.fill(viewer, other, resolve(&events, viewer)))
    }

    /// `GetBalance(user)`.
    pub fn get_balance(&self, user: &UserId) -> u64 {
        self.ledger.balance(user)
    }

    pub fn get_account(&self, user: &UserId) -> LedgerAccount {
        self.ledger.account(user)
    }

    /// Adds coins to `user` (the top-up collaborator's path into the ledger).
    pub fn credit(&self, user: &UserId, amount: u64) -> Result<LedgerAccount> {
        self.ledger.credit(user, amount)
    }

    /// `ListActivity(user, filter)`: newest first, each entry annotated with `is_sender`.
    pub async fn list_activity(
        &self,
        user: &UserId,
        filter: ActivityFilter,
    ) -> Result<BoxStream<'static, ActivityView>> {
        let owner = user.clone();
        let events = self.store.query_actor(user, filter).await?;
        Ok(events
            .map(move |event| ActivityView::new(&owner, event))
            .boxed())
    }

    /// Opens a live session for `user`.
    pub fn connect(&self, user: &UserId) -> SessionStream {
        self.registry.connect(user)
    }

    /// Closes a live session; returns its owner if it existed.
    pub fn disconnect(&self, channel_id: ChannelId) -> Option<UserId> {
        self.registry.unregister(channel_id)
    }
}
