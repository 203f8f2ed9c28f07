//! Event fan-out bus.

use super::registry::SessionRegistry;
use dashmap::DashMap;
use liaison_core::UserId;
use liaison_core::notification::DomainEvent;
use std::sync::Arc;

/// Pushes committed domain events to every live session of the affected users.
///
/// Delivery is best-effort: publishing never blocks, sessions that are not
/// connected miss the event, and a saturated session loses its oldest
/// notifications. Callers serialize publishes per user to keep each user's
/// stream in commit order.
pub struct EventBus {
    registry: Arc<SessionRegistry>,
    /// Last `user_sequence` handed out per recipient.
    sequences: DashMap<UserId, u64>,
}

impl EventBus {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            sequences: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Publishes `event` to its affected users; returns the number of sessions reached.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;

        for user_id in event.affected_users() {
            let user_sequence = {
                let mut last = self.sequences.entry(user_id.clone()).or_insert(0);
                *last += 1;
                *last
            };
            let notification = event.notification_for(&user_id, user_sequence);

            for (channel_id, sender) in self.registry.senders_for(&user_id) {
                match sender.send(notification.clone()) {
                    Ok(_) => delivered += 1,
                    Err(_) => {
                        // Receiver dropped without unregistering.
                        self.registry.unregister(channel_id);
                        tracing::debug!(user_id = %user_id, channel_id = %channel_id, "Pruned closed session");
                    }
                }
            }
        }

        tracing::debug!(event_id = %event.event.id, delivered, "Published domain event");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use liaison_core::interaction::{InteractionEvent, InteractionKind, InteractionStatus, NewInteraction};
    use liaison_core::relationship::RelationshipState;

    fn interest_event(actor: &str, target: &str) -> DomainEvent {
        let event = InteractionEvent::from_new(
            NewInteraction::new(
                UserId::from(actor),
                UserId::from(target),
                InteractionKind::Interest,
                InteractionStatus::Pending,
            ),
            1,
            Utc::now(),
        );
        DomainEvent {
            event,
            relationships: vec![
                (UserId::from(actor), RelationshipState::InterestSent),
                (UserId::from(target), RelationshipState::InterestReceived),
            ],
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_session_of_both_users() {
        let registry = Arc::new(SessionRegistry::new(8));
        let bus = EventBus::new(registry.clone());
        let mut alice_phone = registry.connect(&UserId::from("alice"));
        let mut alice_laptop = registry.connect(&UserId::from("alice"));
        let mut bob = registry.connect(&UserId::from("bob"));
        let _carol = registry.connect(&UserId::from("carol"));

        let delivered = bus.publish(&interest_event("alice", "bob"));
        assert_eq!(delivered, 3);

        let seen = alice_phone.next().await.unwrap();
        assert_eq!(seen.relationship, RelationshipState::InterestSent);
        assert_eq!(seen.user_sequence, 1);
        assert_eq!(alice_laptop.next().await.unwrap().event_id, seen.event_id);
        assert_eq!(bob.next().await.unwrap().relationship, RelationshipState::InterestReceived);
    }

    #[tokio::test]
    async fn test_saturated_session_drops_oldest() {
        let registry = Arc::new(SessionRegistry::new(2));
        let bus = EventBus::new(registry.clone());
        let mut bob = registry.connect(&UserId::from("bob"));

        for _ in 0..5 {
            bus.publish(&interest_event("alice", "bob"));
        }

        assert_eq!(bob.try_next().unwrap().user_sequence, 4);
        assert_eq!(bob.try_next().unwrap().user_sequence, 5);
        assert!(bob.try_next().is_none());
        assert_eq!(bob.dropped(), 3);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let registry = Arc::new(SessionRegistry::new(2));
        let bus = EventBus::new(registry.clone());
        let bob = registry.connect(&UserId::from("bob"));
        drop(bob);

        assert_eq!(bus.publish(&interest_event("alice", "bob")), 0);
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unregister_ends_stream() {
        let registry = Arc::new(SessionRegistry::new(2));
        let mut bob = registry.connect(&UserId::from("bob"));

        registry.unregister(bob.channel_id());
        assert!(bob.next().await.is_none());
    }
}
