mod common;

use common::{harness, harness_with, user};
use futures::StreamExt;
use liaison_application::Coordinator;
use liaison_core::CoreError;
use liaison_core::action::{Action, ActionRequest, Decision};
use liaison_core::config::CoreConfig;
use liaison_core::interaction::{ActivityFilter, InteractionKind, InteractionStatus, Metadata};
use liaison_core::ledger::Ledger;
use liaison_core::relationship::RelationshipState;
use liaison_infrastructure::{JournalInteractionStore, LedgerSnapshotFile, StaticIdentityProvider};
use std::sync::Arc;
use tempfile::TempDir;

fn accept() -> Action {
    Action::Respond {
        decision: Decision::Accept,
        proposal_id: None,
    }
}

#[tokio::test]
async fn test_view_contact_without_coins_fails() {
    let h = harness();
    let (a, b) = (user("a"), user("b"));

    let err = h
        .coordinator
        .execute(&a, &b, Action::ViewContact, Metadata::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CoreError::InsufficientBalance {
            user_id: "a".to_string(),
            required: 1,
            available: 0,
        }
    );
    assert_eq!(h.coordinator.get_balance(&a), 0);

    // Nothing was recorded
    let activity: Vec<_> = h
        .coordinator
        .list_activity(&a, ActivityFilter::default())
        .await
        .unwrap()
        .collect()
        .await;
    assert!(activity.is_empty());
}

#[tokio::test]
async fn test_interest_sets_mirrored_states_and_charges() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .expect("Interest should succeed");

    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::InterestSent
    );
    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::InterestReceived
    );
    assert_eq!(h.coordinator.get_balance(&a), 4);
    assert_eq!(h.coordinator.get_balance(&b), 0);
}

#[tokio::test]
async fn test_accept_unlocks_chat() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();

    // Chat is forbidden before acceptance
    let err = h
        .coordinator
        .execute(&a, &b, Action::Chat, Metadata::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(h.coordinator.get_balance(&a), 4);

    h.coordinator
        .execute(&b, &a, accept(), Metadata::new())
        .await
        .expect("Target should be able to accept");

    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::Accepted
    );
    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::Accepted
    );

    h.coordinator
        .execute(&a, &b, Action::Chat, Metadata::new())
        .await
        .expect("Chat should be allowed once accepted");
    assert_eq!(h.coordinator.get_balance(&a), 3);
}

#[tokio::test]
async fn test_block_is_directional() {
    let h = harness();
    h.fund("a", 5);
    h.fund("b", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    h.coordinator
        .execute(&a, &b, Action::Block, Metadata::new())
        .await
        .expect("Block should always be allowed");

    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::Blocked
    );
    // B keeps its prior state
    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::InterestReceived
    );

    let err = h
        .coordinator
        .execute(&b, &a, Action::Interest, Metadata::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(h.coordinator.get_balance(&b), 5);

    // Visits are still recorded
    assert!(
        h.coordinator
            .execute(&b, &a, Action::Visit, Metadata::new())
            .await
            .is_ok()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_view_contact_with_one_coin() {
    let h = harness();
    h.fund("a", 1);
    let (a, b) = (user("a"), user("b"));

    let (first, second) = tokio::join!(
        h.coordinator
            .execute(&a, &b, Action::ViewContact, Metadata::new()),
        h.coordinator
            .execute(&a, &b, Action::ViewContact, Metadata::new()),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_insufficient_balance()))
            .count(),
        1
    );
    let account = h.coordinator.get_account(&a);
    assert_eq!(account.balance, 0);
    assert!(account.is_consistent());
}

#[tokio::test]
async fn test_super_interest_upgrade_costs_both_steps() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    let upgrade = h
        .coordinator
        .execute_request(ActionRequest::new("a", "b", Action::SuperInterest))
        .await
        .expect("Upgrade should succeed");

    assert_eq!(upgrade.kind, InteractionKind::SuperInterest);
    assert_eq!(h.coordinator.get_balance(&a), 2);
    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::InterestReceived
    );

    // Accepting answers the upgraded proposal
    let response = h
        .coordinator
        .execute_request(ActionRequest::new("b", "a", accept()))
        .await
        .unwrap();
    assert_eq!(response.responds_to, Some(upgrade.id));
    assert_eq!(response.kind, InteractionKind::SuperInterest);
}

#[tokio::test]
async fn test_decline_then_decliner_reproposes() {
    let h = harness();
    h.fund("a", 5);
    h.fund("b", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    h.coordinator
        .execute(
            &b,
            &a,
            Action::Respond {
                decision: Decision::Decline,
                proposal_id: None,
            },
            Metadata::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::DeclinedByThem
    );
    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::DeclinedByMe
    );

    let err = h
        .coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    h.coordinator
        .execute(&b, &a, Action::Interest, Metadata::new())
        .await
        .expect("Decliner may propose again");
    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::InterestReceived
    );
}

#[tokio::test]
async fn test_response_errors() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));

    let err = h
        .coordinator
        .execute(&b, &a, accept(), Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoPendingProposal { .. }));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    let err = h
        .coordinator
        .execute(&a, &b, accept(), Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAuthorizedForAction { .. }));

    let err = h
        .coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateProposal { .. }));
    assert_eq!(h.coordinator.get_balance(&a), 4);
}

#[tokio::test]
async fn test_withdraw_frees_the_slot() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    h.coordinator
        .execute(&a, &b, Action::Withdraw { proposal_id: None }, Metadata::new())
        .await
        .expect("Proposer should be able to withdraw");

    assert_eq!(
        h.coordinator.get_relationship(&b, &a).await.unwrap(),
        RelationshipState::None
    );
    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .expect("Slot should be free again");
    assert_eq!(h.coordinator.get_balance(&a), 3);
}

#[tokio::test]
async fn test_visits_are_never_rejected_as_duplicates() {
    let h = harness();
    let (a, b) = (user("a"), user("b"));

    for _ in 0..3 {
        h.coordinator
            .execute(&a, &b, Action::Visit, Metadata::new())
            .await
            .expect("Visit should always succeed");
    }

    let visits: Vec<_> = h
        .coordinator
        .list_activity(&b, ActivityFilter::received().with_kinds([InteractionKind::Visit]))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(visits.len(), 3);
    assert!(visits.iter().all(|view| !view.is_sender && view.counterpart == a));
    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::None
    );
}

#[tokio::test]
async fn test_list_activity_annotates_sender() {
    let h = harness();
    h.fund("a", 5);
    let (a, b, c) = (user("a"), user("b"), user("c"));

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    h.coordinator
        .execute(&c, &a, Action::Visit, Metadata::new())
        .await
        .unwrap();

    let activity: Vec<_> = h
        .coordinator
        .list_activity(&a, ActivityFilter::default())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(activity.len(), 2);
    // Newest first
    assert_eq!(activity[0].counterpart, c);
    assert!(!activity[0].is_sender);
    assert_eq!(activity[1].counterpart, b);
    assert!(activity[1].is_sender);
    assert_eq!(activity[1].event.status, InteractionStatus::Pending);

    let pending: Vec<_> = h
        .coordinator
        .list_activity(
            &b,
            ActivityFilter::received().with_statuses([InteractionStatus::Pending]),
        )
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_sessions_receive_notifications_for_both_sides() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));
    let mut a_session = h.coordinator.connect(&a);
    let mut b_session = h.coordinator.connect(&b);

    let event_id = h
        .coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();

    let to_a = a_session.next().await.expect("A should be notified");
    let to_b = b_session.next().await.expect("B should be notified");
    assert_eq!(to_a.event_id, event_id);
    assert_eq!(to_b.event_id, event_id);
    assert_eq!(to_a.relationship, RelationshipState::InterestSent);
    assert_eq!(to_b.relationship, RelationshipState::InterestReceived);

    // Failed actions publish nothing
    let _ = h
        .coordinator
        .execute(&b, &a, Action::Chat, Metadata::new())
        .await
        .unwrap_err();
    assert!(a_session.try_next().is_none());

    assert_eq!(h.coordinator.disconnect(b_session.channel_id()), Some(b.clone()));
    assert!(b_session.next().await.is_none());
    assert_eq!(h.coordinator.registry().session_count(), 1);
}

#[tokio::test]
async fn test_block_is_only_announced_to_the_blocker() {
    let h = harness();
    h.fund("a", 5);
    let (a, b) = (user("a"), user("b"));
    let mut a_session = h.coordinator.connect(&a);
    let mut b_session = h.coordinator.connect(&b);

    h.coordinator
        .execute(&a, &b, Action::Interest, Metadata::new())
        .await
        .unwrap();
    a_session.next().await.expect("A should be notified");
    b_session.next().await.expect("B should be notified");

    let block_id = h
        .coordinator
        .execute(&a, &b, Action::Block, Metadata::new())
        .await
        .unwrap();

    let to_a = a_session.next().await.expect("Blocker should be notified");
    assert_eq!(to_a.event_id, block_id);
    assert_eq!(to_a.kind, InteractionKind::Block);
    assert_eq!(to_a.relationship, RelationshipState::Blocked);
    assert!(b_session.try_next().is_none());

    // B's next notification carries no gap left by the block
    let visit_id = h
        .coordinator
        .execute(&b, &a, Action::Visit, Metadata::new())
        .await
        .unwrap();
    let to_b = b_session.next().await.expect("B should see its own visit");
    assert_eq!(to_b.event_id, visit_id);
    assert_eq!(to_b.user_sequence, 2);
    assert_eq!(to_b.relationship, RelationshipState::InterestReceived);
}

#[tokio::test]
async fn test_execute_as_resolves_session_token() {
    let h = harness();
    h.fund("a", 5);
    let identity = Arc::new(StaticIdentityProvider::new());
    let token = identity.issue(&user("a"));
    let coordinator = h.coordinator.clone().with_identity(identity);

    coordinator
        .execute_as(&token, &user("b"), Action::Interest, Metadata::new())
        .await
        .expect("Known token should act as its user");
    assert_eq!(coordinator.get_balance(&user("a")), 4);

    let err = coordinator
        .execute_as("bogus", &user("b"), Action::Visit, Metadata::new())
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
}

#[tokio::test]
async fn test_journaled_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.jsonl");
    let (a, b) = (user("a"), user("b"));

    {
        let store = Arc::new(JournalInteractionStore::open(&path).await.unwrap());
        let h = harness_with(CoreConfig::default(), store);
        h.fund("a", 5);
        h.coordinator
            .execute(&a, &b, Action::Interest, Metadata::new())
            .await
            .unwrap();
        h.coordinator
            .execute(&b, &a, accept(), Metadata::new())
            .await
            .unwrap();
    }

    let store = Arc::new(JournalInteractionStore::open(&path).await.unwrap());
    let h = harness_with(CoreConfig::default(), store);
    assert_eq!(
        h.coordinator.get_relationship(&a, &b).await.unwrap(),
        RelationshipState::Accepted
    );

    // A fresh ledger has no coins for A, so Chat is legal but unpaid
    let err = h
        .coordinator
        .execute(&a, &b, Action::Chat, Metadata::new())
        .await
        .unwrap_err();
    assert!(err.is_insufficient_balance());
}

#[tokio::test]
async fn test_unsaved_debits_are_recovered_from_journal() {
    let temp_dir = TempDir::new().unwrap();
    let journal = temp_dir.path().join("interactions.jsonl");
    let ledger_file = LedgerSnapshotFile::new(temp_dir.path().join("ledger.toml"));
    let (alice, bob) = (user("alice"), user("bob"));

    {
        let ledger = Arc::new(ledger_file.load().unwrap());
        let store = Arc::new(JournalInteractionStore::open(&journal).await.unwrap());
        let coordinator = Coordinator::new(store, ledger.clone(), &CoreConfig::default());
        coordinator.credit(&alice, 5).unwrap();
        ledger_file.save(&ledger).unwrap();

        coordinator
            .execute(&alice, &bob, Action::Interest, Metadata::new())
            .await
            .unwrap();
        coordinator
            .execute(&alice, &bob, Action::ViewContact, Metadata::new())
            .await
            .unwrap();
        // Process dies before the snapshot is written again
    }

    let store = JournalInteractionStore::open(&journal).await.unwrap();
    let ledger = ledger_file.load().unwrap();
    assert_eq!(ledger.balance(&alice), 5);

    let adjusted = ledger.reconcile_usage(&store.charged_by_actor()).unwrap();
    assert_eq!(adjusted, vec![alice.clone()]);
    let account = ledger.account(&alice);
    assert_eq!(account.balance, 3);
    assert_eq!(account.total_used, 2);
    assert!(account.is_consistent());
    assert_eq!(store.charged_by_actor().get(&alice), Some(&account.total_used));
}

#[tokio::test]
async fn test_configured_costs_are_applied() {
    let mut config = CoreConfig::default();
    config.costs.view_contact = 3;
    let h = harness_with(
        config,
        Arc::new(liaison_infrastructure::InMemoryInteractionStore::new()),
    );
    h.fund("a", 4);

    h.coordinator
        .execute(&user("a"), &user("b"), Action::ViewContact, Metadata::new())
        .await
        .unwrap();
    assert_eq!(h.coordinator.get_balance(&user("a")), 1);
}
