//! Create an aggregate, apply events and commit them.

use std::sync::Arc;

use tributary::commands::CommandContext;
use tributary::domain::{AggregateRoot, AggregateRootRepository};
use tributary::events::{AggregateRootVersion, EventSourceId};
use tributary::interfaces::EventStore;
use tributary::storage::InMemoryEventStore;

use crate::bank::{execution_context, Account, ACCOUNT};

#[tokio::test]
async fn test_create_apply_and_commit() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut context = CommandContext::new(execution_context(), store.clone());
    let id = EventSourceId::new();

    let account = context.aggregate_of::<Account>().create_with(id).await.unwrap();
    assert_eq!(account.version(), AggregateRootVersion::INITIAL);
    assert!(account.uncommitted_events().is_empty());

    account.open("alice");
    account.deposit(25);
    assert_eq!(account.version(), AggregateRootVersion::new(2));
    assert_eq!(account.uncommitted_events().len(), 2);

    let report = context.commit().await.unwrap();
    assert_eq!(report.committed.len(), 1);
    assert_eq!(report.committed[0].len(), 2);

    let account = context.aggregate_of::<Account>().get(id).await.unwrap();
    assert!(account.uncommitted_events().is_empty());
    assert_eq!(account.version(), AggregateRootVersion::new(2));
    assert_eq!(account.balance, 25);

    assert_eq!(
        store.version_for(id, ACCOUNT).await.unwrap(),
        AggregateRootVersion::new(2)
    );
}

#[tokio::test]
async fn test_committed_history_replays_into_fresh_aggregate() {
    let store = Arc::new(InMemoryEventStore::new());
    let id = EventSourceId::new();

    let mut context = CommandContext::new(execution_context(), store.clone());
    let account = context.aggregate_of::<Account>().get(id).await.unwrap();
    account.open("bob");
    account.deposit(10);
    account.deposit(5);
    context.commit().await.unwrap();

    let replayed: Account = AggregateRootRepository::new(store).get(id).await.unwrap();
    assert_eq!(replayed.version(), AggregateRootVersion::new(3));
    assert_eq!(replayed.balance, 15);
    assert!(replayed.broken_rules().is_empty());
    assert!(replayed.uncommitted_events().is_empty());
}

#[tokio::test]
async fn test_commit_without_changes_touches_nothing() {
    let store = Arc::new(InMemoryEventStore::new());
    let mut context = CommandContext::new(execution_context(), store.clone());
    let account = context.aggregate_of::<Account>().create().unwrap();
    assert_eq!(account.version(), AggregateRootVersion::INITIAL);

    let report = context.commit().await.unwrap();
    assert!(report.committed.is_empty());
    assert_eq!(store.commit_calls(), 0);
}
