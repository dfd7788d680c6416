//! Two commands race on one aggregate; the loser sees the stored version.

use std::sync::Arc;

use tributary::commands::CommandContext;
use tributary::domain::AggregateRoot;
use tributary::events::{AggregateRootVersion, EventSourceId};
use tributary::interfaces::{EventStore, StorageError};
use tributary::storage::InMemoryEventStore;

use crate::bank::{execution_context, Account, ACCOUNT};

async fn account_at_version_two(store: Arc<InMemoryEventStore>) -> EventSourceId {
    let id = EventSourceId::new();
    let mut context = CommandContext::new(execution_context(), store);
    let account = context.aggregate_of::<Account>().get(id).await.unwrap();
    account.open("carol");
    account.deposit(1);
    context.commit().await.unwrap();
    id
}

#[tokio::test]
async fn test_second_commit_reports_conflict_with_stored_version() {
    let store = Arc::new(InMemoryEventStore::new());
    let id = account_at_version_two(store.clone()).await;

    let mut first = CommandContext::new(execution_context(), store.clone());
    let mut second = CommandContext::new(execution_context(), store.clone());
    assert_ne!(first.correlation_id(), second.correlation_id());

    let mine = first.aggregate_of::<Account>().get(id).await.unwrap();
    assert_eq!(mine.version(), AggregateRootVersion::new(2));
    let theirs = second.aggregate_of::<Account>().get(id).await.unwrap();
    assert_eq!(theirs.version(), AggregateRootVersion::new(2));

    mine.deposit(10);
    theirs.deposit(20);

    first.commit().await.unwrap();
    assert_eq!(
        store.version_for(id, ACCOUNT).await.unwrap(),
        AggregateRootVersion::new(3)
    );

    let err = second.commit().await.unwrap_err();
    assert!(err.is_concurrency_conflict());
    assert_eq!(
        err.conflict_versions(),
        Some((AggregateRootVersion::new(2), AggregateRootVersion::new(3)))
    );
    second.rollback();

    // Nothing from the losing command reached the store.
    let history = store.fetch_for_aggregate(id, ACCOUNT).await.unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_racing_commits_never_overwrite() {
    let store = Arc::new(InMemoryEventStore::new());
    let id = account_at_version_two(store.clone()).await;

    let mut tasks = Vec::new();
    for amount in 1..=8u64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let mut context = CommandContext::new(execution_context(), store);
            let account = context.aggregate_of::<Account>().get(id).await.unwrap();
            account.deposit(amount);
            context.commit().await
        }));
    }

    let mut committed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert!(err.is_concurrency_conflict(), "unexpected error: {err}"),
        }
    }

    let version = store.version_for(id, ACCOUNT).await.unwrap();
    assert_eq!(version, AggregateRootVersion::new(2 + committed));
    let history = store.fetch_for_aggregate(id, ACCOUNT).await.unwrap();
    assert_eq!(history.len() as u64, 2 + committed);
}

#[tokio::test]
async fn test_store_rejects_stale_expected_version_directly() {
    let store = Arc::new(InMemoryEventStore::new());
    let id = account_at_version_two(store.clone()).await;

    let stale = tributary::events::UncommittedAggregateEvents::new(
        id,
        ACCOUNT,
        AggregateRootVersion::new(1),
    );
    let err = store
        .commit_for_aggregate(&execution_context(), stale)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::ConcurrencyConflict { actual, .. } if actual == AggregateRootVersion::new(2)
    ));
}
