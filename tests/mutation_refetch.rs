// Integration tests for mutations refetching active queries

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use color_eyre::eyre::Result;
use futures::FutureExt;
use refetch::prelude::*;
use serde_json::json;
use tokio::time::timeout;

/// Registers a query under `name` that records every refetch in `log`.
fn logged(
    registry: &QueryRegistry,
    log: &Arc<Mutex<Vec<String>>>,
    name: &str,
    id: i64,
) -> Result<WatchedQuery<()>> {
    let log = log.clone();
    let entry = format!("{name}:{id}");
    let query = WatchedQuery::new(registry, name, variables(json!({ "id": id })), move |_| {
        log.lock().expect("log lock").push(entry.clone());
        async { Ok(()) }.boxed()
    })?;
    Ok(query)
}

fn sorted(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    let mut entries = log.lock().expect("log lock").clone();
    entries.sort();
    entries
}

#[tokio::test]
async fn test_configured_and_call_targets_are_additive() -> Result<()> {
    let registry = QueryRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _users = logged(&registry, &log, "ListUsers", 0)?;
    let _user1 = logged(&registry, &log, "GetUser", 1)?;
    let _user2 = logged(&registry, &log, "GetUser", 2)?;

    let mutation = Mutation::new(&registry, |id: i64| async move { Ok(id) }.boxed())
        .refetch_queries(["ListUsers"])
        .with_config(MutationConfig::new(true));

    let id = mutation
        .mutate_with(
            2,
            vec![RefetchTarget::filtered("GetUser", variables(json!({ "id": 2 })))],
        )
        .await?;

    assert_eq!(id, 2);
    assert_eq!(sorted(&log), vec!["GetUser:2", "ListUsers:0"]);

    // call-time targets do not stick to the mutation
    log.lock().expect("log lock").clear();
    mutation.mutate(1).await?;
    assert_eq!(sorted(&log), vec!["ListUsers:0"]);
    Ok(())
}

#[tokio::test]
async fn test_on_completed_runs_before_refetch() -> Result<()> {
    let registry = QueryRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _user = logged(&registry, &log, "GetUser", 1)?;

    let completed = log.clone();
    let mutation = Mutation::new(&registry, |_: ()| async { Ok("saved") }.boxed())
        .refetch_queries(["GetUser"])
        .on_completed(move |data| {
            completed.lock().expect("log lock").push(format!("completed:{data}"));
        })
        .with_config(MutationConfig::new(true));

    mutation.mutate(()).await?;

    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["completed:saved".to_string(), "GetUser:1".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_mutation_refetches_nothing() -> Result<()> {
    let registry = QueryRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _user = logged(&registry, &log, "GetUser", 1)?;

    let mutation: Mutation<(), ()> = Mutation::new(&registry, |()| {
        async { Err(QueryError::NetworkError("offline".to_string())) }.boxed()
    })
    .refetch_queries(["GetUser"])
    .with_config(MutationConfig::new(true));

    let result = mutation.mutate(()).await;

    assert_eq!(
        result,
        Err(MutationError::Mutation(QueryError::NetworkError(
            "offline".to_string()
        )))
    );
    assert!(log.lock().expect("log lock").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_awaited_refetch_failure_fails_mutation() -> Result<()> {
    let registry = QueryRegistry::new();
    let _broken = WatchedQuery::new(&registry, "GetUser", Variables::new(), |_| {
        async { Err::<(), _>(QueryError::FetchError("boom".to_string())) }.boxed()
    })?;

    let mutation = Mutation::new(&registry, |()| async { Ok(1) }.boxed())
        .refetch_queries(["GetUser"])
        .with_config(MutationConfig::new(true));

    assert_eq!(
        mutation.mutate(()).await,
        Err(MutationError::Refetch(QueryError::FetchError(
            "boom".to_string()
        )))
    );
    assert!(mutation.result().is_error());
    Ok(())
}

#[tokio::test]
async fn test_background_refetch_does_not_fail_mutation() -> Result<()> {
    let registry = QueryRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let _broken = WatchedQuery::new(&registry, "GetUser", Variables::new(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(QueryError::FetchError("boom".to_string())) }.boxed()
    })?;

    let mutation = Mutation::new(&registry, |()| async { Ok(1) }.boxed()).refetch_queries(["GetUser"]);

    assert_eq!(mutation.mutate(()).await, Ok(1));
    assert!(mutation.result().is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_background_refetch_updates_query() -> Result<()> {
    let registry = QueryRegistry::new();
    let query = WatchedQuery::new(&registry, "ListUsers", Variables::new(), |_| {
        async { Ok::<_, QueryError>(vec!["ada", "grace"]) }.boxed()
    })?;
    let mut rx = query.subscribe();

    let mutation = Mutation::new(&registry, |()| async { Ok(()) }.boxed()).refetch_queries(["ListUsers"]);
    mutation.mutate(()).await?;

    timeout(Duration::from_secs(1), rx.changed()).await??;
    assert_eq!(query.result().data(), Some(&vec!["ada", "grace"]));
    Ok(())
}

#[test]
fn test_background_refetch_without_tokio_runtime() -> Result<()> {
    let registry = QueryRegistry::new();
    let query = WatchedQuery::new(&registry, "ListUsers", Variables::new(), |_| {
        async { Ok::<_, QueryError>(3usize) }.boxed()
    })?;

    let mutation = Mutation::new(&registry, |()| async { Ok(()) }.boxed()).refetch_queries(["ListUsers"]);
    futures::executor::block_on(mutation.mutate(()))?;

    // refetches ran inline, so the query already holds fresh data
    assert_eq!(query.result().data(), Some(&3));
    assert!(mutation.result().is_success());
    Ok(())
}
