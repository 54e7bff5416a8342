//! Active queries that register themselves for refetching.
//!
//! A [`WatchedQuery`] wraps the fetcher of a GraphQL query together with its
//! operation name and variables. While it is alive, it is registered in a
//! [`QueryRegistry`], so mutations and other code can refetch it by name without
//! holding a reference to it.
//!
//! # Lifecycle
//!
//! 1. [`WatchedQuery::new`] registers the query and starts in the `Loading` state
//! 2. [`WatchedQuery::refetch`] (or a dispatch that matches it) runs the fetcher and
//!    publishes the result to every [`subscribe`](WatchedQuery::subscribe)r
//! 3. [`WatchedQuery::set_variables`] re-registers it when the variables really change
//! 4. Dropping it removes the registration
//!
//! # Example
//!
//! ```
//! use futures::FutureExt;
//! use refetch::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), QueryError> {
//! let registry = QueryRegistry::new();
//! let user = WatchedQuery::new(
//!     &registry,
//!     "GetUser",
//!     variables(json!({ "id": 1 })),
//!     |vars| async move { Ok::<_, QueryError>(format!("user {}", vars["id"])) }.boxed(),
//! )?;
//!
//! registry.refetch_queries(["GetUser"]).await?;
//! assert_eq!(user.result().data().map(String::as_str), Some("user 1"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::memo::VariablesMemo;
use crate::registry::{QueryRegistry, Registration};
use crate::target::{OperationRef, Variables};

/// Error type for query operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Operation has no name and cannot be registered")]
    AnonymousOperation,
}

/// The state of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// Query has not produced data yet.
    Loading,
    /// Query succeeded with data.
    Success {
        /// The data returned by the query.
        data: T,
    },
    /// Query failed with an error.
    Error(String),
}

/// A query result together with the variables that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// The current state of the query.
    pub state: QueryState<T>,
    /// The variables of the fetch that produced `state`.
    pub variables: Variables,
}

impl<T> QueryResult<T> {
    /// Returns the data if the query succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data } => Some(data),
            _ => None,
        }
    }

    /// Returns `true` if the query is currently loading.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    /// Returns `true` if the query succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    /// Returns `true` if the query failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }
}

type Fetcher<V> = Arc<dyn Fn(Variables) -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync>;

/// A query that stays registered for refetching while it is alive.
pub struct WatchedQuery<V> {
    operation: String,
    registry: QueryRegistry,
    fetcher: Fetcher<V>,
    memo: VariablesMemo,
    state: Arc<watch::Sender<QueryResult<V>>>,
    registration: Option<Registration>,
}

impl<V> WatchedQuery<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a query and registers it in `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - The registry the query registers itself in
    /// * `operation` - The operation name, or a document declaring it
    /// * `variables` - The initial variables
    /// * `fetcher` - An async function that executes the query with given variables
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::AnonymousOperation`] if `operation` is a document
    /// without a named operation.
    pub fn new<F>(
        registry: &QueryRegistry,
        operation: impl Into<OperationRef>,
        variables: Variables,
        fetcher: F,
    ) -> Result<Self, QueryError>
    where
        F: Fn(Variables) -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync + 'static,
    {
        let operation: OperationRef = operation.into();
        let operation = operation
            .resolve()
            .map(str::to_string)
            .ok_or(QueryError::AnonymousOperation)?;

        let (state, _) = watch::channel(QueryResult {
            state: QueryState::Loading,
            variables: variables.clone(),
        });

        let mut query = Self {
            operation,
            registry: registry.clone(),
            fetcher: Arc::new(fetcher),
            memo: VariablesMemo::new(variables),
            state: Arc::new(state),
            registration: None,
        };
        query.registration = Some(query.mount());
        Ok(query)
    }

    /// Registers a record carrying a snapshot of the current variables.
    fn mount(&self) -> Registration {
        let fetcher = self.fetcher.clone();
        let state = self.state.clone();
        let variables = self.memo.current().clone();

        self.registry
            .register(self.operation.clone(), variables.clone(), move || {
                execute(fetcher.clone(), state.clone(), variables.clone())
                    .map(|result| result.map(|_| ()))
                    .boxed()
            })
    }

    /// Runs the fetcher with the current variables and publishes the result.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error, which is also published as `QueryState::Error`.
    pub async fn refetch(&self) -> Result<V, QueryError> {
        execute(self.fetcher.clone(), self.state.clone(), self.memo.current().clone()).await
    }

    /// Updates the variables of this query.
    ///
    /// Structurally equal variables are ignored. Otherwise the query's registration is
    /// replaced by one carrying the new variables and `true` is returned; call
    /// [`refetch`](Self::refetch) to load data for them.
    pub fn set_variables(&mut self, variables: Variables) -> bool {
        if !self.memo.update(variables) {
            return false;
        }

        tracing::debug!(
            operation = %self.operation,
            revision = self.memo.revision(),
            "query variables changed, re-registering"
        );

        self.registration.take();
        self.registration = Some(self.mount());
        true
    }

    /// The latest result.
    #[must_use]
    pub fn result(&self) -> QueryResult<V> {
        self.state.borrow().clone()
    }

    /// Subscribes to result updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryResult<V>> {
        self.state.subscribe()
    }

    /// The operation name this query is registered under.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation
    }

    /// The current variables.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        self.memo.current()
    }

    /// Removes this query from its registry.
    pub fn unmount(self) {
        drop(self);
    }
}

/// Invokes the fetcher immediately and returns a future that publishes its outcome.
fn execute<V>(
    fetcher: Fetcher<V>,
    state: Arc<watch::Sender<QueryResult<V>>>,
    variables: Variables,
) -> impl Future<Output = Result<V, QueryError>> + Send + 'static
where
    V: Clone + Send + Sync + 'static,
{
    let pending = fetcher(variables.clone());

    async move {
        let result = pending.await;

        let next = match &result {
            Ok(data) => QueryState::Success { data: data.clone() },
            Err(e) => QueryState::Error(e.to_string()),
        };
        state.send_replace(QueryResult {
            state: next,
            variables,
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::QueryDocument;
    use crate::target::variables;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_id(vars: Variables) -> BoxFuture<'static, Result<i64, QueryError>> {
        async move {
            vars.get("id")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| QueryError::FetchError("missing id".to_string()))
        }
        .boxed()
    }

    #[test]
    fn test_query_result_data() {
        let result = QueryResult {
            state: QueryState::Success { data: 42 },
            variables: Variables::new(),
        };
        assert_eq!(result.data(), Some(&42));

        let result: QueryResult<i32> = QueryResult {
            state: QueryState::Loading,
            variables: Variables::new(),
        };
        assert_eq!(result.data(), None);

        let result: QueryResult<i32> = QueryResult {
            state: QueryState::Error("error".to_string()),
            variables: Variables::new(),
        };
        assert_eq!(result.data(), None);
    }

    #[test]
    fn test_query_result_predicates() {
        let loading: QueryResult<i32> = QueryResult {
            state: QueryState::Loading,
            variables: Variables::new(),
        };
        assert!(loading.is_loading());
        assert!(!loading.is_success());
        assert!(!loading.is_error());

        let success = QueryResult {
            state: QueryState::Success { data: 42 },
            variables: Variables::new(),
        };
        assert!(!success.is_loading());
        assert!(success.is_success());
        assert!(!success.is_error());

        let error: QueryResult<i32> = QueryResult {
            state: QueryState::Error("error".to_string()),
            variables: Variables::new(),
        };
        assert!(!error.is_loading());
        assert!(!error.is_success());
        assert!(error.is_error());
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::FetchError("test error".to_string());
        assert_eq!(err.to_string(), "Fetch failed: test error");

        let err = QueryError::NetworkError("network error".to_string());
        assert_eq!(err.to_string(), "Network error: network error");
    }

    #[test]
    fn test_new_registers_and_starts_loading() {
        let registry = QueryRegistry::new();
        let query = WatchedQuery::new(&registry, "GetUser", variables(json!({ "id": 1 })), echo_id).unwrap();

        assert_eq!(query.operation_name(), "GetUser");
        assert_eq!(registry.active_count("GetUser"), 1);
        assert!(query.result().is_loading());
    }

    #[test]
    fn test_new_with_document() {
        let registry = QueryRegistry::new();
        let doc = QueryDocument::parse("query GetUser($id: Int) { user(id: $id) { id } }").unwrap();
        let query = WatchedQuery::new(&registry, doc, variables(json!({ "id": 1 })), echo_id).unwrap();

        assert_eq!(query.operation_name(), "GetUser");
        assert_eq!(registry.active_count("GetUser"), 1);
    }

    #[test]
    fn test_new_with_anonymous_document() {
        let registry = QueryRegistry::new();
        let doc = QueryDocument::parse("{ user { id } }").unwrap();
        let result = WatchedQuery::new(&registry, doc, Variables::new(), echo_id);

        assert_eq!(result.err(), Some(QueryError::AnonymousOperation));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_refetch_publishes_result() {
        let registry = QueryRegistry::new();
        let query = WatchedQuery::new(&registry, "GetUser", variables(json!({ "id": 7 })), echo_id).unwrap();
        let mut rx = query.subscribe();

        assert_eq!(query.refetch().await, Ok(7));

        rx.changed().await.unwrap();
        let result = rx.borrow().clone();
        assert_eq!(result.data(), Some(&7));
        assert_eq!(result.variables, variables(json!({ "id": 7 })));
    }

    #[tokio::test]
    async fn test_refetch_publishes_error() {
        let registry = QueryRegistry::new();
        let query = WatchedQuery::new(&registry, "GetUser", Variables::new(), echo_id).unwrap();

        let err = query.refetch().await.unwrap_err();
        assert_eq!(err, QueryError::FetchError("missing id".to_string()));
        assert_eq!(
            query.result().state,
            QueryState::Error("Fetch failed: missing id".to_string())
        );
    }

    #[tokio::test]
    async fn test_set_variables_replaces_registration() {
        let registry = QueryRegistry::new();
        let mut query = WatchedQuery::new(&registry, "GetUser", variables(json!({ "id": 1 })), echo_id).unwrap();
        let first = registry.records("GetUser")[0].id();

        assert!(!query.set_variables(variables(json!({ "id": 1 }))));
        assert_eq!(registry.records("GetUser")[0].id(), first);

        assert!(query.set_variables(variables(json!({ "id": 2 }))));
        let records = registry.records("GetUser");
        assert_eq!(records.len(), 1);
        assert_ne!(records[0].id(), first);
        assert_eq!(records[0].variables(), &variables(json!({ "id": 2 })));

        assert_eq!(query.refetch().await, Ok(2));
    }

    #[tokio::test]
    async fn test_registered_callback_uses_snapshot_variables() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = QueryRegistry::new();
        let counter = calls.clone();
        let query = WatchedQuery::new(&registry, "GetUser", variables(json!({ "id": 3 })), move |vars| {
            counter.fetch_add(1, Ordering::SeqCst);
            echo_id(vars)
        })
        .unwrap();

        let (_, refetch) = registry.matching("GetUser", None).remove(0);
        refetch().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(query.result().data(), Some(&3));
    }

    #[test]
    fn test_drop_unregisters() {
        let registry = QueryRegistry::new();
        let query = WatchedQuery::new(&registry, "GetUser", Variables::new(), echo_id).unwrap();
        assert_eq!(registry.active_count("GetUser"), 1);

        query.unmount();
        assert_eq!(registry.active_count("GetUser"), 0);
    }
}
