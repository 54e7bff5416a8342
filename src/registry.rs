//! Registry of active queries.
//!
//! The [`QueryRegistry`] maps an operation name to the records of every query that
//! is currently active under that name. Each record carries the variables the query
//! was registered with and a callback that re-executes it.
//!
//! Records are owned through a [`Registration`] guard: dropping the guard removes
//! the record, so a query that goes away can never be refetched through a stale
//! callback.
//!
//! # Example
//!
//! ```
//! use futures::FutureExt;
//! use refetch::registry::QueryRegistry;
//! use refetch::target::variables;
//! use serde_json::json;
//!
//! let registry = QueryRegistry::new();
//! let registration = registry.register(
//!     "GetUser",
//!     variables(json!({ "id": 1 })),
//!     || async { Ok(()) }.boxed(),
//! );
//! assert_eq!(registry.active_count("GetUser"), 1);
//!
//! drop(registration);
//! assert_eq!(registry.active_count("GetUser"), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::matcher::is_match;
use crate::query::QueryError;
use crate::target::Variables;

/// Type-erased callback that re-executes an active query.
pub type RefetchFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), QueryError>> + Send + Sync>;

/// Identifies a single record within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

/// An active query as seen by the registry.
#[derive(Clone)]
pub struct QueryRecord {
    id: RecordId,
    variables: Variables,
    refetch: RefetchFn,
}

impl QueryRecord {
    /// The identifier of this record.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// The variables the query was registered with.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }
}

impl fmt::Debug for QueryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRecord")
            .field("id", &self.id)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Inner {
    buckets: DashMap<String, Vec<QueryRecord>>,
    next_id: AtomicU64,
}

/// Tracks every active query by operation name.
///
/// Cloning a `QueryRegistry` is cheap; clones share the same records. There is no
/// process-wide instance: create one and hand it to whatever issues queries and
/// mutations.
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    inner: Arc<Inner>,
}

impl QueryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record for `name` and returns the guard that owns it.
    ///
    /// Records registered under the same name keep their insertion order.
    pub fn register<F>(&self, name: impl Into<String>, variables: Variables, refetch: F) -> Registration
    where
        F: Fn() -> BoxFuture<'static, Result<(), QueryError>> + Send + Sync + 'static,
    {
        let name = name.into();
        let id = RecordId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(operation = %name, record = id.0, "registering active query");

        self.inner
            .buckets
            .entry(name.clone())
            .or_default()
            .push(QueryRecord {
                id,
                variables: variables.clone(),
                refetch: Arc::new(refetch),
            });

        Registration {
            registry: Arc::downgrade(&self.inner),
            handle: RegistrationHandle { name, id },
            variables,
        }
    }

    /// Removes the record identified by `handle`.
    ///
    /// Returns `false` if the record is not registered (for example because it was
    /// already removed). A bucket left empty is dropped.
    pub fn unregister(&self, handle: &RegistrationHandle) -> bool {
        Self::remove(&self.inner, handle)
    }

    fn remove(inner: &Inner, handle: &RegistrationHandle) -> bool {
        let removed = inner
            .buckets
            .get_mut(&handle.name)
            .is_some_and(|mut records| {
                let before = records.len();
                records.retain(|record| record.id != handle.id);
                records.len() != before
            });

        if removed {
            inner
                .buckets
                .remove_if(&handle.name, |_, records| records.is_empty());
            tracing::debug!(operation = %handle.name, record = handle.id.0, "unregistered active query");
        }

        removed
    }

    /// Returns the number of active queries registered under `name`.
    #[must_use]
    pub fn active_count(&self, name: &str) -> usize {
        self.inner.buckets.get(name).map_or(0, |records| records.len())
    }

    /// Returns a snapshot of the records registered under `name`.
    #[must_use]
    pub fn records(&self, name: &str) -> Vec<QueryRecord> {
        self.inner
            .buckets
            .get(name)
            .map(|records| records.value().clone())
            .unwrap_or_default()
    }

    /// Returns the operation names that currently have active queries.
    #[must_use]
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .buckets
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Returns `true` if no query is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.buckets.iter().all(|entry| entry.value().is_empty())
    }

    /// Removes every record.
    ///
    /// Outstanding [`Registration`] guards stay valid; dropping them afterwards is a
    /// no-op.
    pub fn clear(&self) {
        self.inner.buckets.clear();
        tracing::debug!("cleared query registry");
    }

    /// Collects the refetch callbacks of the records under `name` whose variables
    /// contain `filter`. No filter selects every record.
    pub(crate) fn matching(
        &self,
        name: &str,
        filter: Option<&Variables>,
    ) -> Vec<(RecordId, RefetchFn)> {
        let Some(records) = self.inner.buckets.get(name) else {
            return Vec::new();
        };

        records
            .value()
            .iter()
            .filter(|record| filter.is_none_or(|filter| is_match(&record.variables, filter)))
            .map(|record| (record.id, record.refetch.clone()))
            .collect()
    }
}

/// Identifies a registered record for [`QueryRegistry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    name: String,
    id: RecordId,
}

impl RegistrationHandle {
    /// The operation name the record was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier of the record.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }
}

/// Owns a record in a [`QueryRegistry`] and removes it when dropped.
#[must_use = "dropping a Registration unregisters the query immediately"]
#[derive(Debug)]
pub struct Registration {
    registry: Weak<Inner>,
    handle: RegistrationHandle,
    variables: Variables,
}

impl Registration {
    /// The handle of the owned record.
    pub const fn handle(&self) -> &RegistrationHandle {
        &self.handle
    }

    /// The variables snapshot the record was registered with.
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Removes the record now instead of on drop.
    pub fn unregister(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            QueryRegistry::remove(&inner, &self.handle);
        }
    }
}
