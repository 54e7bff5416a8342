//! Refetching active queries by target.
//!
//! [`refetch_queries`] turns a list of [`RefetchTarget`]s into refetch calls on the
//! matching records of a [`QueryRegistry`]:
//!
//! 1. Each target is resolved to an operation name; targets without one match nothing
//! 2. The records registered under that name are filtered by the target's variables
//! 3. Every matching record's callback is invoked once, even if several targets match it
//! 4. The returned future waits for all refetches concurrently and fails on the first error
//!
//! Unknown operation names are not an error: they simply contribute no refetch.
//!
//! Matches are deduplicated per dispatch. A record selected by both `"GetUser"` and
//! `{ query: "GetUser", variables: { id: 1 } }` is refetched once, not once per
//! target that selects it.

use std::collections::HashSet;

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};

use crate::query::QueryError;
use crate::registry::QueryRegistry;
use crate::target::RefetchTarget;

/// Refetches every active query in `registry` matched by `targets`.
///
/// The registry is read and all refetches are started before this function returns;
/// the returned future only waits for them. It resolves to the number of refetched
/// queries, or to the first error any refetch reports.
///
/// # Example
///
/// ```
/// use futures::FutureExt;
/// use refetch::prelude::*;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), QueryError> {
/// let registry = QueryRegistry::new();
/// let _a = registry.register("GetUser", variables(json!({ "id": 1 })), || async { Ok(()) }.boxed());
/// let _b = registry.register("GetUser", variables(json!({ "id": 2 })), || async { Ok(()) }.boxed());
///
/// let only_first = refetch_queries(
///     &registry,
///     [RefetchTarget::filtered("GetUser", variables(json!({ "id": 1 })))],
/// );
/// assert_eq!(only_first.await?, 1);
/// assert_eq!(refetch_queries(&registry, ["GetUser"]).await?, 2);
/// # Ok(())
/// # }
/// ```
pub fn refetch_queries<T>(
    registry: &QueryRegistry,
    targets: impl IntoIterator<Item = T>,
) -> BoxFuture<'static, Result<usize, QueryError>>
where
    T: Into<RefetchTarget>,
{
    let mut seen = HashSet::new();
    let mut pending = Vec::new();

    for target in targets.into_iter().map(Into::<RefetchTarget>::into) {
        let Some(name) = target.operation_name() else {
            tracing::debug!(?target, "refetch target has no operation name, skipping");
            continue;
        };

        for (id, refetch) in registry.matching(name, target.filter()) {
            if seen.insert(id) {
                tracing::trace!(operation = %name, record = ?id, "refetching active query");
                pending.push(refetch());
            }
        }
    }

    let count = pending.len();
    tracing::debug!(count, "dispatched refetches");

    try_join_all(pending).map(move |result| result.map(|_| count)).boxed()
}

impl QueryRegistry {
    /// Refetches every active query matched by `targets`.
    ///
    /// See [`refetch_queries`].
    pub fn refetch_queries<T>(
        &self,
        targets: impl IntoIterator<Item = T>,
    ) -> BoxFuture<'static, Result<usize, QueryError>>
    where
        T: Into<RefetchTarget>,
    {
        refetch_queries(self, targets)
    }
}
