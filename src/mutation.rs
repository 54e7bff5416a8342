//! Mutations that refetch active queries when they complete.
//!
//! A [`Mutation`] runs a mutator and, once it succeeds, refetches the active
//! queries named by its refetch targets. Targets come from two places and are
//! combined:
//!
//! - targets configured on the mutation with [`Mutation::refetch_queries`]
//! - targets passed to a single call of [`Mutation::mutate_with`]
//!
//! The `on_completed` callback runs before any refetch starts. A failed mutation
//! refetches nothing.
//!
//! # Example
//!
//! ```
//! use futures::FutureExt;
//! use refetch::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), MutationError> {
//! let registry = QueryRegistry::new();
//!
//! let rename = Mutation::new(&registry, |name: String| {
//!     async move { Ok::<_, QueryError>(name.to_uppercase()) }.boxed()
//! })
//! .refetch_queries(["ListUsers"])
//! .with_config(MutationConfig::new(true));
//!
//! let renamed = rename
//!     .mutate_with(
//!         "ada".to_string(),
//!         vec![RefetchTarget::filtered("GetUser", variables(json!({ "id": 1 })))],
//!     )
//!     .await?;
//! assert_eq!(renamed, "ADA");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::MutationConfig;
use crate::dispatch::refetch_queries;
use crate::query::QueryError;
use crate::registry::QueryRegistry;
use crate::target::RefetchTarget;

/// Error type for mutation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Mutation failed: {0}")]
    Mutation(QueryError),

    #[error("Refetching queries failed: {0}")]
    Refetch(QueryError),
}

/// The state of a mutation result.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    /// Mutation is idle (not yet started).
    Idle,
    /// Mutation is in progress.
    Loading,
    /// Mutation succeeded with a result.
    Success(T),
    /// Mutation failed with an error.
    Error(String),
}

/// A mutation result containing the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult<T> {
    /// The current state of the mutation.
    pub state: MutationState<T>,
}

impl<T> MutationResult<T> {
    /// Returns the result data if the mutation succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns `true` if the mutation is currently loading.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, MutationState::Loading)
    }

    /// Returns `true` if the mutation succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }

    /// Returns `true` if the mutation failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, MutationState::Error(_))
    }
}

type Mutator<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, QueryError>> + Send + Sync>;
type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A mutation that refetches active queries after it succeeds.
pub struct Mutation<I, O> {
    mutator: Mutator<I, O>,
    registry: QueryRegistry,
    targets: Vec<RefetchTarget>,
    config: MutationConfig,
    on_completed: Option<Callback<O>>,
    on_error: Option<Callback<QueryError>>,
    state: Arc<watch::Sender<MutationResult<O>>>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Creates a mutation that refetches queries of `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - The registry holding the queries to refetch
    /// * `mutator` - An async function that performs the mutation
    pub fn new<F>(registry: &QueryRegistry, mutator: F) -> Self
    where
        F: Fn(I) -> BoxFuture<'static, Result<O, QueryError>> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(MutationResult {
            state: MutationState::Idle,
        });

        Self {
            mutator: Arc::new(mutator),
            registry: registry.clone(),
            targets: Vec::new(),
            config: MutationConfig::default(),
            on_completed: None,
            on_error: None,
            state: Arc::new(state),
        }
    }

    /// Adds targets refetched after every successful call.
    #[must_use]
    pub fn refetch_queries<T>(mut self, targets: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<RefetchTarget>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Sets the callback run with the mutation's data before refetching.
    #[must_use]
    pub fn on_completed(mut self, f: impl Fn(&O) + Send + Sync + 'static) -> Self {
        self.on_completed = Some(Arc::new(f));
        self
    }

    /// Sets the callback run when the mutator fails.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&QueryError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub const fn with_config(mut self, config: MutationConfig) -> Self {
        self.config = config;
        self
    }

    /// The targets refetched after every successful call.
    #[must_use]
    pub fn targets(&self) -> &[RefetchTarget] {
        &self.targets
    }

    /// Runs the mutation and refetches the configured targets.
    ///
    /// # Errors
    ///
    /// See [`mutate_with`](Self::mutate_with).
    pub async fn mutate(&self, input: I) -> Result<O, MutationError> {
        self.mutate_with(input, Vec::new()).await
    }

    /// Runs the mutation and refetches the configured targets plus `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Mutation`] if the mutator fails, or
    /// [`MutationError::Refetch`] if refetches are awaited and one of them fails.
    ///
    /// Background refetches are spawned on the current tokio runtime. Outside of one
    /// they are awaited before returning, and their failures are still only logged.
    pub async fn mutate_with(
        &self,
        input: I,
        targets: Vec<RefetchTarget>,
    ) -> Result<O, MutationError> {
        self.publish(MutationState::Loading);

        let data = match (self.mutator)(input).await {
            Ok(data) => data,
            Err(e) => {
                self.publish(MutationState::Error(e.to_string()));
                if let Some(on_error) = &self.on_error {
                    on_error(&e);
                }
                return Err(MutationError::Mutation(e));
            }
        };

        if let Some(on_completed) = &self.on_completed {
            on_completed(&data);
        }

        let refetch = refetch_queries(
            &self.registry,
            self.targets.iter().cloned().chain(targets),
        );

        if self.config.await_refetch_queries {
            if let Err(e) = refetch.await {
                self.publish(MutationState::Error(e.to_string()));
                return Err(MutationError::Refetch(e));
            }
        } else {
            let background = async move {
                if let Err(e) = refetch.await {
                    tracing::warn!(error = %e, "background refetch after mutation failed");
                }
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(background);
                }
                Err(_) => {
                    tracing::debug!("no tokio runtime to spawn on, awaiting refetches inline");
                    background.await;
                }
            }
        }

        self.publish(MutationState::Success(data.clone()));
        Ok(data)
    }

    fn publish(&self, state: MutationState<O>) {
        self.state.send_replace(MutationResult { state });
    }

    /// The latest result.
    #[must_use]
    pub fn result(&self) -> MutationResult<O> {
        self.state.borrow().clone()
    }

    /// Subscribes to result updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MutationResult<O>> {
        self.state.subscribe()
    }
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            mutator: self.mutator.clone(),
            registry: self.registry.clone(),
            targets: self.targets.clone(),
            config: self.config,
            on_completed: self.on_completed.clone(),
            on_error: self.on_error.clone(),
            state: self.state.clone(),
        }
    }
}
