//! # Refetch - declarative refetching of active GraphQL queries
//!
//! Refetch lets application code ask for previously issued queries to be executed
//! again, typically after a mutation, by naming them instead of holding on to them.
//! Queries are selected by operation name and, optionally, by a partial match on
//! their variables.
//!
//! ## Architecture
//!
//! 1. **Registry**: every active query registers its operation name, its current
//!    variables and a refetch callback in a [`QueryRegistry`](registry::QueryRegistry)
//! 2. **Targets**: a [`RefetchTarget`](target::RefetchTarget) names an operation
//!    (literally or through its document) and may carry a variables filter
//! 3. **Dispatch**: [`refetch_queries`](dispatch::refetch_queries) finds the records
//!    matching a list of targets, refetches them concurrently and waits for all
//!
//! ## Core Components
//!
//! - [`WatchedQuery`](query::WatchedQuery): A query that stays registered while alive
//! - [`Mutation`](mutation::Mutation): A mutation that refetches targets on success
//! - [`QueryRegistry`](registry::QueryRegistry): The active-query bookkeeping
//! - [`QueryDocument`](document::QueryDocument): A parsed GraphQL document
//!
//! ## Example
//!
//! ```rust
//! use futures::FutureExt;
//! use refetch::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = QueryRegistry::new();
//!
//! let user = WatchedQuery::new(
//!     &registry,
//!     "GetUser",
//!     variables(json!({ "id": 1 })),
//!     |vars| async move { Ok::<_, QueryError>(vars["id"].clone()) }.boxed(),
//! )?;
//!
//! let update_user = Mutation::new(&registry, |_name: String| async { Ok::<_, QueryError>(()) }.boxed())
//!     .refetch_queries([RefetchTarget::filtered("GetUser", variables(json!({ "id": 1 })))])
//!     .with_config(MutationConfig::new(true));
//!
//! update_user.mutate("Ada".to_string()).await?;
//! assert_eq!(user.result().data(), Some(&json!(1)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod document;
pub mod matcher;
pub mod memo;
pub mod mutation;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod target;
