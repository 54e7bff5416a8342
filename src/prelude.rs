//! Prelude module for convenient imports.
//!
//! ```
//! use refetch::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`QueryRegistry`] - Bookkeeping of active queries
//! - [`WatchedQuery`] - A self-registering query
//! - [`Mutation`] - A mutation that refetches queries on success
//! - [`RefetchTarget`] - Selects queries to refetch
//! - [`refetch_queries`] - Refetches queries outside of a mutation

pub use crate::config::MutationConfig;
pub use crate::dispatch::refetch_queries;
pub use crate::document::QueryDocument;
pub use crate::mutation::{Mutation, MutationError, MutationResult, MutationState};
pub use crate::query::{QueryError, QueryResult, QueryState, WatchedQuery};
pub use crate::registry::{QueryRegistry, Registration};
pub use crate::target::{RefetchTarget, Variables, variables};
