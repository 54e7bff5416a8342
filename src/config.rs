/// Configuration for mutation behavior.
///
/// This controls how a mutation waits for the queries it refetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationConfig {
    /// Whether a mutation waits for its refetches before completing.
    ///
    /// When `true`, the mutation completes after every refetch settled and fails if
    /// any refetch fails. When `false`, refetches run in the background on the tokio
    /// runtime and their failures are only logged; without a runtime they are awaited
    /// inline instead.
    pub await_refetch_queries: bool,
}

impl MutationConfig {
    /// Creates a new mutation configuration.
    #[must_use]
    pub const fn new(await_refetch_queries: bool) -> Self {
        Self {
            await_refetch_queries,
        }
    }
}
