//! Parsed GraphQL query documents.
//!
//! Refetch targets may point at a query by handing over the document itself instead
//! of its operation name. [`QueryDocument`] parses the source once and exposes the
//! name the document declares for its operation.

use std::fmt;

use graphql_parser::query::{Definition, Document, OperationDefinition, parse_query};
use thiserror::Error;

/// Error returned when a GraphQL document cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid GraphQL document: {0}")]
    Parse(String),
}

/// A parsed, executable GraphQL document.
///
/// # Example
///
/// ```
/// use refetch::document::QueryDocument;
///
/// let doc = QueryDocument::parse("query GetUser($id: ID!) { user(id: $id) { name } }")?;
/// assert_eq!(doc.operation_name(), Some("GetUser"));
/// # Ok::<(), refetch::document::DocumentError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    ast: Document<'static, String>,
}

impl QueryDocument {
    /// Parses `src` as a GraphQL executable document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Parse`] if `src` is not valid GraphQL.
    pub fn parse(src: &str) -> Result<Self, DocumentError> {
        let ast = parse_query::<String>(src)
            .map_err(|e| DocumentError::Parse(e.to_string()))?
            .into_static();
        Ok(Self { ast })
    }

    /// Returns the name of the first named operation in the document.
    ///
    /// Fragment definitions and anonymous operations (including the `{ ... }`
    /// shorthand) are skipped, so a document without any named operation yields `None`.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.ast.definitions.iter().find_map(|def| match def {
            Definition::Operation(op) => match op {
                OperationDefinition::Query(q) => q.name.as_deref(),
                OperationDefinition::Mutation(m) => m.name.as_deref(),
                OperationDefinition::Subscription(s) => s.name.as_deref(),
                OperationDefinition::SelectionSet(_) => None,
            },
            Definition::Fragment(_) => None,
        })
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ast)
    }
}
