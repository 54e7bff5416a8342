//! Refetch targets.
//!
//! A [`RefetchTarget`] names the active queries a dispatch should refetch. It is
//! either a bare operation name, or an operation (by name or by document) paired
//! with an optional partial-variables filter.
//!
//! # Wire format
//!
//! Targets deserialize from the shape callers exchange as JSON: either a bare string
//! or an object `{ "query": ..., "variables"?: { ... } }`.
//!
//! ```
//! use refetch::target::RefetchTarget;
//!
//! let targets: Vec<RefetchTarget> = serde_json::from_str(
//!     r#"["ListUsers", { "query": "GetUser", "variables": { "id": 1 } }]"#,
//! )?;
//! assert_eq!(targets[0].operation_name(), Some("ListUsers"));
//! assert_eq!(targets[1].operation_name(), Some("GetUser"));
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{DocumentError, QueryDocument};

/// Variables of a GraphQL operation.
pub type Variables = serde_json::Map<String, Value>;

/// Converts a JSON value into [`Variables`].
///
/// Anything other than a JSON object yields an empty set of variables.
#[must_use]
pub fn variables(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}

/// A reference to an operation, either by its name or by its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OperationRef {
    Name(String),
    Document(QueryDocument),
}

impl OperationRef {
    /// Resolves the operation name.
    ///
    /// Returns `None` for documents that only contain anonymous operations.
    #[must_use]
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Document(doc) => doc.operation_name(),
        }
    }
}

impl TryFrom<String> for OperationRef {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_graphql_name(&value) {
            Ok(Self::Name(value))
        } else {
            QueryDocument::parse(&value).map(Self::Document)
        }
    }
}

impl From<OperationRef> for String {
    fn from(value: OperationRef) -> Self {
        match value {
            OperationRef::Name(name) => name,
            OperationRef::Document(doc) => doc.to_string(),
        }
    }
}

impl From<&str> for OperationRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<QueryDocument> for OperationRef {
    fn from(doc: QueryDocument) -> Self {
        Self::Document(doc)
    }
}

/// Selects active queries to refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefetchTarget {
    /// Every active query with this operation name.
    Name(String),
    /// Active queries of an operation whose variables contain `variables`.
    Filtered {
        query: OperationRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variables: Option<Variables>,
    },
}

impl RefetchTarget {
    /// Targets every active query named `name`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Targets every active query of the operation declared by `doc`.
    #[must_use]
    pub fn document(doc: QueryDocument) -> Self {
        Self::Filtered {
            query: OperationRef::Document(doc),
            variables: None,
        }
    }

    /// Targets the active queries of `query` whose variables contain `filter`.
    ///
    /// # Example
    ///
    /// ```
    /// use refetch::target::{RefetchTarget, variables};
    /// use serde_json::json;
    ///
    /// let target = RefetchTarget::filtered("GetUser", variables(json!({ "id": 1 })));
    /// assert_eq!(target.operation_name(), Some("GetUser"));
    /// ```
    #[must_use]
    pub fn filtered(query: impl Into<OperationRef>, filter: Variables) -> Self {
        Self::Filtered {
            query: query.into(),
            variables: Some(filter),
        }
    }

    /// The operation name this target resolves to, if any.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Filtered { query, .. } => query.resolve(),
        }
    }

    /// The partial-variables filter, if one was given.
    #[must_use]
    pub const fn filter(&self) -> Option<&Variables> {
        match self {
            Self::Name(_) => None,
            Self::Filtered { variables, .. } => variables.as_ref(),
        }
    }
}

impl From<&str> for RefetchTarget {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for RefetchTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<QueryDocument> for RefetchTarget {
    fn from(doc: QueryDocument) -> Self {
        Self::document(doc)
    }
}

/// `/[_A-Za-z][_0-9A-Za-z]*/`
fn is_graphql_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
