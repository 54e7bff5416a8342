//! Partial matching of query variables.
//!
//! A filtered refetch target selects an active query when every key of the filter is
//! present in the query's variables with a matching value. Keys the filter does not
//! mention are ignored, and the same rule applies inside nested values:
//!
//! - a nested object matches when it contains the filter's entries
//! - a nested array matches when every filter element matches some element of it,
//!   in any order
//! - scalars must be equal, with numbers compared by value

use serde_json::{Map, Number, Value};

use crate::target::Variables;

/// Returns `true` if `variables` contains every entry of `filter`.
///
/// An empty filter matches any set of variables.
///
/// # Example
///
/// ```
/// use refetch::matcher::is_match;
/// use refetch::target::variables;
/// use serde_json::json;
///
/// let vars = variables(json!({ "id": 1, "where": { "status": "open", "first": 10 } }));
/// assert!(is_match(&vars, &variables(json!({ "where": { "status": "open" } }))));
/// assert!(!is_match(&vars, &variables(json!({ "id": 2 }))));
/// ```
#[must_use]
pub fn is_match(variables: &Variables, filter: &Variables) -> bool {
    map_contains(variables, filter)
}

fn map_contains(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, expected)| {
        actual
            .get(key)
            .is_some_and(|actual| value_contains(actual, expected))
    })
}

fn value_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(xs), Value::Object(ys)) => map_contains(xs, ys),
        (Value::Array(xs), Value::Array(ys)) => {
            ys.iter().all(|y| xs.iter().any(|x| value_contains(x, y)))
        }
        _ => values_equal(actual, expected),
    }
}

/// Deep structural equality over JSON values.
///
/// Numbers are compared by value, so `1` and `1.0` are equal. Object key order is
/// irrelevant and arrays are compared element-wise.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => maps_equal(xs, ys),
        _ => a == b,
    }
}

/// Deep structural equality over two JSON objects.
#[must_use]
pub fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, x)| b.get(k).is_some_and(|y| values_equal(x, y)))
}

#[allow(clippy::float_cmp)]
fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
