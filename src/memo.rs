use crate::matcher::maps_equal;
use crate::target::Variables;

/// Holds the last accepted variables of a query.
///
/// Callers tend to rebuild their variables on every update even when nothing
/// changed. `VariablesMemo` only accepts a new value when it differs structurally
/// from the current one, so the owner re-registers its query only on real changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablesMemo {
    current: Variables,
    revision: u64,
}

impl VariablesMemo {
    #[must_use]
    pub const fn new(variables: Variables) -> Self {
        Self {
            current: variables,
            revision: 0,
        }
    }

    /// The last accepted variables.
    #[must_use]
    pub const fn current(&self) -> &Variables {
        &self.current
    }

    /// Bumped every time [`update`](Self::update) accepts a new value.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the current variables if `next` is structurally different.
    ///
    /// Returns `true` if the value changed.
    pub fn update(&mut self, next: Variables) -> bool {
        if maps_equal(&self.current, &next) {
            return false;
        }

        self.current = next;
        self.revision += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::variables;
    use serde_json::json;

    #[test]
    fn test_equal_variables_are_ignored() {
        let mut memo = VariablesMemo::new(variables(json!({ "id": 1, "tags": ["a"] })));
        assert!(!memo.update(variables(json!({ "tags": ["a"], "id": 1 }))));
        assert!(!memo.update(variables(json!({ "id": 1.0, "tags": ["a"] }))));
        assert_eq!(memo.revision(), 0);
    }

    #[test]
    fn test_changed_variables_are_accepted() {
        let mut memo = VariablesMemo::new(variables(json!({ "id": 1 })));

        assert!(memo.update(variables(json!({ "id": 2 }))));
        assert_eq!(memo.current(), &variables(json!({ "id": 2 })));
        assert_eq!(memo.revision(), 1);

        // a removed key is a change too
        assert!(memo.update(Variables::new()));
        assert!(memo.current().is_empty());
        assert_eq!(memo.revision(), 2);
    }

    #[test]
    fn test_added_key_is_a_change() {
        let mut memo = VariablesMemo::default();
        assert!(memo.update(variables(json!({ "first": 10 }))));
        assert_eq!(memo.revision(), 1);
    }
}
