//! Source locations attached to diagnostics.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// A position inside a compilation unit.
///
/// `order` is the pre-order index of the syntax node, so sorting by it
/// follows document order. `path` is the human-readable route to the node
/// inside the unit file (e.g. `items[0].body[1].value`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Name of the compilation unit.
    pub unit: String,
    /// Document-order index of the node.
    pub order: u32,
    /// Path to the node inside the unit file.
    pub path: String,
}

impl Location {
    pub fn new(unit: impl Into<String>, order: u32, path: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            order,
            path: path.into(),
        }
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unit
            .cmp(&other.unit)
            .then(self.order.cmp(&other.order))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.unit)
        } else {
            write!(f, "{}:{}", self.unit, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_orders_by_document_position() {
        let early = Location::new("main", 3, "items[0].body[0]");
        let late = Location::new("main", 12, "items[1]");

        assert!(early < late);
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new("main", 3, "items[0].name");
        assert_eq!(loc.to_string(), "main:items[0].name");
        assert_eq!(Location::new("main", 0, "").to_string(), "main");
    }
}
