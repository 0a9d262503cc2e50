use facet_catalog::Status;
use serde::{Deserialize, Serialize};

/// A facet whose stored status was rewritten by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub from: Status,
    pub to: Status,
}

/// Statistics about one index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Test cases with a result
    pub tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Facets carrying a test link
    pub linked_facets: usize,

    /// Linked facets whose test had no coverage contexts
    pub uncovered_facets: Vec<String>,

    pub covered_files: usize,
    pub covered_lines: usize,

    pub status_changes: Vec<StatusChange>,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change(&mut self, id: &str, from: Status, to: Status) {
        self.status_changes.push(StatusChange {
            id: id.to_string(),
            from,
            to,
        });
    }
}
