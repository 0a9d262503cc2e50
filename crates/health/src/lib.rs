//! # Facet Health
//!
//! Stateless detectors over a catalog and its latest index.
//!
//! | category      | detectors                                   |
//! |---------------|---------------------------------------------|
//! | `overload`    | test overload                               |
//! | `structural`  | orphan, hierarchy violation, empty          |
//! | `consistency` | status mismatch (needs an index)            |
//! | `overlap`     | code overlap (needs an index)               |
//!
//! Defects are findings, not errors: every other part of the system keeps working on an
//! imperfect graph, and checking is opt-in.

mod category;
mod detectors;
mod error;
mod report;

pub use category::CheckCategory;
pub use detectors::{code_overlap, status_mismatch, structural, test_overload};
pub use error::{HealthError, Result};
pub use report::{Finding, FindingKind, HealthReport, SkippedCheck};

use facet_catalog::Catalog;
use facet_indexer::TraceIndex;

pub struct HealthChecker<'a> {
    catalog: &'a Catalog,
    index: Option<&'a TraceIndex>,
}

impl<'a> HealthChecker<'a> {
    /// `index` is `None` before the first build; index-backed categories are then skipped.
    pub fn new(catalog: &'a Catalog, index: Option<&'a TraceIndex>) -> Self {
        Self { catalog, index }
    }

    pub fn run(&self, categories: &[CheckCategory]) -> HealthReport {
        let mut report = HealthReport::default();
        for &category in categories {
            if category.requires_index() && self.index.is_none() {
                report.skipped.push(SkippedCheck {
                    category,
                    reason: "no index has been built yet".to_string(),
                });
                continue;
            }
            let findings = match (category, self.index) {
                (CheckCategory::Overload, _) => test_overload(self.catalog),
                (CheckCategory::Structural, _) => structural(self.catalog),
                (CheckCategory::Consistency, Some(index)) => status_mismatch(self.catalog, index),
                (CheckCategory::Overlap, Some(index)) => code_overlap(self.catalog, index),
                (_, None) => Vec::new(),
            };
            log::debug!("{category}: {} finding(s)", findings.len());
            report.checked.push(category);
            report.findings.extend(findings);
        }
        report
    }

    pub fn run_all(&self) -> HealthReport {
        self.run(&CheckCategory::ALL)
    }
}
