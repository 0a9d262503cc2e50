use crate::coverage::CoverageReport;
use crate::index::{ForwardMap, ReverseMap, TraceIndex};
use crate::junit::{TestOutcome, TestReport};
use crate::stats::BuildStats;
use facet_catalog::{Catalog, Status};
use std::collections::HashSet;

/// Cross-references a test report and a coverage report through the catalog's
/// facet → test links.
pub struct IndexBuilder<'a> {
    tests: &'a TestReport,
    coverage: &'a CoverageReport,
}

/// Result of a build: the fresh index plus what changed.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub index: TraceIndex,
    pub stats: BuildStats,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(tests: &'a TestReport, coverage: &'a CoverageReport) -> Self {
        Self { tests, coverage }
    }

    /// Builds the index and rewrites linked facet statuses in `catalog`.
    ///
    /// A facet whose test has no result in this run keeps its previous status.
    pub fn build(&self, catalog: &mut Catalog) -> BuildOutcome {
        let mut stats = BuildStats::new();
        stats.tests = self.tests.results.len();
        stats.passed = self.tests.count(TestOutcome::Passed);
        stats.failed = self.tests.count(TestOutcome::Failed);
        stats.skipped = self.tests.skipped;

        let (forward, reverse) = map_coverage(catalog, self.coverage);

        let links = linked_facets(catalog);
        stats.linked_facets = links.len();
        stats.uncovered_facets = links
            .iter()
            .filter(|(id, _)| !reverse.contains_key(id))
            .map(|(id, _)| id.clone())
            .collect();

        let updates: Vec<(String, Status)> = links
            .iter()
            .filter_map(|(id, test)| {
                self.tests.outcome(test).map(|outcome| {
                    let status = match outcome {
                        TestOutcome::Passed => Status::Passing,
                        TestOutcome::Failed => Status::Failing,
                    };
                    (id.clone(), status)
                })
            })
            .collect();

        for (id, to) in updates {
            let from = catalog
                .get(&id)
                .and_then(|n| n.stored_status())
                .unwrap_or_default();
            if from != to {
                stats.add_change(&id, from, to);
            }
            if let Err(err) = catalog.mark(&id, to) {
                log::warn!("could not update {id}: {err}");
            }
        }

        let facet_status = catalog
            .facets()
            .map(|f| (f.id.clone(), f.stored_status().unwrap_or_default()))
            .collect();

        let index = TraceIndex {
            forward,
            reverse,
            test_results: self.tests.results.clone(),
            facet_status,
        };
        stats.covered_files = index.forward.len();
        stats.covered_lines = index.covered_lines();

        BuildOutcome { index, stats }
    }
}

/// Forward and reverse maps for every linked facet found in `coverage`.
pub fn map_coverage(catalog: &Catalog, coverage: &CoverageReport) -> (ForwardMap, ReverseMap) {
    let by_test = coverage.by_test();
    let mut forward = ForwardMap::new();
    let mut reverse = ReverseMap::new();

    for (id, test) in linked_facets(catalog) {
        let Some(hits) = by_test.get(test.as_str()) else {
            continue;
        };
        for (file, lines) in hits {
            if lines.is_empty() {
                continue;
            }
            let by_line = forward.entry((*file).to_string()).or_default();
            for line in lines.iter() {
                by_line.entry(*line).or_default().push(id.clone());
            }
            reverse
                .entry(id.clone())
                .or_default()
                .entry((*file).to_string())
                .or_default()
                .extend_from_slice(lines);
        }
    }

    for ids in forward.values_mut().flat_map(|by_line| by_line.values_mut()) {
        ids.sort();
        ids.dedup();
    }
    for lines in reverse.values_mut().flat_map(|by_file| by_file.values_mut()) {
        lines.sort_unstable();
        lines.dedup();
    }
    (forward, reverse)
}

/// (facet id, test id) for facets with a non-empty link, in catalog order.
fn linked_facets(catalog: &Catalog) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    catalog
        .facets()
        .filter_map(|f| f.test().map(|t| (f.id.clone(), t.to_string())))
        .filter(|(id, _)| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::junit::parse_junit;
    use facet_catalog::{NewNode, NodeKind};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "g")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "e").parent("g-001"))
            .unwrap();
        for _ in 0..3 {
            catalog
                .add(NewNode::new(NodeKind::Facet, "f").parent("e-001"))
                .unwrap();
        }
        catalog.link("f-001", "t::shared").unwrap();
        catalog.link("f-002", "t::shared").unwrap();
        catalog.link("f-003", "t::absent").unwrap();
        catalog
    }

    fn coverage() -> CoverageReport {
        CoverageReport::parse(
            br#"{"files": {"src/lib.rs": {"contexts": {"t::shared": [3, 1, 2, 2]}}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn shared_test_covers_lines_for_both_facets() {
        let catalog = catalog();
        let (forward, reverse) = map_coverage(&catalog, &coverage());
        assert_eq!(forward["src/lib.rs"][&1], vec!["f-001", "f-002"]);
        assert_eq!(forward["src/lib.rs"].len(), 3);
        assert_eq!(reverse["f-001"]["src/lib.rs"], vec![1, 2, 3]);
        assert_eq!(reverse["f-002"]["src/lib.rs"], vec![1, 2, 3]);
        assert!(!reverse.contains_key("f-003"));
    }

    #[test]
    fn results_rewrite_only_linked_facets_with_results() {
        let mut catalog = catalog();
        catalog.mark("f-003", Status::Passing).unwrap();
        let tests = parse_junit(
            r#"<testsuite><testcase classname="t" name="shared"><failure/></testcase></testsuite>"#,
        )
        .unwrap();
        let cov = coverage();
        let outcome = IndexBuilder::new(&tests, &cov).build(&mut catalog);

        assert_eq!(catalog.get("f-001").unwrap().stored_status(), Some(Status::Failing));
        assert_eq!(catalog.get("f-002").unwrap().stored_status(), Some(Status::Failing));
        // absent from the report: not evidence of failure
        assert_eq!(catalog.get("f-003").unwrap().stored_status(), Some(Status::Passing));

        assert_eq!(outcome.stats.status_changes.len(), 2);
        assert_eq!(outcome.stats.linked_facets, 3);
        assert_eq!(outcome.stats.uncovered_facets, vec!["f-003"]);
        assert_eq!(outcome.index.facet_status["f-003"], Status::Passing);
        assert_eq!(outcome.index.implied_status("t::shared"), Some(Status::Failing));
    }
}
