use crate::model::{Catalog, Node, NodeKind, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate metrics over a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub goals: usize,
    pub expectations: usize,
    pub facets: usize,
    pub passing_facets: usize,
    pub failing_facets: usize,
    /// Expectations whose computed status is passing.
    pub satisfied: usize,
    pub unsatisfied: usize,
    /// Passing facets over all facets, in percent, one decimal.
    pub coverage: f64,
}

/// Computed status for every node of a catalog.
///
/// Facets report their stored status. Goals and expectations aggregate over their
/// direct children: any failing child fails the node, all-passing (with at least one
/// child) passes it, anything else is untested.
pub struct StatusView<'a> {
    catalog: &'a Catalog,
    statuses: HashMap<&'a str, Status>,
}

impl<'a> StatusView<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let children = catalog.children_index();
        let mut statuses = HashMap::with_capacity(catalog.nodes.len());
        let mut in_progress = Vec::new();
        for pos in 0..catalog.nodes.len() {
            resolve(catalog, &children, pos, &mut statuses, &mut in_progress);
        }
        Self { catalog, statuses }
    }

    /// Computed status of `id`; unknown ids are untested.
    pub fn status(&self, id: &str) -> Status {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn summary(&self) -> Summary {
        let count = |kind| self.catalog.nodes_of(kind).count();
        let facets = count(NodeKind::Facet);
        let facet_with = |status| {
            self.catalog
                .facets()
                .filter(|f| f.stored_status() == Some(status))
                .count()
        };
        let passing_facets = facet_with(Status::Passing);
        let failing_facets = facet_with(Status::Failing);
        let expectations = count(NodeKind::Expectation);
        let satisfied = self
            .catalog
            .nodes_of(NodeKind::Expectation)
            .filter(|e| self.status(&e.id) == Status::Passing)
            .count();

        Summary {
            goals: count(NodeKind::Goal),
            expectations,
            facets,
            passing_facets,
            failing_facets,
            satisfied,
            unsatisfied: expectations - satisfied,
            coverage: coverage_percent(passing_facets, facets),
        }
    }

    /// Most urgent expectation that is not yet passing.
    ///
    /// Ordered by expectation priority, then the parent goal's priority, then catalog order.
    pub fn next_unsatisfied(&self) -> Option<&'a Node> {
        self.catalog
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind() == NodeKind::Expectation)
            .filter(|(_, n)| self.status(&n.id) != Status::Passing)
            .min_by_key(|(pos, n)| {
                let goal_priority = n
                    .parent
                    .as_deref()
                    .and_then(|p| self.catalog.get(p))
                    .and_then(Node::priority)
                    .unwrap_or(i32::MAX);
                (n.priority().unwrap_or(0), goal_priority, *pos)
            })
            .map(|(_, n)| n)
    }
}

/// Computed status of a single node.
pub fn compute_status(catalog: &Catalog, id: &str) -> Status {
    StatusView::new(catalog).status(id)
}

fn resolve<'a>(
    catalog: &'a Catalog,
    children: &HashMap<&str, Vec<usize>>,
    pos: usize,
    statuses: &mut HashMap<&'a str, Status>,
    in_progress: &mut Vec<usize>,
) -> Status {
    let node = &catalog.nodes[pos];
    if let Some(status) = statuses.get(node.id.as_str()) {
        return *status;
    }
    if let Some(stored) = node.stored_status() {
        statuses.insert(node.id.as_str(), stored);
        return stored;
    }
    // A parent cycle in a hand-edited catalog; the revisited node counts as untested.
    if in_progress.contains(&pos) {
        return Status::Untested;
    }

    in_progress.push(pos);
    let child_statuses: Vec<Status> = children
        .get(node.id.as_str())
        .map(|kids| {
            kids.iter()
                .map(|&child| resolve(catalog, children, child, statuses, in_progress))
                .collect()
        })
        .unwrap_or_default();
    in_progress.pop();

    let status = aggregate(&child_statuses);
    statuses.insert(node.id.as_str(), status);
    status
}

/// Aggregation rule over direct children.
pub fn aggregate(children: &[Status]) -> Status {
    if children.contains(&Status::Failing) {
        Status::Failing
    } else if !children.is_empty() && children.iter().all(|s| *s == Status::Passing) {
        Status::Passing
    } else {
        Status::Untested
    }
}

/// Percentage rounded to one decimal; zero when there is nothing to measure.
pub fn coverage_percent(passing: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = passing as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewNode;
    use pretty_assertions::assert_eq;

    fn scenario() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "goal")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "one").parent("g-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "two").parent("g-001"))
            .unwrap();
        for parent in ["e-001", "e-001", "e-002"] {
            catalog
                .add(NewNode::new(NodeKind::Facet, "facet").parent(parent))
                .unwrap();
        }
        catalog
    }

    #[test]
    fn coverage_rounds_halves_away_from_zero() {
        assert_eq!(coverage_percent(0, 0), 0.0);
        assert_eq!(coverage_percent(1, 16), 6.3);
        assert_eq!(coverage_percent(2, 3), 66.7);
        assert_eq!(coverage_percent(3, 3), 100.0);
    }

    #[test]
    fn aggregation_rule() {
        assert_eq!(aggregate(&[]), Status::Untested);
        assert_eq!(aggregate(&[Status::Passing]), Status::Passing);
        assert_eq!(
            aggregate(&[Status::Passing, Status::Untested]),
            Status::Untested
        );
        assert_eq!(
            aggregate(&[Status::Untested, Status::Failing, Status::Passing]),
            Status::Failing
        );
    }

    #[test]
    fn end_to_end_metrics_and_next() {
        let mut catalog = scenario();
        catalog.mark("f-001", Status::Passing).unwrap();
        catalog.mark("f-002", Status::Passing).unwrap();

        let view = StatusView::new(&catalog);
        let summary = view.summary();
        assert_eq!(summary.satisfied, 1);
        assert_eq!(summary.unsatisfied, 1);
        assert_eq!(summary.coverage, 66.7);
        assert_eq!(view.status("g-001"), Status::Untested);
        assert_eq!(view.next_unsatisfied().map(|n| n.id.as_str()), Some("e-002"));

        catalog.mark("f-003", Status::Passing).unwrap();
        let view = StatusView::new(&catalog);
        let summary = view.summary();
        assert_eq!(summary.coverage, 100.0);
        assert_eq!(summary.satisfied + summary.unsatisfied, summary.expectations);
        assert_eq!(view.status("g-001"), Status::Passing);
        assert!(view.next_unsatisfied().is_none());
    }

    #[test]
    fn failing_facet_propagates_to_goal() {
        let mut catalog = scenario();
        catalog.mark("f-003", Status::Failing).unwrap();
        let view = StatusView::new(&catalog);
        assert_eq!(view.status("e-002"), Status::Failing);
        assert_eq!(view.status("g-001"), Status::Failing);
        assert_eq!(view.status("e-001"), Status::Untested);
    }

    #[test]
    fn empty_catalog_has_zero_coverage() {
        let catalog = Catalog::new();
        let summary = StatusView::new(&catalog).summary();
        assert_eq!(summary.coverage, 0.0);
        assert_eq!(summary.unsatisfied, 0);
    }

    #[test]
    fn empty_expectation_is_untested() {
        let mut catalog = scenario();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "empty").parent("g-001"))
            .unwrap();
        assert_eq!(compute_status(&catalog, "e-003"), Status::Untested);
    }

    #[test]
    fn next_prefers_lower_priority_value() {
        let mut catalog = scenario();
        catalog
            .add(
                NewNode::new(NodeKind::Expectation, "urgent")
                    .parent("g-001")
                    .priority(-1),
            )
            .unwrap();
        let view = StatusView::new(&catalog);
        assert_eq!(view.next_unsatisfied().map(|n| n.id.as_str()), Some("e-003"));
    }

    #[test]
    fn parent_cycle_does_not_recurse_forever() {
        let mut catalog = scenario();
        catalog.nodes[0].parent = Some("e-001".to_string());
        let view = StatusView::new(&catalog);
        assert_eq!(view.status("e-001"), Status::Untested);
    }
}
