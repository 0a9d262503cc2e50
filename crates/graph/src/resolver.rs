use crate::types::{MotivationNode, MotivationTree};
use facet_catalog::{Catalog, StatusView};
use facet_indexer::TraceIndex;
use std::ops::RangeInclusive;

/// Answers "why does this code exist?" from the catalog and the latest index.
///
/// Queries are pure: the same catalog, index and location always yield the same result,
/// so callers can diff answers against their own caches.
pub struct MotivationResolver<'a> {
    catalog: &'a Catalog,
    index: &'a TraceIndex,
    statuses: StatusView<'a>,
}

impl<'a> MotivationResolver<'a> {
    pub fn new(catalog: &'a Catalog, index: &'a TraceIndex) -> Self {
        Self {
            catalog,
            index,
            statuses: StatusView::new(catalog),
        }
    }

    /// Facets whose tests cover `file`, optionally only within `lines` (inclusive).
    ///
    /// Ids the index still holds but the catalog no longer does are left out.
    pub fn related_facets(&self, file: &str, lines: Option<RangeInclusive<u32>>) -> Vec<String> {
        let mut facets = self.index.facets_at(file, lines);
        facets.retain(|id| self.catalog.contains(id));
        facets
    }

    /// Covering facets merged with their ancestor chains into one tree.
    pub fn motivation_tree(
        &self,
        file: &str,
        lines: Option<RangeInclusive<u32>>,
    ) -> MotivationTree {
        let facets = self.related_facets(file, lines);
        self.tree_for(&facets)
    }

    /// Tree for an explicit set of node ids.
    pub fn tree_for(&self, ids: &[String]) -> MotivationTree {
        let mut tree = MotivationTree::new();
        for id in ids {
            let Ok(chain) = self.catalog.ancestor_chain(id) else {
                log::debug!("index references {id}, which is no longer in the catalog");
                continue;
            };
            tree.add_chain(
                chain
                    .into_iter()
                    .map(|node| MotivationNode::from_node(node, self.statuses.status(&node.id)))
                    .collect(),
            );
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_catalog::{NewNode, NodeKind, Status};
    use pretty_assertions::assert_eq;

    fn fixture() -> (Catalog, TraceIndex) {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "Sync")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "Merges").parent("g-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "Deletes").parent("g-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "lww").parent("e-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "vector clock").parent("e-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "tombstone").parent("e-002"))
            .unwrap();
        catalog.mark("f-001", Status::Passing).unwrap();

        let mut index = TraceIndex::default();
        let by_line = index.forward.entry("src/sync.rs".to_string()).or_default();
        by_line.insert(10, vec!["f-001".to_string(), "f-002".to_string()]);
        by_line.insert(11, vec!["f-002".to_string()]);
        by_line.insert(40, vec!["f-003".to_string()]);
        (catalog, index)
    }

    #[test]
    fn shared_expectation_appears_once() {
        let (catalog, index) = fixture();
        let resolver = MotivationResolver::new(&catalog, &index);
        let tree = resolver.motivation_tree("src/sync.rs", Some(10..=11));

        let rendered = tree.render();
        assert_eq!(rendered.matches("e-001").count(), 1);
        assert_eq!(rendered.matches("g-001").count(), 1);
        assert_eq!(
            rendered,
            "G g-001 [untested] Sync\n  E e-001 [untested] Merges\n    F f-001 [passing] lww\n    F f-002 [untested] vector clock\n"
        );
    }

    #[test]
    fn whole_file_spans_both_expectations() {
        let (catalog, index) = fixture();
        let resolver = MotivationResolver::new(&catalog, &index);
        assert_eq!(
            resolver.related_facets("src/sync.rs", None),
            vec!["f-001", "f-002", "f-003"]
        );

        let nested = resolver.motivation_tree("src/sync.rs", None).to_nested();
        assert_eq!(nested.len(), 1);
        let expectations: Vec<&str> = nested[0]
            .children
            .iter()
            .map(|c| c.node.id.as_str())
            .collect();
        assert_eq!(expectations, vec!["e-001", "e-002"]);
        assert_eq!(nested[0].children[0].children.len(), 2);
    }

    #[test]
    fn queries_are_idempotent_and_tolerate_stale_ids() {
        let (mut catalog, index) = fixture();
        catalog.remove("f-003", false).unwrap();
        let resolver = MotivationResolver::new(&catalog, &index);
        let first = resolver.motivation_tree("src/sync.rs", None).render();
        let second = resolver.motivation_tree("src/sync.rs", None).render();
        assert_eq!(first, second);
        assert!(!first.contains("f-003"));
        assert!(!first.contains("e-002"));
        assert_eq!(
            resolver.related_facets("src/sync.rs", None),
            vec!["f-001", "f-002"]
        );
        assert!(resolver.motivation_tree("src/other.rs", None).is_empty());
    }

    #[test]
    fn nested_json_carries_kind_and_status() {
        let (catalog, index) = fixture();
        let resolver = MotivationResolver::new(&catalog, &index);
        let nested = resolver.motivation_tree("src/sync.rs", Some(10..=10)).to_nested();
        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json[0]["kind"], "goal");
        assert_eq!(json[0]["children"][0]["children"][0]["status"], "passing");
    }
}
