use crate::report::{Finding, FindingKind};
use facet_catalog::{Catalog, NodeKind, Status};
use facet_indexer::TraceIndex;
use std::collections::BTreeMap;

/// Two or more facets linked to the same test.
pub fn test_overload(catalog: &Catalog) -> Vec<Finding> {
    let mut by_test: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for facet in catalog.facets() {
        if let Some(test) = facet.test() {
            by_test.entry(test).or_default().push(facet.id.as_str());
        }
    }
    by_test
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(test, ids)| {
            Finding::new(
                FindingKind::TestOverload,
                format!(
                    "{} facets share test `{test}` ({}); a result cannot tell them apart",
                    ids.len(),
                    ids.join(", ")
                ),
                ids.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

/// Orphans, illegal parent/child kind pairings, and expectations without children.
pub fn structural(catalog: &Catalog) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in &catalog.nodes {
        let kind = node.kind();
        match node.parent.as_deref() {
            None if kind != NodeKind::Goal => findings.push(Finding::new(
                FindingKind::Orphan,
                format!("{} ({kind}) has no parent", node.id),
                vec![node.id.clone()],
            )),
            None => {}
            Some(parent_id) => match catalog.get(parent_id) {
                None => findings.push(Finding::new(
                    FindingKind::Orphan,
                    format!(
                        "{} ({kind}) references missing parent {parent_id}",
                        node.id
                    ),
                    vec![node.id.clone()],
                )),
                Some(parent) if kind.expected_parent() != Some(parent.kind()) => {
                    let expected = kind
                        .expected_parent()
                        .map_or("no parent".to_string(), |k| format!("parent kind {k}"));
                    findings.push(Finding::new(
                        FindingKind::HierarchyViolation,
                        format!(
                            "{} ({kind}) is parented to {} ({}); expected {expected}",
                            node.id,
                            parent.id,
                            parent.kind()
                        ),
                        vec![node.id.clone(), parent.id.clone()],
                    ));
                }
                Some(_) => {}
            },
        }
    }

    let children = catalog.children_index();
    for expectation in catalog.nodes_of(NodeKind::Expectation) {
        if !children.contains_key(expectation.id.as_str()) {
            findings.push(Finding::new(
                FindingKind::EmptyExpectation,
                format!("{} has no facets", expectation.id),
                vec![expectation.id.clone()],
            ));
        }
    }
    findings
}

/// Stored facet status that the last test run contradicts.
pub fn status_mismatch(catalog: &Catalog, index: &TraceIndex) -> Vec<Finding> {
    catalog
        .facets()
        .filter_map(|facet| {
            let test = facet.test()?;
            let implied = index.implied_status(test)?;
            let stored = facet.stored_status().unwrap_or_default();
            (stored != implied).then(|| {
                Finding::new(
                    FindingKind::StatusMismatch,
                    format!(
                        "{} is {stored} but its test `{test}` last {}",
                        facet.id,
                        if implied == Status::Passing {
                            "passed"
                        } else {
                            "failed"
                        }
                    ),
                    vec![facet.id.clone()],
                )
            })
        })
        .collect()
}

/// Facets linked to different tests whose coverage lands on the same lines.
///
/// One finding per facet pair, with the number of shared lines and the first location.
pub fn code_overlap(catalog: &Catalog, index: &TraceIndex) -> Vec<Finding> {
    struct Overlap {
        lines: usize,
        first: String,
    }

    let mut pairs: BTreeMap<(&str, &str), Overlap> = BTreeMap::new();
    for (file, by_line) in &index.forward {
        for (line, ids) in by_line {
            if ids.len() < 2 {
                continue;
            }
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i + 1..] {
                    let (Some(test_a), Some(test_b)) = (link_of(catalog, a), link_of(catalog, b))
                    else {
                        continue;
                    };
                    if test_a == test_b {
                        continue;
                    }
                    pairs
                        .entry((a.as_str(), b.as_str()))
                        .and_modify(|o| o.lines += 1)
                        .or_insert_with(|| Overlap {
                            lines: 1,
                            first: format!("{file}:{line}"),
                        });
                }
            }
        }
    }

    pairs
        .into_iter()
        .map(|((a, b), overlap)| {
            Finding::new(
                FindingKind::CodeOverlap,
                format!(
                    "{a} and {b} are linked to different tests but cover {} identical line(s), first at {}",
                    overlap.lines, overlap.first
                ),
                vec![a.to_string(), b.to_string()],
            )
        })
        .collect()
}

fn link_of<'c>(catalog: &'c Catalog, id: &str) -> Option<&'c str> {
    catalog.get(id).and_then(|n| n.test())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_catalog::NewNode;
    use pretty_assertions::assert_eq;

    fn base() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "g")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "e").parent("g-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "a").parent("e-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "b").parent("e-001"))
            .unwrap();
        catalog
    }

    #[test]
    fn overload_names_every_sharing_facet_once() {
        let mut catalog = base();
        catalog.link("f-001", "t::same").unwrap();
        catalog.link("f-002", "t::same").unwrap();
        let findings = test_overload(&catalog);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].nodes, vec!["f-001", "f-002"]);
    }

    #[test]
    fn structural_detects_each_defect() {
        let mut catalog = base();
        catalog
            .add(NewNode::new(NodeKind::Facet, "nested").parent("f-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "empty").parent("g-001"))
            .unwrap();
        catalog.remove("g-001", true).unwrap();

        let findings = structural(&catalog);
        let kinds: Vec<FindingKind> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FindingKind::Orphan,
                FindingKind::HierarchyViolation,
                FindingKind::Orphan,
                FindingKind::EmptyExpectation,
            ]
        );
        assert_eq!(findings[1].nodes, vec!["f-003", "f-001"]);
        assert_eq!(findings[3].nodes, vec!["e-002"]);
    }

    #[test]
    fn mismatch_compares_against_last_results() {
        let mut catalog = base();
        catalog.link("f-001", "t::a").unwrap();
        catalog.mark("f-001", Status::Passing).unwrap();
        catalog.link("f-002", "t::b").unwrap();
        let mut index = TraceIndex::default();
        index
            .test_results
            .insert("t::a".into(), facet_indexer::TestOutcome::Failed);

        let findings = status_mismatch(&catalog, &index);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].nodes, vec!["f-001"]);
    }

    #[test]
    fn overlap_ignores_facets_sharing_a_test() {
        let mut catalog = base();
        catalog
            .add(NewNode::new(NodeKind::Facet, "c").parent("e-001"))
            .unwrap();
        catalog.link("f-001", "t::a").unwrap();
        catalog.link("f-002", "t::a").unwrap();
        catalog.link("f-003", "t::c").unwrap();

        let mut index = TraceIndex::default();
        let by_line = index.forward.entry("src/x.rs".into()).or_default();
        by_line.insert(1, vec!["f-001".into(), "f-002".into()]);
        by_line.insert(2, vec!["f-001".into(), "f-003".into()]);
        by_line.insert(3, vec!["f-001".into(), "f-003".into()]);

        let findings = code_overlap(&catalog, &index);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].nodes, vec!["f-001", "f-003"]);
        assert!(findings[0].description.contains("2 identical line(s)"));
        assert!(findings[0].description.contains("src/x.rs:2"));
    }
}
