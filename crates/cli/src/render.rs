use facet_catalog::{Node, NodeKind, StatusView, Summary};
use facet_indexer::{FileProjectionSummary, TraceIndex};
use std::collections::HashSet;

/// Whole hierarchy, catalog order among siblings.
///
/// Goals form the rooted tree. Every node not reached from a goal (missing parent,
/// parentless non-goal, cycle) is rendered afterwards under an `orphaned` heading.
pub(crate) fn render_tree(view: &StatusView<'_>) -> String {
    let catalog = view.catalog();
    let children = catalog.children_index();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut out = String::new();

    let walk = |start: usize, out: &mut String, visited: &mut HashSet<usize>| {
        let mut stack = vec![(start, 0usize)];
        while let Some((pos, depth)) = stack.pop() {
            if !visited.insert(pos) {
                continue;
            }
            let node = &catalog.nodes[pos];
            out.push_str(&tree_line(node, view, depth));
            if let Some(kids) = children.get(node.id.as_str()) {
                for &kid in kids.iter().rev() {
                    stack.push((kid, depth + 1));
                }
            }
        }
    };

    for (pos, node) in catalog.nodes.iter().enumerate() {
        if node.parent.is_none() && node.kind() == NodeKind::Goal {
            walk(pos, &mut out, &mut visited);
        }
    }

    if visited.len() < catalog.nodes.len() {
        out.push_str("orphaned\n");
        let mut orphaned = String::new();
        // Dangling or missing parents first, then whatever a cycle left behind.
        for (pos, node) in catalog.nodes.iter().enumerate() {
            let detached = node
                .parent
                .as_deref()
                .map_or(true, |parent| !catalog.contains(parent));
            if detached && !visited.contains(&pos) {
                walk(pos, &mut orphaned, &mut visited);
            }
        }
        for pos in 0..catalog.nodes.len() {
            if !visited.contains(&pos) {
                walk(pos, &mut orphaned, &mut visited);
            }
        }
        for line in orphaned.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }

    if out.is_empty() {
        out.push_str("catalog is empty\n");
    }
    out
}

fn tree_line(node: &Node, view: &StatusView<'_>, depth: usize) -> String {
    format!(
        "{}{} {} {}\n",
        "  ".repeat(depth),
        view.status(&node.id).glyph(),
        node.id,
        node.text
    )
}

pub(crate) fn render_status(summary: &Summary) -> String {
    format!(
        "goals: {}\nexpectations: {} ({} satisfied, {} unsatisfied)\nfacets: {} ({} passing, {} failing)\ncoverage: {:.1}%\n",
        summary.goals,
        summary.expectations,
        summary.satisfied,
        summary.unsatisfied,
        summary.facets,
        summary.passing_facets,
        summary.failing_facets,
        summary.coverage
    )
}

pub(crate) fn render_show(
    node: &Node,
    view: &StatusView<'_>,
    chain: &[&Node],
    index: Option<&TraceIndex>,
) -> String {
    let catalog = view.catalog();
    let mut out = format!(
        "{} {} [{}] {}\n",
        node.kind().marker(),
        node.id,
        view.status(&node.id),
        node.text
    );
    out.push_str(&format!(
        "parent: {}\n",
        node.parent.as_deref().unwrap_or("-")
    ));
    if let Some(planning) = node.planning() {
        out.push_str(&format!("priority: {}\n", planning.priority));
        if !planning.labels.is_empty() {
            out.push_str(&format!("labels: {}\n", planning.labels.join(", ")));
        }
    }
    if let Some(test) = node.test() {
        out.push_str(&format!("test: {test}\n"));
    }

    let children: Vec<&str> = catalog
        .children(&node.id)
        .into_iter()
        .map(|c| c.id.as_str())
        .collect();
    if !children.is_empty() {
        out.push_str(&format!("children: {}\n", children.join(", ")));
    }
    if chain.len() > 1 {
        let path: Vec<&str> = chain.iter().map(|n| n.id.as_str()).collect();
        out.push_str(&format!("chain: {}\n", path.join(" > ")));
    }

    if let Some(files) = index.and_then(|i| i.reverse.get(&node.id)) {
        out.push_str("covers:\n");
        for (file, lines) in files {
            out.push_str(&format!("  {file} ({} lines)\n", lines.len()));
        }
    }
    if let Some(last) = node.modifications.last() {
        out.push_str(&format!(
            "modified: {} times, last {} by {}\n",
            node.modifications.len(),
            last.file,
            last.tool
        ));
    }
    out
}

pub(crate) fn render_projection(summaries: &[FileProjectionSummary]) -> String {
    if summaries.is_empty() {
        return "no covered lines\n".to_string();
    }
    let mut out = String::new();
    for summary in summaries {
        out.push_str(&format!(
            "{}: {} lines, {}\n",
            summary.file,
            summary.lines,
            summary.facets.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_catalog::{Catalog, NewNode, Status};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "Sync")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "Merges").parent("g-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "lww").parent("e-001"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Facet, "clock").parent("e-001"))
            .unwrap();
        catalog.mark("f-001", Status::Passing).unwrap();
        catalog.mark("f-002", Status::Failing).unwrap();
        catalog
    }

    #[test]
    fn tree_uses_status_glyphs_in_catalog_order() {
        let catalog = catalog();
        let view = StatusView::new(&catalog);
        assert_eq!(
            render_tree(&view),
            "✗ g-001 Sync\n  ✗ e-001 Merges\n    ✓ f-001 lww\n    ✗ f-002 clock\n"
        );
    }

    #[test]
    fn detached_subtrees_are_listed_as_orphaned() {
        let mut catalog = catalog();
        catalog
            .add(NewNode::new(NodeKind::Goal, "Other"))
            .unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "Lost").parent("g-002"))
            .unwrap();
        catalog.remove("g-002", true).unwrap();
        let view = StatusView::new(&catalog);
        let out = render_tree(&view);
        assert!(out.ends_with("orphaned\n  ○ e-002 Lost\n"), "{out}");
    }

    #[test]
    fn empty_catalog_says_so() {
        let catalog = Catalog::new();
        let view = StatusView::new(&catalog);
        assert_eq!(render_tree(&view), "catalog is empty\n");
    }

    #[test]
    fn status_prints_one_decimal_coverage() {
        let catalog = catalog();
        let view = StatusView::new(&catalog);
        let out = render_status(&view.summary());
        assert!(out.contains("coverage: 50.0%"), "{out}");
        assert!(out.contains("expectations: 1 (0 satisfied, 1 unsatisfied)"));
    }
}
