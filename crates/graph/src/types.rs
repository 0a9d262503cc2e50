use facet_catalog::{Node, NodeKind, Status};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Node in a motivation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationNode {
    pub id: String,
    pub kind: NodeKind,
    pub text: String,

    /// Computed status at resolution time
    pub status: Status,
}

impl MotivationNode {
    pub fn from_node(node: &Node, status: Status) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind(),
            text: node.text.clone(),
            status,
        }
    }
}

/// Nested form of a motivation tree, for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedMotivation {
    #[serde(flatten)]
    pub node: MotivationNode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NestedMotivation>,
}

/// Merged ancestor chains.
///
/// Every catalog node appears at most once no matter how many chains pass through it;
/// edges point from parent to child.
pub struct MotivationTree {
    /// Directed graph (parent -> child)
    pub graph: DiGraph<MotivationNode, ()>,

    /// Node id -> NodeIndex mapping for fast lookup
    pub id_index: HashMap<String, NodeIndex>,
}

impl MotivationTree {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
        }
    }

    /// Add node unless a node with the same id is already present
    pub fn add_node(&mut self, node: MotivationNode) -> NodeIndex {
        if let Some(idx) = self.id_index.get(&node.id) {
            return *idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Add parent -> child edge once
    pub fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.graph.update_edge(parent, child, ());
    }

    /// Merge a root-first chain into the tree.
    pub fn add_chain(&mut self, chain: Vec<MotivationNode>) {
        let mut prev: Option<NodeIndex> = None;
        for node in chain {
            let idx = self.add_node(node);
            if let Some(parent) = prev {
                self.add_edge(parent, idx);
            }
            prev = Some(idx);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes without a parent in the tree, sorted by id
    pub fn roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect();
        self.sort_by_id(&mut roots);
        roots
    }

    /// Direct children, sorted by id
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut kids: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        self.sort_by_id(&mut kids);
        kids
    }

    fn sort_by_id(&self, nodes: &mut [NodeIndex]) {
        nodes.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
    }

    /// Depth-first (node, depth) walk from the sorted roots.
    ///
    /// A corrupt catalog can merge into a parent cycle with no root; those nodes are
    /// walked afterwards starting from the smallest unvisited id.
    pub fn walk(&self) -> Vec<(NodeIndex, usize)> {
        let mut visited = HashSet::new();
        let mut out = Vec::with_capacity(self.node_count());
        for root in self.roots() {
            self.walk_from(root, 0, &mut visited, &mut out);
        }
        let mut rest: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| !visited.contains(idx))
            .collect();
        self.sort_by_id(&mut rest);
        for idx in rest {
            self.walk_from(idx, 0, &mut visited, &mut out);
        }
        out
    }

    fn walk_from(
        &self,
        idx: NodeIndex,
        depth: usize,
        visited: &mut HashSet<NodeIndex>,
        out: &mut Vec<(NodeIndex, usize)>,
    ) {
        if !visited.insert(idx) {
            return;
        }
        out.push((idx, depth));
        for child in self.children(idx) {
            self.walk_from(child, depth + 1, visited, out);
        }
    }

    /// Indented rendering, one node per line: `<indent><G|E|F> <id> [<status>] <text>`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, depth) in self.walk() {
            let node = &self.graph[idx];
            out.push_str(&format!(
                "{}{} {} [{}] {}\n",
                "  ".repeat(depth),
                node.kind.marker(),
                node.id,
                node.status,
                node.text
            ));
        }
        out
    }

    pub fn to_nested(&self) -> Vec<NestedMotivation> {
        let mut visited = HashSet::new();
        let mut roots: Vec<NestedMotivation> = self
            .roots()
            .into_iter()
            .filter_map(|idx| self.nest(idx, &mut visited))
            .collect();
        let mut rest: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| !visited.contains(idx))
            .collect();
        self.sort_by_id(&mut rest);
        for idx in rest {
            if let Some(nested) = self.nest(idx, &mut visited) {
                roots.push(nested);
            }
        }
        roots
    }

    fn nest(&self, idx: NodeIndex, visited: &mut HashSet<NodeIndex>) -> Option<NestedMotivation> {
        if !visited.insert(idx) {
            return None;
        }
        let children = self
            .children(idx)
            .into_iter()
            .filter_map(|child| self.nest(child, visited))
            .collect();
        Some(NestedMotivation {
            node: self.graph[idx].clone(),
            children,
        })
    }
}

impl Default for MotivationTree {
    fn default() -> Self {
        Self::new()
    }
}
