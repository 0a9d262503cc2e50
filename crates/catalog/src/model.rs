use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// Audit entries kept per node; older entries are dropped first.
pub const MAX_MODIFICATIONS: usize = 50;

/// The three node kinds, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Goal,
    Expectation,
    Facet,
}

impl NodeKind {
    /// Id prefix (`g`, `e`, `f`).
    pub const fn prefix(self) -> &'static str {
        match self {
            NodeKind::Goal => "g",
            NodeKind::Expectation => "e",
            NodeKind::Facet => "f",
        }
    }

    /// One-letter marker used by tree renderings.
    pub const fn marker(self) -> char {
        match self {
            NodeKind::Goal => 'G',
            NodeKind::Expectation => 'E',
            NodeKind::Facet => 'F',
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Goal => "goal",
            NodeKind::Expectation => "expectation",
            NodeKind::Facet => "facet",
        }
    }

    /// Kind a parent of this kind must have, `None` for roots.
    pub const fn expected_parent(self) -> Option<NodeKind> {
        match self {
            NodeKind::Goal => None,
            NodeKind::Expectation => Some(NodeKind::Goal),
            NodeKind::Facet => Some(NodeKind::Expectation),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored status of a facet, and the derived status of every other node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Untested,
    Passing,
    Failing,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Untested => "untested",
            Status::Passing => "passing",
            Status::Failing => "failing",
        }
    }

    pub const fn glyph(self) -> char {
        match self {
            Status::Untested => '○',
            Status::Passing => '✓',
            Status::Failing => '✗',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "untested" => Ok(Status::Untested),
            "passing" | "pass" | "passed" => Ok(Status::Passing),
            "failing" | "fail" | "failed" => Ok(Status::Failing),
            _ => Err(CatalogError::InvalidStatus(s.to_string())),
        }
    }
}

/// One audit-log entry: a source file mapped to the node was edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub file: String,
    pub tool: String,
}

/// Planning payload shared by goals and expectations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Planning {
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Verification payload carried only by facets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub test: String,
    #[serde(default)]
    pub status: Status,
}

/// Kind-specific fields. Serialized inline with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeBody {
    Goal(Planning),
    Expectation(Planning),
    Facet(Verification),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub body: NodeBody,
    pub text: String,
    #[serde(default, with = "parent_field")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifications: Vec<Modification>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Goal(_) => NodeKind::Goal,
            NodeBody::Expectation(_) => NodeKind::Expectation,
            NodeBody::Facet(_) => NodeKind::Facet,
        }
    }

    /// Stored status; only facets carry one.
    pub fn stored_status(&self) -> Option<Status> {
        match &self.body {
            NodeBody::Facet(v) => Some(v.status),
            _ => None,
        }
    }

    /// Linked test id, `None` when unlinked or not a facet.
    pub fn test(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Facet(v) if !v.test.is_empty() => Some(v.test.as_str()),
            _ => None,
        }
    }

    pub fn planning(&self) -> Option<&Planning> {
        match &self.body {
            NodeBody::Goal(p) | NodeBody::Expectation(p) => Some(p),
            NodeBody::Facet(_) => None,
        }
    }

    pub fn priority(&self) -> Option<i32> {
        self.planning().map(|p| p.priority)
    }

    pub fn push_modification(&mut self, entry: Modification) {
        self.modifications.push(entry);
        if self.modifications.len() > MAX_MODIFICATIONS {
            let start = self.modifications.len() - MAX_MODIFICATIONS;
            self.modifications = self.modifications.split_off(start);
        }
    }

    fn verification_mut(&mut self) -> Result<&mut Verification> {
        match &mut self.body {
            NodeBody::Facet(v) => Ok(v),
            _ => Err(CatalogError::NotAFacet(self.id.clone())),
        }
    }
}

/// Goals serialize an empty string; a missing, null or empty parent all read back as `None`.
mod parent_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(parent: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(parent.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|p| !p.is_empty()))
    }
}

/// Arguments for [`Catalog::add`].
#[derive(Debug, Clone)]
pub struct NewNode {
    pub kind: NodeKind,
    pub text: String,
    pub parent: Option<String>,
    pub priority: Option<i32>,
    pub labels: Vec<String>,
}

impl NewNode {
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            parent: None,
            priority: None,
            labels: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            version: CATALOG_SCHEMA_VERSION,
            nodes: Vec::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Node> {
        self.get(id)
            .ok_or_else(|| CatalogError::NodeNotFound(id.to_string()))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| CatalogError::NodeNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Direct children of `id`, in catalog order.
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent.as_deref() == Some(id))
            .collect()
    }

    /// Parent id -> child positions, in catalog order. Dangling parents are included.
    pub fn children_index(&self) -> HashMap<&str, Vec<usize>> {
        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (pos, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent.as_deref() {
                index.entry(parent).or_default().push(pos);
            }
        }
        index
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn facets(&self) -> impl Iterator<Item = &Node> {
        self.nodes_of(NodeKind::Facet)
    }

    /// Next id for `kind`: highest existing sequence for the prefix plus one.
    pub fn next_id(&self, kind: NodeKind) -> String {
        let prefix = kind.prefix();
        let max = self
            .nodes
            .iter()
            .filter_map(|n| parse_sequence(&n.id, prefix))
            .max()
            .unwrap_or(0);
        format!("{prefix}-{:03}", max + 1)
    }

    pub fn add(&mut self, new: NewNode) -> Result<Node> {
        let NewNode {
            kind,
            text,
            parent,
            priority,
            labels,
        } = new;

        let parent = parent.filter(|p| !p.is_empty());
        match (kind, parent.as_deref()) {
            (NodeKind::Goal, Some(p)) => {
                return Err(CatalogError::InvalidParent(format!(
                    "goals cannot have a parent (got {p})"
                )))
            }
            (NodeKind::Expectation | NodeKind::Facet, None) => {
                return Err(CatalogError::InvalidParent(format!(
                    "{kind} nodes require a parent"
                )))
            }
            (_, Some(p)) if !self.contains(p) => {
                return Err(CatalogError::NodeNotFound(p.to_string()))
            }
            _ => {}
        }

        let body = match kind {
            NodeKind::Goal | NodeKind::Expectation => {
                let mut planning = Planning {
                    priority: priority.unwrap_or(0),
                    labels: Vec::new(),
                };
                for label in labels {
                    if !planning.labels.contains(&label) {
                        planning.labels.push(label);
                    }
                }
                if kind == NodeKind::Goal {
                    NodeBody::Goal(planning)
                } else {
                    NodeBody::Expectation(planning)
                }
            }
            NodeKind::Facet => {
                if priority.is_some() || !labels.is_empty() {
                    log::warn!("priority and labels are ignored on facets");
                }
                NodeBody::Facet(Verification::default())
            }
        };

        let node = Node {
            id: self.next_id(kind),
            body,
            text,
            parent,
            modifications: Vec::new(),
        };
        self.nodes.push(node.clone());
        Ok(node)
    }

    pub fn edit(&mut self, id: &str, text: &str) -> Result<()> {
        self.require_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn link(&mut self, facet_id: &str, test: &str) -> Result<()> {
        self.require_mut(facet_id)?.verification_mut()?.test = test.to_string();
        Ok(())
    }

    pub fn mark(&mut self, facet_id: &str, status: Status) -> Result<()> {
        self.require_mut(facet_id)?.verification_mut()?.status = status;
        Ok(())
    }

    /// Removes `id`. Children block removal unless `force`, in which case they are left dangling.
    pub fn remove(&mut self, id: &str, force: bool) -> Result<Node> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| CatalogError::NodeNotFound(id.to_string()))?;

        let children: Vec<&str> = self.children(id).iter().map(|n| n.id.as_str()).collect();
        if !children.is_empty() && !force {
            return Err(CatalogError::HasChildren {
                id: id.to_string(),
                children: children.join(", "),
            });
        }
        Ok(self.nodes.remove(pos))
    }

    /// Root-first chain ending at `id`. Stops at a dangling parent or a cycle.
    pub fn ancestor_chain(&self, id: &str) -> Result<Vec<&Node>> {
        let mut chain = vec![self.require(id)?];
        let mut seen: HashSet<&str> = HashSet::from([id]);
        while let Some(parent) = chain.last().and_then(|n| n.parent.as_deref()) {
            if !seen.insert(parent) {
                break;
            }
            match self.get(parent) {
                Some(node) => chain.push(node),
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn record_modification(&mut self, id: &str, entry: Modification) -> Result<()> {
        self.require_mut(id)?.push_modification(entry);
        Ok(())
    }

    /// Rejects catalogs whose ids collide; everything else is left for health checks.
    pub fn validate_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(CatalogError::DuplicateId(node.id.clone()));
            }
        }
        Ok(())
    }
}

fn parse_sequence(id: &str, prefix: &str) -> Option<u32> {
    id.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add(NewNode::new(NodeKind::Goal, "ship")).unwrap();
        catalog
            .add(NewNode::new(NodeKind::Expectation, "works").parent("g-001"))
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
    fn ids_follow_highest_sequence_per_prefix() {
        let mut catalog = sample();
        assert_eq!(catalog.next_id(NodeKind::Facet), "f-003");
        catalog.remove("f-001", false).unwrap();
        assert_eq!(catalog.next_id(NodeKind::Facet), "f-003");
        catalog.remove("f-002", false).unwrap();
        assert_eq!(catalog.next_id(NodeKind::Facet), "f-001");
        assert_eq!(catalog.next_id(NodeKind::Goal), "g-002");
    }

    #[test]
    fn add_validates_parent_presence_but_not_kind() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.add(NewNode::new(NodeKind::Goal, "x").parent("g-001")),
            Err(CatalogError::InvalidParent(_))
        ));
        assert!(matches!(
            catalog.add(NewNode::new(NodeKind::Facet, "x")),
            Err(CatalogError::InvalidParent(_))
        ));
        assert!(matches!(
            catalog.add(NewNode::new(NodeKind::Facet, "x").parent("e-404")),
            Err(CatalogError::NodeNotFound(_))
        ));
        let nested = catalog
            .add(NewNode::new(NodeKind::Facet, "nested").parent("f-001"))
            .unwrap();
        assert_eq!(nested.parent.as_deref(), Some("f-001"));
    }

    #[test]
    fn mark_and_link_only_apply_to_facets() {
        let mut catalog = sample();
        catalog.link("f-001", "tests/a.py::test_a").unwrap();
        catalog.mark("f-001", Status::Passing).unwrap();
        let facet = catalog.get("f-001").unwrap();
        assert_eq!(facet.test(), Some("tests/a.py::test_a"));
        assert_eq!(facet.stored_status(), Some(Status::Passing));

        assert!(matches!(
            catalog.mark("e-001", Status::Passing),
            Err(CatalogError::NotAFacet(_))
        ));
        assert!(matches!(
            catalog.link("f-999", "t"),
            Err(CatalogError::NodeNotFound(_))
        ));
    }

    #[test]
    fn remove_with_children_requires_force() {
        let mut catalog = sample();
        let before = catalog.clone();
        assert!(matches!(
            catalog.remove("e-001", false),
            Err(CatalogError::HasChildren { .. })
        ));
        assert_eq!(catalog, before);

        catalog.remove("e-001", true).unwrap();
        assert!(catalog.get("e-001").is_none());
        assert_eq!(catalog.get("f-001").unwrap().parent.as_deref(), Some("e-001"));
    }

    #[test]
    fn ancestor_chain_is_root_first_and_cycle_safe() {
        let mut catalog = sample();
        let ids: Vec<&str> = catalog
            .ancestor_chain("f-002")
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["g-001", "e-001", "f-002"]);

        catalog.nodes[0].parent = Some("f-002".to_string());
        let chain = catalog.ancestor_chain("f-002").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.last().unwrap().id, "f-002");
    }

    #[test]
    fn modifications_are_bounded() {
        let mut catalog = sample();
        for i in 0..60 {
            catalog
                .record_modification(
                    "f-001",
                    Modification {
                        timestamp: i,
                        file: "src/lib.rs".into(),
                        tool: "edit".into(),
                    },
                )
                .unwrap();
        }
        let mods = &catalog.get("f-001").unwrap().modifications;
        assert_eq!(mods.len(), MAX_MODIFICATIONS);
        assert_eq!(mods.first().unwrap().timestamp, 10);
    }

    #[test]
    fn json_shape_round_trips_in_order() {
        let mut catalog = sample();
        catalog.link("f-002", "t::b").unwrap();
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["nodes"][0]["type"], "goal");
        assert_eq!(json["nodes"][0]["parent"], "");
        assert_eq!(json["nodes"][3]["test"], "t::b");
        assert_eq!(json["nodes"][3]["status"], "untested");
        assert!(json["nodes"][0].get("test").is_none());

        let back: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("PASSING".parse::<Status>().unwrap(), Status::Passing);
        assert_eq!("failed".parse::<Status>().unwrap(), Status::Failing);
        assert!(matches!(
            "green".parse::<Status>(),
            Err(CatalogError::InvalidStatus(_))
        ));
    }
}
