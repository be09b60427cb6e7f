use super::{DeclaredType, PackageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of resolving a declared range to a concrete version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionStatus {
    Resolved,
    Unresolved { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub id: PackageId,
    pub declared_type: DeclaredType,
    /// BFS level; the root sits at 0
    pub depth: usize,
    /// Ordered, duplicate-free
    pub children: Vec<PackageId>,
    pub status: ResolutionStatus,
    /// Range the node was requested with (first requester wins)
    pub requested_range: Option<String>,
}

impl DependencyNode {
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Resolved)
    }

    pub fn add_child(&mut self, child: PackageId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }
}

/// A dependency cycle: starts and ends with the repeated node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<PackageId>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Same package name resolved to more than one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConflict {
    pub name: String,
    /// version -> parent paths (root first) that requested it
    pub versions: BTreeMap<String, Vec<Vec<PackageId>>>,
}

/// DependencyGraph aggregate: the resolved transitive tree of one project.
///
/// Built once per run by `DependencyGraphBuilder` and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    root: PackageId,
    nodes: BTreeMap<PackageId, DependencyNode>,
    cycles: Vec<Cycle>,
    conflicts: BTreeMap<String, VersionConflict>,
    unresolved: Vec<PackageId>,
    key_index: BTreeMap<String, PackageId>,
}

impl DependencyGraph {
    /// Creates a graph with no recorded structure. The root must be present in `nodes`.
    pub fn new(root: PackageId, nodes: BTreeMap<PackageId, DependencyNode>) -> Self {
        let unresolved = nodes
            .values()
            .filter(|n| !n.is_resolved())
            .map(|n| n.id.clone())
            .collect();
        let key_index = nodes.keys().map(|id| (id.key(), id.clone())).collect();
        Self {
            root,
            nodes,
            cycles: Vec::new(),
            conflicts: BTreeMap::new(),
            unresolved,
            key_index,
        }
    }

    /// Attaches the results of structural analysis (cycles and conflicts).
    pub fn with_structure(
        mut self,
        cycles: Vec<Cycle>,
        conflicts: BTreeMap<String, VersionConflict>,
    ) -> Self {
        self.cycles = cycles;
        self.conflicts = conflicts;
        self
    }

    pub fn root(&self) -> &PackageId {
        &self.root
    }

    pub fn node(&self, id: &PackageId) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    pub fn node_by_key(&self, key: &str) -> Option<&DependencyNode> {
        self.key_index.get(key).and_then(|id| self.nodes.get(id))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Every node listing `id` as a child
    pub fn parents_of(&self, id: &PackageId) -> Vec<&PackageId> {
        self.nodes
            .values()
            .filter(|n| n.children.contains(id))
            .map(|n| &n.id)
            .collect()
    }

    /// Every resolved, non-root package
    pub fn packages(&self) -> Vec<&PackageId> {
        self.nodes
            .values()
            .filter(|n| n.id != self.root && n.is_resolved())
            .map(|n| &n.id)
            .collect()
    }

    pub fn direct_dependencies(&self) -> &[PackageId] {
        self.nodes
            .get(&self.root)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn conflicts(&self) -> &BTreeMap<String, VersionConflict> {
        &self.conflicts
    }

    pub fn unresolved(&self) -> &[PackageId] {
        &self.unresolved
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn package_count(&self) -> usize {
        self.packages().len()
    }
}
