use crate::analysis::domain::{Cycle, DependencyGraph, DependencyNode, PackageId, VersionConflict};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// GraphAnalysis detects structural anomalies in a resolved dependency graph.
///
/// Pure algorithms over domain objects; unresolved nodes are ignored.
pub struct GraphAnalysis;

impl GraphAnalysis {
    /// Maximum cycle length explored
    const MAX_RECURSION_DEPTH: usize = 512;
    /// Dense components hold exponentially many cycles; enumeration stops here
    const MAX_CYCLES: usize = 1_000;
    /// Edge visits allowed across the whole enumeration
    const MAX_CYCLE_STEPS: usize = 200_000;

    /// Creates the graph and records its cycles and version conflicts
    pub fn assemble(
        root: PackageId,
        nodes: BTreeMap<PackageId, DependencyNode>,
    ) -> DependencyGraph {
        let graph = DependencyGraph::new(root, nodes);
        let cycles = Self::detect_cycles(&graph);
        let conflicts = Self::detect_conflicts(&graph);
        graph.with_structure(cycles, conflicts)
    }

    /// Enumerates the elementary cycles among resolved nodes.
    ///
    /// Cycles only exist inside a strongly connected component, so each
    /// component is searched on its own. Within one, a DFS from every member
    /// tracks the current path and only walks through members ordered after
    /// the start; a child equal to the start closes a cycle. Every cycle is
    /// therefore found exactly once, rotated so that its smallest member
    /// comes first. Enumeration is capped by `MAX_CYCLES` and
    /// `MAX_CYCLE_STEPS`.
    pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
        let ids: Vec<&PackageId> = graph
            .nodes()
            .filter(|n| n.is_resolved())
            .map(|n| &n.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: HashMap<&PackageId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let adjacency: Vec<Vec<usize>> = ids
            .iter()
            .map(|id| {
                graph
                    .node(id)
                    .map(|n| {
                        n.children
                            .iter()
                            .filter_map(|c| position.get(c).copied())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        let mut search = CycleSearch {
            adjacency: &adjacency,
            component: vec![usize::MAX; ids.len()],
            path: Vec::new(),
            on_path: vec![false; ids.len()],
            found: Vec::new(),
            steps: 0,
        };
        for (label, members) in Self::strongly_connected(&adjacency).into_iter().enumerate() {
            for &member in &members {
                search.component[member] = label;
            }
            for &start in &members {
                search.search_from(start);
                if search.exhausted() {
                    break;
                }
            }
        }

        search
            .found
            .into_iter()
            .map(|indices| Cycle {
                nodes: indices.into_iter().map(|i| ids[i].clone()).collect(),
            })
            .collect()
    }

    /// Tarjan's algorithm with an explicit stack, so deep chains cannot
    /// overflow the call stack
    fn strongly_connected(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = adjacency.len();
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut components = Vec::new();
        let mut next_index = 0;

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            let mut work = vec![(root, 0usize)];
            while let Some((v, edge)) = work.pop() {
                if edge == 0 {
                    index[v] = next_index;
                    low[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                } else {
                    let w = adjacency[v][edge - 1];
                    if on_stack[w] {
                        low[v] = low[v].min(low[w]);
                    }
                }

                if let Some(&w) = adjacency[v].get(edge) {
                    work.push((v, edge + 1));
                    if index[w] == UNVISITED {
                        work.push((w, 0));
                    }
                    continue;
                }

                if low[v] == index[v] {
                    let mut members = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        members.push(w);
                        if w == v {
                            break;
                        }
                    }
                    members.sort_unstable();
                    components.push(members);
                }
            }
        }
        components
    }

    /// One conflict per package name that resolved to several versions
    pub fn detect_conflicts(graph: &DependencyGraph) -> BTreeMap<String, VersionConflict> {
        let mut by_name: BTreeMap<&str, Vec<&PackageId>> = BTreeMap::new();
        for id in graph.packages() {
            by_name.entry(id.name()).or_default().push(id);
        }

        let shortest = Self::shortest_paths(graph);
        let path_to = |id: &PackageId| -> Vec<PackageId> {
            let mut path = vec![id.clone()];
            let mut next = shortest.get(id).copied();
            while let Some(parent) = next {
                path.push(parent.clone());
                next = shortest.get(parent).copied();
            }
            path.reverse();
            path
        };

        by_name
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, ids)| {
                let versions = ids
                    .into_iter()
                    .map(|id| {
                        let parent_paths = graph
                            .parents_of(id)
                            .into_iter()
                            .map(|parent| path_to(parent))
                            .collect();
                        (id.version().to_string(), parent_paths)
                    })
                    .collect();
                (
                    name.to_string(),
                    VersionConflict {
                        name: name.to_string(),
                        versions,
                    },
                )
            })
            .collect()
    }

    /// BFS predecessor map from the root (first discovered parent wins)
    fn shortest_paths(graph: &DependencyGraph) -> HashMap<&PackageId, &PackageId> {
        let mut predecessor = HashMap::new();
        let mut visited: HashSet<&PackageId> = HashSet::from([graph.root()]);
        let mut queue = VecDeque::from([graph.root()]);

        while let Some(current) = queue.pop_front() {
            let Some(node) = graph.node(current) else {
                continue;
            };
            for child in &node.children {
                if visited.insert(child) {
                    predecessor.insert(child, current);
                    queue.push_back(child);
                }
            }
        }
        predecessor
    }
}

/// Bounded elementary-cycle enumeration inside strongly connected components
struct CycleSearch<'a> {
    adjacency: &'a [Vec<usize>],
    component: Vec<usize>,
    path: Vec<usize>,
    on_path: Vec<bool>,
    found: Vec<Vec<usize>>,
    steps: usize,
}

impl CycleSearch<'_> {
    fn exhausted(&self) -> bool {
        self.found.len() >= GraphAnalysis::MAX_CYCLES
            || self.steps >= GraphAnalysis::MAX_CYCLE_STEPS
    }

    fn search_from(&mut self, start: usize) {
        self.path.push(start);
        self.on_path[start] = true;
        self.extend(start, start);
        self.on_path[start] = false;
        self.path.pop();
    }

    fn extend(&mut self, start: usize, current: usize) {
        let adjacency = self.adjacency;
        for &child in &adjacency[current] {
            if self.exhausted() {
                return;
            }
            self.steps += 1;
            if child == start {
                let mut cycle = self.path.clone();
                cycle.push(start);
                self.found.push(cycle);
            } else if child > start
                && self.component[child] == self.component[start]
                && !self.on_path[child]
                && self.path.len() < GraphAnalysis::MAX_RECURSION_DEPTH
            {
                self.path.push(child);
                self.on_path[child] = true;
                self.extend(start, child);
                self.on_path[child] = false;
                self.path.pop();
            }
        }
    }
}
