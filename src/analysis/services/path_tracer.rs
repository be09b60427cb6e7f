use crate::analysis::domain::{DependencyGraph, PackageId};
use std::collections::{HashMap, HashSet, VecDeque};

/// How a traced target is matched against graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Any version of the target's name
    AnyVersion,
    /// Only the exact id
    ExactVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceOutcome {
    /// Root-first paths ending at a matching node
    pub paths: Vec<Vec<PackageId>>,
    /// The walk hit an edge back onto the current path and did not follow it.
    /// Paths reachable only through that edge are missing from `paths`.
    pub truncated_by_cycle: bool,
    /// The walk stopped early (path count or search budget exhausted)
    pub truncated_by_limit: bool,
}

/// PathTracer answers "which dependency chains pull in this package?"
pub struct PathTracer;

impl PathTracer {
    pub const MAX_PATHS: usize = 256;
    const MAX_RECURSION_DEPTH: usize = 256;
    /// Node visits allowed per trace; dense graphs have exponentially many simple paths
    const MAX_VISITS: usize = 100_000;
    /// Path extensions allowed across one `trace_all` pass
    const MAX_EXTENSIONS: usize = 200_000;

    pub fn trace(graph: &DependencyGraph, target: &PackageId, mode: MatchMode) -> TraceOutcome {
        let mut outcome = TraceOutcome::default();
        let mut path = vec![graph.root()];
        let mut visits = 0;
        Self::walk(graph, target, mode, &mut path, &mut visits, &mut outcome);
        outcome
    }

    /// Root-first paths to every node, computed in one breadth-first pass.
    ///
    /// Paths propagate from each node to its children, shortest first, and a
    /// node keeps at most `limit` of them. The work is therefore bounded by
    /// graph size times `limit` (and by `MAX_EXTENSIONS` overall) instead of
    /// by the number of simple paths, which grows exponentially with density.
    /// Extensions that would revisit a node already on the path set
    /// `truncated_by_cycle` on that node.
    pub fn trace_all(graph: &DependencyGraph, limit: usize) -> HashMap<PackageId, TraceOutcome> {
        let root = graph.root();
        let mut found: HashMap<&PackageId, Vec<Vec<&PackageId>>> =
            HashMap::from([(root, vec![vec![root]])]);
        let mut cycle_hits: HashSet<&PackageId> = HashSet::new();
        let mut limit_hits: HashSet<&PackageId> = HashSet::new();
        let mut propagated: HashMap<&PackageId, usize> = HashMap::new();
        let mut queued: HashSet<&PackageId> = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut extensions = 0usize;
        let mut exhausted = false;

        while let Some(current) = queue.pop_front() {
            queued.remove(current);
            let start = propagated.get(current).copied().unwrap_or(0);
            let fresh: Vec<Vec<&PackageId>> = found
                .get(current)
                .map(|paths| paths.iter().skip(start).cloned().collect())
                .unwrap_or_default();
            propagated.insert(current, start + fresh.len());
            let Some(node) = graph.node(current) else {
                continue;
            };

            for child in &node.children {
                for path in &fresh {
                    if extensions >= Self::MAX_EXTENSIONS {
                        exhausted = true;
                        break;
                    }
                    extensions += 1;
                    if path.contains(&child) {
                        cycle_hits.insert(child);
                        continue;
                    }
                    let paths = found.entry(child).or_default();
                    if paths.len() >= limit {
                        limit_hits.insert(child);
                        continue;
                    }
                    let mut extended = path.clone();
                    extended.push(child);
                    paths.push(extended);
                    if queued.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
            if exhausted {
                break;
            }
        }

        found
            .into_iter()
            .map(|(id, paths)| {
                let outcome = TraceOutcome {
                    paths: paths
                        .into_iter()
                        .map(|path| path.into_iter().cloned().collect())
                        .collect(),
                    truncated_by_cycle: cycle_hits.contains(id),
                    truncated_by_limit: exhausted || limit_hits.contains(id),
                };
                (id.clone(), outcome)
            })
            .collect()
    }

    fn matches(candidate: &PackageId, target: &PackageId, mode: MatchMode) -> bool {
        match mode {
            MatchMode::ExactVersion => candidate == target,
            MatchMode::AnyVersion => {
                candidate.ecosystem == target.ecosystem && candidate.name == target.name
            }
        }
    }

    fn walk<'g>(
        graph: &'g DependencyGraph,
        target: &PackageId,
        mode: MatchMode,
        path: &mut Vec<&'g PackageId>,
        visits: &mut usize,
        outcome: &mut TraceOutcome,
    ) {
        *visits += 1;
        if outcome.paths.len() >= Self::MAX_PATHS || *visits > Self::MAX_VISITS {
            outcome.truncated_by_limit = true;
            return;
        }
        if path.len() > Self::MAX_RECURSION_DEPTH {
            outcome.truncated_by_limit = true;
            return;
        }
        let Some(current) = path.last().copied() else {
            return;
        };
        let Some(node) = graph.node(current) else {
            return;
        };

        for child in &node.children {
            if path.contains(&child) {
                outcome.truncated_by_cycle = true;
                continue;
            }
            path.push(child);
            if Self::matches(child, target, mode) {
                if outcome.paths.len() >= Self::MAX_PATHS {
                    outcome.truncated_by_limit = true;
                } else {
                    outcome.paths.push(path.iter().map(|p| (*p).clone()).collect());
                }
            }
            Self::walk(graph, target, mode, path, visits, outcome);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::{DeclaredType, DependencyNode, Ecosystem, ResolutionStatus};
    use crate::analysis::services::GraphAnalysis;
    use std::collections::BTreeMap;

    fn id(name: &str, version: &str) -> PackageId {
        PackageId::new(Ecosystem::Npm, name, version).unwrap()
    }

    fn graph(edges: &[(&PackageId, &[&PackageId])]) -> DependencyGraph {
        let mut nodes = BTreeMap::new();
        for (parent, children) in edges {
            nodes.insert(
                (*parent).clone(),
                DependencyNode {
                    id: (*parent).clone(),
                    declared_type: DeclaredType::Transitive,
                    depth: 0,
                    children: children.iter().map(|c| (*c).clone()).collect(),
                    status: ResolutionStatus::Resolved,
                    requested_range: None,
                },
            );
        }
        GraphAnalysis::assemble(id("app", "root"), nodes)
    }

    #[test]
    fn test_diamond_yields_two_paths() {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        let vuln = id("vuln", "0.1.0");
        let g = graph(&[(&root, &[&a, &b]), (&a, &[&vuln]), (&b, &[&vuln]), (&vuln, &[])]);

        let outcome = PathTracer::trace(&g, &vuln, MatchMode::ExactVersion);
        assert_eq!(outcome.paths.len(), 2);
        assert!(outcome.paths.contains(&vec![root.clone(), a, vuln.clone()]));
        assert!(outcome.paths.contains(&vec![root, b, vuln]));
        assert!(!outcome.truncated_by_cycle);
    }

    #[test]
    fn test_any_version_matches_by_name() {
        let root = id("app", "root");
        let old = id("lodash", "3.0.0");
        let new = id("lodash", "4.0.0");
        let a = id("a", "1.0.0");
        let g = graph(&[(&root, &[&a, &new]), (&a, &[&old]), (&old, &[]), (&new, &[])]);

        let exact = PathTracer::trace(&g, &new, MatchMode::ExactVersion);
        assert_eq!(exact.paths.len(), 1);
        let any = PathTracer::trace(&g, &new, MatchMode::AnyVersion);
        assert_eq!(any.paths.len(), 2);
    }

    #[test]
    fn test_terminates_on_cycles_and_reports_it() {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        let target = id("t", "1.0.0");
        let g = graph(&[(&root, &[&a]), (&a, &[&b]), (&b, &[&a, &target]), (&target, &[])]);

        let outcome = PathTracer::trace(&g, &target, MatchMode::ExactVersion);
        assert_eq!(outcome.paths, vec![vec![root, a, b, target]]);
        assert!(outcome.truncated_by_cycle);
    }

    #[test]
    fn test_trace_all_matches_single_traces() {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        let vuln = id("vuln", "0.1.0");
        let g = graph(&[(&root, &[&a, &b]), (&a, &[&vuln]), (&b, &[&vuln]), (&vuln, &[])]);

        let all = PathTracer::trace_all(&g, 16);
        let mut paths = all[&vuln].paths.clone();
        paths.sort();
        let mut single = PathTracer::trace(&g, &vuln, MatchMode::ExactVersion).paths;
        single.sort();
        assert_eq!(paths, single);
        assert_eq!(all[&a].paths, vec![vec![root, a.clone()]]);
        assert!(!all[&vuln].truncated_by_limit);
    }

    #[test]
    fn test_trace_all_flags_cycles_on_the_closing_node() {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        let g = graph(&[(&root, &[&a]), (&a, &[&b]), (&b, &[&a])]);

        let all = PathTracer::trace_all(&g, 16);
        assert_eq!(all[&b].paths, vec![vec![root, a.clone(), b.clone()]]);
        assert!(all[&a].truncated_by_cycle);
        assert!(!all[&b].truncated_by_cycle);
    }

    #[test]
    fn test_trace_all_stays_bounded_on_dense_graphs() {
        // 25 layers of 4 nodes, each fully connected to the next layer:
        // 4^25 simple paths reach the last layer
        let root = id("app", "root");
        let layers: Vec<Vec<PackageId>> = (0..25)
            .map(|l| (0..4).map(|i| id(&format!("l{}n{}", l, i), "1.0.0")).collect())
            .collect();
        let mut edges: Vec<(&PackageId, Vec<&PackageId>)> =
            vec![(&root, layers[0].iter().collect())];
        for (depth, layer) in layers.iter().enumerate() {
            let next: Vec<&PackageId> = layers
                .get(depth + 1)
                .map(|l| l.iter().collect())
                .unwrap_or_default();
            for node in layer {
                edges.push((node, next.clone()));
            }
        }
        let borrowed: Vec<(&PackageId, &[&PackageId])> =
            edges.iter().map(|(p, c)| (*p, c.as_slice())).collect();
        let g = graph(&borrowed);

        let started = std::time::Instant::now();
        let all = PathTracer::trace_all(&g, 8);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let deepest = &all[&layers[24][3]];
        assert_eq!(deepest.paths.len(), 8);
        assert!(deepest.truncated_by_limit);
        assert!(layers.iter().flatten().all(|n| !all[n].paths.is_empty()));
    }

    #[test]
    fn test_absent_target() {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let g = graph(&[(&root, &[&a]), (&a, &[])]);
        let outcome = PathTracer::trace(&g, &id("zzz", "1.0.0"), MatchMode::AnyVersion);
        assert!(outcome.paths.is_empty());
    }
}
