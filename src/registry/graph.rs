//! Dependency graph traversal: cycle detection and topological ordering.
//!
//! Both traversals are depth-first and use an explicit frame stack instead
//! of recursion, so pathological dependency chains cannot exhaust the call
//! stack. The visiting order is the same as a recursive walk that follows
//! each schema's dependencies in their declared order.

use std::collections::{HashMap, HashSet};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Read access to dependency edges.
pub trait Edges {
    /// Direct dependencies of `node`, or `None` when `node` is unknown.
    fn dependencies(&self, node: &str) -> Option<&[String]>;

    /// Whether `node` is part of the graph.
    fn contains(&self, node: &str) -> bool {
        self.dependencies(node).is_some()
    }
}

/// A traversal frame: the node and the index of its next dependency.
struct Frame<'a> {
    node: &'a str,
    next: usize,
}

/// Finds a dependency cycle reachable from `start`.
///
/// Returns the traversal path from `start` down to the node that closes
/// the cycle, followed by that node again, e.g. `[c, a, b, c]`. Unknown
/// dependencies are treated as leaves.
pub fn find_cycle<'a, E: Edges + ?Sized>(edges: &'a E, start: &'a str) -> Option<Vec<String>> {
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut on_path: HashSet<&'a str> = HashSet::new();
    let mut path: Vec<&'a str> = vec![start];
    let mut stack: Vec<Frame<'a>> = vec![Frame {
        node: start,
        next: 0,
    }];
    visited.insert(start);
    on_path.insert(start);

    while let Some(frame) = stack.last_mut() {
        let deps = edges.dependencies(frame.node).unwrap_or(&[]);
        if frame.next < deps.len() {
            let dep = deps[frame.next].as_str();
            frame.next += 1;

            if visited.insert(dep) {
                on_path.insert(dep);
                path.push(dep);
                stack.push(Frame { node: dep, next: 0 });
            } else if on_path.contains(dep) {
                let mut cycle: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
        } else {
            on_path.remove(frame.node);
            path.pop();
            stack.pop();
        }
    }

    None
}

/// Orders `roots` so every node comes after all of its dependencies.
///
/// Post-order depth-first traversal: each root is visited in the given
/// order, its dependencies (in declared order) are emitted before it, and
/// a node already visited is never emitted twice. Dependencies that are
/// not part of the graph are skipped. This walk does not report cycles;
/// a node on a cycle is emitted once, at the point the walk unwinds past it.
pub fn topological_order<'a, E, I>(edges: &'a E, roots: I) -> Vec<String>
where
    E: Edges + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut ordered: Vec<String> = Vec::new();
    let mut stack: Vec<Frame<'a>> = Vec::new();

    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        stack.push(Frame {
            node: root,
            next: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let deps = edges.dependencies(frame.node).unwrap_or(&[]);
            if frame.next < deps.len() {
                let dep = deps[frame.next].as_str();
                frame.next += 1;
                if edges.contains(dep) && visited.insert(dep) {
                    stack.push(Frame { node: dep, next: 0 });
                }
            } else {
                ordered.push(frame.node.to_string());
                stack.pop();
            }
        }
    }

    ordered
}

/// Owned snapshot of every schema and its direct dependencies, in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Builds a snapshot from `(name, dependencies)` pairs.
    pub fn new(nodes: Vec<(String, Vec<String>)>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self { nodes, index }
    }

    /// Iterates `(name, dependencies)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.nodes
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.as_slice()))
    }

    /// Number of schemas in the snapshot.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the snapshot holds no schemas.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All schemas ordered dependencies-first.
    pub fn topological_order(&self) -> Vec<String> {
        topological_order(self, self.nodes.iter().map(|(name, _)| name.as_str()))
    }
}

impl Edges for DependencyGraph {
    fn dependencies(&self, node: &str) -> Option<&[String]> {
        self.index
            .get(node)
            .map(|&i| self.nodes[i].1.as_slice())
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (name, deps) in &self.nodes {
            map.serialize_entry(name, deps)?;
        }
        map.end()
    }
}
