//! Formula dependency graph.
//!
//! Calculated stats reference other stats through `<stat:ID:value>` tokens
//! in their formulas. This module extracts those direct dependencies, builds
//! the directed graph they induce, and detects cycles. The graph is rebuilt
//! per validation pass; nothing here is persisted or cached.
//!
//! Only formulas are walked. Stats referenced exclusively through `dices`
//! or `replacements` do not contribute edges.

use crate::id::StatId;
use crate::schema::Stat;
use crate::token::{Lexer, StatProperty, Token};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Extract the direct dependencies of a formula.
///
/// Returns each stat id referenced by a `<stat:ID:value>` token at most
/// once, in first-occurrence order. Other token kinds and properties
/// (`name`, `emoji`, section references, `math`/`dice` payloads) are ignored
/// for dependency purposes.
///
/// # Examples
///
/// ```rust
/// use sheetforge::graph::formula_dependencies;
/// use sheetforge::StatId;
///
/// let deps = formula_dependencies("<stat:2:value> + <stat:7:value> + <stat:2:value>");
/// assert_eq!(deps, vec![StatId::new(2), StatId::new(7)]);
///
/// // name/emoji references are not value dependencies
/// assert!(formula_dependencies("<stat:2:name>").is_empty());
/// ```
pub fn formula_dependencies(formula: &str) -> Vec<StatId> {
    let mut seen = HashSet::new();
    let mut deps = Vec::new();
    for (token, _) in Lexer::new(formula) {
        if let Token::StatRef {
            id,
            property: StatProperty::Value,
        } = token
        {
            if seen.insert(id) {
                deps.push(id);
            }
        }
    }
    deps
}

/// Check whether giving `target_id` the proposed `formula` would close a
/// dependency cycle.
///
/// Walks the formula's `<stat:ID:value>` references depth-first, recursing
/// into the formulas of calculated dependencies. The traversal keeps an
/// on-path set of the stats on the active recursion branch; a node is
/// removed when its subtree has been cleared, so independent branches that
/// share a dependency do not report a false cycle.
///
/// This is the pre-commit check: it is run with the *proposed* formula
/// before an edit is accepted (see [`Schema::try_set_formula`]).
///
/// [`Schema::try_set_formula`]: crate::Schema::try_set_formula
///
/// # Examples
///
/// ```rust
/// use sheetforge::graph::has_cycle;
/// use sheetforge::{LocalizedText, Stat, StatId, StatKind};
///
/// let stats = vec![Stat {
///     id: StatId::new(5),
///     name: LocalizedText::from_default("Initiative"),
///     emoji: None,
///     sections: vec![],
///     kind: StatKind::Calculated { formula: "10".to_string() },
///     dices: vec![],
///     replacements: vec![],
/// }];
///
/// assert!(has_cycle(StatId::new(5), "<stat:5:value> + 1", &stats));
/// assert!(!has_cycle(StatId::new(5), "<stat:1:value> + 1", &stats));
/// ```
pub fn has_cycle(target_id: StatId, formula: &str, stats: &[Stat]) -> bool {
    let mut on_path: HashSet<StatId> = HashSet::new();
    walk(target_id, formula, stats, &mut on_path)
}

fn walk(
    target_id: StatId,
    formula: &str,
    stats: &[Stat],
    on_path: &mut HashSet<StatId>,
) -> bool {
    for dep in formula_dependencies(formula) {
        if dep == target_id {
            return true;
        }
        if on_path.contains(&dep) {
            // Back-edge into the active branch.
            return true;
        }
        let dep_formula = stats
            .iter()
            .find(|s| s.id == dep)
            .and_then(|s| s.formula());
        if let Some(dep_formula) = dep_formula {
            on_path.insert(dep);
            let cyclic = walk(target_id, dep_formula, stats, on_path);
            // The node leaves the path before its siblings are expanded.
            on_path.remove(&dep);
            if cyclic {
                return true;
            }
        }
    }
    false
}

/// The directed graph induced by calculated-stat formulas.
///
/// An edge from A to B means A's formula reads B's value. Built fresh per
/// validation pass from a schema snapshot.
///
/// # Examples
///
/// ```rust
/// use sheetforge::graph::DependencyGraph;
/// use sheetforge::StatId;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_edge(StatId::new(1), StatId::new(2));
/// assert!(graph.find_cycle().is_none());
///
/// graph.add_edge(StatId::new(2), StatId::new(1));
/// let cycle = graph.find_cycle().unwrap();
/// assert_eq!(cycle.first(), cycle.last());
/// ```
pub struct DependencyGraph {
    graph: DiGraph<StatId, ()>,
    node_map: HashMap<StatId, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the graph from a schema's stats.
    ///
    /// Every calculated stat gets a node plus one edge per direct formula
    /// dependency. Non-calculated dependencies become leaf nodes.
    pub fn from_stats(stats: &[Stat]) -> Self {
        let mut graph = Self::new();
        for stat in stats {
            if let Some(formula) = stat.formula() {
                graph.add_node(stat.id);
                for dep in formula_dependencies(formula) {
                    graph.add_edge(stat.id, dep);
                }
            }
        }
        graph
    }

    /// Add a node if it does not exist, returning its index.
    pub fn add_node(&mut self, id: StatId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            idx
        } else {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
            idx
        }
    }

    /// Add an edge meaning `from`'s formula reads `to`'s value.
    pub fn add_edge(&mut self, from: StatId, to: StatId) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.graph.add_edge(from_idx, to_idx, ());
    }

    /// Whether the stat appears in the graph at all.
    pub fn contains_node(&self, id: StatId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// The direct dependencies recorded for a stat.
    pub fn dependencies_of(&self, id: StatId) -> Vec<StatId> {
        match self.node_map.get(&id) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, petgraph::Direction::Outgoing)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Find a dependency cycle, if any.
    ///
    /// Returns the closed cycle path (first element repeated at the end),
    /// or `None` when the graph is acyclic. Depth-first search with a
    /// recursion-stack set; deterministic for a given insertion order.
    pub fn find_cycle(&self) -> Option<Vec<StatId>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node_idx in self.graph.node_indices() {
            if !visited.contains(&node_idx) {
                let mut path = Vec::new();
                if let Some(cycle) =
                    self.dfs_cycle(node_idx, &mut visited, &mut rec_stack, &mut path)
                {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<StatId>,
    ) -> Option<Vec<StatId>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(self.graph[node]);

        for neighbor in self
            .graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
        {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle(neighbor, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                // Extract only the cycle portion of the current path.
                let neighbor_id = self.graph[neighbor];
                let start = path
                    .iter()
                    .position(|id| *id == neighbor_id)
                    .unwrap_or(path.len() - 1);
                let mut cycle: Vec<StatId> = path[start..].to_vec();
                cycle.push(neighbor_id);
                return Some(cycle);
            }
        }

        rec_stack.remove(&node);
        path.pop();
        None
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
