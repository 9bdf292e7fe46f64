//! Dependency graph over manifest items.
//!
//! One node per manifest item, one edge per declared dependency whose target
//! exists. Declared dependencies on identifiers absent from the graph are kept
//! on the side so [`DependencyGraph::validate`] and the resolver can report them
//! without the graph algorithms having to skip dangling edges.
//!
//! All orderings are deterministic: when several items are ready at once the
//! lexicographically smallest identifier goes first.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::core::{CapmError, ItemId, suggest_similar};
use crate::manifest::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Directed graph where an edge `a -> b` means "a depends on b".
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ItemId, ()>,
    node_map: HashMap<ItemId, NodeIndex>,
    declared: BTreeMap<ItemId, Vec<ItemId>>,
}

impl DependencyGraph {
    /// Build the graph for every item in `manifest`.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::from_declarations(manifest.iter().map(|(id, item)| (id.clone(), item.dependency_ids())))
    }

    /// Build a graph from `(node, declared deps)` pairs.
    pub fn from_declarations<I>(declarations: I) -> Self
    where
        I: IntoIterator<Item = (ItemId, Vec<ItemId>)>,
    {
        let mut graph = Self::default();
        let declarations: Vec<(ItemId, Vec<ItemId>)> = declarations.into_iter().collect();

        for (id, _) in &declarations {
            graph.ensure_node(id.clone());
        }
        for (id, deps) in declarations {
            let from = graph.ensure_node(id.clone());
            for dep in &deps {
                if let Some(&to) = graph.node_map.get(dep)
                    && !graph.graph.contains_edge(from, to)
                {
                    graph.graph.add_edge(from, to, ());
                }
            }
            graph.declared.entry(id).or_default().extend(deps);
        }
        graph
    }

    fn ensure_node(&mut self, id: ItemId) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&id) {
            index
        } else {
            let index = self.graph.add_node(id.clone());
            self.node_map.insert(id, index);
            index
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.node_map.contains_key(id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Order every node so that dependencies precede dependents.
    ///
    /// Fails with [`CapmError::CircularDependency`] carrying one concrete
    /// cycle when the graph is not acyclic; no partial order is returned.
    pub fn topological_sort(&self) -> Result<Vec<ItemId>, CapmError> {
        let members: BTreeSet<ItemId> = self.node_map.keys().cloned().collect();
        self.sort_members(&members)
    }

    /// Order `requested` plus everything it transitively depends on.
    ///
    /// Only the closure takes part in the sort, so unrelated items never
    /// appear and cycles elsewhere in the graph do not matter.
    pub fn resolve_order(&self, requested: &[ItemId]) -> Result<Vec<ItemId>, CapmError> {
        let closure = self.closure(requested)?;
        self.sort_members(&closure)
    }

    /// Every item `id` transitively depends on, sorted. Excludes `id` itself
    /// unless it sits on a cycle through itself.
    #[must_use]
    pub fn all_dependencies(&self, id: &ItemId) -> Vec<ItemId> {
        let mut deps = BTreeSet::new();
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.neighbors(current) {
                if deps.insert(self.graph[neighbor].clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
        deps.into_iter().collect()
    }

    /// Items that directly depend on `id`, sorted.
    #[must_use]
    pub fn dependents(&self, id: &ItemId) -> Vec<ItemId> {
        let Some(&index) = self.node_map.get(id) else {
            return Vec::new();
        };
        let dependents: BTreeSet<ItemId> = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        dependents.into_iter().collect()
    }

    /// Declared dependencies whose target is not in the graph, as distinct
    /// `(source, missing)` pairs in sorted order.
    #[must_use]
    pub fn missing_edges(&self) -> Vec<(ItemId, ItemId)> {
        let mut pairs = BTreeSet::new();
        for (source, deps) in &self.declared {
            for dep in deps.iter().filter(|d| !self.contains(d)) {
                pairs.insert((source.clone(), dep.clone()));
            }
        }
        pairs.into_iter().collect()
    }

    /// One message per distinct dangling edge. Empty when all references
    /// resolve.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.missing_edges()
            .into_iter()
            .map(|(source, missing)| format!("{source} depends on missing item {missing}"))
            .collect()
    }

    /// Missing identifiers referenced by anything in the closure of
    /// `requested`, sorted and deduplicated.
    pub fn missing_in_closure(&self, requested: &[ItemId]) -> Result<Vec<ItemId>, CapmError> {
        let closure = self.closure(requested)?;
        let missing: BTreeSet<ItemId> = closure
            .iter()
            .filter_map(|id| self.declared.get(id))
            .flatten()
            .filter(|dep| !self.contains(dep))
            .cloned()
            .collect();
        Ok(missing.into_iter().collect())
    }

    /// Render the dependency tree below `root` for display.
    ///
    /// Revisited nodes are marked instead of expanded again; dangling
    /// references are shown with a `(missing)` marker.
    #[must_use]
    pub fn to_tree_string(&self, root: &ItemId) -> String {
        let mut result = format!("{root}\n");
        let mut visited = HashSet::from([root.clone()]);
        let children = self.declared_deps(root);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.build_tree_string(&child, &mut result, "", i + 1 == count, &mut visited);
        }
        result
    }

    fn build_tree_string(
        &self,
        node: &ItemId,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<ItemId>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        if !self.contains(node) {
            result.push_str(&format!("{prefix}{connector}{node} (missing)\n"));
            return;
        }
        result.push_str(&format!("{prefix}{connector}{node}\n"));

        if !visited.insert(node.clone()) {
            result.push_str(&format!("{child_prefix}└── (already shown)\n"));
            return;
        }

        let children = self.declared_deps(node);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.build_tree_string(&child, result, &child_prefix, i + 1 == count, visited);
        }
    }

    fn declared_deps(&self, id: &ItemId) -> Vec<ItemId> {
        let deps: BTreeSet<ItemId> =
            self.declared.get(id).map(|d| d.iter().cloned().collect()).unwrap_or_default();
        deps.into_iter().collect()
    }

    fn closure(&self, requested: &[ItemId]) -> Result<BTreeSet<ItemId>, CapmError> {
        let mut closure = BTreeSet::new();
        let mut queue = VecDeque::new();

        for id in requested {
            let Some(&index) = self.node_map.get(id) else {
                return Err(CapmError::ItemNotFound {
                    id: id.to_string(),
                    suggestions: suggest_similar(&id.to_string(), self.node_map.keys()),
                });
            };
            if closure.insert(id.clone()) {
                queue.push_back(index);
            }
        }

        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.neighbors(current) {
                if closure.insert(self.graph[neighbor].clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
        Ok(closure)
    }

    /// Dependencies of `id` inside `members`, sorted and deduplicated.
    fn deps_within<'a>(&'a self, id: &ItemId, members: &BTreeSet<ItemId>) -> Vec<&'a ItemId> {
        let Some(&index) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<&ItemId> =
            self.graph.neighbors(index).map(|n| &self.graph[n]).filter(|d| members.contains(*d)).collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Kahn's algorithm restricted to `members`, smallest ready id first.
    fn sort_members(&self, members: &BTreeSet<ItemId>) -> Result<Vec<ItemId>, CapmError> {
        let mut pending: HashMap<&ItemId, usize> = HashMap::new();
        let mut dependents: HashMap<&ItemId, Vec<&ItemId>> = HashMap::new();

        for id in members {
            let deps = self.deps_within(id, members);
            pending.insert(id, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(id);
            }
        }

        let mut ready: BTreeSet<&ItemId> =
            pending.iter().filter(|(_, count)| **count == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(members.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.clone());
            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() < members.len() {
            let placed: HashSet<&ItemId> = order.iter().collect();
            let remaining: BTreeSet<ItemId> =
                members.iter().filter(|id| !placed.contains(id)).cloned().collect();
            return Err(CapmError::CircularDependency {
                cycle: self.find_cycle(&remaining),
            });
        }
        Ok(order)
    }

    /// Recover one cycle among `remaining` (nodes Kahn could not place).
    ///
    /// Iterative depth-first search from the smallest node, visiting
    /// neighbors in sorted order. The returned path repeats its first node at
    /// the end: `[a, b, c, a]`.
    fn find_cycle(&self, remaining: &BTreeSet<ItemId>) -> Vec<ItemId> {
        let mut colors: HashMap<&ItemId, Color> = remaining.iter().map(|id| (id, Color::White)).collect();

        for start in remaining {
            if colors.get(start) != Some(&Color::White) {
                continue;
            }

            let mut path: Vec<&ItemId> = vec![start];
            let mut stack = vec![self.deps_within(start, remaining).into_iter()];
            colors.insert(start, Color::Gray);

            while let Some(frame) = stack.last_mut() {
                let Some(next) = frame.next() else {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        colors.insert(done, Color::Black);
                    }
                    continue;
                };

                match colors.get(next).copied().unwrap_or(Color::Black) {
                    Color::Gray => {
                        let begin = path.iter().position(|n| *n == next).unwrap_or(0);
                        let mut cycle: Vec<ItemId> = path[begin..].iter().map(|n| (*n).clone()).collect();
                        cycle.push(next.clone());
                        return cycle;
                    }
                    Color::White => {
                        colors.insert(next, Color::Gray);
                        path.push(next);
                        stack.push(self.deps_within(next, remaining).into_iter());
                    }
                    Color::Black => {}
                }
            }
        }

        // Every node Kahn leaves behind has a dependency among the others, so
        // the search above always finds a cycle.
        remaining.iter().cloned().collect()
    }
}
