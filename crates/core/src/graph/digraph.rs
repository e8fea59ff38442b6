use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Directed graph backed by an adjacency map.
///
/// Vertices are added implicitly when they appear in an edge, or explicitly
/// via [`add_vertex`](Self::add_vertex). Self-loops are permitted.
///
/// Used by the register engine for the compare-to-swap relation of
/// successful compare-and-swap calls and for the "must precede" relation
/// between blocks of variables.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    /// Maps each vertex to the set of vertices it has edges to.
    pub adj_map: HashMap<T, HashSet<T>>,
}

impl<T> Default for DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self {
            adj_map: HashMap::new(),
        }
    }
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    /// Inserts a directed edge from `source` to `target`.
    ///
    /// Both vertices are added to the graph if not already present.
    pub fn add_edge(&mut self, source: T, target: T) {
        self.adj_map
            .entry(source)
            .or_default()
            .insert(target.clone());
        self.adj_map.entry(target).or_default();
    }

    /// Adds a vertex with no outgoing edges (if not already present).
    pub fn add_vertex(&mut self, source: T) {
        self.adj_map.entry(source).or_default();
    }

    fn in_degrees(&self) -> HashMap<T, usize> {
        let mut in_degree: HashMap<T, usize> = HashMap::new();
        for vertex in self.adj_map.keys() {
            in_degree.entry(vertex.clone()).or_insert(0);
        }
        for neighbors in self.adj_map.values() {
            for neighbor in neighbors {
                *in_degree.entry(neighbor.clone()).or_insert(0) += 1;
            }
        }
        in_degree
    }

    /// Returns the smallest vertex of some cycle, or `None` if acyclic.
    ///
    /// Kahn's algorithm strips every vertex no cycle reaches. Each vertex
    /// left over keeps a predecessor that is left over too, so walking
    /// predecessors from any of them must revisit a vertex and close a cycle.
    #[must_use]
    pub fn find_cycle_vertex(&self) -> Option<T>
    where
        T: Ord,
    {
        let mut in_degree = self.in_degrees();

        let mut queue: Vec<T> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(v, _)| v.clone())
            .collect();

        let mut removed: HashSet<T> = HashSet::new();

        while let Some(vertex) = queue.pop() {
            removed.insert(vertex.clone());
            if let Some(neighbors) = self.adj_map.get(&vertex) {
                for neighbor in neighbors {
                    if let Some(deg) = in_degree.get_mut(neighbor) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push(neighbor.clone());
                        }
                    }
                }
            }
        }

        let mut predecessor: HashMap<&T, &T> = HashMap::new();
        for (source, targets) in &self.adj_map {
            if removed.contains(source) {
                continue;
            }
            for target in targets {
                predecessor
                    .entry(target)
                    .and_modify(|current| *current = (*current).min(source))
                    .or_insert(source);
            }
        }

        let mut vertex = self.adj_map.keys().filter(|v| !removed.contains(*v)).min()?;
        let mut path: Vec<&T> = Vec::new();
        loop {
            if let Some(position) = path.iter().position(|seen| *seen == vertex) {
                return path[position..].iter().min().map(|v| (*v).clone());
            }
            path.push(vertex);
            vertex = *predecessor.get(vertex)?;
        }
    }

    /// Kahn's algorithm that always emits the ready vertex with the smallest
    /// `key` first. Returns `None` if the graph has a cycle.
    ///
    /// Ties on `key` are broken by the vertex order, so the result is
    /// deterministic regardless of hash iteration order.
    #[must_use]
    pub fn topological_sort_by_key<K, F>(&self, mut key: F) -> Option<Vec<T>>
    where
        T: Ord,
        K: Ord,
        F: FnMut(&T) -> K,
    {
        let mut in_degree = self.in_degrees();

        let mut ready: BTreeSet<(K, T)> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(vertex, _)| (key(vertex), vertex.clone()))
            .collect();

        let mut result = Vec::with_capacity(self.adj_map.len());

        while let Some((_, vertex)) = ready.pop_first() {
            if let Some(neighbors) = self.adj_map.get(&vertex) {
                for neighbor in neighbors {
                    if let Some(degree) = in_degree.get_mut(neighbor) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert((key(neighbor), neighbor.clone()));
                        }
                    }
                }
            }
            result.push(vertex);
        }

        (result.len() == self.adj_map.len()).then_some(result)
    }

    /// Depth-first post-order over the whole graph.
    ///
    /// Every vertex is used as a DFS root in ascending order; a vertex is
    /// appended once all of its successors have been appended. Reversing
    /// the result of an acyclic graph gives a topological order.
    #[must_use]
    pub fn post_order(&self) -> Vec<T>
    where
        T: Ord,
    {
        let mut roots: Vec<&T> = self.adj_map.keys().collect();
        roots.sort_unstable();

        let mut visited: HashSet<T> = HashSet::new();
        let mut order = Vec::with_capacity(self.adj_map.len());

        for root in roots {
            if !visited.insert(root.clone()) {
                continue;
            }
            let mut stack: Vec<(T, Vec<T>)> = Vec::new();
            stack.push((root.clone(), self.sorted_successors(root)));
            while let Some((vertex, pending)) = stack.last_mut() {
                if let Some(next) = pending.pop() {
                    if visited.insert(next.clone()) {
                        let successors = self.sorted_successors(&next);
                        stack.push((next, successors));
                    }
                } else {
                    order.push(vertex.clone());
                    stack.pop();
                }
            }
        }

        order
    }

    /// Successors of `source`, sorted descending so popping yields them ascending.
    fn sorted_successors(&self, source: &T) -> Vec<T>
    where
        T: Ord,
    {
        let mut successors: Vec<T> = self
            .adj_map
            .get(source)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        successors.sort_unstable_by(|a, b| b.cmp(a));
        successors
    }
}
