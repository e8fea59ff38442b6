use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Undirected graph backed by an adjacency map.
///
/// The register engine builds one over reversed intervals: two intervals
/// are adjacent when their overlap is not settled by real time.
#[derive(Debug)]
pub struct UGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub adj_map: HashMap<T, HashSet<T>>,
}

impl<T> Default for UGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self {
            adj_map: HashMap::new(),
        }
    }
}

impl<T> UGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub fn add_edge(&mut self, source: T, target: T) {
        self.adj_map
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.adj_map.entry(target).or_default().insert(source);
    }

    pub fn add_vertex(&mut self, vertex: T) {
        self.adj_map.entry(vertex).or_default();
    }

    /// Find the connected components of the graph.
    ///
    /// Returns one [`BTreeSet`] per component, in ascending order of each
    /// component's smallest vertex. Isolated vertices appear as singletons.
    #[must_use]
    pub fn connected_components(&self) -> Vec<BTreeSet<T>>
    where
        T: Ord,
    {
        let mut visited: HashSet<T> = HashSet::default();
        let mut components: Vec<BTreeSet<T>> = Vec::new();

        let mut all_vertices: Vec<&T> = self.adj_map.keys().collect();
        all_vertices.sort_unstable();

        for start in all_vertices {
            if visited.contains(start) {
                continue;
            }
            let mut component: BTreeSet<T> = BTreeSet::new();
            let mut stack: Vec<T> = Vec::new();
            stack.push(start.clone());
            while let Some(v) = stack.pop() {
                if !visited.insert(v.clone()) {
                    continue;
                }
                if let Some(neighbors) = self.adj_map.get(&v) {
                    for n in neighbors {
                        if !visited.contains(n) {
                            stack.push(n.clone());
                        }
                    }
                }
                component.insert(v);
            }
            components.push(component);
        }
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_components() {
        let mut graph: UGraph<u32> = UGraph::default();
        graph.add_edge(1, 2);
        graph.add_edge(2, 4);
        graph.add_edge(3, 5);
        graph.add_vertex(6);

        let components = graph.connected_components();
        assert_eq!(
            components,
            vec![
                BTreeSet::from([1, 2, 4]),
                BTreeSet::from([3, 5]),
                BTreeSet::from([6]),
            ]
        );
    }

    #[test]
    fn test_components_of_non_default_vertices() {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        struct Label(char);

        let mut graph: UGraph<Label> = UGraph::default();
        graph.add_edge(Label('b'), Label('a'));
        graph.add_vertex(Label('c'));
        assert_eq!(
            graph.connected_components(),
            vec![
                BTreeSet::from([Label('a'), Label('b')]),
                BTreeSet::from([Label('c')]),
            ]
        );
    }

    #[test]
    fn test_edges_are_symmetric() {
        let mut graph: UGraph<u32> = UGraph::default();
        graph.add_edge(1, 2);
        assert!(graph.adj_map[&2].contains(&1));
        assert!(graph.adj_map[&1].contains(&2));
    }
}
