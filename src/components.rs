use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;

use crate::graph::{Graph, NodeId};

/// Groups nodes that are reachable from one another when edge direction is
/// ignored. Components are ordered by their smallest node id and list their
/// members in id order.
pub fn weakly_connected_components(graph: &Graph) -> Vec<Vec<NodeId>> {
    let mut sets = UnionFind::<usize>::new(graph.node_count());
    for entry in graph.edges() {
        sets.union(entry.src.index(), entry.dst.index());
    }

    let mut components: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    let mut first_of_root: BTreeMap<usize, usize> = BTreeMap::new();
    for (id, _) in graph.nodes() {
        let root = sets.find(id.index());
        let first = *first_of_root.entry(root).or_insert(id.index());
        components.entry(first).or_default().push(id);
    }

    components.into_values().collect()
}
