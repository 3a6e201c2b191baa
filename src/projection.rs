//! AS-level views of a topology graph.
//!
//! [`project_as`] drops prefixes, [`collapse_bidirectional`] folds mutual
//! `AS->AS` links into one `AS<->AS` edge and [`extract_core`] keeps only
//! those folded links.
use tracing::info;

use crate::graph::{attr, kind, Graph};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollapseStats {
    pub directed: usize,
    pub bidirectional: usize,
}

/// AS nodes and the `AS->AS` edges between them, as a new graph.
pub fn project_as(graph: &Graph) -> Graph {
    let mut projection = Graph::new();

    for (id, node) in graph.nodes() {
        if node.attribute(attr::TYPE) == Some(kind::AS) {
            projection.copy_node_from(graph, id);
        }
    }

    for entry in graph.edges() {
        if entry.edge.attribute(attr::TYPE) != Some(kind::AS_AS) {
            continue;
        }
        let src = projection.index_of(graph.label_of(entry.src));
        let dst = projection.index_of(graph.label_of(entry.dst));
        if let (Some(src), Some(dst)) = (src, dst) {
            let id = projection.add_or_get_edge(src, dst);
            for (key, value) in entry.edge.attributes() {
                projection.set_edge_attribute(id, key, value.as_str());
            }
        }
    }

    info!(
        nodes = projection.node_count(),
        edges = projection.edge_count(),
        "AS projection extracted"
    );
    projection
}

/*
 * Edges are visited in insertion order. When `v -> u` arrives and `u -> v`
 * was already emitted, `u -> v` is retagged `AS<->AS` and `v -> u` is
 * dropped:
 *
 * ┌───────┐  (1)   ┌───────┐          ┌───────┐         ┌───────┐
 * │   A   ├───────►│   B   │          │   A   ├────────►│   B   │
 * │       │◄───────┤       │   ==>    │       │ AS<->AS │       │
 * └───────┘  (2)   └───────┘          └───────┘         └───────┘
 */
/// Folds every pair of mutual edges into the earlier-inserted one. All nodes
/// are kept.
pub fn collapse_bidirectional(graph: &Graph) -> (Graph, CollapseStats) {
    let mut collapsed = Graph::new();
    let mut stats = CollapseStats::default();

    for (id, _) in graph.nodes() {
        collapsed.copy_node_from(graph, id);
    }

    for entry in graph.edges() {
        let src = collapsed.add_or_get_node(graph.label_of(entry.src));
        let dst = collapsed.add_or_get_node(graph.label_of(entry.dst));

        if let Some(reverse) = collapsed.find_edge(dst, src) {
            collapsed.set_edge_attribute(reverse, attr::TYPE, kind::AS_BIDIRECTIONAL);
            stats.bidirectional += 1;
            continue;
        }

        let id = collapsed.add_or_get_edge(src, dst);
        for (key, value) in entry.edge.attributes() {
            collapsed.set_edge_attribute(id, key, value.as_str());
        }
        collapsed.set_edge_attribute(id, attr::TYPE, kind::AS_AS);
    }
    stats.directed = collapsed.edge_count() - stats.bidirectional;

    info!(
        directed = stats.directed,
        bidirectional = stats.bidirectional,
        "bidirectional edges collapsed"
    );
    (collapsed, stats)
}

/// The `AS<->AS` edges of a collapsed graph and their endpoints, nothing else.
pub fn extract_core(graph: &Graph) -> Graph {
    let mut core = Graph::new();

    for entry in graph.edges() {
        if entry.edge.attribute(attr::TYPE) == Some(kind::AS_BIDIRECTIONAL) {
            core.copy_edge_from(graph, entry.id);
        }
    }

    info!(
        nodes = core.node_count(),
        edges = core.edge_count(),
        "core graph extracted"
    );
    core
}

/// Projection followed by collapse: the AS graph every later stage reads.
pub fn as_graph(topology: &Graph) -> (Graph, CollapseStats) {
    collapse_bidirectional(&project_as(topology))
}
