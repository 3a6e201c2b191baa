//! Per-country views of an AS graph.
//!
//! An edge lands in the partition of its source country and in the one of
//! its destination country, so cross-border adjacencies show up on both
//! sides. Nodes without a country code are grouped under [`UNKNOWN_COUNTRY`].
use std::collections::BTreeMap;

use tracing::info;

use crate::graph::{attr, Graph, NodeId};

pub const UNKNOWN_COUNTRY: &str = "unknown";

fn country_of(graph: &Graph, id: NodeId) -> &str {
    match graph.node_attribute(id, attr::CC) {
        Some(cc) if !cc.is_empty() => cc,
        _ => UNKNOWN_COUNTRY,
    }
}

/// Number of nodes per country code.
pub fn country_histogram(graph: &Graph) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for (id, _) in graph.nodes() {
        *histogram.entry(country_of(graph, id).to_owned()).or_insert(0) += 1;
    }
    histogram
}

/// One graph per country code, keyed and ordered by code. Each partition
/// holds every node of its country plus every edge touching one of them,
/// with the foreign endpoint and all attributes copied along.
pub fn partition_by_country(graph: &Graph) -> BTreeMap<String, Graph> {
    let mut partitions: BTreeMap<String, Graph> = BTreeMap::new();

    for (id, _) in graph.nodes() {
        partitions
            .entry(country_of(graph, id).to_owned())
            .or_default()
            .copy_node_from(graph, id);
    }

    for entry in graph.edges() {
        let src = country_of(graph, entry.src);
        let dst = country_of(graph, entry.dst);

        for cc in [Some(src), (dst != src).then(|| dst)].into_iter().flatten() {
            if let Some(partition) = partitions.get_mut(cc) {
                partition.copy_edge_from(graph, entry.id);
            }
        }
    }

    info!(partitions = partitions.len(), "country partitions extracted");
    partitions
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::*;
    use crate::graph::kind;

    fn node(graph: &mut Graph, label: &str, cc: Option<&str>) {
        let id = graph.add_or_get_node(label);
        graph.set_node_attribute(id, attr::TYPE, kind::AS);
        if let Some(cc) = cc {
            graph.set_node_attribute(id, attr::CC, cc);
        }
    }

    fn link(graph: &mut Graph, src: &str, dst: &str) {
        let src = graph.index_of(src).unwrap();
        let dst = graph.index_of(dst).unwrap();
        let id = graph.add_or_get_edge(src, dst);
        graph.set_edge_attribute(id, attr::TYPE, kind::AS_AS);
        graph.set_edge_attribute(id, "weight", "7");
    }

    fn edge_labels(graph: &Graph) -> BTreeSet<(String, String)> {
        graph
            .edges()
            .map(|entry| {
                (
                    graph.label_of(entry.src).to_owned(),
                    graph.label_of(entry.dst).to_owned(),
                )
            })
            .collect()
    }

    /*
     *  DE             │ FR            │ (none)
     * ┌───────┐     ┌─┴─────┐       ┌─┴─────┐
     * │   1   ├────►│   3   ├──────►│   5   │
     * └───┬───┘     └─┬─────┘       └─┬──▲──┘
     *     ▼           │               │  │
     * ┌───────┐       │ ┌───────┐   ┌─┴──┴──┐
     * │   2   │       │ │   4   │   │   6   │
     * └───────┘       │ └───────┘   └───────┘
     */
    fn topology() -> Graph {
        let mut graph = Graph::new();
        node(&mut graph, "1", Some("DE"));
        node(&mut graph, "2", Some("DE"));
        node(&mut graph, "3", Some("FR"));
        node(&mut graph, "4", Some("FR"));
        node(&mut graph, "5", None);
        node(&mut graph, "6", Some(""));
        link(&mut graph, "1", "2");
        link(&mut graph, "1", "3");
        link(&mut graph, "3", "5");
        link(&mut graph, "6", "5");
        graph
    }

    #[test]
    fn test_histogram() {
        let histogram = country_histogram(&topology());

        assert_eq!(histogram.get("DE"), Some(&2));
        assert_eq!(histogram.get("FR"), Some(&2));
        assert_eq!(histogram.get(UNKNOWN_COUNTRY), Some(&2));
        assert_eq!(histogram.values().sum::<usize>(), 6);
    }

    #[test]
    fn test_partitions() {
        let graph = topology();
        let partitions = partition_by_country(&graph);

        assert_eq!(
            partitions.keys().map(String::as_str).collect::<Vec<_>>(),
            ["DE", "FR", UNKNOWN_COUNTRY]
        );

        let de = &partitions["DE"];
        assert_eq!(
            edge_labels(de),
            [("1", "2"), ("1", "3")]
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<BTreeSet<_>>()
        );
        assert_eq!(de.node_count(), 3);
        assert_eq!(
            de.node_attribute(de.index_of("3").unwrap(), attr::CC),
            Some("FR")
        );

        let fr = &partitions["FR"];
        assert!(fr.index_of("4").is_some());
        assert_eq!(fr.edge_count(), 2);

        let unknown = &partitions[UNKNOWN_COUNTRY];
        assert_eq!(unknown.edge_count(), 2);
    }

    #[test]
    fn test_cross_border_edge_in_two_partitions() {
        let graph = topology();
        let partitions = partition_by_country(&graph);

        let holders = partitions
            .values()
            .filter(|partition| edge_labels(partition).contains(&("1".to_owned(), "3".to_owned())))
            .count();
        assert_eq!(holders, 2);
    }

    #[test]
    fn test_known_partitions_cover_edges_with_a_country() {
        let graph = topology();
        let partitions = partition_by_country(&graph);

        let covered: BTreeSet<_> = partitions
            .iter()
            .filter(|(cc, _)| cc.as_str() != UNKNOWN_COUNTRY)
            .flat_map(|(_, partition)| edge_labels(partition))
            .collect();
        let expected: BTreeSet<_> = graph
            .edges()
            .filter(|entry| {
                country_of(&graph, entry.src) != UNKNOWN_COUNTRY
                    || country_of(&graph, entry.dst) != UNKNOWN_COUNTRY
            })
            .map(|entry| {
                (
                    graph.label_of(entry.src).to_owned(),
                    graph.label_of(entry.dst).to_owned(),
                )
            })
            .collect();

        assert_eq!(covered, expected);
    }

    #[test]
    fn test_edge_attributes_are_copied() {
        let graph = topology();
        let partitions = partition_by_country(&graph);
        let fr = &partitions["FR"];

        let id = fr
            .find_edge(fr.index_of("3").unwrap(), fr.index_of("5").unwrap())
            .unwrap();
        assert_eq!(fr.edge_attribute(id, "weight"), Some("7"));
        assert_eq!(fr.edge_attribute(id, attr::TYPE), Some(kind::AS_AS));
    }
}
