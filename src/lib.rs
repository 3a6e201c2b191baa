//! as-topology builds an AS-level topology graph from decoded routing-table
//! dumps (`bgpdump -m` output), enriches it with the RIR delegation files and
//! derives AS-only, core, per-country and sibling-peripheral-node views from
//! it.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use as_topology::{as_graph, extract_core, TopologyBuilder};
//!
//! let rib = BufReader::new(File::open("rib.20231201.0000.txt").unwrap());
//! let (topology, _) = TopologyBuilder::from_reader(rib).unwrap();
//!
//! let (ases, stats) = as_graph(&topology);
//! println!("{} bidirectional links", stats.bidirectional);
//!
//! let core = extract_core(&ases);
//! println!("core: {} ASes, {} links", core.node_count(), core.edge_count());
//! ```
pub mod builder;
pub mod components;
pub mod country;
pub mod error;
pub mod graph;
pub mod input;
pub mod pipeline;
pub mod projection;
pub mod record;
pub mod registry;
pub mod spn;

pub use builder::{BuildStats, TopologyBuilder};
pub use components::weakly_connected_components;
pub use country::{country_histogram, partition_by_country, UNKNOWN_COUNTRY};
pub use error::{AllocationError, GraphError, PipelineError, RecordError};
pub use graph::{attr, kind, Attributes, Edge, EdgeEntry, EdgeId, Graph, GraphDocument, Node, NodeId};
pub use pipeline::{ArtifactName, Pipeline, PipelineConfig};
pub use projection::{as_graph, collapse_bidirectional, extract_core, project_as, CollapseStats};
pub use record::PathRecord;
pub use registry::{is_country_code, Allocation, EnrichStats, Registry, RegistryEnricher};
pub use spn::{Degree, Role, SpnExtractor, SpnStats};

#[cfg(test)]
mod test {
    use super::*;

    fn rib_line(prefix: &str, path: &str) -> String {
        format!(
            "TABLE_DUMP2|1606780800|B|192.0.2.1|64496|{}|{}|IGP|192.0.2.1|0|0||NAG||\n",
            prefix, path
        )
    }

    #[test]
    /*
     *            ┌───────┐
     *            │   1   │
     *            └─▲───▲─┘
     *        ┌─────┘   └─────┐
     *    ┌───┴───┐       ┌───┴───┐
     *    │   2   ├──────►│   3   │
     *    │       │◄──────┤       │
     *    └───▲───┘       └───▲───┘
     *        │               │
     *    ┌───┴───┐       ┌───┴───┐
     *    │   4   │       │   5   │
     *    └───────┘       └───────┘
     */
    fn test_rib_to_views() {
        let table = [
            rib_line("10.0.0.0/24", "1 2 4"),
            rib_line("10.0.1.0/24", "1 3 5"),
            rib_line("10.0.2.0/24", "4 1 2"),
            rib_line("10.0.3.0/24", "5 1 3"),
            rib_line("10.0.4.0/24", "1 2 3"),
            rib_line("10.0.5.0/24", "1 3 2"),
        ]
        .concat();

        let (mut topology, stats) = TopologyBuilder::from_reader(table.as_bytes()).unwrap();
        assert_eq!(stats.as_links, 6);
        assert_eq!(topology.node_count(), 5 + 6);

        let allocations = "ripencc|DE|asn|2|1|20200101|allocated\n\
                           ripencc|DE|asn|4|1|20200101|allocated\n\
                           arin|US|asn|3|1|20200101|allocated\n";
        let mut enricher = RegistryEnricher::new(&mut topology);
        enricher
            .apply_reader(Registry::Ripencc, allocations.as_bytes())
            .unwrap();
        assert_eq!(enricher.finish().applied, 3);

        let (ases, collapse) = as_graph(&topology);
        assert_eq!(ases.node_count(), 5);
        assert_eq!(collapse.bidirectional, 1);
        assert_eq!(ases.edge_count(), 5);

        let core = extract_core(&ases);
        assert_eq!(core.node_count(), 2);

        let partitions = partition_by_country(&ases);
        assert_eq!(partitions["DE"].edge_count(), 3);
        assert_eq!(partitions["US"].edge_count(), 3);
        assert_eq!(partitions[UNKNOWN_COUNTRY].node_count(), 4);

        let (spn, spn_stats) = SpnExtractor::new(&ases).extract(&["4", "5"]);
        assert_eq!(spn_stats.inputs, 2);
        assert_eq!(spn_stats.parents, 2);
        assert_eq!(spn_stats.siblings, 0);
        assert_eq!(weakly_connected_components(&spn).len(), 2);
    }
}
