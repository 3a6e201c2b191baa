use std::{fs::File, io::BufReader};

use as_topology::{as_graph, TopologyBuilder};

fn main() {
    let file = File::open("rib.20231201.0000.txt").unwrap();
    let (topology, stats) = TopologyBuilder::from_reader(BufReader::new(file)).unwrap();

    println!("Records: {} ({} malformed)", stats.records, stats.malformed);
    println!("Nodes: {}, edges: {}", topology.node_count(), topology.edge_count());

    let (ases, collapse) = as_graph(&topology);
    println!(
        "ASes: {}, directed links: {}, bidirectional links: {}",
        ases.node_count(),
        collapse.directed,
        collapse.bidirectional
    );
}
