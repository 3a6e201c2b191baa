use as_topology::{attr, weakly_connected_components, Graph, SpnExtractor};

fn main() {
    /*
     *        ┌───────┐
     *        │  10   │
     *        └─▲─▲─▲─┘
     *     ┌────┘ │ └────┐
     * ┌───┴───┐┌─┴─┐┌───┴───┐
     * │   1   ││ 2 ││   3   │
     * └───────┘└───┘└───────┘
     */
    let mut graph = Graph::new();
    let parent = graph.add_or_get_node("10");
    for child in ["1", "2", "3"] {
        let child = graph.add_or_get_node(child);
        let link = graph.add_or_get_edge(child, parent);
        graph.set_edge_attribute(link, attr::TYPE, as_topology::kind::AS_AS);
    }

    let (spn, stats) = SpnExtractor::new(&graph).extract(&["1"]);
    println!("{:?}", stats);

    for (index, component) in weakly_connected_components(&spn).iter().enumerate() {
        let members = component
            .iter()
            .map(|&id| {
                format!(
                    "{} ({})",
                    spn.label_of(id),
                    spn.node_attribute(id, attr::ROLE).unwrap_or("?")
                )
            })
            .collect::<Vec<_>>();
        println!("component {}: {}", index, members.join(", "));
    }
}
