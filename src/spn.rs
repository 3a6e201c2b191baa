//! Sibling peripheral node extraction.
//!
//! Starting from a list of peripheral ASes (no customers pointing at them,
//! at least one upstream), walk one hop up to their parents and one hop
//! back down to the parents' other peripheral children:
//!
//! ```text
//!            ┌──────────┐
//!            │  Parent  │
//!            └─▲──────▲─┘
//!    AS->AS (1)│      │AS->AS (2)
//!        ┌─────┴─┐  ┌─┴───────┐
//!        │ Input │  │ Sibling │
//!        └───────┘  └─────────┘
//! ```
use std::collections::HashSet;

use tracing::{info, warn};

use crate::graph::{attr, kind, Graph, NodeId};

pub const PARENT_LINK: &str = "AS->AS (1)";
pub const SIBLING_LINK: &str = "AS->AS (2)";

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Role {
    Input,
    Parent,
    Sibling,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Input => "Input",
            Role::Parent => "Parent",
            Role::Sibling => "Sibling",
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            Role::Input => 0,
            Role::Parent => 1,
            Role::Sibling => 2,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Degree {
    pub in_degree: usize,
    pub out_degree: usize,
}

impl Degree {
    /// Nothing points at the node and it points at something.
    pub fn is_peripheral(&self) -> bool {
        self.in_degree == 0 && self.out_degree >= 1
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpnStats {
    pub inputs: usize,
    pub parents: usize,
    pub siblings: usize,
    pub unknown_seeds: usize,
    pub rejected_seeds: usize,
}

fn is_as_link(edge_type: Option<&str>) -> bool {
    matches!(edge_type, Some(kind::AS_AS) | Some(kind::AS_BIDIRECTIONAL))
}

/// Extracts the Input/Parent/Sibling graph around a seed list.
pub struct SpnExtractor<'g> {
    graph: &'g Graph,
    pn_check: bool,
    degrees: Vec<Degree>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl<'g> SpnExtractor<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let count = graph.node_count();
        let mut degrees = vec![Degree::default(); count];
        let mut successors = vec![Vec::new(); count];
        let mut predecessors = vec![Vec::new(); count];

        for entry in graph.edges() {
            if !is_as_link(entry.edge.attribute(attr::TYPE)) {
                continue;
            }
            degrees[entry.src.index()].out_degree += 1;
            degrees[entry.dst.index()].in_degree += 1;
            successors[entry.src.index()].push(entry.dst);
            predecessors[entry.dst.index()].push(entry.src);
        }

        SpnExtractor {
            graph,
            pn_check: true,
            degrees,
            successors,
            predecessors,
        }
    }

    /// Whether seeds and siblings must be peripheral nodes. On by default.
    pub fn pn_check(mut self, enabled: bool) -> Self {
        self.pn_check = enabled;
        self
    }

    pub fn degree(&self, id: NodeId) -> Degree {
        self.degrees.get(id.index()).copied().unwrap_or_default()
    }

    fn accepts(&self, id: NodeId) -> bool {
        !self.pn_check || self.degree(id).is_peripheral()
    }

    fn add_member(&self, output: &mut Graph, id: NodeId, role: Role) -> NodeId {
        let member = output.copy_node_from(self.graph, id);
        output.set_node_attribute(member, attr::ROLE, role.name());
        output.set_node_attribute(member, attr::DEPTH, role.depth().to_string());
        member
    }

    pub fn extract<S: AsRef<str>>(&self, seeds: &[S]) -> (Graph, SpnStats) {
        let mut output = Graph::new();
        let mut stats = SpnStats::default();

        let mut inputs = Vec::new();
        for seed in seeds {
            let label = seed.as_ref().trim();
            if label.is_empty() || output.index_of(label).is_some() {
                continue;
            }

            let id = match self.graph.index_of(label) {
                Some(id) => id,
                None => {
                    warn!(asn = label, "seed not found in AS graph");
                    stats.unknown_seeds += 1;
                    continue;
                }
            };
            if !self.accepts(id) {
                let degree = self.degree(id);
                warn!(
                    asn = label,
                    in_degree = degree.in_degree,
                    out_degree = degree.out_degree,
                    "seed is not a peripheral node"
                );
                stats.rejected_seeds += 1;
                continue;
            }

            self.add_member(&mut output, id, Role::Input);
            inputs.push(id);
        }
        stats.inputs = inputs.len();

        let mut parents = Vec::new();
        let mut reached = HashSet::new();
        for &input in &inputs {
            let child = output.add_or_get_node(self.graph.label_of(input));
            for &parent in &self.successors[input.index()] {
                let member = match output.index_of(self.graph.label_of(parent)) {
                    Some(member) => member,
                    None => {
                        stats.parents += 1;
                        self.add_member(&mut output, parent, Role::Parent)
                    }
                };
                if output.find_edge(child, member).is_none() {
                    let link = output.add_or_get_edge(child, member);
                    output.set_edge_attribute(link, attr::TYPE, PARENT_LINK);
                }
                if reached.insert(parent) {
                    parents.push(parent);
                }
            }
        }

        for &parent in &parents {
            let member = output.add_or_get_node(self.graph.label_of(parent));
            for &sibling in &self.predecessors[parent.index()] {
                if !self.accepts(sibling) {
                    continue;
                }
                let child = match output.index_of(self.graph.label_of(sibling)) {
                    Some(child) => child,
                    None => {
                        stats.siblings += 1;
                        self.add_member(&mut output, sibling, Role::Sibling)
                    }
                };
                if output.find_edge(child, member).is_none() {
                    let link = output.add_or_get_edge(child, member);
                    output.set_edge_attribute(link, attr::TYPE, SIBLING_LINK);
                }
            }
        }

        info!(
            inputs = stats.inputs,
            parents = stats.parents,
            siblings = stats.siblings,
            rejected = stats.rejected_seeds + stats.unknown_seeds,
            "sibling peripheral nodes extracted"
        );
        (output, stats)
    }
}
