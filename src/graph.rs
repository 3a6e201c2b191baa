//! The graph store shared by every stage of the pipeline.
//!
//! Nodes and edges live in a petgraph arena and are addressed by [`NodeId`] /
//! [`EdgeId`]. A node is unique by label and an edge is unique by its ordered
//! `(src, dst)` pair; both are enforced by hash indexes so that get-or-create
//! stays O(1) on multi-million line routing tables.
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use petgraph::{
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GraphError;

/// Attribute keys used across the pipeline.
pub mod attr {
    pub const LABEL: &str = "label";
    pub const TYPE: &str = "type";
    pub const CC: &str = "cc";
    pub const RIR: &str = "rir";
    pub const REGISTRATION: &str = "registration";
    pub const ROLE: &str = "role";
    pub const DEPTH: &str = "depth";
}

/// Values of the `type` attribute.
pub mod kind {
    pub const AS: &str = "AS";
    pub const PREFIX: &str = "Prefix";
    pub const AS_PREFIX: &str = "AS->Prefix";
    pub const AS_AS: &str = "AS->AS";
    pub const AS_BIDIRECTIONAL: &str = "AS<->AS";
}

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone)]
pub struct NodeId(NodeIndex);

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone)]
pub struct EdgeId(EdgeIndex);

impl NodeId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: String,
    attributes: Attributes,
}

impl Node {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edge {
    attributes: Attributes,
}

impl Edge {
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// One edge as seen while iterating a [`Graph`].
#[derive(Debug, Clone, Copy)]
pub struct EdgeEntry<'a> {
    pub id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub edge: &'a Edge,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: DiGraph<Node, Edge>,
    labels: HashMap<String, NodeId>,
    pairs: HashMap<(NodeId, NodeId), EdgeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Returns the node labelled `label`, creating it when absent.
    pub fn add_or_get_node(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.labels.get(label) {
            return id;
        }

        let id = NodeId(self.inner.add_node(Node {
            label: label.to_owned(),
            attributes: Attributes::new(),
        }));
        self.labels.insert(label.to_owned(), id);
        id
    }

    /// Returns the edge `src -> dst`, creating it when absent. `dst -> src` is
    /// a different edge.
    pub fn add_or_get_edge(&mut self, src: NodeId, dst: NodeId) -> EdgeId {
        if let Some(&id) = self.pairs.get(&(src, dst)) {
            return id;
        }

        let id = EdgeId(self.inner.add_edge(src.0, dst.0, Edge::default()));
        self.pairs.insert((src, dst), id);
        id
    }

    pub fn index_of(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.pairs.get(&(src, dst)).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.inner.node_weight(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.inner.edge_weight(id.0)
    }

    /// Label of a node of this graph.
    ///
    /// Panics when `id` was not issued by this graph.
    pub fn label_of(&self, id: NodeId) -> &str {
        &self.inner[id.0].label
    }

    pub fn endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.inner
            .edge_endpoints(id.0)
            .map(|(src, dst)| (NodeId(src), NodeId(dst)))
    }

    pub fn node_attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node(id)?.attribute(key)
    }

    pub fn edge_attribute(&self, id: EdgeId, key: &str) -> Option<&str> {
        self.edge(id)?.attribute(key)
    }

    /// Sets a node attribute and returns the previous value. The label is
    /// immutable and cannot be set through here.
    pub fn set_node_attribute(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<String>,
    ) -> Option<String> {
        if key == attr::LABEL {
            warn!(node = id.index(), "refusing to overwrite node label");
            return None;
        }

        self.inner
            .node_weight_mut(id.0)?
            .attributes
            .insert(key.to_owned(), value.into())
    }

    pub fn set_edge_attribute(
        &mut self,
        id: EdgeId,
        key: &str,
        value: impl Into<String>,
    ) -> Option<String> {
        self.inner
            .edge_weight_mut(id.0)?
            .attributes
            .insert(key.to_owned(), value.into())
    }

    /// Nodes in identifier (insertion) order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.inner
            .node_indices()
            .map(move |index| (NodeId(index), &self.inner[index]))
    }

    /// Edges in identifier (insertion) order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeEntry<'_>> + '_ {
        self.inner.edge_references().map(|edge| EdgeEntry {
            id: EdgeId(edge.id()),
            src: NodeId(edge.source()),
            dst: NodeId(edge.target()),
            edge: edge.weight(),
        })
    }

    /// Targets of the outgoing edges of `id`, in edge insertion order.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Sources of the incoming edges of `id`, in edge insertion order.
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        // petgraph walks adjacency lists newest first
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .inner
            .edges_directed(id.0, direction)
            .map(|edge| match direction {
                Direction::Outgoing => (edge.id(), edge.target()),
                Direction::Incoming => (edge.id(), edge.source()),
            })
            .collect();
        edges.sort_unstable_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, node)| NodeId(node)).collect()
    }

    /// Imports `id` of `other` into this graph by label and deep-copies its
    /// attributes over whatever this graph already holds.
    pub fn copy_node_from(&mut self, other: &Graph, id: NodeId) -> NodeId {
        let source = &other.inner[id.0];
        let local = self.add_or_get_node(&source.label);
        self.inner[local.0]
            .attributes
            .extend(source.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        local
    }

    /// Imports the edge `id` of `other`, endpoints included, and deep-copies
    /// its attributes.
    pub fn copy_edge_from(&mut self, other: &Graph, id: EdgeId) -> Option<EdgeId> {
        let (src, dst) = other.endpoints(id)?;
        let src = self.copy_node_from(other, src);
        let dst = self.copy_node_from(other, dst);
        let local = self.add_or_get_edge(src, dst);
        self.inner[local.0]
            .attributes
            .extend(other.inner[id.0].attributes.clone());
        Some(local)
    }

    pub fn to_document(&self) -> Result<GraphDocument, GraphError> {
        let nodes = self
            .nodes()
            .map(|(id, node)| {
                let record = NodeRecord {
                    label: node.label.clone(),
                    attributes: node.attributes.clone(),
                };
                Ok((document_key(id.index())?, record))
            })
            .collect::<Result<_, GraphError>>()?;

        let edges = self
            .edges()
            .map(|entry| {
                let record = EdgeRecord {
                    src: document_key(entry.src.index())?,
                    dst: document_key(entry.dst.index())?,
                    attributes: entry.edge.attributes.clone(),
                };
                Ok((document_key(entry.id.index())?, record))
            })
            .collect::<Result<_, GraphError>>()?;

        Ok(GraphDocument { nodes, edges })
    }

    /// Builds a graph from a document. Identifiers written by
    /// [`Graph::to_document`] come back unchanged; foreign documents are
    /// renumbered in key order. A repeated label is merged into its first
    /// occurrence and the edges pointing at it are redirected.
    pub fn from_document(document: GraphDocument) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        let mut remap: HashMap<u32, NodeId> = HashMap::with_capacity(document.nodes.len());

        for (raw, record) in document.nodes {
            if let Some(first) = graph.index_of(&record.label) {
                warn!(
                    label = %record.label,
                    id = raw,
                    "label defined multiple times, keeping first occurrence"
                );
                remap.insert(raw, first);
                continue;
            }

            let mut attributes = record.attributes;
            attributes.remove(attr::LABEL);

            let id = graph.add_or_get_node(&record.label);
            graph.inner[id.0].attributes = attributes;
            remap.insert(raw, id);
        }

        for (raw, record) in document.edges {
            let lookup = |node: u32| {
                remap.get(&node).copied().ok_or_else(|| {
                    GraphError::InvalidDocument(format!(
                        "edge {} references unknown node {}",
                        raw, node
                    ))
                })
            };
            let src = lookup(record.src)?;
            let dst = lookup(record.dst)?;

            let id = graph.add_or_get_edge(src, dst);
            let attributes = &mut graph.inner[id.0].attributes;
            for (key, value) in record.attributes {
                attributes.entry(key).or_insert(value);
            }
        }

        Ok(graph)
    }

    pub fn to_writer(&self, writer: impl Write) -> Result<(), GraphError> {
        serde_json::to_writer(writer, &self.to_document()?)?;
        Ok(())
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, GraphError> {
        let document: GraphDocument = serde_json::from_reader(reader)?;
        Graph::from_document(document)
    }

    /// Writes the graph to `path` through a temporary file in the same
    /// directory, so `path` either holds a complete document or nothing.
    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            self.to_writer(&mut writer)?;
            writer.flush()?;
        }
        file.persist(path)
            .map_err(|e| GraphError::Io(io::Error::from(e)))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let file = File::open(path)?;
        Graph::from_reader(BufReader::new(file))
    }
}

fn document_key(index: usize) -> Result<u32, GraphError> {
    u32::try_from(index).map_err(|_| {
        GraphError::InvalidDocument(format!("identifier {} does not fit a document key", index))
    })
}

/// Serialized form of a [`Graph`]: nodes as `id -> attributes` (label
/// included) and edges as `id -> {src, dst, attributes}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: BTreeMap<u32, NodeRecord>,
    pub edges: BTreeMap<u32, EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: u32,
    pub dst: u32,
    #[serde(default)]
    pub attributes: Attributes,
}
