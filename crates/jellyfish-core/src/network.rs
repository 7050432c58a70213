//! This module defines the [`Network`], an immutable, validated graph of layered nodes and
//! undirected links, together with the per-layer specs it was built from.

pub(crate) mod topology;
pub mod types;

pub use topology::Error as TopologyError;
pub use types::*;

use self::topology::Topology;

#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    node_specs: Vec<NodeSpec>,
    edge_specs: Vec<EdgeSpec>,
}

impl Network {
    /// Creates a network, checking the properties listed in `Topology::new`. `node_specs` is
    /// indexed by layer.
    pub fn new(
        nodes: &[Node],
        links: &[Link],
        node_specs: Vec<NodeSpec>,
        edge_specs: Vec<EdgeSpec>,
    ) -> Result<Self, TopologyError> {
        let topology = Topology::new(nodes, links, &node_specs)?;
        Ok(Self {
            topology,
            node_specs,
            edge_specs,
        })
    }

    delegate::delegate! {
        to self.topology.graph {
            /// Returns an iterator over all nodes, in insertion order.
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;

            /// Returns an iterator over all links, in insertion order.
            #[call(edge_weights)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;

            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;

            #[call(edge_count)]
            pub fn nr_links(&self) -> usize;
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.topology
            .idx_of(id)
            .map(|idx| &self.topology.graph[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.topology.idx_of(id).is_some()
    }

    pub fn is_host(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_host)
    }

    pub fn layer(&self, id: NodeId) -> Option<Layer> {
        self.node(id).map(|n| n.layer)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_host())
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| !n.is_host())
    }

    /// Host IDs in ascending order.
    pub fn host_ids(&self) -> Vec<NodeId> {
        let mut ids = self.hosts().map(|n| n.id).collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Returns an iterator over the neighbors of `id`, which is empty if `id` is unknown.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        let g = &self.topology.graph;
        self.topology
            .idx_of(id)
            .into_iter()
            .flat_map(move |idx| g.neighbors(idx))
            .map(move |idx| &g[idx])
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).count()
    }

    pub fn is_linked(&self, a: NodeId, b: NodeId) -> bool {
        match (self.topology.idx_of(a), self.topology.idx_of(b)) {
            (Some(a), Some(b)) => self.topology.graph.contains_edge(a, b),
            _ => false,
        }
    }

    pub fn layer_nodes(&self, layer: Layer) -> impl Iterator<Item = &Node> {
        self.nodes().filter(move |n| n.layer == layer)
    }

    /// Neighbors one layer closer to the core.
    pub fn up_nodes(&self, id: NodeId) -> Vec<&Node> {
        let up = self
            .layer(id)
            .and_then(|l| l.inner().checked_sub(1))
            .map(Layer::new);
        self.neighbors(id)
            .filter(|n| Some(n.layer) == up)
            .collect()
    }

    /// Neighbors one layer closer to the hosts.
    pub fn down_nodes(&self, id: NodeId) -> Vec<&Node> {
        let down = self.layer(id).map(|l| Layer::new(l.inner() + 1));
        self.neighbors(id)
            .filter(|n| Some(n.layer) == down)
            .collect()
    }

    pub fn up_edges(&self, id: NodeId) -> Vec<(NodeId, NodeId)> {
        self.up_nodes(id).into_iter().map(|n| (id, n.id)).collect()
    }

    pub fn down_edges(&self, id: NodeId) -> Vec<(NodeId, NodeId)> {
        self.down_nodes(id).into_iter().map(|n| (id, n.id)).collect()
    }

    pub fn node_spec(&self, layer: Layer) -> Option<&NodeSpec> {
        self.node_specs.get(layer.inner())
    }

    pub fn node_specs(&self) -> &[NodeSpec] {
        &self.node_specs
    }

    pub fn edge_specs(&self) -> &[EdgeSpec] {
        &self.edge_specs
    }
}
