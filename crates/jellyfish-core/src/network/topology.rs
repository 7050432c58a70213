use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::types::{Layer, Link, Node, NodeId, NodeSpec};

#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pub(crate) graph: UnGraph<Node, Link>,
    pub(crate) id2idx: FxHashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Creates a network topology from a list of nodes and links. This function returns an error if
    /// the given specification fails to produce a valid topology.
    ///
    /// Correctness properties:
    ///
    /// - Every node must have a unique ID.
    /// - Every node's layer must have a spec in `node_specs`.
    /// - Every link must have distinct endpoints in `nodes`.
    /// - For any two nodes, there must be at most one link between them.
    /// - No node may have more links than its layer's port budget.
    pub(crate) fn new(
        nodes: &[Node],
        links: &[Link],
        node_specs: &[NodeSpec],
    ) -> Result<Self, Error> {
        let mut g = UnGraph::with_capacity(nodes.len(), links.len());
        let mut id2idx = FxHashMap::default();
        for n in nodes.iter().cloned() {
            let (id, layer) = (n.id, n.layer);
            // CORRECTNESS: Every node's layer must have a spec.
            if node_specs.get(layer.inner()).is_none() {
                return Err(Error::UnknownLayer { id, layer });
            }
            let idx = g.add_node(n);
            // CORRECTNESS: Every node must have a unique ID.
            if id2idx.insert(id, idx).is_some() {
                return Err(Error::DuplicateNodeId(id));
            }
        }
        let mut seen = FxHashSet::default();
        for &link in links {
            let Link { a, b, .. } = link;
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(Error::NodeAdjacentSelf(a));
            }
            let ia = *id2idx.get(&a).ok_or(Error::UndeclaredNode(a))?;
            let ib = *id2idx.get(&b).ok_or(Error::UndeclaredNode(b))?;
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            if !seen.insert(link.key()) {
                return Err(Error::DuplicateLink { n1: a, n2: b });
            }
            g.add_edge(ia, ib, link);
        }
        // CORRECTNESS: No node may have more links than its layer's port budget.
        for idx in g.node_indices() {
            let Node { id, layer, .. } = g[idx];
            let budget = node_specs[layer.inner()].port_budget();
            let n = g.edges(idx).count();
            if n > budget {
                return Err(Error::PortBudgetExceeded { id, budget, n });
            }
        }
        Ok(Self { graph: g, id2idx })
    }

    pub(crate) fn idx_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id2idx.get(&id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {id} is in layer {layer}, which has no spec")]
    UnknownLayer { id: NodeId, layer: Layer },

    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },

    #[error("Node {id} has too many links (budget {budget}, got {n})")]
    PortBudgetExceeded { id: NodeId, budget: usize, n: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn empty_topology_succeeds() {
        assert!(
            Topology::new(&[], &[], &[]).is_ok(),
            "failed to create empty topology"
        );
    }

    #[test]
    fn three_node_topology_succeeds() {
        let (nodes, links, specs) = testing::three_node_config();
        let res = Topology::new(&nodes, &links, &specs);
        assert!(res.is_ok());
    }

    #[test]
    fn duplicate_node_fails() {
        let (mut nodes, links, specs) = testing::three_node_config();
        nodes[1].id = nodes[0].id; // error
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::DuplicateNodeId(..))));
    }

    #[test]
    fn unknown_layer_fails() {
        let (mut nodes, links, specs) = testing::three_node_config();
        nodes[0].layer = Layer::new(7); // error
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::UnknownLayer { .. })));
    }

    #[test]
    fn node_adjacent_self_fails() {
        let (nodes, mut links, specs) = testing::three_node_config();
        links.push(Link::new(nodes[2].id, nodes[2].id, testing::SPEED)); // error
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::NodeAdjacentSelf(..))));
    }

    #[test]
    fn undeclared_node_fails() {
        let (nodes, mut links, specs) = testing::three_node_config();
        links.push(Link::new(NodeId::new(0xdead), nodes[2].id, testing::SPEED)); // error
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::UndeclaredNode(..))));
    }

    #[test]
    fn duplicate_links_fails() {
        let (nodes, mut links, specs) = testing::three_node_config();
        // Same link, reversed endpoints
        links.push(Link::new(nodes[2].id, nodes[0].id, testing::SPEED)); // error
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::DuplicateLink { .. })));
    }

    #[test]
    fn port_budget_exceeded_fails() {
        let (mut nodes, mut links, specs) = testing::three_node_config();
        let extra = Node {
            id: NodeId::new(0x0303),
            name: "h3".into(),
            ..nodes[0].clone()
        };
        // The switch only has two ports
        links.push(Link::new(extra.id, nodes[2].id, testing::SPEED)); // error
        nodes.push(extra);
        let res = Topology::new(&nodes, &links, &specs);
        assert!(matches!(res, Err(Error::PortBudgetExceeded { .. })));
    }
}
