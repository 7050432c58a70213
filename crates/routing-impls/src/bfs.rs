//! Equal-cost next hops computed with BFS.

use std::collections::VecDeque;

use jellyfish_core::{
    network::{Network, NodeId},
    routing::{Route, RoutingError},
};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

type HopMatrix = FxHashMap<NodeId, HopMap>;
type HopMap = FxHashMap<NodeId, Vec<NodeId>>;

/// For every pair of nodes `(from, to)`, the neighbors of `from` that lie on a shortest path to
/// `to`. Paths never transit hosts.
#[derive(Debug, Clone)]
pub struct NextHops {
    inner: HopMatrix,
    nodes: FxHashSet<NodeId>,
}

impl NextHops {
    /// Builds the table with one BFS per node.
    pub fn new(network: &Network) -> Self {
        let mut hops = HopMatrix::default();
        for start in network.nodes().map(|n| n.id) {
            let mut distances: FxHashMap<NodeId, usize> = [(start, 0)].into_iter().collect();
            let mut queue = VecDeque::from([start]);
            while let Some(n) = queue.pop_front() {
                let Some(&cur_distance) = distances.get(&n) else {
                    continue;
                };
                for succ in network.neighbors(n) {
                    if !distances.contains_key(&succ.id) {
                        distances.insert(succ.id, cur_distance + 1);
                        if !succ.is_host() {
                            queue.push_back(succ.id);
                        }
                    }
                    if distances.get(&succ.id) == Some(&(cur_distance + 1)) {
                        // You can get from `succ` to `start` through `n`
                        hops.entry(succ.id)
                            .or_default()
                            .entry(start)
                            .or_default()
                            .push(n);
                    }
                }
            }
        }
        for choices in hops.values_mut().flat_map(|map| map.values_mut()) {
            choices.sort();
        }
        debug!("Built next-hop table over {} nodes", network.nr_nodes());
        Self {
            inner: hops,
            nodes: network.nodes().map(|n| n.id).collect(),
        }
    }

    /// Whether `id` is a node of the network this table was built from.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Next hops from `from` toward `to`, in ascending id order. Empty if `to` is unreachable.
    pub fn next_hops(&self, from: NodeId, to: NodeId) -> &[NodeId] {
        self.inner
            .get(&from)
            .and_then(|map| map.get(&to))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Walks from `src` to `dst`, letting `choose` pick among the next hops at each hop index.
    /// Returns an empty route if there is no path.
    pub fn walk(
        &self,
        src: NodeId,
        dst: NodeId,
        mut choose: impl FnMut(usize, &[NodeId]) -> Option<NodeId>,
    ) -> Result<Route, RoutingError> {
        for id in [src, dst] {
            if !self.contains(id) {
                return Err(RoutingError::UnknownNode(id));
            }
        }
        let mut route = vec![src];
        let mut cur = src;
        while cur != dst {
            match choose(route.len() - 1, self.next_hops(cur, dst)) {
                Some(next_hop) => {
                    route.push(next_hop);
                    cur = next_hop;
                }
                // There is no choice of next hop, and therefore no path
                None => return Ok(Vec::new()),
            }
        }
        Ok(route)
    }
}
