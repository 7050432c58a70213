//! K-shortest-paths routing.
//!
//! Paths are computed with Yen's algorithm over the unweighted graph, where hosts may only be
//! endpoints. Each flow is pinned to one of the `k` paths by hashing `(src, dst, flow_index)`.

use std::collections::{hash_map::Entry, BTreeSet, VecDeque};

use jellyfish_core::{
    network::{Network, NodeId},
    routing::{Route, RoutingError, RoutingPolicy},
};
use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::calculate_hash;

/// K-shortest-paths routing. Paths are computed lazily per host pair and cached.
#[derive(Debug, Clone)]
pub struct Ksp {
    k: usize,
    graph: Graph,
    cache: FxHashMap<(NodeId, NodeId), Vec<Route>>,
}

impl Ksp {
    /// Creates a policy choosing among up to `k` paths per host pair. `k` is at least one.
    pub fn new(network: &Network, k: usize) -> Self {
        Self {
            k: k.max(1),
            graph: Graph::new(network),
            cache: FxHashMap::default(),
        }
    }

    /// Up to `k` loop-free paths from `src` to `dst`, shortest first. Paths of equal length are
    /// ordered by their node ids.
    pub fn paths(&mut self, src: NodeId, dst: NodeId) -> Result<&[Route], RoutingError> {
        for id in [src, dst] {
            if !self.graph.contains(id) {
                return Err(RoutingError::UnknownNode(id));
            }
        }
        let paths = match self.cache.entry((src, dst)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.graph.k_shortest(src, dst, self.k)),
        };
        Ok(paths.as_slice())
    }
}

impl RoutingPolicy for Ksp {
    fn route(&mut self, src: NodeId, dst: NodeId, flow_index: usize) -> Result<Route, RoutingError> {
        let paths = self.paths(src, dst)?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let idx = calculate_hash(&(src, dst, flow_index)) as usize % paths.len();
        Ok(paths[idx].clone())
    }
}

#[derive(Debug, Clone)]
struct Graph {
    adjacency: FxHashMap<NodeId, Vec<NodeId>>,
    hosts: FxHashSet<NodeId>,
}

impl Graph {
    fn new(network: &Network) -> Self {
        let adjacency = network
            .nodes()
            .map(|n| {
                let mut neighbors = network.neighbors(n.id).map(|m| m.id).collect::<Vec<_>>();
                neighbors.sort();
                (n.id, neighbors)
            })
            .collect();
        let hosts = network.hosts().map(|n| n.id).collect();
        Self { adjacency, hosts }
    }

    fn contains(&self, id: NodeId) -> bool {
        self.adjacency.contains_key(&id)
    }

    fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// BFS shortest path avoiding `banned_nodes` and the directed hops in `banned_hops`.
    fn shortest(
        &self,
        src: NodeId,
        dst: NodeId,
        banned_nodes: &FxHashSet<NodeId>,
        banned_hops: &FxHashSet<(NodeId, NodeId)>,
    ) -> Option<Route> {
        let mut parents = FxHashMap::default();
        let mut seen = [src].into_iter().collect::<FxHashSet<_>>();
        let mut queue = VecDeque::from([src]);
        while let Some(n) = queue.pop_front() {
            if n == dst {
                let mut route = vec![dst];
                let mut cur = dst;
                while let Some(&p) = parents.get(&cur) {
                    route.push(p);
                    cur = p;
                }
                route.reverse();
                return Some(route);
            }
            if n != src && self.hosts.contains(&n) {
                continue;
            }
            for &m in self.neighbors(n) {
                if banned_nodes.contains(&m) || banned_hops.contains(&(n, m)) || !seen.insert(m) {
                    continue;
                }
                parents.insert(m, n);
                queue.push_back(m);
            }
        }
        None
    }

    /// Yen's algorithm.
    fn k_shortest(&self, src: NodeId, dst: NodeId, k: usize) -> Vec<Route> {
        let Some(first) = self.shortest(src, dst, &FxHashSet::default(), &FxHashSet::default())
        else {
            return Vec::new();
        };
        let mut paths = vec![first];
        let mut candidates = BTreeSet::new();
        while paths.len() < k {
            let prev = &paths[paths.len() - 1];
            for j in 0..prev.len().saturating_sub(1) {
                let spur = prev[j];
                let root = &prev[..=j];
                // Force a deviation from every known path sharing this root
                let banned_hops = paths
                    .iter()
                    .filter(|p| p.len() > j + 1 && p[..=j] == *root)
                    .map(|p| (p[j], p[j + 1]))
                    .collect::<FxHashSet<_>>();
                let banned_nodes = root[..j].iter().copied().collect::<FxHashSet<_>>();
                if let Some(spur_path) = self.shortest(spur, dst, &banned_nodes, &banned_hops) {
                    let mut path = root[..j].to_vec();
                    path.extend(spur_path);
                    if !paths.contains(&path) {
                        candidates.insert((path.len(), path));
                    }
                }
            }
            match candidates.pop_first() {
                Some((_, path)) => paths.push(path),
                None => break,
            }
        }
        trace!("Found {} paths from {src} to {dst}", paths.len());
        paths
    }
}

#[cfg(test)]
mod tests {
    use jellyfish_core::{
        fat_tree::FatTree, testing, FatTreeId, FatTreeOpts, Jellyfish, JellyfishOpts, NodeIdentity,
    };

    use super::*;

    #[test]
    fn fat_tree_has_four_shortest_inter_pod_paths() -> anyhow::Result<()> {
        let network = FatTree::new(&FatTreeOpts::default())?.into_network();
        let mut ksp = Ksp::new(&network, 8);
        let src = FatTreeId::new(0, 0, 2).dpid();
        let dst = FatTreeId::new(1, 0, 2).dpid();
        let paths = ksp.paths(src, dst)?.to_vec();
        assert_eq!(paths.len(), 8);
        let lengths = paths.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(&lengths[..4], &[7, 7, 7, 7]);
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        for path in &paths {
            testing::assert_valid_route(&network, path, src, dst);
        }
        let distinct = paths.iter().collect::<BTreeSet<_>>();
        assert_eq!(distinct.len(), paths.len());
        Ok(())
    }

    #[test]
    fn same_edge_has_one_path() -> anyhow::Result<()> {
        let network = FatTree::new(&FatTreeOpts::default())?.into_network();
        let mut ksp = Ksp::new(&network, 8);
        let src = FatTreeId::new(2, 1, 2).dpid();
        let dst = FatTreeId::new(2, 1, 3).dpid();
        // Both hosts hang off one edge switch and hosts cannot be transited
        let paths = ksp.paths(src, dst)?;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 3);
        Ok(())
    }

    #[test]
    fn jellyfish_routes_are_valid() -> anyhow::Result<()> {
        let network = Jellyfish::new(&JellyfishOpts::default())?.into_network();
        let mut ksp = Ksp::new(&network, 4);
        let hosts = network.host_ids();
        for &src in &hosts {
            for &dst in &hosts {
                if src == dst {
                    continue;
                }
                for flow_index in 0..3 {
                    let route = ksp.route(src, dst, flow_index)?;
                    if !route.is_empty() {
                        testing::assert_valid_route(&network, &route, src, dst);
                    }
                    assert_eq!(ksp.route(src, dst, flow_index)?, route);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn unknown_node() -> anyhow::Result<()> {
        let network = FatTree::new(&FatTreeOpts::builder().k(2).build())?.into_network();
        let mut ksp = Ksp::new(&network, 0);
        let host = network.host_ids()[0];
        let bogus = NodeId::new(1 << 40);
        assert_eq!(ksp.route(bogus, host, 0), Err(RoutingError::UnknownNode(bogus)));
        assert_eq!(ksp.route(host, host, 0)?, vec![host]);
        Ok(())
    }
}
