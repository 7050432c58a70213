//! Hash-based selection among equal-cost shortest paths.

use jellyfish_core::{
    network::{Network, NodeId},
    routing::{Route, RoutingError, RoutingPolicy},
};

use crate::{
    bfs::NextHops,
    utils::{self, calculate_hash},
};

/// Equal-cost multipath routing. At every hop, the next hop is chosen by hashing
/// `(src, dst, flow_index, hop)`, so different flows between the same hosts may take different
/// paths while each flow keeps its own.
#[derive(Debug, Clone)]
pub struct Ecmp {
    table: NextHops,
}

impl Ecmp {
    /// Creates an ECMP policy over `network`.
    pub fn new(network: &Network) -> Self {
        Self::from_table(NextHops::new(network))
    }

    /// Creates an ECMP policy over a precomputed table.
    pub fn from_table(table: NextHops) -> Self {
        Self { table }
    }
}

impl RoutingPolicy for Ecmp {
    fn route(&mut self, src: NodeId, dst: NodeId, flow_index: usize) -> Result<Route, RoutingError> {
        self.table.walk(src, dst, |hop, choices| {
            utils::pick(choices, calculate_hash(&(src, dst, flow_index, hop)))
        })
    }
}

/// Structured hashing: one path per host pair, chosen by hashing `(src, dst)`. The flow index is
/// ignored.
#[derive(Debug, Clone)]
pub struct Hashed {
    table: NextHops,
}

impl Hashed {
    /// Creates a hashed policy over `network`.
    pub fn new(network: &Network) -> Self {
        Self::from_table(NextHops::new(network))
    }

    /// Creates a hashed policy over a precomputed table.
    pub fn from_table(table: NextHops) -> Self {
        Self { table }
    }
}

impl RoutingPolicy for Hashed {
    fn route(&mut self, src: NodeId, dst: NodeId, _: usize) -> Result<Route, RoutingError> {
        let hash = calculate_hash(&(src, dst));
        self.table.walk(src, dst, |_, choices| utils::pick(choices, hash))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use jellyfish_core::{fat_tree::FatTree, testing, FatTreeId, FatTreeOpts, NodeIdentity};

    use super::*;

    fn fat_tree() -> anyhow::Result<Network> {
        Ok(FatTree::new(&FatTreeOpts::default())?.into_network())
    }

    #[test]
    fn ecmp_spreads_flows() -> anyhow::Result<()> {
        let network = fat_tree()?;
        let mut ecmp = Ecmp::new(&network);
        let src = FatTreeId::new(0, 0, 2).dpid();
        let dst = FatTreeId::new(2, 1, 3).dpid();
        let mut paths = BTreeSet::new();
        for flow_index in 0..64 {
            let route = ecmp.route(src, dst, flow_index)?;
            testing::assert_valid_route(&network, &route, src, dst);
            assert_eq!(ecmp.route(src, dst, flow_index)?, route);
            paths.insert(route);
        }
        // Four equal-cost paths cross the core
        assert!(paths.len() > 1);
        assert!(paths.len() <= 4);
        Ok(())
    }

    #[test]
    fn hashed_ignores_flow_index() -> anyhow::Result<()> {
        let network = fat_tree()?;
        let mut hashed = Hashed::new(&network);
        for &src in &network.host_ids() {
            for &dst in &network.host_ids() {
                if src == dst {
                    continue;
                }
                let route = hashed.route(src, dst, 0)?;
                testing::assert_valid_route(&network, &route, src, dst);
                assert_eq!(hashed.route(src, dst, 7)?, route);
            }
        }
        Ok(())
    }

    #[test]
    fn intra_pod_routes_stay_in_pod() -> anyhow::Result<()> {
        let network = fat_tree()?;
        let mut ecmp = Ecmp::new(&network);
        let src = FatTreeId::new(1, 0, 2).dpid();
        let dst = FatTreeId::new(1, 1, 2).dpid();
        let route = ecmp.route(src, dst, 0)?;
        assert_eq!(route.len(), 5);
        for n in route {
            assert_eq!(FatTreeId::from_dpid(n)?.pod, 1);
        }
        Ok(())
    }
}
