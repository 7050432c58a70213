//! Uniformly random selection among equal-cost shortest paths.

use jellyfish_core::{
    network::{Network, NodeId},
    routing::{Route, RoutingError, RoutingPolicy},
};
use rand::prelude::*;

use crate::bfs::NextHops;

/// Picks every next hop uniformly at random from its own seeded RNG. Two policies created with
/// the same seed answer the same sequence of requests identically.
#[derive(Debug, Clone)]
pub struct RandomPath {
    table: NextHops,
    rng: StdRng,
}

impl RandomPath {
    /// Creates a random policy over `network`.
    pub fn new(network: &Network, seed: u64) -> Self {
        Self::from_table(NextHops::new(network), seed)
    }

    /// Creates a random policy over a precomputed table.
    pub fn from_table(table: NextHops, seed: u64) -> Self {
        Self {
            table,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RoutingPolicy for RandomPath {
    fn route(&mut self, src: NodeId, dst: NodeId, _: usize) -> Result<Route, RoutingError> {
        self.table
            .walk(src, dst, |_, choices| choices.choose(&mut self.rng).copied())
    }
}

#[cfg(test)]
mod tests {
    use jellyfish_core::{testing, Jellyfish, JellyfishOpts};

    use super::*;

    #[test]
    fn same_seed_same_routes() -> anyhow::Result<()> {
        let network = Jellyfish::new(&JellyfishOpts::default())?.into_network();
        let table = NextHops::new(&network);
        let mut a = RandomPath::from_table(table.clone(), 5);
        let mut b = RandomPath::from_table(table, 5);
        let hosts = network.host_ids();
        for &src in &hosts {
            for &dst in &hosts {
                if src == dst {
                    continue;
                }
                let route = a.route(src, dst, 0)?;
                assert_eq!(b.route(src, dst, 0)?, route);
                if !route.is_empty() {
                    testing::assert_valid_route(&network, &route, src, dst);
                }
            }
        }
        Ok(())
    }
}
