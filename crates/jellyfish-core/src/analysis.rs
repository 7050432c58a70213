//! Link usage analysis: how many sampled routes cross each switch-to-switch link.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use rand::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    network::{types::NodeId, Network},
    routing::{RoutingError, RoutingPolicy},
};

/// Analysis options.
#[derive(
    Debug, Clone, Copy, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct AnalysisOpts {
    /// Probability with which each ordered host pair is sampled.
    #[builder(default = 1.0)]
    pub p: f64,
    /// Sampler seed.
    #[builder(default = 0)]
    pub seed: u64,
    /// Flow index passed to the routing policy for every sampled pair.
    #[builder(default = 0)]
    pub flow_index: usize,
}

impl Default for AnalysisOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Traversal counts keyed by the directed hop `(from, to)`. Opposite directions of one physical
/// link are counted separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCounts {
    inner: FxHashMap<(NodeId, NodeId), usize>,
}

impl LinkCounts {
    /// Counts every consecutive node pair of `route`.
    pub fn add_route(&mut self, route: &[NodeId]) {
        for hop in route.windows(2) {
            *self.inner.entry((hop[0], hop[1])).or_default() += 1;
        }
    }

    pub fn get(&self, from: NodeId, to: NodeId) -> usize {
        self.inner.get(&(from, to)).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((NodeId, NodeId), usize)> + '_ {
        self.inner.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of distinct directed hops.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.inner.values().sum()
    }

    /// Keeps only hops for which `f` returns true.
    pub fn filtered(&self, mut f: impl FnMut(NodeId, NodeId) -> bool) -> Self {
        let inner = self
            .inner
            .iter()
            .filter(|(&(a, b), _)| f(a, b))
            .map(|(&k, &v)| (k, v))
            .collect();
        Self { inner }
    }

    pub fn histogram(&self) -> Histogram {
        let mut rows = BTreeMap::new();
        for &count in self.inner.values() {
            *rows.entry(count).or_default() += 1;
        }
        Histogram { rows }
    }
}

/// Maps a traversal count to the number of links that attained it.
///
/// Displays as one `"<count> <links>"` line per count, in ascending count order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Histogram {
    rows: BTreeMap<usize, usize>,
}

impl Histogram {
    /// `(count, number of links)` rows in ascending count order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().map(|(&c, &n)| (c, n))
    }

    /// Number of links that attained `count`.
    pub fn links_with(&self, count: usize) -> usize {
        self.rows.get(&count).copied().unwrap_or_default()
    }

    /// Number of links counted.
    pub fn nr_links(&self) -> usize {
        self.rows.values().sum()
    }

    /// `sum(count * links)`, which equals the number of traversals recorded.
    pub fn total_mass(&self) -> usize {
        self.rows.iter().map(|(c, n)| c * n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (count, links) in self.rows() {
            writeln!(f, "{count} {links}")?;
        }
        Ok(())
    }
}

/// The result of one analysis run.
#[derive(Debug, Clone)]
pub struct LinkUsage {
    /// Number of ordered host pairs sampled.
    pub nr_sampled: usize,
    /// Number of sampled pairs the policy had no route for.
    pub nr_unrouted: usize,
    /// Counts over every hop, access links included.
    pub counts: LinkCounts,
    /// Counts over switch-to-switch hops only.
    pub fabric: LinkCounts,
}

impl LinkUsage {
    /// The histogram of switch-to-switch traversal counts.
    pub fn histogram(&self) -> Histogram {
        self.fabric.histogram()
    }
}

/// Samples each ordered pair of distinct hosts with probability `opts.p`, routes the sampled
/// pairs with `policy` and counts traversals per directed hop.
///
/// Hosts are visited in ascending id order for both endpoints, so `opts.seed` fully determines
/// the sample. Empty routes contribute nothing; policy errors abort the run.
pub fn analyze<P>(
    network: &Network,
    mut policy: P,
    opts: &AnalysisOpts,
) -> Result<LinkUsage, AnalysisError>
where
    P: RoutingPolicy,
{
    let AnalysisOpts {
        p,
        seed,
        flow_index,
    } = *opts;
    if !(0.0..=1.0).contains(&p) {
        return Err(AnalysisError::InvalidProbability(p));
    }
    let hosts = network.host_ids();
    info!(
        "Analyzing link usage over {} hosts with p = {p}, seed = {seed}",
        hosts.len()
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = LinkCounts::default();
    let (mut nr_sampled, mut nr_unrouted) = (0, 0);
    for &src in &hosts {
        for &dst in &hosts {
            if src == dst {
                continue;
            }
            // One draw per pair, sampled or not
            if rng.gen::<f64>() >= p {
                continue;
            }
            nr_sampled += 1;
            let route = policy
                .route(src, dst, flow_index)
                .map_err(|source| AnalysisError::RoutingLookupFailed { src, dst, source })?;
            if route.is_empty() {
                warn!("No route from {src} to {dst}");
                nr_unrouted += 1;
                continue;
            }
            counts.add_route(&route);
        }
    }
    debug!("Sampled {nr_sampled} host pairs, {nr_unrouted} without a route");

    let fabric = counts.filtered(|a, b| !network.is_host(a) && !network.is_host(b));
    info!(
        "Counted {} traversals over {} directed switch hops",
        fabric.total(),
        fabric.len()
    );
    Ok(LinkUsage {
        nr_sampled,
        nr_unrouted,
        counts,
        fabric,
    })
}

/// Analysis error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to route {src} -> {dst}")]
    RoutingLookupFailed {
        src: NodeId,
        dst: NodeId,
        #[source]
        source: RoutingError,
    },

    #[error("sampling probability must be in [0, 1] (got {0})")]
    InvalidProbability(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fat_tree::{FatTree, FatTreeOpts},
        jellyfish::{Jellyfish, JellyfishOpts},
        testing::{self, FirstShortestPath, FixedRoutes},
    };

    fn fat_tree(k: usize) -> anyhow::Result<Network> {
        Ok(FatTree::new(&FatTreeOpts::builder().k(k).build())?.into_network())
    }

    fn opts(p: f64, seed: u64) -> AnalysisOpts {
        AnalysisOpts::builder().p(p).seed(seed).build()
    }

    #[test]
    fn two_host_fat_tree() -> anyhow::Result<()> {
        let network = fat_tree(2)?;
        let usage = analyze(&network, FirstShortestPath::new(&network), &opts(1.0, 0))?;
        assert_eq!(usage.nr_sampled, 2);
        // Each direction of the four fabric links is crossed once
        assert_eq!(usage.histogram().to_string(), "1 8\n");
        // Two access hops per route are filtered
        assert_eq!(usage.counts.total(), 2 * 6);
        Ok(())
    }

    #[test]
    fn k4_histogram() -> anyhow::Result<()> {
        let network = fat_tree(4)?;
        let usage = analyze(&network, FirstShortestPath::new(&network), &opts(1.0, 0))?;
        assert_eq!(usage.nr_sampled, 16 * 15);
        let histogram = usage.histogram();
        insta::assert_snapshot!(histogram.to_string(), @r###"
        28 16
        48 8
        "###);
        assert_eq!(histogram.total_mass(), usage.counts.total() - 2 * usage.nr_sampled);
        Ok(())
    }

    #[test]
    fn conservation_under_sampling() -> anyhow::Result<()> {
        let network = Jellyfish::new(&JellyfishOpts::default())?.into_network();
        for seed in 0..5 {
            let usage = analyze(&network, FirstShortestPath::new(&network), &opts(0.3, seed))?;
            let histogram = usage.histogram();
            assert_eq!(histogram.total_mass(), usage.fabric.total());
            assert_eq!(histogram.nr_links(), usage.fabric.len());
            for ((a, b), _) in usage.fabric.iter() {
                assert!(!network.is_host(a) && !network.is_host(b));
            }
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_histogram() -> anyhow::Result<()> {
        let network = Jellyfish::new(&JellyfishOpts::default())?.into_network();
        let run = |seed| {
            analyze(&network, FirstShortestPath::new(&network), &opts(0.5, seed))
                .map(|u| (u.nr_sampled, u.histogram()))
        };
        assert_eq!(run(3)?, run(3)?);
        Ok(())
    }

    #[test]
    fn p_zero_samples_nothing() -> anyhow::Result<()> {
        let network = fat_tree(4)?;
        let usage = analyze(&network, FixedRoutes::default(), &opts(0.0, 0))?;
        assert_eq!(usage.nr_sampled, 0);
        assert!(usage.histogram().is_empty());
        assert_eq!(usage.histogram().to_string(), "");
        Ok(())
    }

    #[test]
    fn rejects_bad_probability() -> anyhow::Result<()> {
        let network = fat_tree(2)?;
        for p in [-0.1, 1.5, f64::NAN] {
            let res = analyze(&network, FixedRoutes::default(), &opts(p, 0));
            assert!(matches!(res, Err(AnalysisError::InvalidProbability(_))));
        }
        Ok(())
    }

    #[test]
    fn lookup_failures_propagate() -> anyhow::Result<()> {
        let (nodes, links, specs) = testing::three_node_config();
        let network = Network::new(&nodes, &links, specs, Vec::new())?;
        let (h1, h2, s1) = (nodes[0].id, nodes[1].id, nodes[2].id);
        let policy = FixedRoutes::default().with(h1, h2, vec![h1, s1, h2]);
        let res = analyze(&network, policy, &opts(1.0, 0));
        assert_eq!(
            res.err(),
            Some(AnalysisError::RoutingLookupFailed {
                src: h2,
                dst: h1,
                source: RoutingError::UnknownNode(h2),
            })
        );
        Ok(())
    }

    #[test]
    fn empty_routes_count_nothing() -> anyhow::Result<()> {
        let (nodes, links, specs) = testing::three_node_config();
        let network = Network::new(&nodes, &links, specs, Vec::new())?;
        let (h1, h2) = (nodes[0].id, nodes[1].id);
        let policy = FixedRoutes::default()
            .with(h1, h2, Vec::new())
            .with(h2, h1, Vec::new());
        let usage = analyze(&network, policy, &opts(1.0, 0))?;
        assert_eq!(usage.nr_sampled, 2);
        assert_eq!(usage.nr_unrouted, 2);
        assert!(usage.counts.is_empty());
        Ok(())
    }

    #[test]
    fn counts_keep_direction() {
        let [a, b, c] = [1, 2, 3].map(NodeId::new);
        let mut counts = LinkCounts::default();
        counts.add_route(&[a, b, c]);
        counts.add_route(&[c, b]);
        counts.add_route(&[a]);
        assert_eq!(counts.get(a, b), 1);
        assert_eq!(counts.get(b, a), 0);
        assert_eq!(counts.get(b, c), 1);
        assert_eq!(counts.get(c, b), 1);
        assert_eq!(counts.histogram().to_string(), "1 3\n");
    }
}
