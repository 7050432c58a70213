//! Three-layer homogeneous Fat-Tree, from "A scalable, commodity data center network
//! architecture" (Al-Fares et al., SIGCOMM 2008).
//!
//! Node identities are hierarchical:
//!
//! - edge switch `e` of pod `p` is `(p, e, 1)` with `e` in `0..k/2`,
//! - its hosts are `(p, e, h)` with `h` in `2..k/2 + 2`,
//! - aggregation switch `a` of pod `p` is `(p, a, 1)` with `a` in `k/2..k`,
//! - core switch `c` of group `g` is `(k, g, c)` with `g` and `c` in `1..=k/2`. Group `g` is
//!   wired to aggregation switch `a = g + k/2 - 1` of every pod.
//!
//! Because identities encode position, [`FatTree::port`] needs no port table.

use log::info;
use rustc_hash::FxHashSet;

use crate::{
    identity::{FatTreeId, NodeIdentity},
    network::{
        types::{EdgeSpec, Layer, Link, Node, NodeId, NodeSpec, Port},
        Network,
    },
    topo::{BuildError, PortError, PreconditionError},
    units::Gbps,
};

pub const LAYER_CORE: Layer = Layer::new(0);
pub const LAYER_AGG: Layer = Layer::new(1);
pub const LAYER_EDGE: Layer = Layer::new(2);
pub const LAYER_HOST: Layer = Layer::new(3);

/// Starting index for switch ports. Host ports are always 0.
pub const PORT_BASE: u16 = 1;

const K_MAX: usize = 254;

/// Fat-Tree options.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    typed_builder::TypedBuilder,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(default)]
pub struct FatTreeOpts {
    /// Switch degree.
    #[builder(default = 4)]
    pub k: usize,
    /// Link speed.
    #[builder(default = Gbps::ONE)]
    pub speed: Gbps,
}

impl Default for FatTreeOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct FatTree {
    k: usize,
    network: Network,
}

impl FatTree {
    /// Builds a Fat-Tree with `k` pods: `k²/2` edge and aggregation switches, `k²/4` core switches
    /// and `k³/4` hosts.
    pub fn new(opts: &FatTreeOpts) -> Result<Self, BuildError> {
        let FatTreeOpts { k, speed } = *opts;
        if k < 2 || k % 2 != 0 || k > K_MAX {
            return Err(PreconditionError::InvalidDegree(k).into());
        }
        info!("Building fat-tree with k = {k}");
        let half = k / 2;
        let mut nodes = Vec::new();
        let mut links = Vec::new();
        let mut cores = FxHashSet::default();
        for p in 0..k {
            for e in 0..half {
                let edge = FatTreeId::from_indices(p, e, 1)?;
                nodes.push(Node::new_switch(edge, LAYER_EDGE));
                for h in 2..half + 2 {
                    let host = FatTreeId::from_indices(p, e, h)?;
                    nodes.push(Node::new_host(host, LAYER_HOST));
                    links.push(Link::new(host.dpid(), edge.dpid(), speed));
                }
                for a in half..k {
                    let agg = FatTreeId::from_indices(p, a, 1)?;
                    links.push(Link::new(edge.dpid(), agg.dpid(), speed));
                }
            }
            for a in half..k {
                let agg = FatTreeId::from_indices(p, a, 1)?;
                nodes.push(Node::new_switch(agg, LAYER_AGG));
                let group = a - half + 1;
                for c in 1..=half {
                    let core = FatTreeId::from_indices(k, group, c)?;
                    // Core switches are shared by all pods
                    if cores.insert(core) {
                        nodes.push(Node::new_switch(core, LAYER_CORE));
                    }
                    links.push(Link::new(core.dpid(), agg.dpid(), speed));
                }
            }
        }
        let node_specs = vec![
            NodeSpec::new(0, k, None, Some(speed), "core".to_owned()),
            NodeSpec::new(half, half, Some(speed), Some(speed), "agg".to_owned()),
            NodeSpec::new(half, half, Some(speed), Some(speed), "edge".to_owned()),
            NodeSpec::new(1, 0, Some(speed), None, "host".to_owned()),
        ];
        let edge_specs = vec![EdgeSpec::new(speed); 3];
        let network = Network::new(&nodes, &links, node_specs, edge_specs)?;
        info!(
            "Built fat-tree with {} nodes and {} links",
            network.nr_nodes(),
            network.nr_links()
        );
        Ok(Self { k, network })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Returns `(src_port, dst_port)`: the port on `src` leading to `dst` and the port on `dst`
    /// leading back to `src`. Fails for node pairs that are not adjacent in a tree.
    pub fn port(&self, src: NodeId, dst: NodeId) -> Result<(Port, Port), PortError> {
        let src_layer = self.network.layer(src).ok_or(PortError::UnknownNode(src))?;
        let dst_layer = self.network.layer(dst).ok_or(PortError::UnknownNode(dst))?;
        let src_id = FatTreeId::from_dpid(src)?;
        let dst_id = FatTreeId::from_dpid(dst)?;
        port_between(self.k, (src_layer, src_id), (dst_layer, dst_id))
            .ok_or(PortError::UnroutablePortPair { src, dst })
    }
}

/// Whether `port` faces the core.
pub fn is_port_up(port: Port) -> bool {
    port.inner() % 2 == PORT_BASE
}

fn port_between(
    k: usize,
    (src_layer, s): (Layer, FatTreeId),
    (dst_layer, d): (Layer, FatTreeId),
) -> Option<(Port, Port)> {
    let half = (k / 2) as i64;
    let (sp, sw, sh) = (i64::from(s.pod), i64::from(s.sw), i64::from(s.host));
    let (dp, dw, dh) = (i64::from(d.pod), i64::from(d.sw), i64::from(d.host));
    let (src_port, dst_port) = match (src_layer, dst_layer) {
        (LAYER_HOST, LAYER_EDGE) => (0, (sh - 2) * 2 + 1),
        (LAYER_EDGE, LAYER_CORE) => ((dw - 2) * 2, sp),
        (LAYER_EDGE, LAYER_AGG) => ((dw - half) * 2, sw * 2 + 1),
        (LAYER_AGG, LAYER_CORE) => ((dh - 1) * 2, sp),
        (LAYER_CORE, LAYER_AGG) => (dp, (sh - 1) * 2),
        (LAYER_AGG, LAYER_EDGE) => (dw * 2 + 1, (sw - half) * 2),
        (LAYER_CORE, LAYER_EDGE) => (dp, (sw - 2) * 2),
        (LAYER_EDGE, LAYER_HOST) => ((dh - 2) * 2 + 1, 0),
        _ => return None,
    };
    // Switch ports are 1-indexed (OpenFlow 0.9 and later)
    let shift = |layer: Layer, port: i64| {
        let port = if layer == LAYER_HOST {
            port
        } else {
            port + i64::from(PORT_BASE)
        };
        u16::try_from(port).ok().map(Port::new)
    };
    Some((shift(src_layer, src_port)?, shift(dst_layer, dst_port)?))
}
