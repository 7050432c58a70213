//! Jellyfish: a random degree-bounded graph among top-of-rack switches, from "Jellyfish:
//! Networking Data Centers Randomly" (Singla et al., NSDI 2012).
//!
//! Server `i` hangs off switch `i`. Remaining switch ports are first paired up at random. When
//! random pairing stalls, switches with two or more free ports absorb them by splitting an
//! existing link `(x, y)` into `(i, x)` and `(i, y)`, which keeps every other degree unchanged.

use std::collections::BTreeSet;

use log::{debug, info};
use rand::prelude::*;

use crate::{
    identity::{JellyfishId, NodeIdentity},
    network::{
        types::{EdgeSpec, Layer, Link, Node, NodeSpec},
        Network,
    },
    topo::{BuildError, PreconditionError},
    units::Gbps,
};

pub const LAYER_EDGE: Layer = Layer::new(0);
pub const LAYER_HOST: Layer = Layer::new(1);

/// Random pairing gives up after this many consecutive picks of an already-linked pair.
pub const MAX_CONSECUTIVE_FAILURES: usize = 10;

const MAX_SWITCHES: usize = 255;
const MAX_SERVERS: usize = 254;

/// Jellyfish options.
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
pub struct JellyfishOpts {
    /// Number of servers.
    #[builder(default = 16)]
    pub n_servers: usize,
    /// Number of switches.
    #[builder(default = 20)]
    pub n_switches: usize,
    /// Number of ports per switch.
    #[builder(default = 4)]
    pub n_ports: usize,
    /// RNG seed.
    #[builder(default = 0)]
    pub seed: u64,
    /// Link speed.
    #[builder(default = Gbps::ONE)]
    pub speed: Gbps,
}

impl Default for JellyfishOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl JellyfishOpts {
    fn validate(&self) -> Result<(), PreconditionError> {
        let &Self {
            n_servers,
            n_switches,
            n_ports,
            ..
        } = self;
        if n_switches < n_servers {
            return Err(PreconditionError::TooFewSwitches {
                servers: n_servers,
                switches: n_switches,
            });
        }
        if n_ports <= 1 {
            return Err(PreconditionError::TooFewPorts(n_ports));
        }
        if n_switches > MAX_SWITCHES {
            return Err(PreconditionError::TooMany {
                what: "switches",
                max: MAX_SWITCHES,
                got: n_switches,
            });
        }
        if n_servers > MAX_SERVERS {
            return Err(PreconditionError::TooMany {
                what: "servers",
                max: MAX_SERVERS,
                got: n_servers,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Jellyfish {
    opts: JellyfishOpts,
    network: Network,
}

impl Jellyfish {
    /// Builds a Jellyfish topology using an RNG seeded with `opts.seed`.
    pub fn new(opts: &JellyfishOpts) -> Result<Self, BuildError> {
        let mut rng = StdRng::seed_from_u64(opts.seed);
        Self::new_with_rng(opts, &mut rng)
    }

    /// Builds a Jellyfish topology drawing all randomness from `rng`. `opts.seed` is ignored.
    pub fn new_with_rng<R: Rng + ?Sized>(
        opts: &JellyfishOpts,
        rng: &mut R,
    ) -> Result<Self, BuildError> {
        opts.validate()?;
        let &JellyfishOpts {
            n_servers,
            n_switches,
            n_ports,
            speed,
            ..
        } = opts;
        info!(
            "Building jellyfish with {n_servers} servers, {n_switches} switches, {n_ports} ports"
        );

        let servers = (1..=n_servers)
            .map(JellyfishId::host)
            .collect::<Result<Vec<_>, _>>()?;
        let switches = (1..=n_switches)
            .map(JellyfishId::switch)
            .collect::<Result<Vec<_>, _>>()?;
        let nodes = servers
            .iter()
            .map(|&id| Node::new_host(id, LAYER_HOST))
            .chain(switches.iter().map(|&id| Node::new_switch(id, LAYER_EDGE)))
            .collect::<Vec<_>>();

        // Connect each server with a switch
        let mut open_ports = vec![n_ports; n_switches];
        let mut links = Vec::new();
        for (i, server) in servers.iter().enumerate() {
            links.push(Link::new(server.dpid(), switches[i].dpid(), speed));
            open_ports[i] -= 1;
        }

        let mut fabric = SwitchLinks::default();
        let matching = random_matching(&mut open_ports, &mut fabric, rng);
        debug!(
            "Random matching left {} switches with open ports",
            matching.switches_left
        );
        if matching.stalled {
            expand(&mut open_ports, &mut fabric, rng).map_err(|(i, open_ports)| {
                BuildError::Infeasible {
                    switch: switches[i].dpid(),
                    open_ports,
                }
            })?;
        }
        links.extend(
            fabric
                .iter()
                .map(|(a, b)| Link::new(switches[a].dpid(), switches[b].dpid(), speed)),
        );

        let downlinks = if n_switches == 0 {
            0
        } else {
            n_servers.div_ceil(n_switches)
        };
        let node_specs = vec![
            NodeSpec::new(
                n_ports - downlinks,
                downlinks,
                Some(speed),
                Some(speed),
                "edge".to_owned(),
            ),
            NodeSpec::new(1, 0, Some(speed), None, "host".to_owned()),
        ];
        let edge_specs = vec![EdgeSpec::new(speed)];
        let network = Network::new(&nodes, &links, node_specs, edge_specs)?;
        info!(
            "Built jellyfish with {} switch-to-switch links",
            network.nr_links() - n_servers
        );
        Ok(Self {
            opts: *opts,
            network,
        })
    }

    pub fn opts(&self) -> &JellyfishOpts {
        &self.opts
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

/// Undirected links between switch indices, stored with the smaller index first so that
/// iteration order, and therefore every random choice over it, is reproducible.
#[derive(Debug, Default)]
struct SwitchLinks {
    inner: BTreeSet<(usize, usize)>,
}

impl SwitchLinks {
    fn key(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    fn contains(&self, a: usize, b: usize) -> bool {
        self.inner.contains(&Self::key(a, b))
    }

    fn insert(&mut self, a: usize, b: usize) -> bool {
        self.inner.insert(Self::key(a, b))
    }

    fn remove(&mut self, a: usize, b: usize) -> bool {
        self.inner.remove(&Self::key(a, b))
    }

    fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.inner.iter().copied()
    }
}

/// How random matching ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Matching {
    /// Switches still having open ports.
    switches_left: usize,
    /// Whether [`MAX_CONSECUTIVE_FAILURES`] picks in a row hit an existing link. Otherwise fewer
    /// than two switches with open ports remained.
    stalled: bool,
}

/// Links random pairs of switches with open ports until fewer than two remain or pairing stalls.
fn random_matching<R: Rng + ?Sized>(
    open_ports: &mut [usize],
    links: &mut SwitchLinks,
    rng: &mut R,
) -> Matching {
    let mut switches_left = open_ports.iter().filter(|&&n| n > 0).count();
    let mut consec_fails = 0;
    while switches_left > 1 && consec_fails < MAX_CONSECUTIVE_FAILURES {
        let open = (0..open_ports.len())
            .filter(|&i| open_ports[i] > 0)
            .collect::<Vec<_>>();
        let Some(&s1) = open.choose(rng) else {
            break;
        };
        let others = open.into_iter().filter(|&i| i != s1).collect::<Vec<_>>();
        let Some(&s2) = others.choose(rng) else {
            break;
        };
        if !links.insert(s1, s2) {
            consec_fails += 1;
            continue;
        }
        consec_fails = 0;
        for s in [s1, s2] {
            open_ports[s] -= 1;
            if open_ports[s] == 0 {
                switches_left -= 1;
            }
        }
    }
    let stalled = consec_fails >= MAX_CONSECUTIVE_FAILURES;
    if stalled {
        debug!("Random matching stalled after {consec_fails} consecutive failures");
    }
    Matching {
        switches_left,
        stalled,
    }
}

/// Incremental expansion: every switch `i` with more than one open port splits a random link
/// `(x, y)`, where neither `x` nor `y` is `i` or already linked to `i`, into `(i, x)` and `(i, y)`.
///
/// Fails with `(i, open ports of i)` if no link can be split.
fn expand<R: Rng + ?Sized>(
    open_ports: &mut [usize],
    links: &mut SwitchLinks,
    rng: &mut R,
) -> Result<(), (usize, usize)> {
    for i in 0..open_ports.len() {
        while open_ports[i] > 1 {
            let candidates = links
                .iter()
                .filter(|&(x, y)| x != i && y != i && !links.contains(i, x) && !links.contains(i, y))
                .collect::<Vec<_>>();
            let &(x, y) = candidates.choose(rng).ok_or((i, open_ports[i]))?;
            links.remove(x, y);
            links.insert(i, x);
            links.insert(i, y);
            open_ports[i] -= 2;
        }
    }
    Ok(())
}
