//! This module ties the topology families together: a [`TopologySpec`] selects a family and its
//! parameters, and [`Topo::build`] turns it into a validated [`Network`] wrapped in the family's
//! type.

use crate::{
    fat_tree::{FatTree, FatTreeOpts},
    identity::{FatTreeId, IdentityError, JellyfishId, NodeIdentity},
    jellyfish::{Jellyfish, JellyfishOpts},
    network::{
        types::{NodeId, Port},
        Network, TopologyError,
    },
};

/// Which topology to build, and with what parameters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TopologySpec {
    FatTree(FatTreeOpts),
    Jellyfish(JellyfishOpts),
}

impl TopologySpec {
    pub fn kind(&self) -> TopoKind {
        match self {
            TopologySpec::FatTree(_) => TopoKind::FatTree,
            TopologySpec::Jellyfish(_) => TopoKind::Jellyfish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TopoKind {
    FatTree,
    Jellyfish,
}

impl TopoKind {
    /// The short tag used in output file names.
    pub fn tag(&self) -> &'static str {
        match self {
            TopoKind::FatTree => "ft",
            TopoKind::Jellyfish => "jf",
        }
    }
}

/// A built topology.
#[derive(Debug, Clone)]
pub enum Topo {
    FatTree(FatTree),
    Jellyfish(Jellyfish),
}

impl Topo {
    pub fn build(spec: &TopologySpec) -> Result<Self, BuildError> {
        match spec {
            TopologySpec::FatTree(opts) => FatTree::new(opts).map(Topo::FatTree),
            TopologySpec::Jellyfish(opts) => Jellyfish::new(opts).map(Topo::Jellyfish),
        }
    }

    pub fn kind(&self) -> TopoKind {
        match self {
            Topo::FatTree(_) => TopoKind::FatTree,
            Topo::Jellyfish(_) => TopoKind::Jellyfish,
        }
    }

    pub fn network(&self) -> &Network {
        match self {
            Topo::FatTree(t) => t.network(),
            Topo::Jellyfish(t) => t.network(),
        }
    }

    /// Ports for the link between `src` and `dst`. Only Fat-Trees address ports statelessly.
    pub fn port(&self, src: NodeId, dst: NodeId) -> Result<(Port, Port), PortError> {
        match self {
            Topo::FatTree(t) => t.port(src, dst),
            Topo::Jellyfish(_) => Err(PortError::Unsupported(TopoKind::Jellyfish)),
        }
    }

    /// Resolves a canonical node name with this topology's identity scheme.
    pub fn parse_name(&self, name: &str) -> Result<NodeId, IdentityError> {
        match self {
            Topo::FatTree(_) => FatTreeId::from_name(name).map(|id| id.dpid()),
            Topo::Jellyfish(_) => JellyfishId::from_name(name).map(|id| id.dpid()),
        }
    }
}

/// Topology construction error. No partial topology is ever returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("precondition violated")]
    Precondition(#[from] PreconditionError),

    #[error("no link can be split to absorb the {open_ports} open ports left on switch {switch}")]
    Infeasible { switch: NodeId, open_ports: usize },

    #[error("invalid node identity")]
    Identity(#[from] IdentityError),

    #[error("invalid topology")]
    Topology(#[from] TopologyError),
}

/// Parameters that can never produce a valid topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("fat-tree degree must be even and in 2..=254 (got {0})")]
    InvalidDegree(usize),

    #[error("need at least as many switches as servers (got {switches} switches, {servers} servers)")]
    TooFewSwitches { servers: usize, switches: usize },

    #[error("switches need more than one port (got {0})")]
    TooFewPorts(usize),

    #[error("at most {max} {what} fit in an 8-bit identity field (got {got})")]
    TooMany {
        what: &'static str,
        max: usize,
        got: usize,
    },
}

/// Port addressing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("no port mapping between {src} and {dst}")]
    UnroutablePortPair { src: NodeId, dst: NodeId },

    #[error("node {0} is not in the topology")]
    UnknownNode(NodeId),

    #[error("{0:?} topologies do not address ports")]
    Unsupported(TopoKind),

    #[error("invalid node identity")]
    Identity(#[from] IdentityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_dispatches_on_spec() -> anyhow::Result<()> {
        let ft = Topo::build(&TopologySpec::FatTree(FatTreeOpts::builder().k(2).build()))?;
        assert_eq!(ft.kind(), TopoKind::FatTree);
        assert_eq!(ft.network().hosts().count(), 2);
        let jf = Topo::build(&TopologySpec::Jellyfish(JellyfishOpts::default()))?;
        assert_eq!(jf.kind(), TopoKind::Jellyfish);
        assert_eq!(jf.network().hosts().count(), 16);
        assert_eq!(jf.network().switches().count(), 20);
        Ok(())
    }

    #[test]
    fn names_resolve_per_family() -> anyhow::Result<()> {
        let ft = Topo::build(&TopologySpec::FatTree(FatTreeOpts::default()))?;
        let id = ft.parse_name("0_0_2")?;
        assert!(ft.network().is_host(id));
        let jf = Topo::build(&TopologySpec::Jellyfish(JellyfishOpts::default()))?;
        let id = jf.parse_name("s3")?;
        assert!(jf.network().contains(id));
        assert!(!jf.network().is_host(id));
        assert!(jf.parse_name("0_0_2").is_err());
        Ok(())
    }

    #[test]
    fn jellyfish_has_no_ports() -> anyhow::Result<()> {
        let jf = Topo::build(&TopologySpec::Jellyfish(JellyfishOpts::default()))?;
        let link = *jf.network().links().next().expect("jellyfish has links");
        assert_eq!(
            jf.port(link.a, link.b),
            Err(PortError::Unsupported(TopoKind::Jellyfish))
        );
        Ok(())
    }

    #[test]
    fn spec_deserializes_with_defaults() -> anyhow::Result<()> {
        let spec: TopologySpec = serde_json::from_str(r#"{"Jellyfish": {"n_switches": 30}}"#)?;
        let TopologySpec::Jellyfish(opts) = spec else {
            anyhow::bail!("wrong topology kind");
        };
        assert_eq!(opts.n_switches, 30);
        assert_eq!(opts.n_servers, 16);
        assert_eq!(opts.n_ports, 4);
        Ok(())
    }
}
