#![warn(unreachable_pub, missing_debug_implementations)]

//! The core Jellyfish library. This crate synthesizes data center topologies (a deterministic
//! [Fat-Tree](fat_tree::FatTree) and a randomized [Jellyfish](jellyfish::Jellyfish) graph) and
//! [measures](analysis::analyze) how a [routing policy](routing::RoutingPolicy) spreads routes
//! across their links.

#[macro_use]
mod ident;

pub mod analysis;
pub mod fat_tree;
pub mod identity;
pub mod jellyfish;
pub mod network;
pub mod routing;
pub mod topo;
pub mod units;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analysis::{analyze, AnalysisError, AnalysisOpts, Histogram, LinkCounts, LinkUsage};
pub use fat_tree::{FatTree, FatTreeOpts};
pub use identity::{FatTreeId, IdentityError, JellyfishId, MacAddr, NodeIdentity};
pub use jellyfish::{Jellyfish, JellyfishOpts};
pub use network::{
    types::{EdgeSpec, Layer, Link, Node, NodeId, NodeKind, NodeSpec, Port},
    Network, TopologyError,
};
pub use routing::{Route, RoutingError, RoutingPolicy};
pub use topo::{BuildError, PortError, PreconditionError, Topo, TopoKind, TopologySpec};
