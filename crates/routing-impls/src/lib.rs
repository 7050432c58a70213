//! This crate contains implementations of the
//! [`RoutingPolicy`](jellyfish_core::routing::RoutingPolicy) trait. Every policy here routes over
//! shortest paths that only transit switches, and differs in how it picks among them.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

pub mod bfs;
pub mod ecmp;
pub mod ksp;
pub mod random;
mod utils;

use std::str::FromStr;

use jellyfish_core::{network::Network, routing::RoutingPolicy};

pub use crate::bfs::NextHops;
pub use crate::ecmp::{Ecmp, Hashed};
pub use crate::ksp::Ksp;
pub use crate::random::RandomPath;

/// Number of paths KSP routing chooses from unless configured otherwise.
pub const DEFAULT_KSP_PATHS: usize = 8;

/// Selects a routing policy and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RoutingKind {
    /// See [`Ksp`].
    Ksp {
        /// Number of shortest paths to choose from.
        k: usize,
    },
    /// See [`Ecmp`].
    Ecmp,
    /// See [`Hashed`].
    Hashed,
    /// See [`RandomPath`].
    Random {
        /// RNG seed.
        seed: u64,
    },
}

impl Default for RoutingKind {
    fn default() -> Self {
        Self::Ksp {
            k: DEFAULT_KSP_PATHS,
        }
    }
}

impl RoutingKind {
    /// The short tag used in output file names.
    pub fn tag(&self) -> &'static str {
        match self {
            RoutingKind::Ksp { .. } => "ksp",
            RoutingKind::Ecmp => "ecmp",
            RoutingKind::Hashed => "hashed",
            RoutingKind::Random { .. } => "random",
        }
    }

    /// Builds the selected policy over `network`.
    pub fn build(&self, network: &Network) -> Box<dyn RoutingPolicy + Send> {
        match *self {
            RoutingKind::Ksp { k } => Box::new(Ksp::new(network, k)),
            RoutingKind::Ecmp => Box::new(Ecmp::new(network)),
            RoutingKind::Hashed => Box::new(Hashed::new(network)),
            RoutingKind::Random { seed } => Box::new(RandomPath::new(network, seed)),
        }
    }
}

impl FromStr for RoutingKind {
    type Err = UnknownRouting;

    /// Parses a tag, using default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ksp" => Ok(RoutingKind::default()),
            "ecmp" => Ok(RoutingKind::Ecmp),
            "hashed" => Ok(RoutingKind::Hashed),
            "random" => Ok(RoutingKind::Random { seed: 0 }),
            _ => Err(UnknownRouting(s.to_owned())),
        }
    }
}

/// An unrecognized routing tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown routing `{0}` (expected one of ksp, ecmp, hashed, random)")]
pub struct UnknownRouting(pub String);
