//! This module defines the interface routing policies must satisfy to be analyzed.

use crate::network::types::NodeId;

/// An ordered sequence of nodes from source to destination, both included. A route is empty only
/// if no path exists.
pub type Route = Vec<NodeId>;

/// The trait implemented by all routing policies.
pub trait RoutingPolicy {
    /// Return the route taken by flow number `flow_index` from `src` to `dst`.
    fn route(&mut self, src: NodeId, dst: NodeId, flow_index: usize) -> Result<Route, RoutingError>;
}

impl<R: RoutingPolicy + ?Sized> RoutingPolicy for &mut R {
    fn route(&mut self, src: NodeId, dst: NodeId, flow_index: usize) -> Result<Route, RoutingError> {
        (**self).route(src, dst, flow_index)
    }
}

impl<R: RoutingPolicy + ?Sized> RoutingPolicy for Box<R> {
    fn route(&mut self, src: NodeId, dst: NodeId, flow_index: usize) -> Result<Route, RoutingError> {
        (**self).route(src, dst, flow_index)
    }
}

/// Routing lookup error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("node {0} is not in the topology")]
    UnknownNode(NodeId),
}
