//! Fixtures shared by tests in this crate and downstream crates.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::{
    identity::{JellyfishId, SWITCH_SENTINEL},
    network::{
        types::{Layer, Link, Node, NodeId, NodeSpec},
        Network,
    },
    routing::{Route, RoutingError, RoutingPolicy},
    units::Gbps,
};

pub const SPEED: Gbps = Gbps::new(1);

/// Two hosts (`h1`, `h2`, layer 1) hanging off one two-port switch (`s1`, layer 0).
pub fn three_node_config() -> (Vec<Node>, Vec<Link>, Vec<NodeSpec>) {
    let n1 = Node::new_host(JellyfishId::new(1, 1), Layer::new(1));
    let n2 = Node::new_host(JellyfishId::new(2, 2), Layer::new(1));
    let n3 = Node::new_switch(JellyfishId::new(1, SWITCH_SENTINEL), Layer::new(0));
    let l1 = Link::new(n1.id, n3.id, SPEED);
    let l2 = Link::new(n2.id, n3.id, SPEED);
    let specs = vec![
        NodeSpec::new(0, 2, None, Some(SPEED), "edge".to_owned()),
        NodeSpec::new(1, 0, Some(SPEED), None, "host".to_owned()),
    ];
    (vec![n1, n2, n3], vec![l1, l2], specs)
}

/// A routing policy that returns the first shortest path found by a BFS which only transits
/// switches. On a tree this is the unique path.
#[derive(Debug)]
pub struct FirstShortestPath<'a> {
    network: &'a Network,
}

impl<'a> FirstShortestPath<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }
}

impl RoutingPolicy for FirstShortestPath<'_> {
    fn route(&mut self, src: NodeId, dst: NodeId, _: usize) -> Result<Route, RoutingError> {
        for id in [src, dst] {
            if !self.network.contains(id) {
                return Err(RoutingError::UnknownNode(id));
            }
        }
        let mut parents = FxHashMap::default();
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
                return Ok(route);
            }
            if n != src && self.network.is_host(n) {
                continue;
            }
            let mut next = self.network.neighbors(n).map(|m| m.id).collect::<Vec<_>>();
            next.sort();
            for m in next {
                if m != src && !parents.contains_key(&m) {
                    parents.insert(m, n);
                    queue.push_back(m);
                }
            }
        }
        Ok(Vec::new())
    }
}

/// A routing policy that replays fixed answers and fails for any other pair.
#[derive(Debug, Default)]
pub struct FixedRoutes {
    routes: FxHashMap<(NodeId, NodeId), Route>,
}

impl FixedRoutes {
    pub fn with(mut self, src: NodeId, dst: NodeId, route: Route) -> Self {
        self.routes.insert((src, dst), route);
        self
    }
}

impl RoutingPolicy for FixedRoutes {
    fn route(&mut self, src: NodeId, dst: NodeId, _: usize) -> Result<Route, RoutingError> {
        self.routes
            .get(&(src, dst))
            .cloned()
            .ok_or(RoutingError::UnknownNode(src))
    }
}

/// Asserts that `route` runs from `src` to `dst` over existing links, visits no node twice and
/// only transits switches.
pub fn assert_valid_route(network: &Network, route: &[NodeId], src: NodeId, dst: NodeId) {
    assert_eq!(route.first(), Some(&src), "route {route:?} does not start at {src}");
    assert_eq!(route.last(), Some(&dst), "route {route:?} does not end at {dst}");
    for hop in route.windows(2) {
        assert!(
            network.is_linked(hop[0], hop[1]),
            "no link between {} and {}",
            hop[0],
            hop[1]
        );
    }
    if route.len() > 2 {
        for &n in &route[1..route.len() - 1] {
            assert!(!network.is_host(n), "route {route:?} transits host {n}");
        }
    }
    let mut seen = route.to_vec();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), route.len(), "route {route:?} has a loop");
}
