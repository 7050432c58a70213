use std::net::Ipv4Addr;

use crate::identity::{MacAddr, NodeIdentity};
use crate::units::Gbps;

identifier!(
    /// A node's dpid.
    NodeId,
    u64
);

identifier!(
    /// A topology layer. Lower layers are closer to the core.
    Layer,
    usize
);

identifier!(
    /// A switch port number.
    Port,
    u16
);

/// A topology node. Hosts carry an IP and a MAC address; switches do not.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub layer: Layer,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr>,
}

impl Node {
    pub fn new_host(ident: impl NodeIdentity, layer: Layer) -> Self {
        Self {
            id: ident.dpid(),
            name: ident.name(),
            layer,
            kind: NodeKind::Host,
            ip: Some(ident.ip()),
            mac: Some(ident.mac()),
        }
    }

    pub fn new_switch(ident: impl NodeIdentity, layer: Layer) -> Self {
        Self {
            id: ident.dpid(),
            name: ident.name(),
            layer,
            kind: NodeKind::Switch,
            ip: None,
            mac: None,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, NodeKind::Host)
    }

    /// The dpid as 16 zero-padded hex digits.
    pub fn dpid_str(&self) -> String {
        format!("{:016x}", self.id.inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    Host,
    Switch,
}

/// An undirected link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub bandwidth: Gbps,
}

impl Link {
    pub fn new(a: NodeId, b: NodeId, bandwidth: impl Into<Gbps>) -> Self {
        Self {
            a,
            b,
            bandwidth: bandwidth.into(),
        }
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        self.a == x && self.b == y || self.a == y && self.b == x
    }

    /// The endpoints with the smaller ID first.
    pub fn key(&self) -> (NodeId, NodeId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// Per-layer node metadata. Speeds are `None` where a layer has no links in that direction.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct NodeSpec {
    pub up_total: usize,
    pub down_total: usize,
    pub up_speed: Option<Gbps>,
    pub down_speed: Option<Gbps>,
    pub role: String,
}

impl NodeSpec {
    /// The most links a node in this layer may have.
    pub fn port_budget(&self) -> usize {
        self.up_total + self.down_total
    }
}

/// Per-layer metadata for down-links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct EdgeSpec {
    pub speed: Gbps,
}
