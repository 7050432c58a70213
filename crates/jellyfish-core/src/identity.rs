//! This module defines node identities. An identity is a small tuple of structural fields (pod,
//! switch, host, ...) packed into a [`NodeId`] (the node's dpid). Packing is bijective, so the
//! dpid alone recovers a node's position in the topology, its addresses, and its display name.

use std::{fmt, net::Ipv4Addr, str::FromStr};

use crate::network::types::NodeId;

/// The host field value marking a Jellyfish node as a switch rather than a host.
pub const SWITCH_SENTINEL: u8 = 0xff;

/// A structural identity scheme for the nodes of one topology family.
pub trait NodeIdentity: Copy + Eq + fmt::Debug + Sized {
    /// Packs the structural fields into a dpid.
    fn dpid(&self) -> NodeId;

    /// Unpacks a dpid. Fails if the dpid has bits set outside the packed fields.
    fn from_dpid(dpid: NodeId) -> Result<Self, IdentityError>;

    /// Parses the canonical textual name produced by [`NodeIdentity::name`].
    fn from_name(name: &str) -> Result<Self, IdentityError>;

    /// The canonical textual name.
    fn name(&self) -> String;

    fn ip(&self) -> Ipv4Addr;

    fn mac(&self) -> MacAddr;

    /// The dpid as 16 zero-padded hex digits.
    fn dpid_str(&self) -> String {
        format!("{:016x}", self.dpid().inner())
    }
}

/// Identity of a Fat-Tree node: three 8-bit fields packed as `pod:switch:host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FatTreeId {
    pub pod: u8,
    pub sw: u8,
    pub host: u8,
}

impl FatTreeId {
    pub const fn new(pod: u8, sw: u8, host: u8) -> Self {
        Self { pod, sw, host }
    }

    /// Creates an identity from unbounded indices, failing if any of them exceeds 8 bits.
    pub fn from_indices(pod: usize, sw: usize, host: usize) -> Result<Self, IdentityError> {
        Ok(Self::new(field(pod)?, field(sw)?, field(host)?))
    }
}

impl NodeIdentity for FatTreeId {
    fn dpid(&self) -> NodeId {
        NodeId::new(u64::from(self.pod) << 16 | u64::from(self.sw) << 8 | u64::from(self.host))
    }

    fn from_dpid(dpid: NodeId) -> Result<Self, IdentityError> {
        let raw = dpid.inner();
        if raw > 0xff_ffff {
            return Err(IdentityError::DpidOutOfRange { dpid: raw, bits: 24 });
        }
        Ok(Self::new((raw >> 16) as u8, (raw >> 8) as u8, raw as u8))
    }

    fn from_name(name: &str) -> Result<Self, IdentityError> {
        let malformed = || IdentityError::MalformedName(name.to_owned());
        let fields = name
            .split('_')
            .map(|s| parse_index::<u8>(s).ok_or_else(malformed))
            .collect::<Result<Vec<_>, _>>()?;
        match fields[..] {
            [pod, sw, host] => Ok(Self::new(pod, sw, host)),
            _ => Err(malformed()),
        }
    }

    fn name(&self) -> String {
        format!("{}_{}_{}", self.pod, self.sw, self.host)
    }

    fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(10, self.pod, self.sw, self.host)
    }

    fn mac(&self) -> MacAddr {
        MacAddr::new([0, 0, 0, self.pod, self.sw, self.host])
    }
}

impl fmt::Display for FatTreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.pod, self.sw, self.host)
    }
}

/// Identity of a Jellyfish node: two 8-bit fields packed as `switch:host`. Switches carry
/// [`SWITCH_SENTINEL`] in the host field; host `i` is attached to switch `i`, so hosts carry
/// their own index in both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JellyfishId {
    pub sw: u8,
    pub host: u8,
}

impl JellyfishId {
    pub const fn new(sw: u8, host: u8) -> Self {
        Self { sw, host }
    }

    /// The identity of switch `sw`.
    pub fn switch(sw: usize) -> Result<Self, IdentityError> {
        Ok(Self::new(field(sw)?, SWITCH_SENTINEL))
    }

    /// The identity of host `host`, which hangs off the switch with the same index.
    pub fn host(host: usize) -> Result<Self, IdentityError> {
        let host = field(host)?;
        if host == SWITCH_SENTINEL {
            return Err(IdentityError::FieldOutOfRange(host.into()));
        }
        Ok(Self::new(host, host))
    }

    pub fn is_switch(&self) -> bool {
        self.host == SWITCH_SENTINEL
    }
}

impl NodeIdentity for JellyfishId {
    fn dpid(&self) -> NodeId {
        NodeId::new(u64::from(self.sw) << 8 | u64::from(self.host))
    }

    /// Unpacks a dpid. Besides range, fails on a host whose switch field differs from its host
    /// field, since hosts only exist as `(i, i)`.
    fn from_dpid(dpid: NodeId) -> Result<Self, IdentityError> {
        let raw = dpid.inner();
        if raw > 0xffff {
            return Err(IdentityError::DpidOutOfRange { dpid: raw, bits: 16 });
        }
        let id = Self::new((raw >> 8) as u8, raw as u8);
        if !id.is_switch() && id.sw != id.host {
            return Err(IdentityError::DetachedHost {
                sw: id.sw,
                host: id.host,
            });
        }
        Ok(id)
    }

    fn from_name(name: &str) -> Result<Self, IdentityError> {
        let malformed = || IdentityError::MalformedName(name.to_owned());
        let parse = |index: &str| parse_index::<usize>(index).ok_or_else(malformed);
        if let Some(index) = name.strip_prefix('h') {
            Self::host(parse(index)?)
        } else if let Some(index) = name.strip_prefix('s') {
            Self::switch(parse(index)?)
        } else {
            Err(malformed())
        }
    }

    fn name(&self) -> String {
        if self.is_switch() {
            format!("s{}", self.sw)
        } else {
            format!("h{}", self.host)
        }
    }

    fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, self.sw, self.host)
    }

    fn mac(&self) -> MacAddr {
        MacAddr::new([0, 0, 0, 0, self.sw, self.host])
    }
}

impl fmt::Display for JellyfishId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sw, self.host)
    }
}

/// Parses a plain decimal field. Signs and leading zeros are rejected so each identity has
/// exactly one name.
fn parse_index<T>(s: &str) -> Option<T>
where
    T: FromStr + ToString,
{
    s.parse::<T>().ok().filter(|v| v.to_string() == s)
}

fn field(val: usize) -> Result<u8, IdentityError> {
    u8::try_from(val).map_err(|_| IdentityError::FieldOutOfRange(val))
}

/// A 48-bit MAC address, rendered as colon-separated lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdentityError::MalformedMac(s.to_owned());
        let octets = s
            .split(':')
            .map(|o| u8::from_str_radix(o, 16).map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        let octets: [u8; 6] = octets.try_into().map_err(|_| malformed())?;
        Ok(Self(octets))
    }
}

impl serde::Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for MacAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Node identity error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("dpid {dpid:#x} does not fit in {bits} bits")]
    DpidOutOfRange { dpid: u64, bits: u32 },

    #[error("malformed node name {0:?}")]
    MalformedName(String),

    #[error("malformed MAC address {0:?}")]
    MalformedMac(String),

    #[error("field value {0} does not fit in an 8-bit identity field")]
    FieldOutOfRange(usize),

    #[error("host {host} is not attached to switch {sw}")]
    DetachedHost { sw: u8, host: u8 },
}
