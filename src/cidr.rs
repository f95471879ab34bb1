//! IPv4 CIDR block arithmetic.
//!
//! Network containers and subnets are described by CIDR blocks. This module
//! provides the [`Cidr`] value type with the containment, overlap, and
//! subdivision operations the graph builder and validators rely on.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing or manipulating CIDR blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    /// The string is not `a.b.c.d/len`.
    #[error("Invalid CIDR notation '{0}': expected a.b.c.d/len")]
    Malformed(String),

    /// The prefix length is outside 0..=32.
    #[error("Invalid prefix length {0}: must be between 0 and 32")]
    PrefixOutOfRange(u8),

    /// The address has bits set below the prefix boundary.
    #[error("Host bits set in '{0}': a network address is required")]
    HostBitsSet(String),

    /// A subdivision was requested with a prefix no longer than the parent.
    #[error("Cannot subdivide /{parent} into /{child} blocks")]
    InvalidSubdivision {
        /// Parent prefix length
        parent: u8,
        /// Requested child prefix length
        child: u8,
    },
}

/// An IPv4 CIDR block, always normalized to its network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cidr {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl Cidr {
    /// Creates a block from a network address and prefix length.
    ///
    /// Fails if the prefix length exceeds 32 or if `addr` has host bits set.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, CidrError> {
        if prefix_len > 32 {
            return Err(CidrError::PrefixOutOfRange(prefix_len));
        }
        let raw = u32::from(addr);
        if raw & !mask(prefix_len) != 0 {
            return Err(CidrError::HostBitsSet(format!("{addr}/{prefix_len}")));
        }
        Ok(Self { addr, prefix_len })
    }

    /// The network address of the block.
    pub fn network(&self) -> Ipv4Addr {
        self.addr
    }

    /// The prefix length of the block.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The highest address in the block.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) | !mask(self.prefix_len))
    }

    /// Number of addresses covered by the block.
    pub fn host_capacity(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    /// Whether the block covers `ip`.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & mask(self.prefix_len) == u32::from(self.addr)
    }

    /// Whether the block fully covers `other`.
    pub fn contains_cidr(&self, other: &Cidr) -> bool {
        self.prefix_len <= other.prefix_len && self.contains(other.addr)
    }

    /// Whether the two blocks share any address.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other.addr) || other.contains(self.addr)
    }

    /// Iterates over the equal-sized child blocks of the given prefix length.
    ///
    /// `prefix_len` must be strictly longer than the parent prefix.
    pub fn subdivide(&self, prefix_len: u8) -> Result<Subdivision, CidrError> {
        if prefix_len > 32 {
            return Err(CidrError::PrefixOutOfRange(prefix_len));
        }
        if prefix_len <= self.prefix_len {
            return Err(CidrError::InvalidSubdivision {
                parent: self.prefix_len,
                child: prefix_len,
            });
        }
        Ok(Subdivision {
            cursor: u32::from(self.addr) as u64,
            end: u32::from(self.broadcast()) as u64 + 1,
            step: 1u64 << (32 - prefix_len),
            prefix_len,
        })
    }
}

/// Iterator over the child blocks of a [`Cidr::subdivide`] call.
#[derive(Debug, Clone)]
pub struct Subdivision {
    cursor: u64,
    end: u64,
    step: u64,
    prefix_len: u8,
}

impl Iterator for Subdivision {
    type Item = Cidr;

    fn next(&mut self) -> Option<Cidr> {
        if self.cursor >= self.end {
            return None;
        }
        let block = Cidr {
            addr: Ipv4Addr::from(self.cursor as u32),
            prefix_len: self.prefix_len,
        };
        self.cursor += self.step;
        Some(block)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| CidrError::Malformed(s.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| CidrError::Malformed(s.to_string()))?;
        Cidr::new(addr, prefix_len)
    }
}

impl Serialize for Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    }
}
