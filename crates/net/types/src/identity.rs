//! Fixed-length peer identities and identifier-derived lookup keys.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::FixedBytes;
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Length of peer identities and info hashes in bytes (BitTorrent `peer_id` / `info_hash`).
pub const IDENTITY_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidIdentity {
    #[error("expected {IDENTITY_LEN} bytes, got {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

fn parse_fixed(s: &str) -> Result<FixedBytes<IDENTITY_LEN>, InvalidIdentity> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    if bytes.len() != IDENTITY_LEN {
        return Err(InvalidIdentity::Length(bytes.len()));
    }
    Ok(FixedBytes::from_slice(&bytes))
}

/// Opaque identity of one logical peer.
///
/// The local identity is random per session; remote identities arrive in
/// tracker responses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity(FixedBytes<IDENTITY_LEN>);

impl PeerIdentity {
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(FixedBytes::new(bytes))
    }

    /// Fresh identity from random bytes.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; IDENTITY_LEN]> for PeerIdentity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self::new(bytes)
    }
}

impl FromStr for PeerIdentity {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s).map(Self)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({})", self.to_hex())
    }
}

/// Lookup key announced to trackers, scoping discovery to one application.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(FixedBytes<IDENTITY_LEN>);

impl InfoHash {
    /// SHA-1 of the application identifier string.
    pub fn from_identifier(identifier: &str) -> Self {
        let digest: [u8; IDENTITY_LEN] = Sha1::digest(identifier.as_bytes()).into();
        Self(FixedBytes::new(digest))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s).map(Self)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}
