//! # Core Types for the Election Ledger
//!
//! This module defines the value types shared by every ledger component.
//! Identifiers are fixed-width and only constructed through validated
//! parsing, so a numeric id and its text form can never be confused.
//!
//! ## Type Categories
//!
//! ### Identifiers
//! - [`Identity`]: 20-byte caller address supplied by the authentication layer
//! - [`CandidateId`]: 1-based candidate position within an election
//! - [`ElectionId`]: UUID assigned to every election at construction
//!
//! ### Records
//! - [`Candidate`]: candidate name and running vote count
//! - [`VoterRecord`]: registration and verification state of one identity
//! - [`Phase`]: election lifecycle stage
//!
//! ## Usage Examples
//!
//! ```rust
//! use vote_ledger::types::{Identity, Phase};
//!
//! let voter = Identity::parse("0xAA").unwrap();
//! assert_eq!(voter, Identity::parse("0x00000000000000000000000000000000000000aa").unwrap());
//!
//! assert_eq!(Phase::Setup.next(), Some(Phase::Active));
//! assert!(Phase::Active.accepts_votes());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A cryptographic hash using Blake3 (32 bytes)
pub type Hash = [u8; 32];

/// Opaque digest of a voter's identity proof, computed by the caller
pub type ProofDigest = Hash;

/// Candidate identifier, contiguous from 1 within an election
pub type CandidateId = u32;

/// Running vote count of a candidate
pub type VoteCount = u64;

/// Logical timestamp: a component-local sequence number, starting at 1
pub type LogicalTimestamp = u64;

/// Unique election identifier
pub type ElectionId = Uuid;

/// Width of an identity in bytes
pub const IDENTITY_LEN: usize = 20;

/// Caller identity (wallet address equivalent)
///
/// Identities are opaque 20-byte keys. The text form is `0x` followed by up
/// to 40 hex digits; shorter inputs are left-padded with zeros, so `0xAA`
/// names the same identity as its fully padded form. Parsing is the only way
/// to build an identity from text.
///
/// # Examples
///
/// ```rust
/// use vote_ledger::types::Identity;
///
/// let id: Identity = "0xCc".parse().unwrap();
/// assert_eq!(id.to_string(), "0x00000000000000000000000000000000000000cc");
///
/// assert!(Identity::parse("").is_err());
/// assert!(Identity::parse("0xZZ").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Build an identity from raw bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an identity from its hex text form
    pub fn parse(text: &str) -> Result<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);

        if digits.is_empty() || digits.len() > IDENTITY_LEN * 2 {
            return Err(Error::validation(format!(
                "identity must have 1..={} hex digits, got {}",
                IDENTITY_LEN * 2,
                digits.len()
            )));
        }

        let padded = format!("{:0>width$}", digits, width = IDENTITY_LEN * 2);
        let mut bytes = [0u8; IDENTITY_LEN];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| Error::validation(format!("identity is not valid hex: {e}")))?;

        Ok(Self(bytes))
    }

    /// Generate a random identity
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Raw identity bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Identity::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Election lifecycle phase
///
/// Phases only move forward: `Setup -> Active -> Closed -> Tallied`.
/// Votes are accepted only while `Active`; `Tallied` is terminal and marks
/// the results as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Active,
    Closed,
    Tallied,
}

impl Phase {
    /// The phase that follows this one, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Setup => Some(Phase::Active),
            Phase::Active => Some(Phase::Closed),
            Phase::Closed => Some(Phase::Tallied),
            Phase::Tallied => None,
        }
    }

    /// Whether votes may be cast in this phase
    pub fn accepts_votes(self) -> bool {
        self == Phase::Active
    }

    /// Whether this is the terminal phase
    pub fn is_final(self) -> bool {
        self == Phase::Tallied
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "Setup",
            Phase::Active => "Active",
            Phase::Closed => "Closed",
            Phase::Tallied => "Tallied",
        };
        f.write_str(name)
    }
}

/// A candidate within one election
///
/// Candidates are created once at election setup and never removed; only
/// `vote_count` changes afterwards, and only through a successful vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position in the setup list, starting at 1
    pub id: CandidateId,

    /// Display name, non-empty and unique within the election
    pub name: String,

    /// Votes received so far
    pub vote_count: VoteCount,
}

/// Registration record of a single identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub identity: Identity,
    pub display_name: String,

    /// Digest of the identity document presented at registration
    pub proof_digest: ProofDigest,

    /// Set once by the registry admin, never cleared
    pub verified: bool,

    /// Registration sequence number within the registry
    pub registered_at: LogicalTimestamp,
}
