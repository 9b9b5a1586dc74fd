//! Serializable ledger state for the storage collaborator
//!
//! Snapshots are plain data. Restoring goes through
//! [`crate::ledger::Election::restore`] and
//! [`crate::ledger::VoterRegistry::restore`], which re-check every ledger
//! invariant before accepting the state.

use crate::types::{Candidate, ElectionId, Identity, Phase, VoterRecord};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted form of one election
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSnapshot {
    pub id: ElectionId,
    pub admin: Identity,
    pub name: String,
    pub description: String,
    pub phase: Phase,
    pub candidates: Vec<Candidate>,

    /// Identities that have voted, sorted
    pub voted: Vec<Identity>,
    pub created_at: DateTime<Utc>,
}

/// Persisted form of a voter registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRegistrySnapshot {
    pub admin: Identity,

    /// Records in registration order
    pub voters: Vec<VoterRecord>,
}

impl ElectionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl VoterRegistrySnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
