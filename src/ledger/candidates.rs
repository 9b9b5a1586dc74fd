//! Candidate registry
//!
//! Fixed after setup: names and ids never change once initialized. The
//! registry has no locking of its own; its owning election serializes every
//! access.

use crate::types::{Candidate, CandidateId, VoteCount};
use crate::{Error, Result};
use std::collections::HashSet;

/// Ordered candidate list with running vote counts
#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
    initialized: bool,
}

impl CandidateRegistry {
    /// Create an uninitialized registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from candidate names in ballot order
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        registry.initialize(names)?;
        Ok(registry)
    }

    /// Allocate candidates 1..=N with zero votes
    ///
    /// Fails with `InvalidConfiguration` on an empty list, a blank name or a
    /// duplicate name, and with `AlreadyInitialized` on a second call.
    pub fn initialize<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        if names.is_empty() {
            return Err(Error::invalid_configuration(
                "at least one candidate is required",
            ));
        }

        if names.len() > CandidateId::MAX as usize {
            return Err(Error::invalid_configuration(format!(
                "too many candidates: {}",
                names.len()
            )));
        }

        let mut seen = HashSet::with_capacity(names.len());
        let mut candidates = Vec::with_capacity(names.len());

        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(Error::invalid_configuration(format!(
                    "candidate {} has an empty name",
                    index + 1
                )));
            }
            if !seen.insert(name) {
                return Err(Error::invalid_configuration(format!(
                    "duplicate candidate name: {name}"
                )));
            }

            candidates.push(Candidate {
                id: index as CandidateId + 1,
                name: name.to_string(),
                vote_count: 0,
            });
        }

        self.candidates = candidates;
        self.initialized = true;
        Ok(())
    }

    /// Rebuild a registry from previously persisted candidates
    ///
    /// Ids must be exactly 1..=N in order and names must pass the same checks
    /// as [`CandidateRegistry::initialize`].
    pub(crate) fn from_candidates(candidates: Vec<Candidate>) -> Result<Self> {
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        let mut registry = Self::with_names(&names)?;

        for (index, (slot, stored)) in registry
            .candidates
            .iter_mut()
            .zip(candidates.iter())
            .enumerate()
        {
            if stored.id != index as CandidateId + 1 {
                return Err(Error::integrity(format!(
                    "candidate ids are not contiguous: expected {}, found {}",
                    index + 1,
                    stored.id
                )));
            }
            slot.vote_count = stored.vote_count;
        }

        Ok(registry)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Look up a candidate by id
    pub fn get(&self, id: CandidateId) -> Result<&Candidate> {
        let index = self.index_of(id)?;
        Ok(&self.candidates[index])
    }

    /// Count `id` would have after one more vote, without changing it
    pub fn next_count(&self, id: CandidateId) -> Result<VoteCount> {
        self.get(id)?
            .vote_count
            .checked_add(1)
            .ok_or_else(|| Error::internal(format!("vote count overflow for candidate {id}")))
    }

    /// Add one vote and return the new count
    pub fn increment_vote(&mut self, id: CandidateId) -> Result<VoteCount> {
        let vote_count = self.next_count(id)?;
        let index = self.index_of(id)?;
        self.candidates[index].vote_count = vote_count;
        Ok(vote_count)
    }

    /// Number of candidates
    pub fn count(&self) -> u32 {
        self.candidates.len() as u32
    }

    /// Every candidate in id order
    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Sum of all vote counts
    pub fn total_votes(&self) -> VoteCount {
        self.candidates.iter().map(|c| c.vote_count).sum()
    }

    fn index_of(&self, id: CandidateId) -> Result<usize> {
        if id < 1 || id > self.count() {
            return Err(Error::InvalidCandidate {
                candidate_id: id,
                candidates_count: self.count(),
            });
        }
        Ok(id as usize - 1)
    }
}
