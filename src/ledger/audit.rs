//! Audit over the event feed
//!
//! Two checks an external auditor can run without trusting live state:
//! 1. [`verify_chain`] re-derives every content hash and chain link
//! 2. [`reconstruct_tally`] replays `VoteCast` events into per-candidate
//!    counts, which [`audit_election`] compares against the live election

use crate::ledger::election::Election;
use crate::ledger::feed::{LedgerEvent, LedgerRecord};
use crate::types::{CandidateId, ElectionId, Hash, Identity, Phase, VoteCount};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Hash chain verification report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainIntegrityReport {
    pub records_checked: usize,
    pub violations: Vec<ChainViolation>,
    pub chain_valid: bool,
    pub verified_at: DateTime<Utc>,
}

/// A single broken record in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainViolation {
    pub sequence: u64,
    pub kind: ViolationKind,
    pub description: String,
}

/// Types of chain violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    ContentHashMismatch,
    HashChainBroken,
    SequenceGap,
}

/// Verify content hashes, links and sequence numbers of a record slice
///
/// The slice must start at the beginning of the feed.
pub fn verify_chain(records: &[LedgerRecord]) -> Result<ChainIntegrityReport> {
    let mut violations = Vec::new();
    let mut previous_hash: Option<Hash> = None;

    for (index, record) in records.iter().enumerate() {
        let expected_sequence = index as u64 + 1;
        if record.sequence != expected_sequence {
            violations.push(ChainViolation {
                sequence: record.sequence,
                kind: ViolationKind::SequenceGap,
                description: format!(
                    "expected sequence {expected_sequence}, found {}",
                    record.sequence
                ),
            });
        }

        if !record.verify_content()? {
            violations.push(ChainViolation {
                sequence: record.sequence,
                kind: ViolationKind::ContentHashMismatch,
                description: "Content hash does not match calculated hash".to_string(),
            });
        }

        if record.previous_hash != previous_hash {
            violations.push(ChainViolation {
                sequence: record.sequence,
                kind: ViolationKind::HashChainBroken,
                description: "Previous hash does not match expected value".to_string(),
            });
        }

        previous_hash = Some(record.record_hash()?);
    }

    Ok(ChainIntegrityReport {
        records_checked: records.len(),
        chain_valid: violations.is_empty(),
        violations,
        verified_at: Utc::now(),
    })
}

/// Election state rebuilt purely from feed records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructedTally {
    pub counts: BTreeMap<CandidateId, VoteCount>,
    pub voters: BTreeSet<Identity>,

    /// Identities with more than one `VoteCast` record
    pub duplicate_voters: Vec<Identity>,

    /// Latest phase implied by lifecycle events, `None` if never created
    pub phase: Option<Phase>,
}

impl ReconstructedTally {
    pub fn total_votes(&self) -> VoteCount {
        self.counts.values().sum()
    }
}

/// Replay the feed for one election
pub fn reconstruct_tally(records: &[LedgerRecord], election_id: ElectionId) -> ReconstructedTally {
    let mut tally = ReconstructedTally::default();

    for record in records {
        if record.event.election_id() != Some(election_id) {
            continue;
        }

        match &record.event {
            LedgerEvent::ElectionCreated { .. } => tally.phase = Some(Phase::Setup),
            LedgerEvent::ElectionOpened { .. } => tally.phase = Some(Phase::Active),
            LedgerEvent::ElectionClosed { .. } => tally.phase = Some(Phase::Closed),
            LedgerEvent::ElectionTallied { .. } => tally.phase = Some(Phase::Tallied),
            LedgerEvent::VoteCast {
                candidate_id,
                voter,
                ..
            } => {
                if !tally.voters.insert(*voter) {
                    tally.duplicate_voters.push(*voter);
                    continue;
                }
                *tally.counts.entry(*candidate_id).or_insert(0) += 1;
            }
            LedgerEvent::VoterRegistered { .. } | LedgerEvent::VoterVerified { .. } => {}
        }
    }

    tally
}

/// Mismatch between live state and the replayed feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TallyDiscrepancy {
    CountMismatch {
        candidate_id: CandidateId,
        recorded: VoteCount,
        replayed: VoteCount,
    },
    UnknownCandidate {
        candidate_id: CandidateId,
    },
    VoterMissingFromFeed {
        identity: Identity,
    },
    VoterMissingFromLedger {
        identity: Identity,
    },
    DuplicateVote {
        identity: Identity,
    },
    PhaseMismatch {
        recorded: Phase,
        replayed: Option<Phase>,
    },
}

/// Result of auditing one election against the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyAudit {
    pub election_id: ElectionId,
    pub chain: ChainIntegrityReport,
    pub replayed_total: VoteCount,
    pub recorded_total: VoteCount,
    pub discrepancies: Vec<TallyDiscrepancy>,
}

impl TallyAudit {
    /// Chain intact and live state matches the replay
    pub fn is_consistent(&self) -> bool {
        self.chain.chain_valid && self.discrepancies.is_empty()
    }
}

/// Compare an election's live state with the feed it publishes to
///
/// State and history come from one read of the election, so votes cast
/// while the audit runs never show up as discrepancies.
pub fn audit_election(election: &Election) -> Result<TallyAudit> {
    let (snapshot, records) = election.snapshot_with_history()?;
    let chain = verify_chain(&records)?;
    let replayed = reconstruct_tally(&records, snapshot.id);

    let candidates = snapshot.candidates;
    let voted: BTreeSet<Identity> = snapshot.voted.into_iter().collect();
    let phase = snapshot.phase;

    let mut discrepancies = Vec::new();

    for candidate in &candidates {
        let replayed_count = replayed.counts.get(&candidate.id).copied().unwrap_or(0);
        if replayed_count != candidate.vote_count {
            discrepancies.push(TallyDiscrepancy::CountMismatch {
                candidate_id: candidate.id,
                recorded: candidate.vote_count,
                replayed: replayed_count,
            });
        }
    }

    let candidates_count = candidates.len() as CandidateId;
    for candidate_id in replayed.counts.keys() {
        if *candidate_id < 1 || *candidate_id > candidates_count {
            discrepancies.push(TallyDiscrepancy::UnknownCandidate {
                candidate_id: *candidate_id,
            });
        }
    }

    for identity in voted.difference(&replayed.voters) {
        discrepancies.push(TallyDiscrepancy::VoterMissingFromFeed {
            identity: *identity,
        });
    }
    for identity in replayed.voters.difference(&voted) {
        discrepancies.push(TallyDiscrepancy::VoterMissingFromLedger {
            identity: *identity,
        });
    }
    for identity in &replayed.duplicate_voters {
        discrepancies.push(TallyDiscrepancy::DuplicateVote {
            identity: *identity,
        });
    }

    if replayed.phase != Some(phase) {
        discrepancies.push(TallyDiscrepancy::PhaseMismatch {
            recorded: phase,
            replayed: replayed.phase,
        });
    }

    let recorded_total = candidates.iter().map(|c| c.vote_count).sum();

    Ok(TallyAudit {
        election_id: snapshot.id,
        chain,
        replayed_total: replayed.total_votes(),
        recorded_total,
        discrepancies,
    })
}
