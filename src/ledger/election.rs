//! Election state machine
//!
//! An election owns its candidate registry and the set of identities that
//! have voted. Every command runs under one write guard from first check to
//! last write, so commands never interleave and a failed command leaves the
//! election untouched:
//!
//! 1. Validate caller and phase
//! 2. Append the event to the feed
//! 3. Apply the in-memory writes, none of which can fail at that point
//!
//! Lifecycle: `Setup -> Active -> Closed -> Tallied`, forward only, admin only.

use crate::config::ElectionConfig;
use crate::ledger::audit::{self, TallyAudit};
use crate::ledger::candidates::CandidateRegistry;
use crate::ledger::feed::{EventFeed, LedgerEvent, LedgerRecord};
use crate::ledger::snapshot::ElectionSnapshot;
use crate::ledger::tally::TallyReport;
use crate::ledger::voters::VoterRegistry;
use crate::types::{Candidate, CandidateId, ElectionId, Identity, Phase, VoteCount};
use crate::{Error, Result, integrity_error, ledger_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};
use uuid::Uuid;

struct ElectionState {
    phase: Phase,
    candidates: CandidateRegistry,
    voted: HashSet<Identity>,
}

/// Proof of an accepted vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    pub voter: Identity,

    /// Candidate's count right after this vote
    pub vote_count: VoteCount,

    /// Feed position of the `VoteCast` record
    pub feed_sequence: u64,
}

/// A single-choice election
pub struct Election {
    id: ElectionId,
    admin: Identity,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    state: RwLock<ElectionState>,
    voter_registry: Option<Weak<VoterRegistry>>,
    feed: Arc<EventFeed>,
}

impl Election {
    /// Create an election in the `Setup` phase
    ///
    /// Fails with `InvalidConfiguration` for a blank name or a bad candidate
    /// list. Emits `ElectionCreated`.
    pub fn new(config: ElectionConfig, feed: Arc<EventFeed>) -> Result<Self> {
        config.validate()?;
        let candidates = CandidateRegistry::with_names(&config.candidate_names)?;
        let id = Uuid::new_v4();

        feed.append(LedgerEvent::ElectionCreated {
            election_id: id,
            admin: config.admin,
            name: config.name.clone(),
            candidates_count: candidates.count(),
        })?;

        tracing::info!(
            "🗳️ Election created: id={}, name={}, candidates={}",
            id,
            config.name,
            candidates.count()
        );

        Ok(Self {
            id,
            admin: config.admin,
            name: config.name,
            description: config.description,
            created_at: Utc::now(),
            state: RwLock::new(ElectionState {
                phase: Phase::Setup,
                candidates,
                voted: HashSet::new(),
            }),
            voter_registry: None,
            feed,
        })
    }

    /// Require a verified voter record for every vote
    ///
    /// Only a weak reference is kept; the registry's owner decides its
    /// lifetime. If the registry is dropped, nobody counts as verified.
    pub fn with_voter_registry(mut self, registry: &Arc<VoterRegistry>) -> Self {
        self.voter_registry = Some(Arc::downgrade(registry));
        self
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn admin(&self) -> Identity {
        self.admin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn feed(&self) -> &Arc<EventFeed> {
        &self.feed
    }

    /// `Setup -> Active`
    pub fn open(&self, caller: Identity) -> Result<()> {
        self.transition(caller, Phase::Active)
    }

    /// `Active -> Closed`
    pub fn close(&self, caller: Identity) -> Result<()> {
        self.transition(caller, Phase::Closed)
    }

    /// `Closed -> Tallied`
    ///
    /// Counts are already current; this only marks them final.
    pub fn tally(&self, caller: Identity) -> Result<()> {
        self.transition(caller, Phase::Tallied)
    }

    fn transition(&self, caller: Identity, to: Phase) -> Result<()> {
        if caller != self.admin {
            return Err(Error::Unauthorized { caller });
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| ledger_error!("Election state write error"))?;

        let from = state.phase;
        if from.next() != Some(to) {
            return Err(Error::InvalidTransition { from, to });
        }

        let event = match to {
            Phase::Active => LedgerEvent::ElectionOpened {
                election_id: self.id,
            },
            Phase::Closed => LedgerEvent::ElectionClosed {
                election_id: self.id,
            },
            Phase::Tallied => LedgerEvent::ElectionTallied {
                election_id: self.id,
                total_votes: state.candidates.total_votes(),
            },
            Phase::Setup => return Err(Error::InvalidTransition { from, to }),
        };
        self.feed.append(event)?;

        state.phase = to;

        tracing::info!("🔁 Election phase changed: id={}, {} -> {}", self.id, from, to);

        Ok(())
    }

    /// Cast `caller`'s vote for `candidate_id`
    ///
    /// Checks run in a fixed order so the reported error is deterministic:
    /// `NotActive`, `AlreadyVoted`, `NotRegistered` (only with a registry
    /// attached), `InvalidCandidate`.
    pub fn vote(&self, candidate_id: CandidateId, caller: Identity) -> Result<VoteReceipt> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ledger_error!("Election state write error"))?;

        if !state.phase.accepts_votes() {
            return Err(Error::NotActive { phase: state.phase });
        }

        if state.voted.contains(&caller) {
            return Err(Error::AlreadyVoted { identity: caller });
        }

        if let Some(registry) = &self.voter_registry {
            let verified = registry
                .upgrade()
                .is_some_and(|registry| registry.is_verified(&caller));
            if !verified {
                return Err(Error::NotRegistered { identity: caller });
            }
        }

        // Bounds and overflow are settled before anything is written
        let vote_count = state.candidates.next_count(candidate_id)?;

        let record = self.feed.append(LedgerEvent::VoteCast {
            election_id: self.id,
            candidate_id,
            voter: caller,
        })?;

        state.candidates.increment_vote(candidate_id)?;
        state.voted.insert(caller);

        tracing::info!(
            "🗳️ Vote cast: election={}, candidate={}, voter={}, seq={}",
            self.id,
            candidate_id,
            caller.short(),
            record.sequence
        );

        Ok(VoteReceipt {
            election_id: self.id,
            candidate_id,
            voter: caller,
            vote_count,
            feed_sequence: record.sequence,
        })
    }

    /// Whether `identity` has voted in this election
    pub fn has_voted(&self, identity: &Identity) -> bool {
        self.read_state().voted.contains(identity)
    }

    pub fn phase(&self) -> Phase {
        self.read_state().phase
    }

    pub fn candidates_count(&self) -> u32 {
        self.read_state().candidates.count()
    }

    /// Candidate by id, or `InvalidCandidate`
    pub fn candidate(&self, id: CandidateId) -> Result<Candidate> {
        self.read_state().candidates.get(id).cloned()
    }

    /// Every candidate in id order
    pub fn candidates(&self) -> Vec<Candidate> {
        self.read_state().candidates.all().to_vec()
    }

    pub fn total_votes(&self) -> VoteCount {
        self.read_state().candidates.total_votes()
    }

    /// Number of identities that have voted
    pub fn voter_turnout(&self) -> usize {
        self.read_state().voted.len()
    }

    /// Identities that have voted, sorted
    pub fn voted_identities(&self) -> BTreeSet<Identity> {
        self.read_state().voted.iter().copied().collect()
    }

    /// Whether an attached voter registry is still reachable
    pub fn has_voter_registry(&self) -> bool {
        self.registry().is_some()
    }

    /// Registered voters in the attached registry, 0 without one
    pub fn registered_voter_count(&self) -> u64 {
        self.registry().map_or(0, |registry| registry.count())
    }

    /// Verified voters in the attached registry, 0 without one
    pub fn verified_voter_count(&self) -> u64 {
        self.registry().map_or(0, |registry| registry.verified_count())
    }

    /// Current results with percentages
    pub fn results(&self) -> TallyReport {
        let state = self.read_state();
        TallyReport::from_candidates(state.candidates.all(), state.phase)
    }

    /// Check that vote counts and the voted set agree
    pub fn verify_invariants(&self) -> Result<()> {
        let state = self.read_state();
        let total = state.candidates.total_votes();
        if total != state.voted.len() as VoteCount {
            return Err(integrity_error!(
                "vote total {} does not match {} voters",
                total,
                state.voted.len()
            ));
        }
        Ok(())
    }

    /// Replay the feed and compare it with live state
    pub fn audit(&self) -> Result<TallyAudit> {
        audit::audit_election(self)
    }

    /// Live state and feed history read under one election guard
    ///
    /// Commands append to the feed while holding the write guard, so no vote
    /// can land between the two reads.
    pub(crate) fn snapshot_with_history(&self) -> Result<(ElectionSnapshot, Vec<LedgerRecord>)> {
        let state = self.read_state();
        let records = self.feed.replay()?;
        Ok((self.snapshot_of(&state), records))
    }

    /// Capture state for persistence
    pub fn snapshot(&self) -> ElectionSnapshot {
        self.snapshot_of(&self.read_state())
    }

    fn snapshot_of(&self, state: &ElectionState) -> ElectionSnapshot {
        let mut voted: Vec<Identity> = state.voted.iter().copied().collect();
        voted.sort();

        ElectionSnapshot {
            id: self.id,
            admin: self.admin,
            name: self.name.clone(),
            description: self.description.clone(),
            phase: state.phase,
            candidates: state.candidates.all().to_vec(),
            voted,
            created_at: self.created_at,
        }
    }

    /// Rebuild an election from a snapshot
    ///
    /// Rejects snapshots whose candidate ids are not contiguous, whose voted
    /// set contains duplicates, whose vote total differs from the voted set
    /// size, or that hold votes while still in `Setup`. No events are emitted;
    /// reattach a registry with [`Election::with_voter_registry`].
    pub fn restore(snapshot: ElectionSnapshot, feed: Arc<EventFeed>) -> Result<Self> {
        if snapshot.name.trim().is_empty() {
            return Err(integrity_error!("election {} has an empty name", snapshot.id));
        }

        let candidates = CandidateRegistry::from_candidates(snapshot.candidates)?;

        let mut voted = HashSet::with_capacity(snapshot.voted.len());
        for identity in snapshot.voted {
            if !voted.insert(identity) {
                return Err(integrity_error!("duplicate voter {} in snapshot", identity));
            }
        }

        let total = candidates.total_votes();
        if total != voted.len() as VoteCount {
            return Err(integrity_error!(
                "vote total {} does not match {} voters",
                total,
                voted.len()
            ));
        }

        if snapshot.phase == Phase::Setup && total > 0 {
            return Err(integrity_error!(
                "election {} holds votes before opening",
                snapshot.id
            ));
        }

        tracing::info!(
            "♻️ Election restored: id={}, phase={}, votes={}",
            snapshot.id,
            snapshot.phase,
            total
        );

        Ok(Self {
            id: snapshot.id,
            admin: snapshot.admin,
            name: snapshot.name,
            description: snapshot.description,
            created_at: snapshot.created_at,
            state: RwLock::new(ElectionState {
                phase: snapshot.phase,
                candidates,
                voted,
            }),
            voter_registry: None,
            feed,
        })
    }

    fn registry(&self) -> Option<Arc<VoterRegistry>> {
        self.voter_registry.as_ref().and_then(Weak::upgrade)
    }

    // Commands validate before writing, so a poisoned guard still holds
    // committed state.
    fn read_state(&self) -> RwLockReadGuard<'_, ElectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
