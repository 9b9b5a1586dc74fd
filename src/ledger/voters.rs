//! Voter registry with a two-step trust workflow
//!
//! Registration is self-service and produces an unverified record; only the
//! registry admin can verify it. Elections read the registry through
//! [`VoterRegistry::is_verified`] and never mutate it.

use crate::ledger::feed::{EventFeed, LedgerEvent};
use crate::ledger::snapshot::VoterRegistrySnapshot;
use crate::types::{Identity, LogicalTimestamp, ProofDigest, VoterRecord};
use crate::{Error, Result, integrity_error, ledger_error};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
struct RegistryState {
    records: HashMap<Identity, VoterRecord>,
    registered_count: u64,
    verified_count: u64,
    last_registration: LogicalTimestamp,
}

/// Shared registry of voter records
pub struct VoterRegistry {
    admin: Identity,
    state: RwLock<RegistryState>,
    feed: Arc<EventFeed>,
}

impl VoterRegistry {
    /// Create an empty registry administered by `admin`
    pub fn new(admin: Identity, feed: Arc<EventFeed>) -> Self {
        Self {
            admin,
            state: RwLock::new(RegistryState::default()),
            feed,
        }
    }

    /// Create for testing with a fresh feed
    pub fn for_testing(admin: Identity) -> Self {
        Self::new(admin, Arc::new(EventFeed::for_testing()))
    }

    pub fn admin(&self) -> Identity {
        self.admin
    }

    /// Register `identity` as an unverified voter
    pub fn register_voter(
        &self,
        identity: Identity,
        display_name: &str,
        proof_digest: ProofDigest,
    ) -> Result<VoterRecord> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ledger_error!("Voter registry write error"))?;

        if state.records.contains_key(&identity) {
            return Err(Error::AlreadyRegistered { identity });
        }

        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(Error::validation("display_name must not be empty"));
        }

        let registered_at = state.last_registration + 1;
        let record = VoterRecord {
            identity,
            display_name: display_name.to_string(),
            proof_digest,
            verified: false,
            registered_at,
        };

        self.feed.append(LedgerEvent::VoterRegistered {
            identity,
            registered_at,
        })?;

        state.records.insert(identity, record.clone());
        state.registered_count += 1;
        state.last_registration = registered_at;

        tracing::info!(
            "📝 Voter registered: voter={}, seq={}",
            identity.short(),
            registered_at
        );

        Ok(record)
    }

    /// Mark a registered voter as verified (admin only)
    pub fn verify_voter(&self, caller: Identity, identity: Identity) -> Result<()> {
        if caller != self.admin {
            return Err(Error::Unauthorized { caller });
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| ledger_error!("Voter registry write error"))?;

        let record = state
            .records
            .get_mut(&identity)
            .ok_or(Error::UnknownVoter { identity })?;

        if record.verified {
            return Err(Error::AlreadyVerified { identity });
        }

        self.feed.append(LedgerEvent::VoterVerified {
            identity,
            verified_by: caller,
        })?;

        record.verified = true;
        state.verified_count += 1;

        tracing::info!("✅ Voter verified: voter={}", identity.short());

        Ok(())
    }

    /// Whether `identity` has a verified record; unknown identities are unverified
    pub fn is_verified(&self, identity: &Identity) -> bool {
        self.read_state()
            .records
            .get(identity)
            .is_some_and(|record| record.verified)
    }

    /// Registration record of `identity`
    pub fn voter(&self, identity: &Identity) -> Option<VoterRecord> {
        self.read_state().records.get(identity).cloned()
    }

    /// Number of registered voters
    pub fn count(&self) -> u64 {
        self.read_state().registered_count
    }

    /// Number of verified voters
    pub fn verified_count(&self) -> u64 {
        self.read_state().verified_count
    }

    /// Capture every record for persistence, ordered by registration
    pub fn snapshot(&self) -> VoterRegistrySnapshot {
        let state = self.read_state();
        let mut voters: Vec<VoterRecord> = state.records.values().cloned().collect();
        voters.sort_by_key(|record| record.registered_at);

        VoterRegistrySnapshot {
            admin: self.admin,
            voters,
        }
    }

    /// Rebuild a registry from a snapshot
    ///
    /// Identities and registration sequence numbers must be unique; counters
    /// are recomputed from the records. No events are emitted.
    pub fn restore(snapshot: VoterRegistrySnapshot, feed: Arc<EventFeed>) -> Result<Self> {
        let mut state = RegistryState::default();

        for record in snapshot.voters {
            if record.registered_at <= state.last_registration {
                return Err(integrity_error!(
                    "registration sequence not increasing at {}",
                    record.identity
                ));
            }
            if record.display_name.trim().is_empty() {
                return Err(integrity_error!(
                    "empty display name for {}",
                    record.identity
                ));
            }

            state.last_registration = record.registered_at;
            state.registered_count += 1;
            if record.verified {
                state.verified_count += 1;
            }

            let identity = record.identity;
            if state.records.insert(identity, record).is_some() {
                return Err(integrity_error!("duplicate voter record for {}", identity));
            }
        }

        tracing::info!(
            "♻️ Voter registry restored: voters={}, verified={}",
            state.registered_count,
            state.verified_count
        );

        Ok(Self {
            admin: snapshot.admin,
            state: RwLock::new(state),
            feed,
        })
    }

    // Mutations validate before writing, so a poisoned guard still holds
    // committed state.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;

    fn registry() -> (VoterRegistry, Identity) {
        let admin = Identity::random();
        (VoterRegistry::for_testing(admin), admin)
    }

    #[test]
    fn test_register_creates_unverified_record() {
        let (registry, _) = registry();
        let voter = Identity::parse("0xAA").unwrap();

        let record = registry
            .register_voter(voter, " Alice ", Digest::proof(b"passport"))
            .unwrap();

        assert_eq!(record.display_name, "Alice");
        assert!(!record.verified);
        assert_eq!(record.registered_at, 1);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.verified_count(), 0);
        assert!(!registry.is_verified(&voter));
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let (registry, _) = registry();
        let voter = Identity::random();
        registry
            .register_voter(voter, "Alice", Digest::proof(b"one"))
            .unwrap();

        let result = registry.register_voter(voter, "Mallory", Digest::proof(b"two"));
        assert!(matches!(result, Err(Error::AlreadyRegistered { identity }) if identity == voter));

        let record = registry.voter(&voter).unwrap();
        assert_eq!(record.display_name, "Alice");
        assert_eq!(record.proof_digest, Digest::proof(b"one"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_duplicate_reported_before_blank_name() {
        let (registry, _) = registry();
        let voter = Identity::random();
        registry.register_voter(voter, "Alice", [1u8; 32]).unwrap();

        let result = registry.register_voter(voter, "", [2u8; 32]);
        assert!(matches!(result, Err(Error::AlreadyRegistered { identity }) if identity == voter));
        assert_eq!(registry.voter(&voter).unwrap().display_name, "Alice");
    }

    #[test]
    fn test_blank_name_rejected() {
        let (registry, _) = registry();
        let result = registry.register_voter(Identity::random(), "   ", [0u8; 32]);
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_verification_workflow() {
        let (registry, admin) = registry();
        let voter = Identity::random();

        assert!(matches!(
            registry.verify_voter(admin, voter),
            Err(Error::UnknownVoter { .. })
        ));

        registry.register_voter(voter, "Bob", [1u8; 32]).unwrap();

        let outsider = Identity::random();
        assert!(matches!(
            registry.verify_voter(outsider, voter),
            Err(Error::Unauthorized { caller }) if caller == outsider
        ));
        assert!(!registry.is_verified(&voter));

        registry.verify_voter(admin, voter).unwrap();
        assert!(registry.is_verified(&voter));
        assert_eq!(registry.verified_count(), 1);

        assert!(matches!(
            registry.verify_voter(admin, voter),
            Err(Error::AlreadyVerified { .. })
        ));
        assert_eq!(registry.verified_count(), 1);
    }

    #[test]
    fn test_unknown_identity_is_unverified() {
        let (registry, _) = registry();
        assert!(!registry.is_verified(&Identity::random()));
        assert!(registry.voter(&Identity::random()).is_none());
    }

    #[test]
    fn test_events_emitted() {
        let admin = Identity::random();
        let feed = Arc::new(EventFeed::for_testing());
        let registry = VoterRegistry::new(admin, feed.clone());
        let voter = Identity::random();

        registry.register_voter(voter, "Carol", [2u8; 32]).unwrap();
        registry.verify_voter(admin, voter).unwrap();

        let kinds: Vec<_> = feed
            .replay()
            .unwrap()
            .iter()
            .map(|r| r.event.kind())
            .collect();
        assert_eq!(kinds, vec!["VoterRegistered", "VoterVerified"]);
    }

    #[test]
    fn test_snapshot_restore() {
        let (registry, admin) = registry();
        let first = Identity::random();
        let second = Identity::random();
        registry.register_voter(first, "First", [1u8; 32]).unwrap();
        registry.register_voter(second, "Second", [2u8; 32]).unwrap();
        registry.verify_voter(admin, second).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.voters[0].identity, first);

        let restored =
            VoterRegistry::restore(snapshot, Arc::new(EventFeed::for_testing())).unwrap();
        assert_eq!(restored.admin(), admin);
        assert_eq!(restored.count(), 2);
        assert_eq!(restored.verified_count(), 1);
        assert!(restored.is_verified(&second));

        let third = Identity::random();
        let record = restored.register_voter(third, "Third", [3u8; 32]).unwrap();
        assert_eq!(record.registered_at, 3);
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let (registry, _) = registry();
        let voter = Identity::random();
        registry.register_voter(voter, "Dup", [1u8; 32]).unwrap();

        let mut snapshot = registry.snapshot();
        let mut copy = snapshot.voters[0].clone();
        copy.registered_at = 2;
        snapshot.voters.push(copy);

        assert!(matches!(
            VoterRegistry::restore(snapshot, Arc::new(EventFeed::for_testing())),
            Err(Error::Integrity { .. })
        ));
    }
}
