//! Election factory
//!
//! Owns the ledger-wide voter registry and event feed and creates elections
//! bound to both. Elections are addressed by their creation index.

use crate::config::{ElectionConfig, LedgerConfig};
use crate::ledger::election::Election;
use crate::ledger::feed::EventFeed;
use crate::ledger::voters::VoterRegistry;
use crate::types::Identity;
use crate::{Error, Result, ledger_error};
use std::sync::{Arc, PoisonError, RwLock};

/// Creates and indexes elections sharing one voter registry
pub struct ElectionFactory {
    voter_registry: Arc<VoterRegistry>,
    feed: Arc<EventFeed>,
    elections: RwLock<Vec<Arc<Election>>>,
}

impl ElectionFactory {
    /// Create a factory whose registry is administered by `admin`
    pub fn new(admin: Identity, feed: Arc<EventFeed>) -> Self {
        tracing::info!("🏭 Election factory initialized: registry admin={}", admin.short());

        Self {
            voter_registry: Arc::new(VoterRegistry::new(admin, feed.clone())),
            feed,
            elections: RwLock::new(Vec::new()),
        }
    }

    /// Create a factory and its feed from ledger configuration
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.admin, Arc::new(EventFeed::from_config(config)))
    }

    /// Create for testing
    pub fn for_testing(admin: Identity) -> Self {
        Self::new(admin, Arc::new(EventFeed::for_testing()))
    }

    /// Create an election bound to the shared registry and return its index
    ///
    /// The election's own admin comes from `config`, independent of the
    /// registry admin.
    pub fn create_election(&self, config: ElectionConfig) -> Result<usize> {
        let mut elections = self
            .elections
            .write()
            .map_err(|_| ledger_error!("Election list write error"))?;

        let election =
            Election::new(config, self.feed.clone())?.with_voter_registry(&self.voter_registry);
        let index = elections.len();

        tracing::info!(
            "🏭 Election registered: index={}, id={}",
            index,
            election.id()
        );

        elections.push(Arc::new(election));
        Ok(index)
    }

    /// Election at `index`, or `UnknownElection`
    pub fn get_election(&self, index: usize) -> Result<Arc<Election>> {
        let elections = self.elections.read().unwrap_or_else(PoisonError::into_inner);
        elections
            .get(index)
            .cloned()
            .ok_or(Error::UnknownElection {
                index,
                count: elections.len(),
            })
    }

    pub fn elections_count(&self) -> usize {
        self.elections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every election in creation order
    pub fn elections(&self) -> Vec<Arc<Election>> {
        self.elections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn voter_registry(&self) -> &Arc<VoterRegistry> {
        &self.voter_registry
    }

    pub fn feed(&self) -> &Arc<EventFeed> {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;

    #[test]
    fn test_create_and_lookup() {
        let registry_admin = Identity::random();
        let factory = ElectionFactory::for_testing(registry_admin);
        assert_eq!(factory.elections_count(), 0);

        let election_admin = Identity::random();
        let first = factory
            .create_election(ElectionConfig::new(election_admin, "First", "", ["A"]))
            .unwrap();
        let second = factory
            .create_election(ElectionConfig::new(election_admin, "Second", "", ["A", "B"]))
            .unwrap();

        assert_eq!((first, second), (0, 1));
        assert_eq!(factory.elections_count(), 2);

        let election = factory.get_election(1).unwrap();
        assert_eq!(election.name(), "Second");
        assert_eq!(election.admin(), election_admin);
        assert_eq!(election.phase(), Phase::Setup);
        assert!(election.has_voter_registry());
    }

    #[test]
    fn test_unknown_index() {
        let factory = ElectionFactory::for_testing(Identity::random());
        factory
            .create_election(ElectionConfig::new(Identity::random(), "Only", "", ["A"]))
            .unwrap();

        assert!(matches!(
            factory.get_election(1),
            Err(Error::UnknownElection { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_rejected_config_not_registered() {
        let factory = ElectionFactory::for_testing(Identity::random());
        let empty: Vec<String> = Vec::new();

        assert!(
            factory
                .create_election(ElectionConfig::new(Identity::random(), "Empty", "", empty))
                .is_err()
        );
        assert_eq!(factory.elections_count(), 0);
    }

    #[test]
    fn test_shared_registry_gates_every_election() {
        let registry_admin = Identity::random();
        let factory = ElectionFactory::for_testing(registry_admin);
        let election_admin = Identity::random();

        let elections: Vec<_> = ["North", "South"]
            .into_iter()
            .map(|name| {
                let index = factory
                    .create_election(ElectionConfig::new(election_admin, name, "", ["A", "B"]))
                    .unwrap();
                let election = factory.get_election(index).unwrap();
                election.open(election_admin).unwrap();
                election
            })
            .collect();

        let voter = Identity::random();
        factory
            .voter_registry()
            .register_voter(voter, "Voter", [7u8; 32])
            .unwrap();
        factory
            .voter_registry()
            .verify_voter(registry_admin, voter)
            .unwrap();

        // One verification covers both elections; each still allows one vote
        for election in &elections {
            election.vote(1, voter).unwrap();
            assert!(matches!(election.vote(2, voter), Err(Error::AlreadyVoted { .. })));
            assert_eq!(election.verified_voter_count(), 1);
        }
    }
}
