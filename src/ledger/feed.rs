//! Append-only, hash-chained event feed
//!
//! Every accepted state change in the ledger appends exactly one
//! [`LedgerRecord`]. Records form a Blake3 hash chain: each record carries the
//! hash of its predecessor, so any edit to history is detectable with
//! [`crate::ledger::audit::verify_chain`].
//!
//! Consumers read the feed in two ways:
//! - pull: [`EventFeed::replay`], [`EventFeed::since`] or a [`FeedCursor`]
//! - push: [`EventFeed::subscribe`], a broadcast channel that only delivers
//!   records appended after subscription. A lagging receiver can catch up
//!   with [`EventFeed::since`].

use crate::config::LedgerConfig;
use crate::digest::Digest;
use crate::ledger::audit::{self, ChainIntegrityReport};
use crate::types::{CandidateId, ElectionId, Hash, Identity, LogicalTimestamp, VoteCount};
use crate::{Result, ledger_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Default broadcast capacity for live subscribers
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Ledger state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    VoterRegistered {
        identity: Identity,
        registered_at: LogicalTimestamp,
    },
    VoterVerified {
        identity: Identity,
        verified_by: Identity,
    },
    ElectionCreated {
        election_id: ElectionId,
        admin: Identity,
        name: String,
        candidates_count: u32,
    },
    ElectionOpened {
        election_id: ElectionId,
    },
    ElectionClosed {
        election_id: ElectionId,
    },
    ElectionTallied {
        election_id: ElectionId,
        total_votes: VoteCount,
    },
    VoteCast {
        election_id: ElectionId,
        candidate_id: CandidateId,
        voter: Identity,
    },
}

impl LedgerEvent {
    /// Election this event belongs to, if any
    pub fn election_id(&self) -> Option<ElectionId> {
        match self {
            LedgerEvent::ElectionCreated { election_id, .. }
            | LedgerEvent::ElectionOpened { election_id }
            | LedgerEvent::ElectionClosed { election_id }
            | LedgerEvent::ElectionTallied { election_id, .. }
            | LedgerEvent::VoteCast { election_id, .. } => Some(*election_id),
            LedgerEvent::VoterRegistered { .. } | LedgerEvent::VoterVerified { .. } => None,
        }
    }

    /// Short event name for logs and filters
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::VoterRegistered { .. } => "VoterRegistered",
            LedgerEvent::VoterVerified { .. } => "VoterVerified",
            LedgerEvent::ElectionCreated { .. } => "ElectionCreated",
            LedgerEvent::ElectionOpened { .. } => "ElectionOpened",
            LedgerEvent::ElectionClosed { .. } => "ElectionClosed",
            LedgerEvent::ElectionTallied { .. } => "ElectionTallied",
            LedgerEvent::VoteCast { .. } => "VoteCast",
        }
    }
}

/// Tamper-evident feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Position in the feed (monotonically increasing, starting at 1)
    pub sequence: u64,

    /// Hash of the previous record (forms hash chain)
    pub previous_hash: Option<Hash>,

    /// Hash over sequence, previous hash and event
    pub content_hash: Hash,

    pub event: LedgerEvent,

    /// Wall-clock time of the append, informational only
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    fn new(sequence: u64, previous_hash: Option<Hash>, event: LedgerEvent) -> Result<Self> {
        let content_hash = Self::content_digest(sequence, &previous_hash, &event)?;

        Ok(Self {
            sequence,
            previous_hash,
            content_hash,
            event,
            recorded_at: Utc::now(),
        })
    }

    fn content_digest(
        sequence: u64,
        previous_hash: &Option<Hash>,
        event: &LedgerEvent,
    ) -> Result<Hash> {
        Digest::hash_json(&(sequence, previous_hash, event))
    }

    /// Hash of the whole record, linked from the next record
    pub fn record_hash(&self) -> Result<Hash> {
        Digest::hash_json(self)
    }

    /// Recompute the content hash and compare in constant time
    pub fn verify_content(&self) -> Result<bool> {
        let expected = Self::content_digest(self.sequence, &self.previous_hash, &self.event)?;
        Ok(Digest::constant_time_eq(&self.content_hash, &expected))
    }
}

struct FeedState {
    records: Vec<LedgerRecord>,
    last_hash: Option<Hash>,
}

/// Shared event feed for a ledger
pub struct EventFeed {
    state: RwLock<FeedState>,
    sender: broadcast::Sender<LedgerRecord>,
    source: String,
}

impl EventFeed {
    /// Create a feed whose live subscribers buffer up to `capacity` records
    pub fn new(source: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            state: RwLock::new(FeedState {
                records: Vec::new(),
                last_hash: None,
            }),
            sender,
            source: source.into(),
        }
    }

    /// Create a feed from ledger configuration
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.audit_source.clone(), config.feed_capacity)
    }

    /// Create feed for testing
    pub fn for_testing() -> Self {
        Self::new("vote_ledger_test", DEFAULT_FEED_CAPACITY)
    }

    /// Source label for records of this feed
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Append an event and notify live subscribers
    pub(crate) fn append(&self, event: LedgerEvent) -> Result<LedgerRecord> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ledger_error!("Event feed write error"))?;

        let sequence = state.records.len() as u64 + 1;
        let record = LedgerRecord::new(sequence, state.last_hash, event)?;
        let record_hash = record.record_hash()?;

        state.records.push(record.clone());
        state.last_hash = Some(record_hash);

        // No receivers is not an error; history stays replayable
        let _ = self.sender.send(record.clone());

        tracing::debug!(
            "📡 Feed record appended: source={}, seq={}, kind={}, hash={}",
            self.source,
            sequence,
            record.event.kind(),
            &Digest::hash_to_hex(&record_hash)[..16]
        );

        Ok(record)
    }

    /// Every record from the start of the feed
    pub fn replay(&self) -> Result<Vec<LedgerRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| ledger_error!("Event feed read error"))?;
        Ok(state.records.clone())
    }

    /// Records with `sequence > position`
    pub fn since(&self, position: u64) -> Result<Vec<LedgerRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| ledger_error!("Event feed read error"))?;

        let start = usize::try_from(position)
            .unwrap_or(usize::MAX)
            .min(state.records.len());
        Ok(state.records[start..].to_vec())
    }

    /// Sequence number of the newest record, 0 when empty
    pub fn latest_position(&self) -> Result<u64> {
        let state = self
            .state
            .read()
            .map_err(|_| ledger_error!("Event feed read error"))?;
        Ok(state.records.len() as u64)
    }

    /// Receive records appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerRecord> {
        self.sender.subscribe()
    }

    /// Pull cursor positioned after `from`
    pub fn cursor(&self, from: u64) -> FeedCursor {
        FeedCursor { position: from }
    }

    /// Pull cursor positioned at the current end of the feed
    pub fn cursor_at_latest(&self) -> Result<FeedCursor> {
        Ok(FeedCursor {
            position: self.latest_position()?,
        })
    }

    /// Verify the hash chain of the whole feed
    pub fn verify(&self) -> Result<ChainIntegrityReport> {
        let state = self
            .state
            .read()
            .map_err(|_| ledger_error!("Event feed read error"))?;
        audit::verify_chain(&state.records)
    }
}

/// Pull-based reader that remembers how far it has read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    position: u64,
}

impl FeedCursor {
    /// Last sequence number this cursor has consumed
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Fetch every record after the cursor and advance past them
    pub fn poll(&mut self, feed: &EventFeed) -> Result<Vec<LedgerRecord>> {
        let records = feed.since(self.position)?;
        if let Some(last) = records.last() {
            self.position = last.sequence;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn opened() -> LedgerEvent {
        LedgerEvent::ElectionOpened {
            election_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_append_links_records() {
        let feed = EventFeed::for_testing();

        let first = feed.append(opened()).unwrap();
        let second = feed.append(opened()).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(first.previous_hash, None);
        assert_eq!(second.previous_hash, Some(first.record_hash().unwrap()));
        assert!(first.verify_content().unwrap());
        assert_eq!(feed.latest_position().unwrap(), 2);
    }

    #[test]
    fn test_since_and_cursor() {
        let feed = EventFeed::for_testing();
        for _ in 0..3 {
            feed.append(opened()).unwrap();
        }

        assert_eq!(feed.since(0).unwrap().len(), 3);
        assert_eq!(feed.since(2).unwrap()[0].sequence, 3);
        assert!(feed.since(3).unwrap().is_empty());
        assert!(feed.since(u64::MAX).unwrap().is_empty());

        let mut cursor = feed.cursor(1);
        assert_eq!(cursor.poll(&feed).unwrap().len(), 2);
        assert_eq!(cursor.position(), 3);
        assert!(cursor.poll(&feed).unwrap().is_empty());

        feed.append(opened()).unwrap();
        let fresh = cursor.poll(&feed).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].sequence, 4);
    }

    #[tokio::test]
    async fn test_subscribers_only_see_new_records() {
        let feed = EventFeed::for_testing();
        feed.append(opened()).unwrap();

        let mut receiver = feed.subscribe();
        let record = feed.append(opened()).unwrap();

        let delivered = receiver.recv().await.unwrap();
        assert_eq!(delivered, record);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_event_metadata() {
        let election_id = Uuid::new_v4();
        let event = LedgerEvent::VoteCast {
            election_id,
            candidate_id: 1,
            voter: Identity::random(),
        };
        assert_eq!(event.election_id(), Some(election_id));
        assert_eq!(event.kind(), "VoteCast");

        let event = LedgerEvent::VoterRegistered {
            identity: Identity::random(),
            registered_at: 1,
        };
        assert_eq!(event.election_id(), None);
    }
}
