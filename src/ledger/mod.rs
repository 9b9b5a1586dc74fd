//! Election ledger
//!
//! Lock order across components is election, then voter registry, then
//! event feed. No component calls back up that chain.

pub mod audit;
pub mod candidates;
pub mod election;
pub mod factory;
pub mod feed;
pub mod snapshot;
pub mod tally;
pub mod voters;

pub use audit::{ChainIntegrityReport, TallyAudit, TallyDiscrepancy};
pub use candidates::CandidateRegistry;
pub use election::{Election, VoteReceipt};
pub use factory::ElectionFactory;
pub use feed::{EventFeed, FeedCursor, LedgerEvent, LedgerRecord};
pub use snapshot::{ElectionSnapshot, VoterRegistrySnapshot};
pub use tally::{TallyReport, VoteResult};
pub use voters::VoterRegistry;
