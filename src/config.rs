//! Configuration for the election ledger
//!
//! Ledger-wide settings load from environment variables with validation.
//! Per-election settings are an explicit [`ElectionConfig`] passed at
//! construction; nothing is read from ambient global state.

use crate::ledger::feed::DEFAULT_FEED_CAPACITY;
use crate::types::Identity;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ledger-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Admin of the shared voter registry
    pub admin: Identity,

    /// Buffer size of the live event broadcast channel
    pub feed_capacity: usize,

    /// Source label attached to the event feed
    pub audit_source: String,
}

impl LedgerConfig {
    /// Load ledger configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let admin = std::env::var("LEDGER_ADMIN")
            .map_err(|_| Error::config("LEDGER_ADMIN environment variable required"))?;
        let admin = Identity::parse(&admin)
            .map_err(|e| Error::config(format!("Invalid LEDGER_ADMIN: {e}")))?;

        let feed_capacity: usize = std::env::var("LEDGER_FEED_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_FEED_CAPACITY.to_string())
            .parse()
            .map_err(|_| Error::config("Invalid LEDGER_FEED_CAPACITY"))?;

        if feed_capacity == 0 {
            return Err(Error::config("LEDGER_FEED_CAPACITY must be greater than zero"));
        }

        let audit_source =
            std::env::var("LEDGER_AUDIT_SOURCE").unwrap_or_else(|_| "vote_ledger".to_string());

        Ok(Self {
            admin,
            feed_capacity,
            audit_source,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            admin: Identity::random(),
            feed_capacity: 256,
            audit_source: "vote_ledger_test".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let ledger = LedgerConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        };

        Ok(Self { ledger, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        Self {
            ledger: LedgerConfig::for_testing(),
            logging,
        }
    }
}

/// Setup parameters of a single election
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Identity allowed to open, close and tally the election
    pub admin: Identity,
    pub name: String,
    pub description: String,

    /// Candidate names in ballot order; ids are assigned 1..=N from this order
    pub candidate_names: Vec<String>,
}

impl ElectionConfig {
    pub fn new<I, S>(
        admin: Identity,
        name: impl Into<String>,
        description: impl Into<String>,
        candidate_names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin,
            name: name.into(),
            description: description.into(),
            candidate_names: candidate_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the fields that do not depend on the candidate registry
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_configuration("election name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_config() {
        let config = Config::for_testing();
        assert!(config.ledger.feed_capacity > 0);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_election_config_validation() {
        let admin = Identity::random();
        let config = ElectionConfig::new(admin, "Board", "Annual", ["A", "B"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.candidate_names, vec!["A".to_string(), "B".to_string()]);

        let unnamed = ElectionConfig::new(admin, "  ", "", ["A"]);
        assert!(matches!(
            unnamed.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_election_config_serde() {
        let config = ElectionConfig::new(Identity::random(), "Board", "", vec!["A".to_string()]);
        let json = serde_json::to_string(&config).unwrap();
        let back: ElectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
