//! Tamper-evident election ledger
//!
//! Single-choice elections with a forward-only lifecycle, a shared voter
//! registry with admin verification, and a hash-chained event feed that lets
//! anyone replay and audit every accepted state change.

pub mod config;
pub mod digest;
pub mod errors;
pub mod ledger;
pub mod types;

// Re-export commonly used types
pub use errors::{Error, Result};
pub use ledger::{Election, ElectionFactory, EventFeed, VoterRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `RUST_LOG`, defaulting to `vote_ledger=info`
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vote_ledger=info".into()),
        )
        .try_init()
        .map_err(|e| Error::config(format!("Logging already initialized: {e}")))?;

    tracing::info!("🗳️  Vote ledger v{} initialized", VERSION);
    Ok(())
}

/// Initialize logging from explicit configuration
///
/// `format` is `json` or `pretty`; anything else falls back to the default
/// text format.
pub fn init_with(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .map_err(|e| Error::config(format!("Invalid LOG_LEVEL: {e}")))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.try_init(),
    };
    result.map_err(|e| Error::config(format!("Logging already initialized: {e}")))?;

    tracing::info!(
        "🗳️  Vote ledger v{} initialized (format={})",
        VERSION,
        logging.format
    );
    Ok(())
}
