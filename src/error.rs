//! Error types for the towkay bot core.

/// Top-level error type for the bot engine.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Preference store request failed (transport or non-success status).
    #[error("store error: {0}")]
    Store(String),

    /// Scraper invocation failed at the transport level.
    #[error("invoke error: {0}")]
    Invoke(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;
