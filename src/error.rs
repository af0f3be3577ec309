//! Error types for media-dl
//!
//! This module provides the error hierarchy for the library:
//! - Caller-misuse guards on the queue ([`QueueError`])
//! - Machine-matchable engine failures ([`EngineError`])
//! - History store failures ([`DatabaseError`])
//! - Configuration problems, including the non-fatal load fallback
//!
//! Every variant exposes a stable, machine-readable code via
//! [`Error::error_code`] so UI layers can branch without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "network.proxy_url")
        key: Option<String>,
    },

    /// Persisted configuration was missing or corrupt.
    ///
    /// Never returned by [`crate::Config::load_or_init`]; it is logged and the
    /// built-in defaults are written and used instead.
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad {
        /// The configuration file that could not be loaded
        path: PathBuf,
        /// Why loading failed (missing file, malformed JSON, ...)
        reason: String,
    },

    /// Queue operation rejected because of the queue's current state
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The retrieval engine reported a failure
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// History database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Source URL could not be parsed
    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl {
        /// The URL as supplied by the caller
        url: String,
        /// The parse failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool could not be located or started (yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Caller-misuse guards on the queue. Reported without changing any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue has nothing to clear or nothing left to run
    #[error("queue is empty")]
    EmptyQueue,

    /// A run is already in progress
    #[error("a queue run is already in progress")]
    AlreadyRunning,
}

/// Failure reported by a retrieval engine for a single invocation.
///
/// The variants are the machine-matchable failure classes the executor's
/// retry policy branches on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Browser cookies could not be decrypted (e.g. DPAPI on Windows)
    #[error("cookie decryption failed: {message}")]
    AuthDecryption {
        /// The engine's own description of the failure
        message: String,
    },

    /// The engine reported a transfer or extraction failure
    #[error("{message}")]
    NetworkExtraction {
        /// The engine's own description of the failure
        message: String,
    },

    /// Anything else: the engine could not be started, crashed, panicked,
    /// or finished without producing metadata
    #[error("unexpected engine failure: {message}")]
    Unexpected {
        /// Diagnostic detail (exit status, stderr tail, panic payload)
        message: String,
    },
}

impl EngineError {
    /// Whether this failure belongs to the cookie-decryption class
    pub fn is_auth_decryption(&self) -> bool {
        matches!(self, EngineError::AuthDecryption { .. })
    }

    /// Machine-readable failure class
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::AuthDecryption { .. } => "auth_decryption_failure",
            EngineError::NetworkExtraction { .. } => "network_extraction_error",
            EngineError::Unexpected { .. } => "unexpected_engine_error",
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::ConfigLoad { .. } => "config_load_error",
            Error::Queue(QueueError::EmptyQueue) => "empty_queue",
            Error::Queue(QueueError::AlreadyRunning) => "already_running",
            Error::Engine(e) => e.error_code(),
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Other(_) => "internal_error",
        }
    }
}
