//! Error types for the engine's configuration surface.
//!
//! These errors cover everything that can be rejected before a single
//! remote command is issued. Remote command failures are not represented
//! here; they are opaque to the engine and surface through the executor.

use thiserror::Error;

/// Errors produced while interpreting job configuration.
#[derive(Debug, Error)]
pub enum SyncCoreError {
    /// Connection URL does not match `scheme://[user[:password]@]host[:port]/database`.
    #[error("malformed connection url: '{url}'")]
    MalformedUrl { url: String },

    /// The cursor fetch loop needs at least one row per batch to make progress.
    #[error("batch size must be positive, got {0}")]
    InvalidBatchSize(u32),

    /// Staged-swap jobs must declare the identifier the swap machinery needs.
    #[error("job '{table}' uses the staged-swap strategy but does not declare a {missing}")]
    MissingSwapIdentifier {
        table: String,
        missing: &'static str,
    },
}

/// Result type for configuration-surface operations.
pub type Result<T> = std::result::Result<T, SyncCoreError>;
