//! Store error type.

use thiserror::Error;

/// Errors surfaced by the domain stores.
///
/// Storage (disk) failures never appear here: persistence is
/// best-effort and logged at the write site, so in-memory state stays
/// authoritative even when the on-disk mirror lags.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller supplied invalid input (e.g. whitespace-only message text).
    #[error("validation: {0}")]
    Validation(String),

    /// The referenced session / record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
