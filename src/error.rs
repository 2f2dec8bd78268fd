//! Core error taxonomy for the state backend.

use thiserror::Error;

use crate::session::lockinfo::LockInfo;

/// Errors surfaced by the state backend core to its driver.
///
/// The core never retries; every variant here is returned verbatim to the
/// caller, which decides whether to retry, prompt the user, or abort.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Transient object-store or secret-store failure (timeouts, throttling,
    /// connection resets). Safe to retry at the driver's discretion.
    #[error("backend temporarily unavailable: {0}")]
    BackendUnavailable(String),

    /// Permanent object-store or secret-store failure (auth failure, missing
    /// container, malformed request). Not safe to retry without a config
    /// change.
    #[error("backend error: {0}")]
    BackendFatal(String),

    /// The blob's lease is already held by another session.
    #[error("state blob is locked by {}", existing.who)]
    LockConflict { existing: LockInfo },

    /// `unlock` was called with an id that does not match the currently
    /// held lease. Bundles the LockInfo actually found in blob metadata.
    #[error("lock id mismatch: expected {expected}, got {actual}")]
    LockMismatch {
        existing: LockInfo,
        expected: String,
        actual: String,
    },

    /// Lock metadata on the blob could not be parsed, or was expected but
    /// absent.
    #[error("lock metadata is corrupt or missing: {0}")]
    LockMetadataCorrupt(String),

    /// The blob payload could not be decoded into a state document.
    #[error("state document is corrupt: {0}")]
    StateCorrupt(String),

    /// `write_state` observed a lineage different from the last-read
    /// lineage. Non-fatal by design; kept as a distinct
    /// variant so callers that want to surface it as a warning can match on
    /// it, but the state manager itself only logs and proceeds.
    #[error("lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    /// A SecretReference in a persisted blob has no corresponding secret in
    /// the secret store.
    #[error("secret missing for address {address}")]
    SecretMissing { address: String },

    /// The encoded secret address exceeds the secret store's name length
    /// limit; the leaf was left in cleartext.
    #[error("secret name too long for address {address}")]
    SecretNameTooLong { address: String },

    /// A `secret_store.set` call failed while masking.
    #[error("failed to write secret {address}: {source}")]
    SecretSetFailed {
        address: String,
        #[source]
        source: Box<CoreError>,
    },

    /// `persist_state` was called with no in-memory state.
    #[error("persist_state called with no in-memory state")]
    EmptyState,

    /// Reserved: the current design does not require a sensitivity-report
    /// channel (schema-only detection), but the variant is kept so future
    /// drivers attempting to use one get a clear error rather than a panic.
    #[error("sensitivity report channel is not supported")]
    NoSensitivityReport,

    /// The operation was cancelled (hard cancel, no state flush attempted).
    #[error("operation cancelled")]
    Cancelled,

    /// A masking feature that is explicitly out of scope (map-typed
    /// sensitive attributes).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The workspace registry rejected an operation (deleting the default
    /// workspace) or a `delete_workspace` call failed partway through,
    /// leaving as much cleaned up as possible.
    #[error("workspace registry error: {0}")]
    WorkspaceError(String),
}

impl CoreError {
    /// True for failures a driver may reasonably retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::BackendUnavailable(_))
    }

    /// True for failures that will not resolve without driver intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::BackendFatal(_) | CoreError::StateCorrupt(_) | CoreError::EmptyState
        )
    }
}

/// Result type alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;
