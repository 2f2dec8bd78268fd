//! Failure modes of the object-store client wrapper.

use thiserror::Error;

/// Errors returned by [`super::client::ObjectStoreClient`].
///
/// Every method can fail with [`ObjectStoreError::Unavailable`] or
/// [`ObjectStoreError::Fatal`]. `acquire_lease` additionally distinguishes
/// [`ObjectStoreError::Conflict`] (already leased) and
/// [`ObjectStoreError::NotFound`]; `get` also surfaces `NotFound` so that
/// [`crate::session::blob_session::BlobSession::get`] can translate a
/// missing blob into `Ok(None)` rather than an error.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("object store error: {0}")]
    Fatal(String),

    /// The blob does not exist.
    #[error("blob not found")]
    NotFound,

    /// The lease is already held by another session. Carries the raw
    /// `lockinfo` metadata value, if it could be read.
    #[error("lease already held")]
    Conflict { existing_lockinfo: Option<String> },
}

impl ObjectStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ObjectStoreError::Unavailable(_))
    }
}
