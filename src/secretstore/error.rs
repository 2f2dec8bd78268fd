//! Failure modes of the secret-store client wrapper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("secret store error: {0}")]
    Fatal(String),

    /// The name exceeds the store's length limit (≤ 127 chars) or uses
    /// disallowed characters.
    #[error("secret name invalid: {0}")]
    InvalidName(String),
}
