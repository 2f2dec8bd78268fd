//! Secret-store client wrapper.

pub mod client;
pub mod error;

pub use client::{AzureSecretStoreClient, SecretListEntry, SecretStoreClient, SecretStoreClientFactory};
pub use error::SecretStoreError;
