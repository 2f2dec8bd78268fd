//! Object-store client wrapper: typed access to a single named
//! blob bound at construction time.

pub mod client;
pub mod error;
pub mod lease;

pub use client::{AzureObjectStoreClient, ObjectStoreClient, ObjectStoreClientFactory};
pub use error::ObjectStoreError;
pub use lease::{DeleteOptions, LeaseDuration, ReadOptions, WriteOptions};
