//! In-memory test doubles for the object store and secret store, used by
//! this crate's own unit tests and exposed to downstream drivers under the
//! `test-support` feature for their own integration tests.

pub mod memory_objectstore;
pub mod memory_secretstore;

pub use memory_objectstore::{MemoryContainer, MemoryObjectStore, MemoryObjectStoreFactory};
pub use memory_secretstore::{MemorySecretStore, MemorySecretStoreFactory};
