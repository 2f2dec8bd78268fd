//! tfstate-core: the storage and secret-masking core of a remote state
//! backend for an infrastructure-as-code tool.
//!
//! This crate stores declarative infrastructure state in cloud object
//! storage, coordinates concurrent writers via lease-based mutual
//! exclusion, and redacts sensitive resource attributes into a
//! secret-management service before persistence, reinjecting them on reads.
//! The planning/apply driver, schema provider registry, and CLI shell are
//! external collaborators; this crate only implements the persistence and
//! masking layer they sit on top of.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tfstate_core::masking::schema::StaticSchemaOracle;
//! use tfstate_core::testing::{MemoryObjectStoreFactory, MemorySecretStoreFactory};
//! use tfstate_core::WorkspaceRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = WorkspaceRegistry::new(
//!         Arc::new(MemoryObjectStoreFactory::new("tfstate")),
//!         Arc::new(MemorySecretStoreFactory::new()),
//!         Arc::new(StaticSchemaOracle::new()),
//!         "1.7.0",
//!     );
//!     let manager = registry.get_state_manager("default").await.unwrap();
//!     manager.refresh_state().await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod masking;
pub mod objectstore;
pub mod registry;
pub mod runner;
pub mod secretstore;
pub mod session;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{Args, BackendConfig, ConfigError};
pub use error::{CoreError, CoreResult};
pub use manager::StateManager;
pub use registry::{WorkspaceRegistry, DEFAULT_WORKSPACE};
pub use runner::{OperationKind, OperationRunner, RunningOperation, WorkerContext};
pub use state::{ResourceState, StateDocument};
