//! Masking engine: the schema-driven transform between
//! in-memory state and on-wire state.

pub mod engine;
pub mod schema;
pub mod secret_id;

pub use engine::MaskingEngine;
pub use schema::{AttributeSchema, Block, SchemaOracle, StaticSchemaOracle};
