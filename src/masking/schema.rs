//! Resource-schema oracle consumed by the masking engine.
//!
//! The schema provider registry itself is out of scope; the core
//! only depends on this narrow read-only interface.

use std::collections::HashMap;

/// A resource's (or nested block's) schema: which attributes are
/// sensitive, and which keys are themselves nested blocks to descend into.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: HashMap<String, AttributeSchema>,
    pub block_types: HashMap<String, Block>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeSchema {
    pub sensitive: bool,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, sensitive: bool) -> Self {
        self.attributes.insert(name.into(), AttributeSchema { sensitive });
        self
    }

    pub fn with_block_type(mut self, name: impl Into<String>, block: Block) -> Self {
        self.block_types.insert(name.into(), block);
        self
    }

    /// True if `key` names a sensitive scalar/collection attribute.
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.attributes.get(key).map(|a| a.sensitive).unwrap_or(false)
    }

    /// Schema for a nested block type named `key`, if any.
    pub fn nested_block(&self, key: &str) -> Option<&Block> {
        self.block_types.get(key)
    }

    /// True if `key` is declared at all (attribute or nested block),
    /// distinguishing "unknown key, leave untouched" from "known, not
    /// sensitive".
    pub fn declares(&self, key: &str) -> bool {
        self.attributes.contains_key(key) || self.block_types.contains_key(key)
    }
}

/// Supplies the schema for a resource type. Implemented by the (external)
/// provider registry in a real driver; the core only ever reads through
/// this trait.
pub trait SchemaOracle: Send + Sync {
    fn schema_for(&self, resource_type: &str) -> Option<Block>;
}

/// A schema oracle backed by a static map, useful for tests and for
/// drivers that pre-resolve schemas before invoking the core.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaOracle {
    schemas: HashMap<String, Block>,
}

impl StaticSchemaOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, resource_type: impl Into<String>, block: Block) -> Self {
        self.schemas.insert(resource_type.into(), block);
        self
    }
}

impl SchemaOracle for StaticSchemaOracle {
    fn schema_for(&self, resource_type: &str) -> Option<Block> {
        self.schemas.get(resource_type).cloned()
    }
}
