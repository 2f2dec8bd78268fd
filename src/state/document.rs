//! The state document and its nested entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// On-disk state format version understood by this core. A single version
/// is assumed.
pub const STATE_FORMAT_VERSION: &str = "1";

/// The full state document persisted in a workspace's blob.
///
/// `outputs` and `resources` use `BTreeMap`/`Vec` respectively so that
/// encoding is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: String,
    pub terraform_version: String,
    pub serial: u64,
    pub lineage: Uuid,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceState>,
}

impl StateDocument {
    /// An empty document with a freshly generated lineage and serial 0, as
    /// written at blob genesis.
    pub fn genesis(terraform_version: impl Into<String>) -> Self {
        Self {
            version: STATE_FORMAT_VERSION.to_string(),
            terraform_version: terraform_version.into(),
            serial: 0,
            lineage: Uuid::new_v4(),
            outputs: BTreeMap::new(),
            resources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputState {
    pub value: Value,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub module: String,
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub each_mode: Option<EachMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<String>,
    pub instances: Vec<InstanceObjectState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EachMode {
    List,
    Map,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceObjectState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposed: Option<String>,
    pub schema_version: u64,
    /// The masked projection after persistence; cleartext while only held
    /// in memory between `write_state` and `persist_state`.
    pub attributes_raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Structural placeholder replacing a sensitive leaf.
///
/// Only the `"string"` kind is produced by this implementation: sequence-
/// typed sensitive attributes are masked element-wise, so every reference
/// actually written to a document is scalar. The `"[]interface{}"`/
/// `"map[...]"` kinds are recognized structurally by the unmasker (see
/// `masking::engine`) but never emitted by `mask`, since nothing in this
/// design collapses a whole container into one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretReference {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub id: String,
    pub version: String,
}

impl SecretReference {
    pub const KIND_STRING: &'static str = "string";

    pub fn new_string(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ref_type: Self::KIND_STRING.to_string(),
            id: id.into(),
            version: version.into(),
        }
    }
}
