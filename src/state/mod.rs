//! State document and codec.

pub mod codec;
pub mod document;

pub use document::{
    EachMode, InstanceObjectState, OutputState, ResourceMode, ResourceState, SecretReference,
    StateDocument, STATE_FORMAT_VERSION,
};
