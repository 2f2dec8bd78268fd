//! Blob session.

pub mod blob_session;
pub mod lockinfo;

pub use blob_session::BlobSession;
pub use lockinfo::LockInfo;
