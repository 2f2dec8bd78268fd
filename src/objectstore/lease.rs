//! Lease-related option types passed to [`super::client::ObjectStoreClient`]
//! methods.

/// Duration requested when acquiring a lease. The core always requests an
/// infinite lease; the variant exists so the wrapper's
/// surface matches the underlying object store's API, which supports
/// bounded leases too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseDuration {
    Infinite,
    Seconds(u32),
}

impl Default for LeaseDuration {
    fn default() -> Self {
        LeaseDuration::Infinite
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub lease_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub lease_id: Option<String>,
    pub content_type: Option<String>,
    pub metadata: Option<std::collections::HashMap<String, String>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub lease_id: Option<String>,
    pub delete_snapshots: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    pub lease_id: Option<String>,
}
