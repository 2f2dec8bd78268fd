//! LockInfo: the caller-visible record of a held lease, stored in blob
//! metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Describes the current holder of a blob's lease.
///
/// `id` is always replaced with the server-issued lease id once a lease is
/// actually acquired (see [`crate::session::blob_session::BlobSession::lock`]);
/// callers only supply it as a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    pub path: String,
    pub operation: String,
    pub who: String,
    pub version: String,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl LockInfo {
    /// Builds a new LockInfo ready to be passed to `lock`. `id` is a
    /// caller-proposed identifier; it will be overwritten by the lease id
    /// the object store actually grants.
    pub fn new(operation: impl Into<String>, who: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path: String::new(),
            operation: operation.into(),
            who: who.into(),
            version: version.into(),
            created: Utc::now(),
            info: None,
        }
    }

    /// Returns a copy with `id` and `path` overwritten, as `lock` does once
    /// the lease is granted.
    pub fn with_lease(&self, lease_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: lease_id.into(),
            path: path.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_lease_replaces_id_and_path_only() {
        let info = LockInfo::new("Apply", "alice@host", "1.7.0");
        let granted = info.with_lease("lease-abc", "container/dev.tfstate");
        assert_eq!(granted.id, "lease-abc");
        assert_eq!(granted.path, "container/dev.tfstate");
        assert_eq!(granted.who, info.who);
        assert_eq!(granted.operation, info.operation);
    }
}
