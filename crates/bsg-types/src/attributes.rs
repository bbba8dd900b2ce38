use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Caller-supplied blob headers.
///
/// Headers are stored alongside the blob and double as the create hints a
/// fill policy may inspect when choosing a member.
pub type Headers = BTreeMap<String, String>;

/// Well-known header names.
pub mod headers {
    /// Logical name of the blob (usually the asset path).
    pub const BLOB_NAME: &str = "BlobStore.blob-name";
    /// Principal that created the blob.
    pub const CREATED_BY: &str = "BlobStore.created-by";
    /// Declared content type.
    pub const CONTENT_TYPE: &str = "BlobStore.content-type";
    /// Declared content size in bytes, when known up front.
    pub const EXPECTED_SIZE: &str = "BlobStore.expected-size";
}

/// Size, hash and creation time of a stored blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetrics {
    pub creation_time: DateTime<Utc>,
    pub hash: ContentHash,
    pub content_size: u64,
}

impl BlobMetrics {
    pub fn new(hash: ContentHash, content_size: u64) -> Self {
        Self {
            creation_time: Utc::now(),
            hash,
            content_size,
        }
    }
}

/// Everything a backend records about a blob besides its bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobAttributes {
    pub headers: Headers,
    pub metrics: BlobMetrics,
    /// Soft-delete marker. Soft-deleted blobs are only visible to reads that
    /// ask for deleted content.
    pub deleted: bool,
    pub deleted_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BlobAttributes {
    pub fn new(headers: Headers, metrics: BlobMetrics) -> Self {
        Self {
            headers,
            metrics,
            deleted: false,
            deleted_reason: None,
            deleted_at: None,
        }
    }

    /// Mark as soft-deleted with a reason.
    pub fn mark_deleted(&mut self, reason: &str) {
        self.deleted = true;
        self.deleted_reason = Some(reason.to_string());
        self.deleted_at = Some(Utc::now());
    }

    /// Clear the soft-delete marker.
    pub fn undelete(&mut self) {
        self.deleted = false;
        self.deleted_reason = None;
        self.deleted_at = None;
    }
}
