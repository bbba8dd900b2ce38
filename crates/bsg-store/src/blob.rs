use std::io::Read;

use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};

use bsg_types::{BlobId, BlobMetrics, Headers};

use crate::error::StoreResult;

/// Lazy, forward-only sequence of blob ids.
///
/// Iteration yields `Err` when the backend fails while listing; consumers
/// should stop at the first error.
pub type BlobIdStream = Box<dyn Iterator<Item = StoreResult<BlobId>> + Send>;

/// A blob as returned by a backend: id, headers, metrics and content.
///
/// Content is held as reference-counted [`Bytes`], so cloning a `Blob` does
/// not copy the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub id: BlobId,
    pub headers: Headers,
    pub metrics: BlobMetrics,
    content: Bytes,
}

impl Blob {
    pub fn new(id: BlobId, headers: Headers, metrics: BlobMetrics, content: Bytes) -> Self {
        Self {
            id,
            headers,
            metrics,
            content,
        }
    }

    /// The full content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// A reader over the content.
    pub fn reader(&self) -> impl Read {
        self.content.clone().reader()
    }

    /// Content size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Storage statistics reported by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobStoreMetrics {
    pub blob_count: u64,
    pub total_size: u64,
    /// Free space in bytes. Meaningless when `unlimited` is set.
    pub available_space: u64,
    pub unlimited: bool,
}

impl BlobStoreMetrics {
    /// Sum two sets of metrics.
    ///
    /// The result is unlimited when either side is.
    pub fn combine(self, other: Self) -> Self {
        Self {
            blob_count: self.blob_count + other.blob_count,
            total_size: self.total_size + other.total_size,
            available_space: self.available_space.saturating_add(other.available_space),
            unlimited: self.unlimited || other.unlimited,
        }
    }
}
