//! Blob store backend contract for blob store groups.
//!
//! This crate defines what a physical blob store looks like to a group:
//! the [`BlobStore`] trait, the [`Blob`] value it returns, and the
//! [`MemberRegistry`] that resolves configured member names to live stores.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Absence is a result, not an error.
//! 2. Soft-deleted blobs still exist; reads opt into them explicitly.
//! 3. Writability is live state owned by the store.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod blob;
pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::{Blob, BlobIdStream, BlobStoreMetrics};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use registry::{InMemoryRegistry, MemberRegistry};
pub use traits::BlobStore;
