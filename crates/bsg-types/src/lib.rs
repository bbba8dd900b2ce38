//! Foundation types for blob store groups (BSG).
//!
//! This crate provides the identifier and metadata types shared by every
//! blob store backend and by the group router. Every other BSG crate depends
//! on `bsg-types`.
//!
//! # Key Types
//!
//! - [`BlobId`] -- Opaque, immutable blob identifier (cache key for location lookups)
//! - [`ContentHash`] -- BLAKE3 digest of blob content
//! - [`Headers`] -- Caller-supplied blob headers, also used as create hints
//! - [`BlobMetrics`] -- Size, hash and creation time of a stored blob
//! - [`BlobAttributes`] -- Headers + metrics + soft-delete state

pub mod attributes;
pub mod error;
pub mod hash;
pub mod id;

pub use attributes::{headers, BlobAttributes, BlobMetrics, Headers};
pub use error::TypeError;
pub use hash::ContentHash;
pub use id::BlobId;
