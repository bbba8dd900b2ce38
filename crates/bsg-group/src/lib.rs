//! Blob store group: one logical blob store over an ordered set of members.
//!
//! A [`GroupStore`] implements [`bsg_store::BlobStore`] by routing each call
//! to its members:
//!
//! - **create** -- to the member chosen by the configured [`FillPolicy`]
//! - **read** -- to the first member that confirms it holds the blob,
//!   writable members first, with hits on writable members remembered in a
//!   shared location cache
//! - **delete** -- to every member that holds the blob; undelete asks every member
//! - **enumerate** -- member id streams concatenated in configured order
//!
//! A group is never writable itself, so groups nest without an outer group
//! placing new blobs into an inner one.
//!
//! # Lifecycle
//!
//! `configure` accepts a [`GroupConfiguration`], `start` resolves member
//! names through a [`bsg_store::MemberRegistry`] and obtains the cache,
//! `stop` releases them. Data-path calls outside `Started` fail with
//! [`bsg_store::StoreError::NotStarted`].

pub mod config;
pub mod error;
pub mod fill_policy;
pub mod group;
pub mod lifecycle;
mod locate;
pub mod membership;
pub mod stream;

#[cfg(test)]
mod testing;

pub use config::{BlobStoreConfiguration, GroupConfiguration, GroupSettings};
pub use error::{GroupError, GroupResult};
pub use fill_policy::{
    FillPolicies, FillPolicy, FillPolicyFactory, RoundRobinFillPolicy,
    WriteToFirstMemberFillPolicy,
};
pub use group::GroupStore;
pub use lifecycle::GroupState;
pub use membership::Membership;
pub use stream::GroupIdStream;
