//! Write placement strategies.
//!
//! A [`FillPolicy`] picks the member that receives each newly created blob.
//! Policies are registered by name in [`FillPolicies`] and resolved once when
//! a group is configured; an unknown name falls back to
//! [`WriteToFirstMemberFillPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bsg_store::BlobStore;
use bsg_types::Headers;

use crate::group::GroupStore;

/// Chooses the member of a group that receives a new blob.
pub trait FillPolicy: Send + Sync {
    /// Registered name of this policy.
    fn name(&self) -> &str;

    /// Pick a member able to accept the write, or `None` if there is none.
    ///
    /// Called once per create. `hints` are the headers of the blob being
    /// created.
    fn choose_member(&self, group: &GroupStore, hints: &Headers) -> Option<Arc<dyn BlobStore>>;
}

fn accepts_writes(member: &Arc<dyn BlobStore>) -> bool {
    member.is_writable() && member.is_storage_available()
}

/// Writes every blob to the first writable member in configured order.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteToFirstMemberFillPolicy;

impl WriteToFirstMemberFillPolicy {
    pub const TYPE: &'static str = "writeToFirst";
}

impl FillPolicy for WriteToFirstMemberFillPolicy {
    fn name(&self) -> &str {
        Self::TYPE
    }

    fn choose_member(&self, group: &GroupStore, _hints: &Headers) -> Option<Arc<dyn BlobStore>> {
        group.members().into_iter().find(accepts_writes)
    }
}

/// Spreads blobs over the writable members in turn.
#[derive(Debug, Default)]
pub struct RoundRobinFillPolicy {
    next: AtomicUsize,
}

impl RoundRobinFillPolicy {
    pub const TYPE: &'static str = "roundRobin";

    pub fn new() -> Self {
        Self::default()
    }
}

impl FillPolicy for RoundRobinFillPolicy {
    fn name(&self) -> &str {
        Self::TYPE
    }

    fn choose_member(&self, group: &GroupStore, _hints: &Headers) -> Option<Arc<dyn BlobStore>> {
        let mut writable: Vec<Arc<dyn BlobStore>> = group
            .members()
            .into_iter()
            .filter(accepts_writes)
            .collect();
        if writable.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % writable.len();
        Some(writable.swap_remove(index))
    }
}

/// Produces a policy instance for a group.
pub type FillPolicyFactory = Arc<dyn Fn() -> Arc<dyn FillPolicy> + Send + Sync>;

/// Named table of fill policy factories.
#[derive(Clone, Default)]
pub struct FillPolicies {
    factories: HashMap<String, FillPolicyFactory>,
}

impl FillPolicies {
    /// An empty table. Unknown names still resolve to the built-in default.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table with every built-in policy registered.
    pub fn builtin() -> Self {
        let mut policies = Self::new();
        policies.register(WriteToFirstMemberFillPolicy::TYPE, || {
            Arc::new(WriteToFirstMemberFillPolicy)
        });
        policies.register(RoundRobinFillPolicy::TYPE, || {
            Arc::new(RoundRobinFillPolicy::new())
        });
        policies
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn FillPolicy> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the policy registered under `name`.
    pub fn create(&self, name: &str) -> Option<Arc<dyn FillPolicy>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// The fallback policy: the registered `writeToFirst` factory if any,
    /// otherwise the built-in instance.
    pub fn fallback(&self) -> Arc<dyn FillPolicy> {
        self.create(WriteToFirstMemberFillPolicy::TYPE)
            .unwrap_or_else(|| Arc::new(WriteToFirstMemberFillPolicy))
    }
}

impl fmt::Debug for FillPolicies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FillPolicies").field("names", &names).finish()
    }
}
