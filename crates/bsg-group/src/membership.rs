use std::fmt;
use std::sync::Arc;

use bsg_store::BlobStore;

/// Ordered, resolved member stores of a started group.
///
/// Built once by `start()` and never mutated afterwards.
#[derive(Clone, Default)]
pub struct Membership {
    members: Vec<Arc<dyn BlobStore>>,
}

impl Membership {
    pub fn new(members: Vec<Arc<dyn BlobStore>>) -> Self {
        Self { members }
    }

    /// Members in configured order.
    pub fn members(&self) -> &[Arc<dyn BlobStore>] {
        &self.members
    }

    /// First member with the given name.
    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn BlobStore>> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Members to probe when looking for a blob: writable members in
    /// configured order, then non-writable members in configured order.
    ///
    /// Writability is sampled now, once per member.
    pub fn search_order(&self) -> Vec<Arc<dyn BlobStore>> {
        let (mut writable, read_only): (Vec<_>, Vec<_>) =
            self.members.iter().cloned().partition(|m| m.is_writable());
        writable.extend(read_only);
        writable
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
