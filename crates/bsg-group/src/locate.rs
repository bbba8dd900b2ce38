//! Finding the member(s) that hold a blob.

use std::sync::Arc;

use tracing::trace;

use bsg_store::{BlobStore, StoreResult};
use bsg_types::BlobId;

use crate::group::Runtime;

impl Runtime {
    /// Find the first member that confirms it holds `id`.
    ///
    /// A cached location is probed first but only trusted once the member
    /// itself confirms. Otherwise members are probed writable-first; a hit
    /// on a writable member is recorded in the cache.
    pub(crate) fn locate(&self, id: &BlobId) -> StoreResult<Option<Arc<dyn BlobStore>>> {
        let cached = self.cache.lookup(id);
        if let Some(name) = cached.as_deref() {
            if let Some(member) = self.membership.by_name(name) {
                if member.exists(id)? {
                    trace!(blob = %id, member = name, "location was cached");
                    return Ok(Some(Arc::clone(member)));
                }
            }
            trace!(blob = %id, member = name, "cached location not confirmed");
        }

        trace!(blob = %id, members = ?self.membership, "searching for blob");
        for member in self.membership.search_order() {
            if cached.as_deref() == Some(member.name()) {
                continue;
            }
            if member.exists(id)? {
                if member.is_writable() {
                    trace!(blob = %id, member = member.name(), "caching location");
                    self.cache.record(id.clone(), member.name().to_string());
                }
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// Every member that confirms it holds `id`, in configured order.
    ///
    /// Probes all members and ignores the cache.
    pub(crate) fn locate_all(&self, id: &BlobId) -> StoreResult<Vec<Arc<dyn BlobStore>>> {
        let mut owners = Vec::new();
        for member in self.membership.members() {
            if member.exists(id)? {
                owners.push(Arc::clone(member));
            }
        }
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use bsg_cache::LocationCache;
    use bsg_store::StoreError;
    use bsg_types::BlobId;

    use crate::fill_policy::FillPolicies;
    use crate::testing::{Fixture, TestMember};

    fn writable_and_archive() -> Fixture {
        Fixture::new(
            &[
                TestMember::writable("writableMember"),
                TestMember::read_only("nonWritableMember"),
            ],
            FillPolicies::builtin(),
        )
        .start(None)
    }

    #[test]
    fn searches_writable_members_first_and_caches_hit() {
        let f = writable_and_archive();
        let id = BlobId::new("BLOB_ID_VALUE");
        f.member("writableMember").seed("BLOB_ID_VALUE");
        f.member("nonWritableMember").seed("BLOB_ID_VALUE");

        let located = f.group.locate(&id).unwrap().unwrap();

        assert_eq!(located.name(), "writableMember");
        assert_eq!(f.member("writableMember").calls("exists"), 1);
        assert_eq!(f.member("nonWritableMember").calls("exists"), 0);
        assert_eq!(f.cache().lookup(&id).as_deref(), Some("writableMember"));
    }

    #[test]
    fn writable_members_are_probed_before_earlier_read_only_ones() {
        let f = Fixture::new(
            &[
                TestMember::read_only("archive"),
                TestMember::writable("hot"),
            ],
            FillPolicies::builtin(),
        )
        .start(None);
        f.member("hot").seed("x");
        f.member("archive").seed("x");

        let located = f.group.locate(&BlobId::new("x")).unwrap().unwrap();
        assert_eq!(located.name(), "hot");
        assert_eq!(f.member("archive").calls("exists"), 0);
    }

    #[test]
    fn only_caches_hits_on_writable_members() {
        let f = writable_and_archive();
        let id = BlobId::new("BLOB_ID_VALUE");
        f.member("nonWritableMember").seed("BLOB_ID_VALUE");

        let located = f.group.locate(&id).unwrap().unwrap();

        assert_eq!(located.name(), "nonWritableMember");
        assert_eq!(f.member("writableMember").calls("exists"), 1);
        assert_eq!(f.member("nonWritableMember").calls("exists"), 1);
        assert!(f.cache().is_empty());
    }

    #[test]
    fn cached_location_skips_search() {
        let f = Fixture::new(
            &[TestMember::writable("one"), TestMember::writable("two")],
            FillPolicies::builtin(),
        )
        .start(None);
        f.member("two").seed("in_two");
        let id = BlobId::new("in_two");

        f.group.locate(&id).unwrap().unwrap();
        f.reset_calls();

        let located = f.group.locate(&id).unwrap().unwrap();
        assert_eq!(located.name(), "two");
        assert_eq!(f.member("one").calls("exists"), 0);
        assert_eq!(f.member("two").calls("exists"), 1);
    }

    #[test]
    fn stale_cache_entry_is_not_trusted() {
        let f = Fixture::new(
            &[TestMember::writable("one"), TestMember::writable("two")],
            FillPolicies::builtin(),
        )
        .start(None);
        let id = BlobId::new("moved");
        f.member("two").seed("moved");
        f.cache().record(id.clone(), "one".into());

        let located = f.group.locate(&id).unwrap().unwrap();

        assert_eq!(located.name(), "two");
        // One failed probe of the stale candidate, not repeated by the scan.
        assert_eq!(f.member("one").calls("exists"), 1);
        assert_eq!(f.cache().lookup(&id).as_deref(), Some("two"));
    }

    #[test]
    fn cache_entry_naming_unknown_member_is_ignored() {
        let f = writable_and_archive();
        let id = BlobId::new("x");
        f.member("writableMember").seed("x");
        f.cache().record(id.clone(), "removedMember".into());

        let located = f.group.locate(&id).unwrap().unwrap();
        assert_eq!(located.name(), "writableMember");
    }

    #[test]
    fn stale_entry_for_missing_blob_reports_not_found() {
        let f = writable_and_archive();
        let id = BlobId::new("gone");
        f.cache().record(id.clone(), "writableMember".into());

        assert!(f.group.locate(&id).unwrap().is_none());
    }

    #[test]
    fn writability_is_sampled_per_search() {
        let f = writable_and_archive();
        let id = BlobId::new("x");
        f.member("writableMember").seed("x");
        f.member("writableMember").set_writable(false);

        let located = f.group.locate(&id).unwrap().unwrap();
        assert_eq!(located.name(), "writableMember");
        assert!(f.cache().is_empty());
    }

    #[test]
    fn member_exists_errors_propagate() {
        let f = writable_and_archive();
        f.member("writableMember").error_on_exists();

        let Err(err) = f.group.locate(&BlobId::new("x")) else {
            panic!("locate should fail when a member existence check fails");
        };
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
