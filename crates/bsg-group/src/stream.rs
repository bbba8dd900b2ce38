use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::Duration;

use bsg_store::{BlobIdStream, BlobStore, StoreResult};
use bsg_types::BlobId;

type OpenStream = Box<dyn Fn(&dyn BlobStore) -> StoreResult<BlobIdStream> + Send>;

/// Concatenation of member id streams in configured order.
///
/// A member's stream is only opened once the previous member's stream is
/// exhausted. The first error, whether opening or draining a member stream,
/// is yielded and ends the iteration.
pub struct GroupIdStream {
    pending: std::vec::IntoIter<Arc<dyn BlobStore>>,
    open: OpenStream,
    current: Option<BlobIdStream>,
    finished: bool,
}

impl GroupIdStream {
    /// Every live id of every member.
    pub fn new(members: Vec<Arc<dyn BlobStore>>) -> Self {
        Self::with_opener(
            members,
            Box::new(|member: &dyn BlobStore| member.blob_id_stream()),
        )
    }

    /// Ids each member reports as created within the last `window`.
    pub fn updated_since(members: Vec<Arc<dyn BlobStore>>, window: Duration) -> Self {
        Self::with_opener(
            members,
            Box::new(move |member: &dyn BlobStore| member.blob_ids_updated_since(window)),
        )
    }

    fn with_opener(members: Vec<Arc<dyn BlobStore>>, open: OpenStream) -> Self {
        Self {
            pending: members.into_iter(),
            open,
            current: None,
            finished: false,
        }
    }

    fn fail(&mut self) {
        self.finished = true;
        self.current = None;
    }
}

impl Iterator for GroupIdStream {
    type Item = StoreResult<BlobId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(id)) => return Some(Ok(id)),
                    Some(Err(e)) => {
                        self.fail();
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            let Some(member) = self.pending.next() else {
                self.finished = true;
                return None;
            };
            match (self.open)(&*member) {
                Ok(stream) => self.current = Some(stream),
                Err(e) => {
                    self.fail();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl FusedIterator for GroupIdStream {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ProbeStore;
    use proptest::prelude::*;

    fn member(name: &str, ids: &[&str]) -> Arc<ProbeStore> {
        let store = Arc::new(ProbeStore::writable(name));
        for id in ids {
            store.seed(id);
        }
        store
    }

    fn dyn_members(members: &[&Arc<ProbeStore>]) -> Vec<Arc<dyn BlobStore>> {
        members
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn BlobStore>)
            .collect()
    }

    fn drain(stream: GroupIdStream) -> Vec<StoreResult<BlobId>> {
        stream.collect()
    }

    #[test]
    fn concatenates_in_member_order() {
        let a = member("a", &["a", "b", "c"]);
        let b = member("b", &["d", "e", "f"]);
        let ids: Vec<String> = GroupIdStream::new(dyn_members(&[&a, &b]))
            .map(|r| r.unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn does_not_deduplicate() {
        let a = member("a", &["x", "y"]);
        let b = member("b", &["x"]);
        let ids: Vec<String> = GroupIdStream::new(dyn_members(&[&a, &b]))
            .map(|r| r.unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["x", "y", "x"]);
    }

    #[test]
    fn opens_member_streams_lazily() {
        let a = member("a", &["a1", "a2"]);
        let b = member("b", &["b1"]);
        let mut stream = GroupIdStream::new(dyn_members(&[&a, &b]));

        assert_eq!(stream.next().unwrap().unwrap(), BlobId::new("a1"));
        assert_eq!(a.calls("blob_id_stream"), 1);
        assert_eq!(b.calls("blob_id_stream"), 0);

        assert_eq!(stream.next().unwrap().unwrap(), BlobId::new("a2"));
        assert_eq!(stream.next().unwrap().unwrap(), BlobId::new("b1"));
        assert_eq!(b.calls("blob_id_stream"), 1);
        assert!(stream.next().is_none());
    }

    #[test]
    fn error_while_draining_terminates_stream() {
        let a = member("a", &["a1", "a2", "a3"]);
        a.fail_stream_after(1);
        let b = member("b", &["b1"]);

        let results = drain(GroupIdStream::new(dyn_members(&[&a, &b])));
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(b.calls("blob_id_stream"), 0);
    }

    #[test]
    fn error_opening_member_stream_terminates() {
        let a = member("a", &["a1"]);
        let b = member("b", &["b1"]);
        b.fail_stream_after(0);
        let c = member("c", &["c1"]);

        let results = drain(GroupIdStream::new(dyn_members(&[&a, &b, &c])));
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
        assert_eq!(c.calls("blob_id_stream"), 0);
    }

    #[test]
    fn updated_since_asks_each_member_for_its_window() {
        let a = member("a", &["a1"]);
        let b = member("b", &["b1", "b2"]);

        let stream = GroupIdStream::updated_since(dyn_members(&[&a, &b]), Duration::from_secs(60));
        let ids: Vec<String> = stream.map(|r| r.unwrap().to_string()).collect();
        assert_eq!(ids, vec!["a1", "b1", "b2"]);
        assert_eq!(a.calls("blob_ids_updated_since"), 1);
        assert_eq!(a.calls("blob_id_stream"), 0);
    }

    #[test]
    fn empty_membership_yields_nothing() {
        assert!(GroupIdStream::new(Vec::new()).next().is_none());
    }

    proptest! {
        #[test]
        fn concatenation_preserves_every_id_in_order(
            members in proptest::collection::vec(
                proptest::collection::btree_set("[a-z]{1,6}", 0..8),
                0..5,
            )
        ) {
            let stores: Vec<Arc<dyn BlobStore>> = members
                .iter()
                .enumerate()
                .map(|(i, ids)| {
                    let store = ProbeStore::writable(&format!("m{i}"));
                    for id in ids {
                        store.seed(id);
                    }
                    Arc::new(store) as Arc<dyn BlobStore>
                })
                .collect();
            let expected: Vec<String> = members.iter().flatten().cloned().collect();

            let actual: Vec<String> = GroupIdStream::new(stores)
                .map(|r| r.unwrap().to_string())
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
