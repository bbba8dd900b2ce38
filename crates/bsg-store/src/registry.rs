//! Name → store resolution.
//!
//! A group refers to its members by configured name. The [`MemberRegistry`]
//! turns those names into live store handles when the group starts.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::traits::BlobStore;

/// Resolves configured store names to live store instances.
pub trait MemberRegistry: Send + Sync {
    /// Look up a store by name. Returns `None` if no such store is known.
    fn resolve(&self, name: &str) -> Option<Arc<dyn BlobStore>>;
}

/// Registry backed by a `HashMap` behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryRegistry {
    stores: RwLock<HashMap<String, Arc<dyn BlobStore>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under its own name, replacing any previous entry.
    pub fn register(&self, store: Arc<dyn BlobStore>) {
        let name = store.name().to_string();
        self.stores
            .write()
            .expect("lock poisoned")
            .insert(name, store);
    }

    /// Remove a store by name.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn BlobStore>> {
        self.stores.write().expect("lock poisoned").remove(name)
    }

    /// Sorted names of all registered stores.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stores
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl MemberRegistry for InMemoryRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn BlobStore>> {
        self.stores.read().expect("lock poisoned").get(name).cloned()
    }
}

impl fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("stores", &self.names())
            .finish()
    }
}
