//! The group store: one logical blob store over an ordered set of members.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use bsg_cache::{CacheFactory, LocationCache};
use bsg_store::{
    Blob, BlobIdStream, BlobStore, BlobStoreMetrics, MemberRegistry, StoreError, StoreResult,
};
use bsg_types::{BlobAttributes, BlobId, ContentHash, Headers};

use crate::config::{BlobStoreConfiguration, GroupConfiguration, GroupSettings};
use crate::error::{GroupError, GroupResult};
use crate::fill_policy::{FillPolicies, FillPolicy, WriteToFirstMemberFillPolicy};
use crate::lifecycle::GroupState;
use crate::membership::Membership;
use crate::stream::GroupIdStream;

/// Everything a started group needs on the data path. Replaced as a whole
/// on start and stop.
pub(crate) struct Runtime {
    pub(crate) membership: Membership,
    pub(crate) cache: Arc<dyn LocationCache>,
    pub(crate) fill_policy: Arc<dyn FillPolicy>,
}

struct Inner {
    state: GroupState,
    config: Option<GroupConfiguration>,
    fill_policy: Option<Arc<dyn FillPolicy>>,
    runtime: Option<Arc<Runtime>>,
}

/// A blob store that routes every operation to its member stores.
///
/// Creates go to the member chosen by the fill policy. Reads go to the first
/// member that confirms it holds the blob, searching writable members first
/// and remembering hits on writable members in a shared location cache.
/// Deletes go to every member that holds the blob.
///
/// The group itself is never writable, so it can be nested inside another
/// group without receiving that group's writes.
pub struct GroupStore {
    name: String,
    registry: Arc<dyn MemberRegistry>,
    fill_policies: FillPolicies,
    cache_factory: Arc<dyn CacheFactory>,
    settings: GroupSettings,
    inner: RwLock<Inner>,
}

impl GroupStore {
    /// Create an unconfigured group.
    pub fn new(
        name: impl Into<String>,
        registry: Arc<dyn MemberRegistry>,
        fill_policies: FillPolicies,
        cache_factory: Arc<dyn CacheFactory>,
        settings: GroupSettings,
    ) -> Self {
        Self {
            name: name.into(),
            registry,
            fill_policies,
            cache_factory,
            settings,
            inner: RwLock::new(Inner {
                state: GroupState::New,
                config: None,
                fill_policy: None,
                runtime: None,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Accept a membership and fill policy.
    ///
    /// An unknown fill policy name falls back to the default policy. Not
    /// allowed while started.
    pub fn configure(&self, config: GroupConfiguration) -> GroupResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if !inner.state.can_configure() {
            return Err(self.invalid_state("configure", inner.state));
        }
        config.validate()?;
        if config.members.iter().any(|m| *m == self.name) {
            return Err(GroupError::InvalidConfiguration(format!(
                "group '{}' cannot be a member of itself",
                self.name
            )));
        }

        let fill_policy = self.resolve_fill_policy(config.fill_policy.as_deref());
        info!(
            group = %self.name,
            members = ?config.members,
            fill_policy = fill_policy.name(),
            "group configured"
        );
        inner.config = Some(config);
        inner.fill_policy = Some(fill_policy);
        inner.state = GroupState::Configured;
        Ok(())
    }

    /// Configure from the `group` section of a generic store configuration.
    pub fn configure_from(&self, config: &BlobStoreConfiguration) -> GroupResult<()> {
        self.configure(GroupConfiguration::from_store_configuration(config)?)
    }

    /// Resolve every member by name and obtain the location cache.
    ///
    /// A member that cannot be resolved fails the start and leaves the group
    /// `Failed` until it is configured again.
    pub fn start(&self) -> GroupResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if !inner.state.can_start() {
            return Err(self.invalid_state("start", inner.state));
        }
        let (Some(config), Some(fill_policy)) = (inner.config.clone(), inner.fill_policy.clone())
        else {
            return Err(self.invalid_state("start", inner.state));
        };

        match self.build_runtime(&config, fill_policy) {
            Ok(runtime) => {
                info!(
                    group = %self.name,
                    members = ?runtime.membership,
                    cache = %self.settings.cache_name,
                    "group started"
                );
                inner.runtime = Some(Arc::new(runtime));
                inner.state = GroupState::Started;
                Ok(())
            }
            Err(e) => {
                warn!(group = %self.name, error = %e, "group failed to start");
                inner.runtime = None;
                inner.state = GroupState::Failed;
                Err(e)
            }
        }
    }

    /// Release the resolved members. The configuration is kept.
    pub fn stop(&self) -> GroupResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if !inner.state.can_stop() {
            return Err(self.invalid_state("stop", inner.state));
        }
        inner.runtime = None;
        inner.state = GroupState::Stopped;
        info!(group = %self.name, "group stopped");
        Ok(())
    }

    pub fn state(&self) -> GroupState {
        self.inner.read().expect("lock poisoned").state
    }

    /// The accepted configuration, if any.
    pub fn configuration(&self) -> Option<GroupConfiguration> {
        self.inner.read().expect("lock poisoned").config.clone()
    }

    /// The fill policy resolved by the last `configure`.
    pub fn fill_policy(&self) -> Option<Arc<dyn FillPolicy>> {
        self.inner.read().expect("lock poisoned").fill_policy.clone()
    }

    pub fn settings(&self) -> &GroupSettings {
        &self.settings
    }

    /// Resolved members in configured order. Empty unless started.
    pub fn members(&self) -> Vec<Arc<dyn BlobStore>> {
        self.inner
            .read()
            .expect("lock poisoned")
            .runtime
            .as_ref()
            .map(|rt| rt.membership.members().to_vec())
            .unwrap_or_default()
    }

    /// The member a read of `id` would be routed to.
    pub fn locate(&self, id: &BlobId) -> StoreResult<Option<Arc<dyn BlobStore>>> {
        self.runtime()?.locate(id)
    }

    fn resolve_fill_policy(&self, requested: Option<&str>) -> Arc<dyn FillPolicy> {
        let Some(name) = requested else {
            return self.fill_policies.fallback();
        };
        match self.fill_policies.create(name) {
            Some(policy) => policy,
            None => {
                warn!(
                    group = %self.name,
                    requested = name,
                    fallback = WriteToFirstMemberFillPolicy::TYPE,
                    "unable to find fill policy, using default"
                );
                self.fill_policies.fallback()
            }
        }
    }

    fn build_runtime(
        &self,
        config: &GroupConfiguration,
        fill_policy: Arc<dyn FillPolicy>,
    ) -> GroupResult<Runtime> {
        let members = config
            .members
            .iter()
            .map(|name| {
                self.registry
                    .resolve(name)
                    .ok_or_else(|| GroupError::MemberNotFound {
                        group: self.name.clone(),
                        member: name.clone(),
                    })
            })
            .collect::<GroupResult<Vec<_>>>()?;
        let cache = self
            .cache_factory
            .maybe_create_cache(&self.settings.cache_name, &self.settings.cache_config())?;
        Ok(Runtime {
            membership: Membership::new(members),
            cache,
            fill_policy,
        })
    }

    fn invalid_state(&self, operation: &'static str, state: GroupState) -> GroupError {
        GroupError::InvalidState {
            group: self.name.clone(),
            operation,
            state,
        }
    }

    fn runtime(&self) -> StoreResult<Arc<Runtime>> {
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .runtime
            .clone()
            .ok_or_else(|| StoreError::NotStarted {
                store: self.name.clone(),
                state: inner.state.to_string(),
            })
    }

    // -----------------------------------------------------------------------
    // Routing helpers
    // -----------------------------------------------------------------------

    fn target_for_create(
        &self,
        runtime: &Runtime,
        headers: &Headers,
    ) -> StoreResult<Arc<dyn BlobStore>> {
        let target = runtime
            .fill_policy
            .choose_member(self, headers)
            .ok_or_else(|| StoreError::NoWritableMember {
                group: self.name.clone(),
            })?;
        debug!(
            group = %self.name,
            member = target.name(),
            fill_policy = runtime.fill_policy.name(),
            "placing new blob"
        );
        Ok(target)
    }

    /// Apply `delete` to every member holding `id`.
    ///
    /// Every owner is attempted. Returns `true` only if all of them report
    /// success; the first member error, if any, is returned after all
    /// attempts.
    fn delete_from_owners(
        &self,
        id: &BlobId,
        operation: &'static str,
        delete: impl Fn(&dyn BlobStore) -> StoreResult<bool>,
    ) -> StoreResult<bool> {
        let owners = self.runtime()?.locate_all(id)?;
        if owners.is_empty() {
            trace!(group = %self.name, blob = %id, operation, "no member holds blob");
            return Ok(false);
        }
        if owners.len() > 1 {
            let names: Vec<&str> = owners.iter().map(|m| m.name()).collect();
            warn!(
                group = %self.name,
                blob = %id,
                owners = ?names,
                "blob found in multiple members"
            );
        }

        let mut failed = Vec::new();
        let mut first_error = None;
        for owner in &owners {
            match delete(&**owner) {
                Ok(true) => {}
                Ok(false) => failed.push(owner.name().to_string()),
                Err(e) => {
                    warn!(
                        group = %self.name,
                        blob = %id,
                        member = owner.name(),
                        operation,
                        error = %e,
                        "member delete failed"
                    );
                    failed.push(owner.name().to_string());
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if !failed.is_empty() {
            warn!(
                group = %self.name,
                blob = %id,
                operation,
                failed = ?failed,
                "blob not deleted from every member"
            );
            return Ok(false);
        }
        debug!(group = %self.name, blob = %id, operation, owners = owners.len(), "blob deleted");
        Ok(true)
    }
}

impl BlobStore for GroupStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        Ok(self.locate(id)?.is_some())
    }

    fn get(&self, id: &BlobId) -> StoreResult<Option<Blob>> {
        match self.locate(id)? {
            Some(member) => member.get(id),
            None => Ok(None),
        }
    }

    fn get_with_deleted(&self, id: &BlobId, include_deleted: bool) -> StoreResult<Option<Blob>> {
        match self.locate(id)? {
            Some(member) => member.get_with_deleted(id, include_deleted),
            None => Ok(None),
        }
    }

    fn create(&self, content: &mut dyn Read, headers: &Headers) -> StoreResult<Blob> {
        let runtime = self.runtime()?;
        self.target_for_create(&runtime, headers)?
            .create(content, headers)
    }

    fn create_with_id(
        &self,
        id: BlobId,
        content: &mut dyn Read,
        headers: &Headers,
    ) -> StoreResult<Blob> {
        let runtime = self.runtime()?;
        self.target_for_create(&runtime, headers)?
            .create_with_id(id, content, headers)
    }

    fn create_from_path(
        &self,
        path: &Path,
        headers: &Headers,
        size: u64,
        hash: ContentHash,
    ) -> StoreResult<Blob> {
        let runtime = self.runtime()?;
        self.target_for_create(&runtime, headers)?
            .create_from_path(path, headers, size, hash)
    }

    fn copy(&self, id: &BlobId, headers: &Headers) -> StoreResult<Blob> {
        match self.locate(id)? {
            Some(member) => member.copy(id, headers),
            None => Err(StoreError::BlobNotFound(id.clone())),
        }
    }

    fn delete(&self, id: &BlobId, reason: &str) -> StoreResult<bool> {
        self.delete_from_owners(id, "delete", |member| member.delete(id, reason))
    }

    fn delete_hard(&self, id: &BlobId) -> StoreResult<bool> {
        self.delete_from_owners(id, "delete_hard", |member| member.delete_hard(id))
    }

    /// Asks every member. `true` if any member restored the blob; the first
    /// member error, if any, is returned after all members were asked.
    fn undelete(&self, id: &BlobId, dry_run: bool) -> StoreResult<bool> {
        let runtime = self.runtime()?;
        let mut restored = Vec::new();
        let mut first_error = None;
        for member in runtime.membership.members() {
            match member.undelete(id, dry_run) {
                Ok(true) => restored.push(member.name()),
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        group = %self.name,
                        blob = %id,
                        member = member.name(),
                        error = %e,
                        "member undelete failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if !restored.is_empty() {
            info!(
                group = %self.name,
                blob = %id,
                members = ?restored,
                dry_run,
                "blob undeleted"
            );
        }
        Ok(!restored.is_empty())
    }

    fn blob_id_stream(&self) -> StoreResult<BlobIdStream> {
        let runtime = self.runtime()?;
        Ok(Box::new(GroupIdStream::new(
            runtime.membership.members().to_vec(),
        )))
    }

    fn blob_ids_updated_since(&self, window: Duration) -> StoreResult<BlobIdStream> {
        let runtime = self.runtime()?;
        Ok(Box::new(GroupIdStream::updated_since(
            runtime.membership.members().to_vec(),
            window,
        )))
    }

    fn blob_attributes(&self, id: &BlobId) -> StoreResult<Option<BlobAttributes>> {
        match self.locate(id)? {
            Some(member) => member.blob_attributes(id),
            None => Ok(None),
        }
    }

    fn set_blob_attributes(&self, id: &BlobId, attributes: BlobAttributes) -> StoreResult<bool> {
        match self.locate(id)? {
            Some(member) => member.set_blob_attributes(id, attributes),
            None => Ok(false),
        }
    }

    /// Sum of the metrics of members whose storage is available.
    fn metrics(&self) -> StoreResult<BlobStoreMetrics> {
        let runtime = self.runtime()?;
        runtime
            .membership
            .members()
            .iter()
            .filter(|m| m.is_storage_available())
            .try_fold(BlobStoreMetrics::default(), |total, m| {
                Ok(total.combine(m.metrics()?))
            })
    }

    fn is_empty(&self) -> StoreResult<bool> {
        let runtime = self.runtime()?;
        for member in runtime.membership.members() {
            if !member.is_empty()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for GroupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().expect("lock poisoned");
        f.debug_struct("GroupStore")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("config", &inner.config)
            .finish()
    }
}
