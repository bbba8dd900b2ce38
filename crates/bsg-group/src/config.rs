use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use bsg_cache::{CacheConfig, DEFAULT_TTL};

use crate::error::{GroupError, GroupResult};

/// Store type name of a group.
pub const TYPE: &str = "Group";
/// Attribute section holding the group settings.
pub const CONFIG_KEY: &str = "group";
/// Ordered list of member store names inside the group section.
pub const MEMBERS_KEY: &str = "members";
/// Fill policy name inside the group section.
pub const FILL_POLICY_KEY: &str = "fillPolicy";
/// Name of the shared location cache.
pub const CACHE_NAME: &str = "blobstore-group-blobIds";

/// Generic blob store configuration: a name, a type, and a nested
/// attribute map whose layout depends on the type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobStoreConfiguration {
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl BlobStoreConfiguration {
    /// Build a group-typed configuration with the given member names and
    /// optional fill policy.
    pub fn group(name: &str, members: &[&str], fill_policy: Option<&str>) -> Self {
        let mut section = Map::new();
        section.insert(
            MEMBERS_KEY.into(),
            Value::Array(members.iter().map(|m| Value::from(*m)).collect()),
        );
        if let Some(policy) = fill_policy {
            section.insert(FILL_POLICY_KEY.into(), Value::from(policy));
        }
        let mut attributes = Map::new();
        attributes.insert(CONFIG_KEY.into(), Value::Object(section));
        Self {
            name: name.into(),
            store_type: TYPE.into(),
            attributes,
        }
    }
}

/// Membership and placement settings of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfiguration {
    /// Member store names, in priority order. May be empty.
    pub members: Vec<String>,
    /// Fill policy name. `None` selects the default policy.
    #[serde(rename = "fillPolicy", default)]
    pub fill_policy: Option<String>,
}

impl GroupConfiguration {
    pub fn new<S: Into<String>>(
        members: impl IntoIterator<Item = S>,
        fill_policy: Option<&str>,
    ) -> Self {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            fill_policy: fill_policy.map(str::to_string),
        }
    }

    /// Read the `group` section of a store configuration.
    pub fn from_store_configuration(config: &BlobStoreConfiguration) -> GroupResult<Self> {
        let section = config.attributes.get(CONFIG_KEY).ok_or_else(|| {
            GroupError::InvalidConfiguration(format!(
                "blob store '{}' has no '{CONFIG_KEY}' section",
                config.name
            ))
        })?;
        let parsed: Self = serde_json::from_value(section.clone()).map_err(|e| {
            GroupError::InvalidConfiguration(format!(
                "blob store '{}': malformed '{CONFIG_KEY}' section: {e}",
                config.name
            ))
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> GroupResult<()> {
        if let Some(policy) = &self.fill_policy {
            if policy.trim().is_empty() {
                return Err(GroupError::InvalidConfiguration(
                    "fill policy name is blank".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Process-level settings shared by groups, loadable from TOML or the
/// environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// How long a located blob's member is remembered.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    pub cache_name: String,
    pub cache_max_entries: Option<usize>,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            cache_name: CACHE_NAME.into(),
            cache_max_entries: None,
        }
    }
}

impl GroupSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> GroupResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GroupError::Settings(format!("{}: {e}", path.as_ref().display())))?;
        let settings: Self =
            toml::from_str(&contents).map_err(|e| GroupError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay `BSG_GROUP_*` environment variables on the defaults.
    pub fn from_env() -> GroupResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup` on the defaults.
    ///
    /// Recognised keys: `BSG_GROUP_CACHE_TTL` (humantime, e.g. `2d`),
    /// `BSG_GROUP_CACHE_NAME`, `BSG_GROUP_CACHE_MAX_ENTRIES`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GroupResult<Self> {
        let mut settings = Self::default();
        if let Some(ttl) = lookup("BSG_GROUP_CACHE_TTL") {
            settings.cache_ttl = humantime_serde::re::humantime::parse_duration(&ttl)
                .map_err(|e| GroupError::Settings(format!("invalid cache ttl '{ttl}': {e}")))?;
        }
        if let Some(name) = lookup("BSG_GROUP_CACHE_NAME") {
            settings.cache_name = name;
        }
        if let Some(max) = lookup("BSG_GROUP_CACHE_MAX_ENTRIES") {
            let max = max.parse::<usize>().map_err(|e| {
                GroupError::Settings(format!("invalid cache max entries '{max}': {e}"))
            })?;
            settings.cache_max_entries = Some(max);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> GroupResult<()> {
        if self.cache_name.trim().is_empty() {
            return Err(GroupError::Settings("cache_name must not be blank".into()));
        }
        self.cache_config().validate(&self.cache_name)?;
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
            max_entries: self.cache_max_entries,
        }
    }
}
