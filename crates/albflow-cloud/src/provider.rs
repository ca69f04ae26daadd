//! Cloud provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::Result;
use crate::state::GlobalState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud provider abstraction trait
///
/// A provider turns a desired [`ResourceSet`] plus the persisted
/// [`GlobalState`] into a [`Plan`], and applies that plan against the remote
/// API. Providers never keep remote state between calls: everything they
/// learn is written back into the `GlobalState` they are handed.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name used in state keys (e.g., "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Calculate the actions needed to move `state` towards `desired`
    async fn plan(&self, desired: &ResourceSet, state: &GlobalState) -> Result<Plan>;

    /// Apply the planned actions, recording every success in `state`
    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> Result<ApplyResult>;

    /// Re-read every managed resource; drop the ones that no longer exist
    async fn refresh(&self, state: &mut GlobalState) -> Result<ApplyResult>;

    /// Adopt an existing remote resource under a manifest key
    async fn import(
        &self,
        resource_type: &str,
        key: &str,
        remote_id: &str,
        state: &mut GlobalState,
    ) -> Result<()>;

    /// Destroy one managed resource and forget it
    async fn destroy(&self, resource_type: &str, key: &str, state: &mut GlobalState) -> Result<()>;
}

/// Set of resources to be managed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by `type:key`
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, resource_type: &str, key: &str) -> Option<&ResourceConfig> {
        self.resources.get(&format!("{}:{}", resource_type, key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Declared configuration of one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "alb")
    pub resource_type: String,

    /// Manifest key
    pub key: String,

    /// Provider name
    pub provider: String,

    /// Resource-specific configuration
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        key: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            key: key.into(),
            provider: provider.into(),
            config,
        }
    }

    /// `type:key`
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.key)
    }

    /// Decode the whole configuration into a typed structure
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_set_lookup() {
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new(
            "alb",
            "web",
            "aws",
            serde_json::json!({ "name": "web" }),
        ));
        set.add(ResourceConfig::new("alb", "api", "aws", serde_json::json!({})));

        assert_eq!(set.len(), 2);
        assert!(set.get("alb", "web").is_some());
        assert!(set.get("alb", "missing").is_none());
        assert_eq!(set.by_type("alb").len(), 2);
    }

    #[test]
    fn test_resource_config_parse() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }

        let config = ResourceConfig::new("alb", "web", "aws", serde_json::json!({ "name": "web" }));
        let named: Named = config.parse().unwrap();
        assert_eq!(named.name, "web");
    }
}
