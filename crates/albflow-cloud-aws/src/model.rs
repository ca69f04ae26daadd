//! Declarative and observed load balancer models

use crate::api::{CreateLoadBalancerRequest, LoadBalancerScheme};
use crate::error::{AlbError, Result};
use crate::tags::Tags;
use crate::validation::validate_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_IDLE_TIMEOUT: u32 = 60;

fn default_idle_timeout() -> u32 {
    DEFAULT_IDLE_TIMEOUT
}

/// S3 access-log destination
///
/// An undeclared prefix and an empty one compare equal: the service reports
/// both as an empty prefix.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct AccessLogs {
    pub bucket: String,

    /// `None` when no prefix was declared; `Some("")` is sent as an empty prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl AccessLogs {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn prefix_or_empty(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }
}

impl PartialEq for AccessLogs {
    fn eq(&self, other: &Self) -> bool {
        self.bucket == other.bucket && self.prefix_or_empty() == other.prefix_or_empty()
    }
}

/// Load balancer configuration as written in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerConfig {
    pub name: String,

    #[serde(default)]
    pub internal: bool,

    #[serde(default)]
    pub security_groups: Vec<String>,

    #[serde(default)]
    pub subnets: Vec<String>,

    /// Zero or one block
    #[serde(default)]
    pub access_logs: Vec<AccessLogs>,

    #[serde(default)]
    pub enable_deletion_protection: bool,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u32,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Desired state of one load balancer
///
/// `name`, `internal`, `security_groups` and `subnets` can only be set at
/// creation time; everything else is pushed as attributes or tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LoadBalancerConfig", into = "LoadBalancerConfig")]
pub struct DesiredState {
    pub name: String,
    pub internal: bool,
    pub security_groups: BTreeSet<String>,
    pub subnets: BTreeSet<String>,
    pub access_logs: Option<AccessLogs>,
    pub enable_deletion_protection: bool,
    pub idle_timeout: u32,
    pub tags: Tags,
}

impl DesiredState {
    /// A desired state with defaults for every optional field
    pub fn new<I, S>(name: impl Into<String>, subnets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            internal: false,
            security_groups: BTreeSet::new(),
            subnets: subnets.into_iter().map(Into::into).collect(),
            access_logs: None,
            enable_deletion_protection: false,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            tags: Tags::new(),
        }
    }

    /// Check the invariants that must hold before any remote call
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.subnets.is_empty() {
            return Err(AlbError::Validation(format!(
                "{}: at least one subnet is required",
                self.name
            )));
        }
        if self
            .access_logs
            .as_ref()
            .is_some_and(|logs| logs.bucket.is_empty())
        {
            return Err(AlbError::Validation(format!(
                "{}: access_logs.bucket must not be empty",
                self.name
            )));
        }
        Ok(())
    }

    /// Request covering the creation-time fields
    pub fn create_request(&self) -> CreateLoadBalancerRequest {
        CreateLoadBalancerRequest {
            name: self.name.clone(),
            scheme: self.internal.then_some(LoadBalancerScheme::Internal),
            security_groups: self.security_groups.iter().cloned().collect(),
            subnets: self.subnets.iter().cloned().collect(),
            tags: self.tags.to_api(),
        }
    }
}

impl TryFrom<LoadBalancerConfig> for DesiredState {
    type Error = AlbError;

    fn try_from(config: LoadBalancerConfig) -> Result<Self> {
        if config.access_logs.len() > 1 {
            return Err(AlbError::Validation(format!(
                "{}: at most one access_logs block is allowed, got {}",
                config.name,
                config.access_logs.len()
            )));
        }

        let state = DesiredState {
            name: config.name,
            internal: config.internal,
            security_groups: config.security_groups.into_iter().collect(),
            subnets: config.subnets.into_iter().collect(),
            access_logs: config.access_logs.into_iter().next(),
            enable_deletion_protection: config.enable_deletion_protection,
            idle_timeout: config.idle_timeout,
            tags: config.tags.into(),
        };
        state.validate()?;
        Ok(state)
    }
}

impl From<DesiredState> for LoadBalancerConfig {
    fn from(state: DesiredState) -> Self {
        LoadBalancerConfig {
            name: state.name,
            internal: state.internal,
            security_groups: state.security_groups.into_iter().collect(),
            subnets: state.subnets.into_iter().collect(),
            access_logs: state.access_logs.into_iter().collect(),
            enable_deletion_protection: state.enable_deletion_protection,
            idle_timeout: state.idle_timeout,
            tags: state.tags.into_inner(),
        }
    }
}

/// Load balancer as observed through the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Remote identifier (ARN)
    pub id: String,
    pub name: String,
    pub internal: bool,
    pub security_groups: Vec<String>,
    /// One entry per availability zone, in API order
    pub subnets: Vec<String>,
    pub access_logs: Option<AccessLogs>,
    pub enable_deletion_protection: bool,
    pub idle_timeout: u32,
    pub tags: Tags,

    // computed only
    pub vpc_id: Option<String>,
    pub zone_id: Option<String>,
    pub dns_name: Option<String>,
}

impl RemoteState {
    /// The user-settable fields, as a desired state
    pub fn to_desired(&self) -> DesiredState {
        DesiredState {
            name: self.name.clone(),
            internal: self.internal,
            security_groups: self.security_groups.iter().cloned().collect(),
            subnets: self.subnets.iter().cloned().collect(),
            access_logs: self.access_logs.clone(),
            enable_deletion_protection: self.enable_deletion_protection,
            idle_timeout: self.idle_timeout,
            tags: self.tags.clone(),
        }
    }

    /// Computed-only fields, for display and persistence
    pub fn computed_attributes(&self) -> BTreeMap<String, serde_json::Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("arn".to_string(), serde_json::json!(self.id));
        for (key, value) in [
            ("vpc_id", &self.vpc_id),
            ("zone_id", &self.zone_id),
            ("dns_name", &self.dns_name),
        ] {
            if let Some(value) = value {
                attrs.insert(key.to_string(), serde_json::json!(value));
            }
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json(extra: serde_json::Value) -> serde_json::Value {
        let mut base = serde_json::json!({
            "name": "web",
            "subnets": ["subnet-a", "subnet-b"],
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    #[test]
    fn test_defaults() {
        let state: DesiredState = serde_json::from_value(config_json(serde_json::json!({}))).unwrap();

        assert!(!state.internal);
        assert!(!state.enable_deletion_protection);
        assert_eq!(state.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert!(state.access_logs.is_none());
        assert!(state.tags.is_empty());
    }

    #[test]
    fn test_single_access_logs_block() {
        let state: DesiredState = serde_json::from_value(config_json(serde_json::json!({
            "access_logs": [{ "bucket": "logs" }],
        })))
        .unwrap();

        assert_eq!(state.access_logs, Some(AccessLogs::new("logs")));
    }

    #[test]
    fn test_multiple_access_logs_blocks_rejected() {
        let result: std::result::Result<DesiredState, _> =
            serde_json::from_value(config_json(serde_json::json!({
                "access_logs": [{ "bucket": "a" }, { "bucket": "b" }],
            })));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("at most one access_logs block"), "{}", err);
    }

    #[test]
    fn test_missing_subnets_rejected() {
        let config = LoadBalancerConfig {
            subnets: vec![],
            ..serde_json::from_value::<LoadBalancerConfig>(config_json(serde_json::json!({})))
                .unwrap()
        };
        assert!(matches!(
            DesiredState::try_from(config),
            Err(AlbError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let result: std::result::Result<DesiredState, _> =
            serde_json::from_value(config_json(serde_json::json!({ "name": "-bad" })));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<DesiredState, _> =
            serde_json::from_value(config_json(serde_json::json!({ "idle": 30 })));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_request_scheme() {
        let mut state = DesiredState::new("web", ["subnet-a"]);
        assert_eq!(state.create_request().scheme, None);

        state.internal = true;
        assert_eq!(
            state.create_request().scheme,
            Some(LoadBalancerScheme::Internal)
        );
    }

    #[test]
    fn test_serialize_roundtrip_through_config_shape() {
        let mut state = DesiredState::new("web", ["subnet-b", "subnet-a"]);
        state.access_logs = Some(AccessLogs::new("logs").with_prefix(""));
        state.tags.insert("Env", "prod");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["access_logs"][0]["prefix"], "");
        assert_eq!(value["subnets"], serde_json::json!(["subnet-a", "subnet-b"]));

        let back: DesiredState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_empty_prefix_equals_undeclared_prefix() {
        assert_eq!(
            AccessLogs::new("logs").with_prefix(""),
            AccessLogs::new("logs")
        );
        assert_ne!(
            AccessLogs::new("logs").with_prefix("p"),
            AccessLogs::new("logs")
        );
        assert_ne!(AccessLogs::new("a"), AccessLogs::new("b"));
    }
}
