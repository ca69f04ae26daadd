//! Manifest file model
//!
//! ```yaml
//! provider:
//!   region: ap-northeast-1
//!   profile: staging
//! load_balancers:
//!   web:
//!     name: web-alb
//!     subnets: [subnet-0a1, subnet-0b2]
//!     idle_timeout: 120
//! ```
//!
//! Load balancer bodies are kept as loosely-typed JSON values here; the
//! provider validates them when building its desired state.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 60;

/// Overrides `provider.region`
pub const ENV_REGION: &str = "ALB_REGION";
/// Overrides `provider.profile`
pub const ENV_PROFILE: &str = "AWS_PROFILE";

fn default_create_timeout_secs() -> u64 {
    DEFAULT_CREATE_TIMEOUT_SECS
}

/// Connection settings for the AWS provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Wall-clock budget for creating one load balancer
    #[serde(default = "default_create_timeout_secs")]
    pub create_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint_url: None,
            create_timeout_secs: DEFAULT_CREATE_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    /// Apply `ALB_REGION` / `AWS_PROFILE` on top of the file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(region) = non_empty_var(ENV_REGION) {
            tracing::debug!("{} overrides region: {}", ENV_REGION, region);
            self.region = Some(region);
        }
        if let Some(profile) = non_empty_var(ENV_PROFILE) {
            tracing::debug!("{} overrides profile: {}", ENV_PROFILE, profile);
            self.profile = Some(profile);
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Declared load balancers, keyed by manifest name
    #[serde(default)]
    pub load_balancers: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Parse YAML without touching the environment
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if manifest.provider.create_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.create_timeout_secs は 1 以上を指定してください".to_string(),
            ));
        }
        for (key, body) in &manifest.load_balancers {
            if !body.is_object() {
                return Err(ConfigError::Invalid(format!(
                    "load_balancers.{} はマッピングで記述してください",
                    key
                )));
            }
        }
        Ok(manifest)
    }
}

/// Read and parse a manifest, then apply environment overrides
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    let mut manifest = Manifest::from_yaml(&content, path)?;
    manifest.provider.apply_env_overrides();
    tracing::debug!(
        "Loaded manifest {} ({} load balancers)",
        path.display(),
        manifest.load_balancers.len()
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MANIFEST: &str = r#"
provider:
  region: ap-northeast-1
  profile: staging
load_balancers:
  web:
    name: web-alb
    subnets: [subnet-a, subnet-b]
    tags:
      Env: staging
  api:
    name: api-alb
    internal: true
    subnets: [subnet-c]
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_yaml(MANIFEST, Path::new("alb.yaml")).unwrap();

        assert_eq!(manifest.provider.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(manifest.provider.create_timeout_secs, DEFAULT_CREATE_TIMEOUT_SECS);
        assert_eq!(
            manifest.load_balancers.keys().collect::<Vec<_>>(),
            vec!["api", "web"]
        );
        assert_eq!(manifest.load_balancers["web"]["tags"]["Env"], "staging");
        assert_eq!(manifest.load_balancers["api"]["internal"], true);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from_yaml("{}", Path::new("alb.yaml")).unwrap();
        assert!(manifest.load_balancers.is_empty());
        assert_eq!(manifest.provider, ProviderSettings::default());
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let err = Manifest::from_yaml("services: {}", Path::new("alb.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Manifest::from_yaml(
            "provider:\n  create_timeout_secs: 0\n",
            Path::new("alb.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Manifest::from_yaml("load_balancers:\n  web: 3\n", Path::new("alb.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    #[serial]
    fn test_load_manifest_env_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alb.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = temp_env::with_vars(
            [(ENV_REGION, Some("us-west-2")), (ENV_PROFILE, Some("prod"))],
            || load_manifest(&path),
        )
        .unwrap();

        assert_eq!(manifest.provider.region.as_deref(), Some("us-west-2"));
        assert_eq!(manifest.provider.profile.as_deref(), Some("prod"));
    }

    #[test]
    #[serial]
    fn test_load_manifest_without_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alb.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = temp_env::with_vars_unset([ENV_REGION, ENV_PROFILE], || load_manifest(&path))
            .unwrap();

        assert_eq!(manifest.provider.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(manifest.provider.profile.as_deref(), Some("staging"));
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let err = load_manifest(Path::new("/nonexistent/alb.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
