//! Persisted resource state
//!
//! The `.albflow/state.json` file is the only thing that survives between
//! invocations. For every managed resource it records the remote identifier
//! (the durable handle), the last configuration that was successfully
//! applied, and whatever the last read observed.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".albflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Locks older than this are considered abandoned
const STALE_LOCK_HOURS: i64 = 1;

/// Build the state key for a resource: `<provider>:<type>:<name>`
pub fn resource_key(provider: &str, resource_type: &str, name: &str) -> String {
    format!("{}:{}:{}", provider, resource_type, name)
}

/// Whole state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by provider:type:name
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources owned by one provider, with their keys
    pub fn get_provider_resources(&self, provider: &str) -> Vec<(&String, &ResourceState)> {
        let prefix = format!("{}:", provider);
        self.resources
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .collect()
    }

    pub fn set_resource(&mut self, key: impl Into<String>, state: ResourceState) {
        self.resources.insert(key.into(), state);
        self.updated_at = Utc::now();
    }

    pub fn remove_resource(&mut self, key: &str) -> Option<ResourceState> {
        let removed = self.resources.remove(key);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    pub fn get_resource_mut(&mut self, key: &str) -> Option<&mut ResourceState> {
        self.resources.get_mut(key)
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Remote identifier (e.g. an ARN)
    pub id: String,

    pub resource_type: String,

    pub status: ResourceStatus,

    /// Configuration as of the last successful apply
    #[serde(default)]
    pub applied: serde_json::Value,

    /// Attributes observed by the last read (DNS name, zone id, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Created,
            applied: serde_json::Value::Null,
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_applied(mut self, applied: serde_json::Value) -> Self {
        self.applied = applied;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn set_applied(&mut self, applied: serde_json::Value) {
        self.applied = applied;
        self.updated_at = Utc::now();
    }

    /// Replace all observed attributes at once
    pub fn set_attributes(&mut self, attributes: BTreeMap<String, serde_json::Value>) {
        self.attributes = attributes;
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Decode the last applied configuration
    pub fn applied_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        if self.applied.is_null() {
            return None;
        }
        serde_json::from_value(self.applied.clone()).ok()
    }
}

/// Lifecycle position of a resource
///
/// `Created` is transient: creation always continues into configuration.
/// A resource left in `Created` or `Tainted` is replaced on the next apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Immutable fields exist remotely, attributes not yet pushed
    Created,
    /// Attributes pushed and read back
    Configured,
    /// A mutation failed part-way; the remote object is not trusted
    Tainted,
    Deleted,
}

impl ResourceStatus {
    /// Whether the remote object must be rebuilt before it can be trusted
    pub fn needs_replacement(&self) -> bool {
        matches!(self, ResourceStatus::Created | ResourceStatus::Tainted)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Created => write!(f, "created"),
            ResourceStatus::Configured => write!(f, "configured"),
            ResourceStatus::Tainted => write!(f, "tainted"),
            ResourceStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Reads and writes the state file under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the state, or an empty one when no file exists yet
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }

        // write-then-rename so a crash never leaves a truncated state file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Acquire the advisory lock that serializes mutating commands
    ///
    /// The lock file is created with `create_new`, so at most one caller wins.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            // 作成直後で中身がまだ書かれていない
            let lock_info: LockInfo = serde_json::from_str(&content).map_err(|_| {
                CloudError::LockError(format!(
                    "State lock is being acquired by another process: {}",
                    lock_path.display()
                ))
            })?;

            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} (pid {}) since {}",
                    lock_info.holder, lock_info.pid, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
            match fs::remove_file(&lock_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(format!(
                    "State lock was taken by another process: {}",
                    lock_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let lock = StateLock {
            lock_path,
            released: false,
        };

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        file.write_all(serde_json::to_string_pretty(&lock_info)?.as_bytes())
            .await?;
        file.flush().await?;

        tracing::debug!("Acquired state lock");
        Ok(lock)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).await?;
            tracing::debug!("Released state lock");
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            // no async in drop
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.set_resource(
            resource_key("aws", "alb", "web"),
            ResourceState::new("arn:aws:elasticloadbalancing:1", "alb")
                .with_status(ResourceStatus::Configured)
                .with_applied(serde_json::json!({ "name": "web" }))
                .with_attribute("dns_name", serde_json::json!("web-1.elb.amazonaws.com")),
        );

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        let web = loaded.get_resource("aws:alb:web").unwrap();
        assert_eq!(web.id, "arn:aws:elasticloadbalancing:1");
        assert_eq!(web.status, ResourceStatus::Configured);
        assert_eq!(
            web.get_attribute::<String>("dns_name").as_deref(),
            Some("web-1.elb.amazonaws.com")
        );
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_second_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        manager.save(&GlobalState::new()).await.unwrap();

        assert!(temp_dir.path().join(".albflow/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        assert!(matches!(
            manager.load().await,
            Err(CloudError::StateError(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        let relocked = manager.acquire_lock().await.unwrap();
        drop(relocked);
        assert!(!temp_dir.path().join(".albflow/lock.json").exists());
    }

    #[tokio::test]
    async fn test_concurrent_lock_has_single_winner() {
        let temp_dir = tempdir().unwrap();
        let first = StateManager::new(temp_dir.path());
        let second = StateManager::new(temp_dir.path());

        let (a, b) = tokio::join!(first.acquire_lock(), second.acquire_lock());

        assert_eq!(
            [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
            1,
            "{:?} / {:?}",
            a.as_ref().err(),
            b.as_ref().err()
        );
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(CloudError::LockError(_))));
    }

    #[tokio::test]
    async fn test_stale_lock_is_replaced() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        manager.ensure_state_dir().await.unwrap();
        let stale = LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            acquired_at: Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1),
        };
        std::fs::write(
            manager.lock_path(),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        let content = std::fs::read_to_string(manager.lock_path()).unwrap();
        let info: LockInfo = serde_json::from_str(&content).unwrap();
        assert_eq!(info.pid, std::process::id());
        lock.release().await.unwrap();
    }

    #[test]
    fn test_provider_resources_filter() {
        let mut state = GlobalState::new();
        state.set_resource(resource_key("aws", "alb", "a"), ResourceState::new("1", "alb"));
        state.set_resource(resource_key("gcp", "lb", "b"), ResourceState::new("2", "lb"));

        let aws = state.get_provider_resources("aws");
        assert_eq!(aws.len(), 1);
        assert_eq!(aws[0].0, "aws:alb:a");
    }

    #[test]
    fn test_status_replacement() {
        assert!(ResourceStatus::Created.needs_replacement());
        assert!(ResourceStatus::Tainted.needs_replacement());
        assert!(!ResourceStatus::Configured.needs_replacement());
    }
}
