//! ALB provider implementation

use crate::api::LoadBalancerApi;
use crate::changes::{ChangeSet, replacement_fields};
use crate::error::AlbError;
use crate::model::{DesiredState, RemoteState};
use crate::reconciler::Reconciler;
use crate::tags::Tags;
use albflow_cloud::{
    Action, ActionType, ApplyResult, CloudError, CloudProvider, DETAIL_CHANGES, DETAIL_REMOTE_ID,
    GlobalState, Plan, ResourceConfig, ResourceSet, ResourceState, ResourceStatus, RetryConfig,
    resource_key,
};
use async_trait::async_trait;

pub const PROVIDER_NAME: &str = "aws";
pub const RESOURCE_TYPE: &str = "alb";

/// State key for the load balancer declared as `name`
pub fn state_key(name: &str) -> String {
    resource_key(PROVIDER_NAME, RESOURCE_TYPE, name)
}

fn name_from_state_key(key: &str) -> Option<&str> {
    key.strip_prefix(PROVIDER_NAME)?
        .strip_prefix(':')?
        .strip_prefix(RESOURCE_TYPE)?
        .strip_prefix(':')
}

/// Application Load Balancer provider
pub struct AlbProvider<A> {
    api: A,
    create_retry: RetryConfig,
}

impl<A: LoadBalancerApi> AlbProvider<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            create_retry: RetryConfig::default(),
        }
    }

    pub fn with_create_retry(mut self, create_retry: RetryConfig) -> Self {
        self.create_retry = create_retry;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn reconciler(&self) -> Reconciler<'_, A> {
        Reconciler::new(&self.api).with_create_retry(self.create_retry.clone())
    }

    /// Read the live state of a managed load balancer
    pub async fn show(&self, name: &str, state: &GlobalState) -> albflow_cloud::Result<Option<RemoteState>> {
        let entry = state
            .get_resource(&state_key(name))
            .ok_or_else(|| CloudError::ResourceNotFound(name.to_string()))?;
        Ok(self.reconciler().read(&entry.id).await?)
    }

    fn plan_resource(name: &str, desired: &DesiredState, entry: Option<&ResourceState>) -> Action {
        let Some(entry) = entry else {
            return Action::new(
                ActionType::Create,
                RESOURCE_TYPE,
                name,
                format!("ALB {} を作成", desired.name),
            );
        };

        let remote_id = serde_json::json!(entry.id);
        if entry.status.needs_replacement() {
            return Action::new(
                ActionType::Replace,
                RESOURCE_TYPE,
                name,
                format!("ALB {} は {} 状態のため再作成", desired.name, entry.status),
            )
            .with_detail(DETAIL_REMOTE_ID, remote_id)
            .with_detail(DETAIL_CHANGES, serde_json::json!(["status"]));
        }

        let Some(prior) = entry.applied_as::<DesiredState>() else {
            let changes = full_change_set(desired);
            return Action::new(
                ActionType::Update,
                RESOURCE_TYPE,
                name,
                format!("ALB {} の設定を再適用", desired.name),
            )
            .with_detail(DETAIL_REMOTE_ID, remote_id)
            .with_detail(DETAIL_CHANGES, serde_json::json!(changes.field_names()));
        };

        let immutable = replacement_fields(&prior, desired);
        if !immutable.is_empty() {
            return Action::new(
                ActionType::Replace,
                RESOURCE_TYPE,
                name,
                format!("ALB {} を再作成 ({})", desired.name, immutable.join(", ")),
            )
            .with_detail(DETAIL_REMOTE_ID, remote_id)
            .with_detail(DETAIL_CHANGES, serde_json::json!(immutable));
        }

        let changes = ChangeSet::between(&prior, desired);
        if changes.is_empty() {
            return Action::new(
                ActionType::NoOp,
                RESOURCE_TYPE,
                name,
                format!("ALB {} は最新です", desired.name),
            )
            .with_detail(DETAIL_REMOTE_ID, remote_id);
        }

        let fields = changes.field_names();
        Action::new(
            ActionType::Update,
            RESOURCE_TYPE,
            name,
            format!("ALB {} を更新 ({})", desired.name, fields.join(", ")),
        )
        .with_detail(DETAIL_REMOTE_ID, remote_id)
        .with_detail(DETAIL_CHANGES, serde_json::json!(fields))
    }

    /// Create, recording the result. A half-configured load balancer is
    /// recorded as tainted so the next apply replaces it.
    async fn create_and_record(
        &self,
        name: &str,
        desired: &DesiredState,
        state: &mut GlobalState,
    ) -> albflow_cloud::Result<RemoteState> {
        match self.reconciler().create(desired).await {
            Ok(remote) => {
                record(state, name, &remote, ResourceStatus::Configured)?;
                Ok(remote)
            }
            Err(AlbError::Configure { id, source }) => {
                tracing::warn!("ALB {} created but not configured; marking tainted", id);
                state.set_resource(
                    state_key(name),
                    ResourceState::new(&id, RESOURCE_TYPE).with_status(ResourceStatus::Tainted),
                );
                Err(AlbError::Configure { id, source }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete by identifier, treating an already missing load balancer as deleted
    async fn delete_remote(&self, id: &str) -> albflow_cloud::Result<()> {
        match self.reconciler().delete(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!("ALB {} already deleted", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_action(
        &self,
        action: &Action,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> albflow_cloud::Result<String> {
        let name = action.resource_key.as_str();
        let key = state_key(name);

        match action.action_type {
            ActionType::Create => {
                let config = desired_config(desired, name)?;
                let remote = self.create_and_record(name, &config, state).await?;
                Ok(format!("ALB {} を作成しました (ARN: {})", name, remote.id))
            }
            ActionType::Replace => {
                let config = desired_config(desired, name)?;
                let id = managed_id(action, state, &key)?;
                tracing::info!("Replacing ALB {} ({})", name, id);
                self.delete_remote(&id).await?;
                state.remove_resource(&key);
                let remote = self.create_and_record(name, &config, state).await?;
                Ok(format!("ALB {} を再作成しました (ARN: {})", name, remote.id))
            }
            ActionType::Update => {
                let config = desired_config(desired, name)?;
                let entry = state
                    .get_resource(&key)
                    .ok_or_else(|| CloudError::ResourceNotFound(name.to_string()))?;
                let changes = match entry.applied_as::<DesiredState>() {
                    Some(prior) => ChangeSet::between(&prior, &config),
                    None => full_change_set(&config),
                };
                let id = entry.id.clone();

                match self.reconciler().update(&id, &config, &changes).await {
                    Ok(remote) => {
                        record(state, name, &remote, ResourceStatus::Configured)?;
                        Ok(format!(
                            "ALB {} を更新しました ({})",
                            name,
                            changes.field_names().join(", ")
                        ))
                    }
                    Err(e @ AlbError::Vanished { .. }) => {
                        state.remove_resource(&key);
                        Err(e.into())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ActionType::Delete => {
                let id = managed_id(action, state, &key)?;
                self.delete_remote(&id).await?;
                state.remove_resource(&key);
                Ok(format!("ALB {} を削除しました", name))
            }
            ActionType::NoOp => Ok(format!("ALB {} は変更なし", name)),
        }
    }
}

/// Every mutable field marked, for entries without a usable prior configuration
fn full_change_set(desired: &DesiredState) -> ChangeSet {
    let tags = Tags::new().diff(&desired.tags);
    ChangeSet {
        access_logs: true,
        enable_deletion_protection: true,
        idle_timeout: true,
        tags: (!tags.is_empty()).then_some(tags),
    }
}

fn parse_desired(resource: &ResourceConfig) -> Result<DesiredState, AlbError> {
    resource.parse::<DesiredState>().map_err(|e| AlbError::Config {
        key: resource.key(),
        message: e.to_string(),
    })
}

fn desired_config(desired: &ResourceSet, name: &str) -> albflow_cloud::Result<DesiredState> {
    let resource = desired
        .get(RESOURCE_TYPE, name)
        .ok_or_else(|| CloudError::InvalidConfig(format!("{} is not declared", name)))?;
    Ok(parse_desired(resource)?)
}

fn managed_id(action: &Action, state: &GlobalState, key: &str) -> albflow_cloud::Result<String> {
    action
        .remote_id()
        .map(str::to_string)
        .or_else(|| state.get_resource(key).map(|e| e.id.clone()))
        .ok_or_else(|| CloudError::ResourceNotFound(key.to_string()))
}

/// Store what was read back as the applied configuration
fn record(
    state: &mut GlobalState,
    name: &str,
    remote: &RemoteState,
    status: ResourceStatus,
) -> albflow_cloud::Result<()> {
    let key = state_key(name);
    let applied = serde_json::to_value(remote.to_desired())?;

    match state.get_resource_mut(&key) {
        Some(entry) if entry.id == remote.id => {
            entry.set_status(status);
            entry.set_applied(applied);
            entry.set_attributes(remote.computed_attributes());
        }
        _ => {
            let mut entry = ResourceState::new(&remote.id, RESOURCE_TYPE)
                .with_status(status)
                .with_applied(applied);
            entry.set_attributes(remote.computed_attributes());
            state.set_resource(key, entry);
        }
    }
    Ok(())
}

#[async_trait]
impl<A: LoadBalancerApi> CloudProvider for AlbProvider<A> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "AWS Application Load Balancer"
    }

    async fn plan(&self, desired: &ResourceSet, state: &GlobalState) -> albflow_cloud::Result<Plan> {
        let mut actions = Vec::new();

        for resource in desired.iter() {
            if resource.resource_type != RESOURCE_TYPE {
                tracing::debug!("Skipping unsupported resource {}", resource.key());
                continue;
            }
            let config = parse_desired(resource)?;
            let entry = state.get_resource(&state_key(&resource.key));
            actions.push(Self::plan_resource(&resource.key, &config, entry));
        }

        for (key, entry) in state.get_provider_resources(PROVIDER_NAME) {
            if entry.resource_type != RESOURCE_TYPE {
                continue;
            }
            let Some(name) = name_from_state_key(key) else {
                tracing::warn!("Ignoring malformed state key {}", key);
                continue;
            };
            if desired.get(RESOURCE_TYPE, name).is_none() {
                actions.push(
                    Action::new(
                        ActionType::Delete,
                        RESOURCE_TYPE,
                        name,
                        format!("ALB {} を削除", name),
                    )
                    .with_detail(DETAIL_REMOTE_ID, serde_json::json!(entry.id)),
                );
            }
        }

        Ok(Plan::new(actions))
    }

    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> albflow_cloud::Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for action in &plan.actions {
            if action.action_type == ActionType::NoOp {
                continue;
            }
            tracing::info!("{}: {}", action.action_type, action.description);
            match self.apply_action(action, desired, state).await {
                Ok(message) => result.add_success(&action.id, message),
                Err(e) => {
                    tracing::error!("{} failed: {}", action.id, e);
                    result.add_failure(&action.id, e.to_string());
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn refresh(&self, state: &mut GlobalState) -> albflow_cloud::Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        let managed: Vec<(String, String, ResourceStatus)> = state
            .get_provider_resources(PROVIDER_NAME)
            .into_iter()
            .filter(|(_, entry)| entry.resource_type == RESOURCE_TYPE)
            .filter_map(|(key, entry)| {
                name_from_state_key(key).map(|name| (name.to_string(), entry.id.clone(), entry.status))
            })
            .collect();

        for (name, id, status) in managed {
            let action_id = format!("refresh-{}", name);
            match self.reconciler().read(&id).await {
                Ok(Some(remote)) => match record(state, &name, &remote, status) {
                    Ok(()) => result.add_success(&action_id, format!("ALB {} を更新しました", name)),
                    Err(e) => result.add_failure(&action_id, e.to_string()),
                },
                Ok(None) => {
                    state.remove_resource(&state_key(&name));
                    result.add_success(
                        &action_id,
                        format!("ALB {} は存在しないため状態から削除しました", name),
                    );
                }
                Err(e) => result.add_failure(&action_id, e.to_string()),
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn import(
        &self,
        resource_type: &str,
        key: &str,
        remote_id: &str,
        state: &mut GlobalState,
    ) -> albflow_cloud::Result<()> {
        if resource_type != RESOURCE_TYPE {
            return Err(CloudError::UnsupportedResourceType(resource_type.to_string()));
        }
        if state.get_resource(&state_key(key)).is_some() {
            return Err(CloudError::ResourceAlreadyManaged(key.to_string()));
        }

        let remote = self.reconciler().import(remote_id).await?;
        tracing::info!("Imported ALB {} as {}", remote.id, key);
        record(state, key, &remote, ResourceStatus::Configured)
    }

    async fn destroy(
        &self,
        resource_type: &str,
        key: &str,
        state: &mut GlobalState,
    ) -> albflow_cloud::Result<()> {
        if resource_type != RESOURCE_TYPE {
            return Err(CloudError::UnsupportedResourceType(resource_type.to_string()));
        }
        let state_key = state_key(key);
        let id = state
            .get_resource(&state_key)
            .map(|e| e.id.clone())
            .ok_or_else(|| CloudError::ResourceNotFound(key.to_string()))?;

        self.delete_remote(&id).await?;
        state.remove_resource(&state_key);
        Ok(())
    }
}
