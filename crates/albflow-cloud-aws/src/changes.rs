//! Per-field change tracking for in-place updates

use crate::model::DesiredState;
use crate::tags::TagDiff;

pub const FIELD_ACCESS_LOGS: &str = "access_logs";
pub const FIELD_DELETION_PROTECTION: &str = "enable_deletion_protection";
pub const FIELD_IDLE_TIMEOUT: &str = "idle_timeout";
pub const FIELD_TAGS: &str = "tags";

/// Mutable fields that an update has to push
///
/// The reconciler acts only on what is marked here; it never diffs on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub access_logs: bool,
    pub enable_deletion_protection: bool,
    pub idle_timeout: bool,
    pub tags: Option<TagDiff>,
}

impl ChangeSet {
    /// Fields that differ between `prior` and `desired`
    pub fn between(prior: &DesiredState, desired: &DesiredState) -> Self {
        let tags = prior.tags.diff(&desired.tags);
        Self {
            access_logs: prior.access_logs != desired.access_logs,
            enable_deletion_protection: prior.enable_deletion_protection
                != desired.enable_deletion_protection,
            idle_timeout: prior.idle_timeout != desired.idle_timeout,
            tags: (!tags.is_empty()).then_some(tags),
        }
    }

    /// Changes to push right after creation.
    ///
    /// Compared with a load balancer that has no attributes set: access logs
    /// and deletion protection only when enabled, the idle timeout always.
    /// Tags were already sent with the create request.
    pub fn bootstrap(desired: &DesiredState) -> Self {
        Self {
            access_logs: desired.access_logs.is_some(),
            enable_deletion_protection: desired.enable_deletion_protection,
            idle_timeout: true,
            tags: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.access_logs {
            names.push(FIELD_ACCESS_LOGS);
        }
        if self.enable_deletion_protection {
            names.push(FIELD_DELETION_PROTECTION);
        }
        if self.idle_timeout {
            names.push(FIELD_IDLE_TIMEOUT);
        }
        if self.tags.is_some() {
            names.push(FIELD_TAGS);
        }
        names
    }
}

/// Creation-time fields that differ; any entry forces a replacement
///
/// Undeclared security groups are left to the service, which attaches the
/// VPC default group, so they are not compared.
pub fn replacement_fields(prior: &DesiredState, desired: &DesiredState) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if prior.name != desired.name {
        fields.push("name");
    }
    if prior.internal != desired.internal {
        fields.push("internal");
    }
    if !desired.security_groups.is_empty() && prior.security_groups != desired.security_groups {
        fields.push("security_groups");
    }
    if prior.subnets != desired.subnets {
        fields.push("subnets");
    }
    fields
}
