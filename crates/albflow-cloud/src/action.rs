//! Planned actions and apply results

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Details key holding the list of dirty field names of an update
pub const DETAIL_CHANGES: &str = "changes";

/// Details key holding the remote identifier an action operates on
pub const DETAIL_REMOTE_ID: &str = "remote_id";

/// A single planned step against one managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (`<type>-<key>`)
    pub id: String,

    pub action_type: ActionType,

    /// Resource type (e.g., "alb")
    pub resource_type: String,

    /// Manifest key of the resource
    pub resource_key: String,

    /// Human readable description
    pub description: String,

    /// Additional details (changed fields, remote identifier, ...)
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_key: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_key = resource_key.into();
        Self {
            id: format!("{}-{}", action_type, resource_key),
            action_type,
            resource_type: resource_type.into(),
            resource_key,
            description: description.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Names of the fields an update action touches
    pub fn changes(&self) -> Vec<String> {
        self.details
            .get(DETAIL_CHANGES)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Remote identifier recorded for the action, if any
    pub fn remote_id(&self) -> Option<&str> {
        self.details.get(DETAIL_REMOTE_ID).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    /// Mutable attributes changed in place
    Update,
    /// An immutable field changed: delete, then create
    Replace,
    Delete,
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: impl Into<String>, message: impl Into<String>) {
        self.succeeded.push(ActionResult {
            action_id: action_id.into(),
            success: true,
            message: message.into(),
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: impl Into<String>, error: impl Into<String>) {
        self.failed.push(ActionResult {
            action_id: action_id.into(),
            success: false,
            message: String::new(),
            error: Some(error.into()),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Ordered list of actions produced by a provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,

    /// Whether any action is something other than a no-op
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            Action::new(ActionType::Create, "alb", "web", "create web"),
            Action::new(ActionType::Update, "alb", "api", "update api")
                .with_detail(DETAIL_CHANGES, serde_json::json!(["idle_timeout"])),
            Action::new(ActionType::NoOp, "alb", "internal", "unchanged"),
        ]);

        assert!(plan.has_changes);
        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(
            summary.to_string(),
            "1 to create, 1 to update, 0 to replace, 0 to delete, 1 unchanged"
        );
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan = Plan::new(vec![Action::new(ActionType::NoOp, "alb", "web", "")]);
        assert!(!plan.has_changes);
        assert!(!Plan::empty().has_changes);
    }

    #[test]
    fn test_action_details() {
        let action = Action::new(ActionType::Update, "alb", "web", "update web")
            .with_detail(
                DETAIL_CHANGES,
                serde_json::json!(["access_logs", "idle_timeout"]),
            )
            .with_detail(DETAIL_REMOTE_ID, serde_json::json!("arn:aws:lb:1"));

        assert_eq!(action.id, "update-web");
        assert_eq!(action.changes(), vec!["access_logs", "idle_timeout"]);
        assert_eq!(action.remote_id(), Some("arn:aws:lb:1"));
    }
}
