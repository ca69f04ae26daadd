//! Translation between mutable settings and load balancer attributes

use crate::api::Attribute;
use crate::changes::ChangeSet;
use crate::error::{AlbError, Result};
use crate::model::{AccessLogs, DEFAULT_IDLE_TIMEOUT, DesiredState};

pub const ACCESS_LOGS_ENABLED: &str = "access_logs.s3.enabled";
pub const ACCESS_LOGS_BUCKET: &str = "access_logs.s3.bucket";
pub const ACCESS_LOGS_PREFIX: &str = "access_logs.s3.prefix";
pub const DELETION_PROTECTION_ENABLED: &str = "deletion_protection.enabled";
pub const IDLE_TIMEOUT_SECONDS: &str = "idle_timeout.timeout_seconds";

/// Attributes that (re)configure or disable access logging
pub fn access_log_attributes(logs: Option<&AccessLogs>) -> Vec<Attribute> {
    match logs {
        Some(logs) => {
            let mut attrs = vec![
                Attribute::new(ACCESS_LOGS_ENABLED, "true"),
                Attribute::new(ACCESS_LOGS_BUCKET, &logs.bucket),
            ];
            if let Some(prefix) = &logs.prefix {
                attrs.push(Attribute::new(ACCESS_LOGS_PREFIX, prefix));
            }
            attrs
        }
        None => vec![Attribute::new(ACCESS_LOGS_ENABLED, "false")],
    }
}

/// Attributes for every dirty attribute-backed field of `changes`
pub fn mutable_attributes(changes: &ChangeSet, desired: &DesiredState) -> Vec<Attribute> {
    let mut attrs = Vec::new();
    if changes.access_logs {
        attrs.extend(access_log_attributes(desired.access_logs.as_ref()));
    }
    if changes.enable_deletion_protection {
        attrs.push(Attribute::new(
            DELETION_PROTECTION_ENABLED,
            desired.enable_deletion_protection.to_string(),
        ));
    }
    if changes.idle_timeout {
        attrs.push(Attribute::new(
            IDLE_TIMEOUT_SECONDS,
            desired.idle_timeout.to_string(),
        ));
    }
    attrs
}

/// Mutable settings read back from the attribute list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedAttributes {
    pub access_logs: Option<AccessLogs>,
    pub enable_deletion_protection: bool,
    pub idle_timeout: u32,
}

impl ObservedAttributes {
    /// Extract the settings we manage; unknown keys are ignored.
    ///
    /// Access logs are reported only when the bucket or prefix is non-empty.
    /// An empty prefix reads back as "no prefix".
    pub fn parse(attributes: &[Attribute]) -> Result<Self> {
        let mut bucket = String::new();
        let mut prefix = String::new();
        let mut observed = ObservedAttributes {
            access_logs: None,
            enable_deletion_protection: false,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        };

        for attr in attributes {
            match attr.key.as_str() {
                ACCESS_LOGS_BUCKET => bucket = attr.value.clone(),
                ACCESS_LOGS_PREFIX => prefix = attr.value.clone(),
                IDLE_TIMEOUT_SECONDS => {
                    let timeout = attr.value.parse::<u32>().map_err(|source| AlbError::Parse {
                        key: attr.key.clone(),
                        value: attr.value.clone(),
                        source,
                    })?;
                    tracing::debug!("Setting ALB Timeout Seconds: {}", timeout);
                    observed.idle_timeout = timeout;
                }
                DELETION_PROTECTION_ENABLED => {
                    observed.enable_deletion_protection = attr.value == "true";
                    tracing::debug!(
                        "Setting ALB Deletion Protection Enabled: {}",
                        observed.enable_deletion_protection
                    );
                }
                _ => {}
            }
        }

        if !bucket.is_empty() || !prefix.is_empty() {
            observed.access_logs = Some(AccessLogs {
                bucket,
                prefix: (!prefix.is_empty()).then_some(prefix),
            });
        }
        tracing::debug!("Setting ALB Access Logs: {:?}", observed.access_logs);

        Ok(observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_and_values(attrs: &[Attribute]) -> Vec<(&str, &str)> {
        attrs
            .iter()
            .map(|a| (a.key.as_str(), a.value.as_str()))
            .collect()
    }

    #[test]
    fn test_access_logs_enabled_with_prefix() {
        let logs = AccessLogs::new("b").with_prefix("p");
        assert_eq!(
            keys_and_values(&access_log_attributes(Some(&logs))),
            vec![
                (ACCESS_LOGS_ENABLED, "true"),
                (ACCESS_LOGS_BUCKET, "b"),
                (ACCESS_LOGS_PREFIX, "p"),
            ]
        );
    }

    #[test]
    fn test_access_logs_prefix_only_when_declared() {
        let without = access_log_attributes(Some(&AccessLogs::new("b")));
        assert_eq!(without.len(), 2);

        let empty = access_log_attributes(Some(&AccessLogs::new("b").with_prefix("")));
        assert_eq!(empty[2], Attribute::new(ACCESS_LOGS_PREFIX, ""));
    }

    #[test]
    fn test_access_logs_disabled() {
        assert_eq!(
            keys_and_values(&access_log_attributes(None)),
            vec![(ACCESS_LOGS_ENABLED, "false")]
        );
    }

    #[test]
    fn test_mutable_attributes_only_dirty_fields() {
        let mut desired = DesiredState::new("web", ["subnet-a"]);
        desired.enable_deletion_protection = true;
        desired.idle_timeout = 300;

        let changes = ChangeSet {
            enable_deletion_protection: true,
            idle_timeout: true,
            ..Default::default()
        };
        assert_eq!(
            keys_and_values(&mutable_attributes(&changes, &desired)),
            vec![(DELETION_PROTECTION_ENABLED, "true"), (IDLE_TIMEOUT_SECONDS, "300")]
        );
        assert!(mutable_attributes(&ChangeSet::default(), &desired).is_empty());
    }

    #[test]
    fn test_parse_attributes() {
        let observed = ObservedAttributes::parse(&[
            Attribute::new(ACCESS_LOGS_ENABLED, "true"),
            Attribute::new(ACCESS_LOGS_BUCKET, "logs"),
            Attribute::new(ACCESS_LOGS_PREFIX, "web"),
            Attribute::new(DELETION_PROTECTION_ENABLED, "true"),
            Attribute::new(IDLE_TIMEOUT_SECONDS, "120"),
            Attribute::new("routing.http2.enabled", "true"),
        ])
        .unwrap();

        assert_eq!(
            observed,
            ObservedAttributes {
                access_logs: Some(AccessLogs::new("logs").with_prefix("web")),
                enable_deletion_protection: true,
                idle_timeout: 120,
            }
        );
    }

    #[test]
    fn test_parse_empty_access_logs() {
        let observed = ObservedAttributes::parse(&[
            Attribute::new(ACCESS_LOGS_ENABLED, "false"),
            Attribute::new(ACCESS_LOGS_BUCKET, ""),
            Attribute::new(ACCESS_LOGS_PREFIX, ""),
            Attribute::new(DELETION_PROTECTION_ENABLED, "false"),
        ])
        .unwrap();

        assert!(observed.access_logs.is_none());
        assert!(!observed.enable_deletion_protection);
        assert_eq!(observed.idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn test_parse_non_numeric_timeout() {
        let err = ObservedAttributes::parse(&[Attribute::new(IDLE_TIMEOUT_SECONDS, "abc")])
            .unwrap_err();

        match err {
            AlbError::Parse { key, value, .. } => {
                assert_eq!(key, IDLE_TIMEOUT_SECONDS);
                assert_eq!(value, "abc");
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }
}
