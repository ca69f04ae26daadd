//! Create / read / update / delete for a single Application Load Balancer
//!
//! Creation is two-phase: [`Reconciler::create_load_balancer`] sends the
//! creation-time fields, then [`Reconciler::configure`] pushes the
//! attributes that the create call cannot carry. [`Reconciler::create`]
//! runs both. Every mutation ends with a fresh [`Reconciler::read`].

use crate::api::{LoadBalancer, LoadBalancerApi, SCHEME_INTERNAL};
use crate::attributes::{ObservedAttributes, mutable_attributes};
use crate::changes::ChangeSet;
use crate::error::{AlbError, Result};
use crate::model::{DesiredState, RemoteState};
use crate::tags::{TagDiff, Tags};
use albflow_cloud::{CloudError, RetryConfig, RetryError, RetryFailure, retry};

/// Drives one load balancer through its lifecycle against `api`
pub struct Reconciler<'a, A: LoadBalancerApi + ?Sized> {
    api: &'a A,
    create_retry: RetryConfig,
}

impl<'a, A: LoadBalancerApi + ?Sized> Reconciler<'a, A> {
    /// Reconciler with the default one minute create budget
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            create_retry: RetryConfig::default(),
        }
    }

    pub fn with_create_retry(mut self, create_retry: RetryConfig) -> Self {
        self.create_retry = create_retry;
        self
    }

    /// Create the load balancer and push its attributes.
    ///
    /// If the second phase fails the error is [`AlbError::Configure`],
    /// carrying the identifier of the load balancer that now exists.
    pub async fn create(&self, desired: &DesiredState) -> Result<RemoteState> {
        let id = self.create_load_balancer(desired).await?;
        self.configure(&id, desired)
            .await
            .map_err(|source| AlbError::Configure {
                id,
                source: Box::new(source),
            })
    }

    /// Phase one: create from the immutable fields and return the identifier
    pub async fn create_load_balancer(&self, desired: &DesiredState) -> Result<String> {
        desired.validate()?;

        let request = desired.create_request();
        tracing::debug!("ALB create configuration: {:?}", request);

        let api = self.api;
        let request = &request;
        let name = desired.name.as_str();
        let created = retry(&self.create_retry, move || async move {
            let records = api.create_load_balancer(request).await.map_err(|e| {
                let retryable = e.is_retryable();
                let err = AlbError::remote("create load balancer", name, e);
                if retryable {
                    RetryError::Retryable(err)
                } else {
                    RetryError::NonRetryable(err)
                }
            })?;
            exactly_one("create load balancer", name, records).map_err(RetryError::NonRetryable)
        })
        .await
        .map_err(|failure| match failure {
            RetryFailure::Aborted(e) => e,
            RetryFailure::TimedOut {
                elapsed,
                attempts,
                last,
            } => AlbError::Timeout {
                operation: "create load balancer",
                elapsed,
                attempts,
                last: last.map(Box::new),
            },
        })?;

        tracing::info!("ALB ID: {}", created.arn);
        Ok(created.arn)
    }

    /// Phase two: push the attributes a freshly created load balancer needs
    pub async fn configure(&self, id: &str, desired: &DesiredState) -> Result<RemoteState> {
        self.update(id, desired, &ChangeSet::bootstrap(desired)).await
    }

    /// Fetch the current state; `Ok(None)` when the load balancer no longer exists
    pub async fn read(&self, id: &str) -> Result<Option<RemoteState>> {
        let records = match self.api.describe_load_balancer(id).await {
            Ok(records) => records,
            Err(e) if e.is_not_found() => {
                tracing::info!("ALB {} is gone", id);
                return Ok(None);
            }
            Err(e) => return Err(AlbError::remote("describe load balancer", id, e)),
        };
        let lb = exactly_one("describe load balancer", id, records)?;

        let tag_descriptions = self
            .api
            .describe_tags(&lb.arn)
            .await
            .map_err(|e| AlbError::remote("describe ALB tags", id, e))?;
        let tags = tag_descriptions
            .first()
            .map(|d| Tags::from_api(&d.tags))
            .unwrap_or_default();

        let attributes = self
            .api
            .describe_attributes(id)
            .await
            .map_err(|e| AlbError::remote("describe ALB attributes", id, e))?;
        let observed = ObservedAttributes::parse(&attributes)?;

        Ok(Some(RemoteState {
            internal: lb.scheme.as_deref() == Some(SCHEME_INTERNAL),
            subnets: lb
                .availability_zones
                .iter()
                .map(|az| az.subnet_id.clone())
                .collect(),
            id: lb.arn,
            name: lb.name,
            security_groups: lb.security_groups,
            access_logs: observed.access_logs,
            enable_deletion_protection: observed.enable_deletion_protection,
            idle_timeout: observed.idle_timeout,
            tags,
            vpc_id: lb.vpc_id,
            zone_id: lb.canonical_hosted_zone_id,
            dns_name: lb.dns_name,
        }))
    }

    /// Push the fields marked in `changes`, then read back.
    pub async fn update(
        &self,
        id: &str,
        desired: &DesiredState,
        changes: &ChangeSet,
    ) -> Result<RemoteState> {
        if let Some(diff) = &changes.tags {
            self.apply_tag_diff(id, diff).await?;
        }

        let attributes = mutable_attributes(changes, desired);
        if !attributes.is_empty() {
            tracing::debug!(
                "ALB Modify Load Balancer Attributes Request: {} {:?}",
                id,
                attributes
            );
            self.api
                .modify_attributes(id, &attributes)
                .await
                .map_err(|e| AlbError::remote("configure ALB attributes", id, e))?;
        }

        self.read(id).await?.ok_or_else(|| AlbError::Vanished {
            id: id.to_string(),
        })
    }

    async fn apply_tag_diff(&self, id: &str, diff: &TagDiff) -> Result<()> {
        if !diff.remove.is_empty() {
            tracing::debug!("Removing ALB tags from {}: {:?}", id, diff.remove);
            self.api
                .remove_tags(id, &diff.remove)
                .await
                .map_err(|e| AlbError::remote("remove ALB tags", id, e))?;
        }
        if !diff.upsert.is_empty() {
            tracing::debug!("Adding ALB tags to {}: {:?}", id, diff.upsert);
            self.api
                .add_tags(id, &diff.upsert)
                .await
                .map_err(|e| AlbError::remote("add ALB tags", id, e))?;
        }
        Ok(())
    }

    /// Delete the load balancer. Not retried.
    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting ALB: {}", id);
        self.api
            .delete_load_balancer(id)
            .await
            .map_err(|e| AlbError::remote("delete ALB", id, e))
    }

    /// Read an existing load balancer that is not yet managed
    pub async fn import(&self, id: &str) -> Result<RemoteState> {
        self.read(id)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()).into())
    }
}

fn exactly_one(operation: &'static str, id: &str, records: Vec<LoadBalancer>) -> Result<LoadBalancer> {
    if records.len() != 1 {
        return Err(AlbError::Cardinality {
            operation,
            id: id.to_string(),
            count: records.len(),
        });
    }
    records.into_iter().next().ok_or_else(|| AlbError::Cardinality {
        operation,
        id: id.to_string(),
        count: 0,
    })
}
