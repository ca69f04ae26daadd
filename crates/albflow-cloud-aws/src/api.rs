//! Remote load-balancing API boundary
//!
//! [`LoadBalancerApi`] is the narrow surface the reconciler talks to. The
//! production implementation lives in [`crate::client`]; tests use the
//! in-memory fake from `crate::fake`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheme value the API uses for internal-only load balancers
pub const SCHEME_INTERNAL: &str = "internal";

/// Error codes the API returns while freshly created subnets or security
/// groups are not yet visible to the load-balancing service.
const NOT_YET_CONSISTENT_CODES: &[&str] = &["SubnetNotFound", "InvalidSubnet", "InvalidSecurityGroup"];

const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

const NOT_FOUND_CODES: &[&str] = &["LoadBalancerNotFound"];

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    NotYetConsistent,
    Throttled,
    Other,
}

/// Failure reported by the remote API, classified for retry decisions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify by the API's error code
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if NOT_FOUND_CODES.contains(&code.as_str()) {
            ApiErrorKind::NotFound
        } else if NOT_YET_CONSISTENT_CODES.contains(&code.as_str()) {
            ApiErrorKind::NotYetConsistent
        } else if THROTTLING_CODES.contains(&code.as_str()) {
            ApiErrorKind::Throttled
        } else {
            ApiErrorKind::Other
        };
        Self::new(kind, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, "LoadBalancerNotFound", message)
    }

    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Other, code, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::NotYetConsistent | ApiErrorKind::Throttled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerScheme {
    Internal,
    InternetFacing,
}

impl LoadBalancerScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerScheme::Internal => SCHEME_INTERNAL,
            LoadBalancerScheme::InternetFacing => "internet-facing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Flat key/value setting on a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLoadBalancerRequest {
    pub name: String,
    /// `None` leaves the API default (internet-facing)
    pub scheme: Option<LoadBalancerScheme>,
    pub security_groups: Vec<String>,
    pub subnets: Vec<String>,
    pub tags: Vec<Tag>,
}

/// One subnet in one availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityZone {
    pub zone_name: Option<String>,
    pub subnet_id: String,
}

/// Load balancer record as returned by create/describe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub arn: String,
    pub name: String,
    pub scheme: Option<String>,
    pub security_groups: Vec<String>,
    pub availability_zones: Vec<AvailabilityZone>,
    pub vpc_id: Option<String>,
    pub canonical_hosted_zone_id: Option<String>,
    pub dns_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDescription {
    pub resource_id: String,
    pub tags: Vec<Tag>,
}

/// Remote load-balancing API
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ApiResult<Vec<LoadBalancer>>;

    /// Describe by identifier; a missing load balancer is an error of kind `NotFound`
    async fn describe_load_balancer(&self, id: &str) -> ApiResult<Vec<LoadBalancer>>;

    async fn describe_tags(&self, id: &str) -> ApiResult<Vec<TagDescription>>;

    async fn describe_attributes(&self, id: &str) -> ApiResult<Vec<Attribute>>;

    async fn modify_attributes(&self, id: &str, attributes: &[Attribute]) -> ApiResult<()>;

    async fn add_tags(&self, id: &str, tags: &[Tag]) -> ApiResult<()>;

    async fn remove_tags(&self, id: &str, keys: &[String]) -> ApiResult<()>;

    async fn delete_load_balancer(&self, id: &str) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ApiError::from_code("LoadBalancerNotFound", "gone").is_not_found());
        assert!(ApiError::from_code("SubnetNotFound", "subnet-1").is_retryable());
        assert!(ApiError::from_code("Throttling", "slow down").is_retryable());

        let denied = ApiError::from_code("AccessDenied", "no");
        assert_eq!(denied.kind, ApiErrorKind::Other);
        assert!(!denied.is_retryable());
        assert!(!denied.is_not_found());
    }

    #[test]
    fn test_scheme_strings() {
        assert_eq!(LoadBalancerScheme::Internal.as_str(), "internal");
        assert_eq!(LoadBalancerScheme::InternetFacing.as_str(), "internet-facing");
    }
}
