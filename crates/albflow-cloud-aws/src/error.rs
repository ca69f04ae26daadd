//! ALB provider error types

use crate::api::ApiError;
use albflow_cloud::CloudError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlbError {
    /// Rejected before any remote call was made
    #[error("Invalid load balancer configuration: {0}")]
    Validation(String),

    #[error("Failed to {operation} ({id}): {source}")]
    RemoteCall {
        operation: &'static str,
        id: String,
        #[source]
        source: ApiError,
    },

    /// The API answered with an unexpected number of records
    #[error("Expected exactly one load balancer from {operation} ({id}), got {count}")]
    Cardinality {
        operation: &'static str,
        id: String,
        count: usize,
    },

    #[error("Failed to parse ALB attribute {key}={value:?}: {source}")]
    Parse {
        key: String,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Timed out after {elapsed:?} ({attempts} attempts) waiting to {operation}{}", last_error_suffix(.last))]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
        attempts: u32,
        last: Option<Box<AlbError>>,
    },

    /// Phase one of create succeeded but pushing attributes failed
    #[error("Load balancer {id} was created but could not be configured: {source}")]
    Configure {
        id: String,
        #[source]
        source: Box<AlbError>,
    },

    /// Provider input that could not be turned into a desired state
    #[error("Invalid provider input for {key}: {message}")]
    Config { key: String, message: String },

    /// A load balancer disappeared right after being mutated
    #[error("Load balancer {id} disappeared while being reconciled")]
    Vanished { id: String },

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),
}

fn last_error_suffix(last: &Option<Box<AlbError>>) -> String {
    last.as_ref()
        .map(|e| format!(" (last error: {})", e))
        .unwrap_or_default()
}

impl AlbError {
    pub fn remote(operation: &'static str, id: impl Into<String>, source: ApiError) -> Self {
        AlbError::RemoteCall {
            operation,
            id: id.into(),
            source,
        }
    }

    /// Whether the remote API reported the load balancer as missing
    pub fn is_not_found(&self) -> bool {
        match self {
            AlbError::RemoteCall { source, .. } => source.is_not_found(),
            AlbError::Vanished { .. } => true,
            AlbError::Cloud(CloudError::ResourceNotFound(_)) => true,
            _ => false,
        }
    }
}

impl From<AlbError> for CloudError {
    fn from(err: AlbError) -> Self {
        match err {
            AlbError::Cloud(e) => e,
            AlbError::Validation(msg) => CloudError::InvalidConfig(msg),
            e @ AlbError::Config { .. } => CloudError::InvalidConfig(e.to_string()),
            AlbError::Vanished { id } => CloudError::ResourceNotFound(id),
            e @ AlbError::Timeout { .. } => CloudError::Timeout(e.to_string()),
            e => CloudError::ApiError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlbError>;
