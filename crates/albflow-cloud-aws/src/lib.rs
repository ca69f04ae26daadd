//! AWS Application Load Balancer provider for albflow
//!
//! This crate implements the CloudProvider trait for Elastic Load Balancing
//! v2, managing Application Load Balancers and their attributes.
//!
//! # Features
//!
//! - Two-phase create (immutable fields, then attributes) with retries
//!   while freshly created subnets and security groups propagate
//! - Access logs, deletion protection, idle timeout and tags updated in place
//! - Import of existing load balancers
//!
//! # Requirements
//!
//! - AWS credentials available through the default credential chain
//!
//! # Example
//!
//! ```ignore
//! use albflow_cloud_aws::{AlbProvider, ClientSettings, ElbV2Client};
//! use albflow_cloud::{CloudProvider, GlobalState, ResourceSet};
//!
//! let client = ElbV2Client::from_settings(&ClientSettings::default()).await;
//! let provider = AlbProvider::new(client);
//!
//! let plan = provider.plan(&desired, &state).await?;
//! let result = provider.apply(&plan, &desired, &mut state).await?;
//! ```

pub mod api;
pub mod attributes;
pub mod changes;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod model;
pub mod provider;
pub mod reconciler;
pub mod tags;
pub mod validation;

pub use api::{
    ApiError, ApiErrorKind, ApiResult, Attribute, AvailabilityZone, CreateLoadBalancerRequest,
    LoadBalancer, LoadBalancerApi, LoadBalancerScheme, Tag, TagDescription,
};
pub use changes::ChangeSet;
pub use client::{ClientSettings, ElbV2Client};
pub use error::{AlbError, Result};
pub use model::{AccessLogs, DesiredState, LoadBalancerConfig, RemoteState};
pub use provider::{AlbProvider, PROVIDER_NAME, RESOURCE_TYPE, state_key};
pub use reconciler::Reconciler;
pub use tags::{TagDiff, Tags};
pub use validation::validate_name;
