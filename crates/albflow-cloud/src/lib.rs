//! albflow cloud infrastructure
//!
//! Provider abstraction shared by the albflow providers: the plan/apply
//! action model, the persisted state file, and the retry helper used for
//! eventually-consistent remote APIs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    alb CLI                       │
//! │            (plan / apply / destroy)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                albflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Retry/backoff│  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  aws (ALB)    │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod retry;
pub mod state;

// Re-exports
pub use action::{
    Action, ActionResult, ActionType, ApplyResult, DETAIL_CHANGES, DETAIL_REMOTE_ID, Plan,
    PlanSummary,
};
pub use error::{CloudError, Result};
pub use provider::{CloudProvider, ResourceConfig, ResourceSet};
pub use retry::{RetryConfig, RetryError, RetryFailure, retry};
pub use state::{GlobalState, ResourceState, ResourceStatus, StateLock, StateManager, resource_key};
