//! In-memory [`LoadBalancerApi`] for tests
//!
//! Behaves like the real service closely enough for the reconciler: fresh
//! load balancers carry the service's default attributes, unknown
//! identifiers are `LoadBalancerNotFound`, and deleting a missing load
//! balancer succeeds. Failures can be queued per operation, and every call
//! is recorded for later inspection.

use crate::api::{
    ApiError, ApiResult, Attribute, AvailabilityZone, CreateLoadBalancerRequest, LoadBalancer,
    LoadBalancerApi, LoadBalancerScheme, Tag, TagDescription,
};
use crate::attributes::{
    ACCESS_LOGS_BUCKET, ACCESS_LOGS_ENABLED, ACCESS_LOGS_PREFIX, DELETION_PROTECTION_ENABLED,
    IDLE_TIMEOUT_SECONDS,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const FAKE_VPC_ID: &str = "vpc-0fake";
pub const FAKE_ZONE_ID: &str = "Z35SXDOTRQ7X7K";

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Describe,
    DescribeTags,
    DescribeAttributes,
    ModifyAttributes,
    AddTags,
    RemoveTags,
    Delete,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateLoadBalancer(CreateLoadBalancerRequest),
    DescribeLoadBalancer(String),
    DescribeTags(String),
    DescribeAttributes(String),
    ModifyAttributes(String, Vec<Attribute>),
    AddTags(String, Vec<Tag>),
    RemoveTags(String, Vec<String>),
    DeleteLoadBalancer(String),
}

#[derive(Debug, Clone)]
struct StoredLoadBalancer {
    record: LoadBalancer,
    tags: Vec<Tag>,
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeState {
    load_balancers: BTreeMap<String, StoredLoadBalancer>,
    next_id: u64,
    calls: Vec<ApiCall>,
    queued_failures: HashMap<Operation, VecDeque<ApiError>>,
    persistent_create_failure: Option<ApiError>,
    create_response: Option<Vec<LoadBalancer>>,
    create_delay: Option<Duration>,
    describe_response: Option<Vec<LoadBalancer>>,
    empty_tag_descriptions: bool,
    default_security_group: Option<String>,
}

impl FakeState {
    fn take_failure(&mut self, operation: Operation) -> ApiResult<()> {
        if operation == Operation::Create {
            if let Some(err) = &self.persistent_create_failure {
                return Err(err.clone());
            }
        }
        match self
            .queued_failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stored(&self, id: &str) -> ApiResult<&StoredLoadBalancer> {
        self.load_balancers
            .get(id)
            .ok_or_else(|| ApiError::not_found(format!("One or more load balancers not found: {}", id)))
    }

    fn stored_mut(&mut self, id: &str) -> ApiResult<&mut StoredLoadBalancer> {
        self.load_balancers
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("Load balancer '{}' not found", id)))
    }
}

/// Attributes a freshly created load balancer reports
fn default_attributes() -> BTreeMap<String, String> {
    [
        (ACCESS_LOGS_ENABLED, "false"),
        (ACCESS_LOGS_BUCKET, ""),
        (ACCESS_LOGS_PREFIX, ""),
        (DELETION_PROTECTION_ENABLED, "false"),
        (IDLE_TIMEOUT_SECONDS, "60"),
        ("routing.http2.enabled", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// In-memory load-balancing service
#[derive(Debug, Default)]
pub struct FakeLoadBalancerApi {
    state: Mutex<FakeState>,
}

impl FakeLoadBalancerApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call of `operation` with `error`; queued errors are used in order
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.lock()
            .queued_failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Fail every create call with `error`
    pub fn fail_create_always(&self, error: ApiError) {
        self.lock().persistent_create_failure = Some(error);
    }

    /// Answer create calls with `records` instead of creating anything
    pub fn set_create_response(&self, records: Vec<LoadBalancer>) {
        self.lock().create_response = Some(records);
    }

    /// Make each create call take `delay` before answering
    pub fn set_create_delay(&self, delay: Duration) {
        self.lock().create_delay = Some(delay);
    }

    /// Answer describe calls with `records` for any identifier
    pub fn set_describe_response(&self, records: Vec<LoadBalancer>) {
        self.lock().describe_response = Some(records);
    }

    /// Answer tag queries with no descriptions at all
    pub fn set_empty_tag_descriptions(&self, empty: bool) {
        self.lock().empty_tag_descriptions = empty;
    }

    /// Attach `group` to load balancers created without security groups
    pub fn set_default_security_group(&self, group: impl Into<String>) {
        self.lock().default_security_group = Some(group.into());
    }

    /// Store a load balancer record as-is, with default attributes and no tags
    pub fn insert_load_balancer(&self, record: LoadBalancer) {
        self.lock().load_balancers.insert(
            record.arn.clone(),
            StoredLoadBalancer {
                record,
                tags: Vec::new(),
                attributes: default_attributes(),
            },
        );
    }

    /// Delete behind the reconciler's back
    pub fn remove_load_balancer(&self, id: &str) -> bool {
        self.lock().load_balancers.remove(id).is_some()
    }

    /// Overwrite one attribute; returns false when the load balancer is unknown
    pub fn set_attribute(&self, id: &str, key: &str, value: &str) -> bool {
        match self.lock().load_balancers.get_mut(id) {
            Some(lb) => {
                lb.attributes.insert(key.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, id: &str, key: &str) -> Option<String> {
        self.lock()
            .load_balancers
            .get(id)
            .and_then(|lb| lb.attributes.get(key).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().load_balancers.contains_key(id)
    }

    pub fn load_balancer_count(&self) -> usize {
        self.lock().load_balancers.len()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn create_attempts(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ApiCall::CreateLoadBalancer(_)))
            .count()
    }

    /// Every attribute list sent to `modify_attributes`, in order
    pub fn modify_requests(&self) -> Vec<Vec<Attribute>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::ModifyAttributes(_, attrs) => Some(attrs.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LoadBalancerApi for FakeLoadBalancerApi {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ApiResult<Vec<LoadBalancer>> {
        let delay = {
            let mut state = self.lock();
            state
                .calls
                .push(ApiCall::CreateLoadBalancer(request.clone()));
            state.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.take_failure(Operation::Create)?;
        if let Some(records) = &state.create_response {
            return Ok(records.clone());
        }
        if state
            .load_balancers
            .values()
            .any(|lb| lb.record.name == request.name)
        {
            return Err(ApiError::other(
                "DuplicateLoadBalancerName",
                format!("A load balancer with the name '{}' already exists", request.name),
            ));
        }

        state.next_id += 1;
        let n = state.next_id;
        let record = LoadBalancer {
            arn: format!(
                "arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/{}/{:016x}",
                request.name, n
            ),
            name: request.name.clone(),
            scheme: Some(
                request
                    .scheme
                    .unwrap_or(LoadBalancerScheme::InternetFacing)
                    .as_str()
                    .to_string(),
            ),
            security_groups: match &state.default_security_group {
                Some(group) if request.security_groups.is_empty() => vec![group.clone()],
                _ => request.security_groups.clone(),
            },
            availability_zones: request
                .subnets
                .iter()
                .enumerate()
                .map(|(i, subnet)| AvailabilityZone {
                    zone_name: Some(format!("us-east-1{}", char::from(b'a' + (i % 26) as u8))),
                    subnet_id: subnet.clone(),
                })
                .collect(),
            vpc_id: Some(FAKE_VPC_ID.to_string()),
            canonical_hosted_zone_id: Some(FAKE_ZONE_ID.to_string()),
            dns_name: Some(format!(
                "{}-{}.us-east-1.elb.amazonaws.com",
                request.name, n
            )),
        };
        state.load_balancers.insert(
            record.arn.clone(),
            StoredLoadBalancer {
                record: record.clone(),
                tags: request.tags.clone(),
                attributes: default_attributes(),
            },
        );
        Ok(vec![record])
    }

    async fn describe_load_balancer(&self, id: &str) -> ApiResult<Vec<LoadBalancer>> {
        let mut state = self.lock();
        state.calls.push(ApiCall::DescribeLoadBalancer(id.to_string()));
        state.take_failure(Operation::Describe)?;
        if let Some(records) = &state.describe_response {
            return Ok(records.clone());
        }
        Ok(vec![state.stored(id)?.record.clone()])
    }

    async fn describe_tags(&self, id: &str) -> ApiResult<Vec<TagDescription>> {
        let mut state = self.lock();
        state.calls.push(ApiCall::DescribeTags(id.to_string()));
        state.take_failure(Operation::DescribeTags)?;
        let lb = state.stored(id)?;
        if state.empty_tag_descriptions {
            return Ok(Vec::new());
        }
        Ok(vec![TagDescription {
            resource_id: id.to_string(),
            tags: lb.tags.clone(),
        }])
    }

    async fn describe_attributes(&self, id: &str) -> ApiResult<Vec<Attribute>> {
        let mut state = self.lock();
        state.calls.push(ApiCall::DescribeAttributes(id.to_string()));
        state.take_failure(Operation::DescribeAttributes)?;
        Ok(state
            .stored(id)?
            .attributes
            .iter()
            .map(|(k, v)| Attribute::new(k, v))
            .collect())
    }

    async fn modify_attributes(&self, id: &str, attributes: &[Attribute]) -> ApiResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(ApiCall::ModifyAttributes(id.to_string(), attributes.to_vec()));
        state.take_failure(Operation::ModifyAttributes)?;
        let lb = state.stored_mut(id)?;
        for attr in attributes {
            lb.attributes.insert(attr.key.clone(), attr.value.clone());
        }
        // disabled logging reports no destination
        if lb.attributes.get(ACCESS_LOGS_ENABLED).map(String::as_str) == Some("false") {
            lb.attributes.insert(ACCESS_LOGS_BUCKET.to_string(), String::new());
            lb.attributes.insert(ACCESS_LOGS_PREFIX.to_string(), String::new());
        }
        Ok(())
    }

    async fn add_tags(&self, id: &str, tags: &[Tag]) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.push(ApiCall::AddTags(id.to_string(), tags.to_vec()));
        state.take_failure(Operation::AddTags)?;
        let lb = state.stored_mut(id)?;
        for tag in tags {
            match lb.tags.iter_mut().find(|t| t.key == tag.key) {
                Some(existing) => existing.value = tag.value.clone(),
                None => lb.tags.push(tag.clone()),
            }
        }
        Ok(())
    }

    async fn remove_tags(&self, id: &str, keys: &[String]) -> ApiResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(ApiCall::RemoveTags(id.to_string(), keys.to_vec()));
        state.take_failure(Operation::RemoveTags)?;
        let lb = state.stored_mut(id)?;
        lb.tags.retain(|t| !keys.contains(&t.key));
        Ok(())
    }

    async fn delete_load_balancer(&self, id: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state
            .calls
            .push(ApiCall::DeleteLoadBalancer(id.to_string()));
        state.take_failure(Operation::Delete)?;
        state.load_balancers.remove(id);
        Ok(())
    }
}
