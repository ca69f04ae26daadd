//! [`LoadBalancerApi`] backed by the AWS SDK

use crate::api::{
    ApiError, ApiResult, Attribute, AvailabilityZone, CreateLoadBalancerRequest, LoadBalancer,
    LoadBalancerApi, Tag, TagDescription,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_elasticloadbalancingv2 as elbv2;
use elbv2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use elbv2::types::{LoadBalancerAttribute, LoadBalancerSchemeEnum, LoadBalancerTypeEnum};

/// Where and as whom to connect
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Override the service endpoint (e.g. LocalStack)
    pub endpoint_url: Option<String>,
}

/// Elastic Load Balancing v2 client
#[derive(Debug, Clone)]
pub struct ElbV2Client {
    client: elbv2::Client,
}

impl ElbV2Client {
    pub fn new(client: elbv2::Client) -> Self {
        Self { client }
    }

    /// Build from the default credential chain plus `settings`
    pub async fn from_settings(settings: &ClientSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let mut builder = elbv2::config::Builder::from(&sdk_config);
        if let Some(url) = &settings.endpoint_url {
            tracing::debug!("Using ELBv2 endpoint: {}", url);
            builder = builder.endpoint_url(url);
        }
        Self::new(elbv2::Client::from_conf(builder.build()))
    }
}

fn api_error<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some(code) => {
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            ApiError::from_code(code, message)
        }
        None => ApiError::other("SdkError", DisplayErrorContext(&err).to_string()),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

fn to_sdk_tags(tags: &[Tag]) -> Vec<elbv2::types::Tag> {
    tags.iter()
        .map(|t| {
            elbv2::types::Tag::builder()
                .key(&t.key)
                .value(&t.value)
                .build()
        })
        .collect()
}

fn from_sdk_tags(tags: &[elbv2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .map(|t| Tag::new(t.key().unwrap_or_default(), t.value().unwrap_or_default()))
        .collect()
}

fn from_sdk_load_balancer(lb: &elbv2::types::LoadBalancer) -> LoadBalancer {
    LoadBalancer {
        arn: lb.load_balancer_arn().unwrap_or_default().to_string(),
        name: lb.load_balancer_name().unwrap_or_default().to_string(),
        scheme: lb.scheme().map(|s| s.as_str().to_string()),
        security_groups: lb.security_groups().to_vec(),
        availability_zones: lb
            .availability_zones()
            .iter()
            .map(|az| AvailabilityZone {
                zone_name: az.zone_name().map(str::to_string),
                subnet_id: az.subnet_id().unwrap_or_default().to_string(),
            })
            .collect(),
        vpc_id: lb.vpc_id().map(str::to_string),
        canonical_hosted_zone_id: lb.canonical_hosted_zone_id().map(str::to_string),
        dns_name: lb.dns_name().map(str::to_string),
    }
}

#[async_trait]
impl LoadBalancerApi for ElbV2Client {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ApiResult<Vec<LoadBalancer>> {
        let output = self
            .client
            .create_load_balancer()
            .name(&request.name)
            .r#type(LoadBalancerTypeEnum::Application)
            .set_scheme(
                request
                    .scheme
                    .map(|s| LoadBalancerSchemeEnum::from(s.as_str())),
            )
            .set_security_groups(non_empty(request.security_groups.clone()))
            .set_subnets(Some(request.subnets.clone()))
            .set_tags(non_empty(to_sdk_tags(&request.tags)))
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .load_balancers()
            .iter()
            .map(from_sdk_load_balancer)
            .collect())
    }

    async fn describe_load_balancer(&self, id: &str) -> ApiResult<Vec<LoadBalancer>> {
        let output = self
            .client
            .describe_load_balancers()
            .load_balancer_arns(id)
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .load_balancers()
            .iter()
            .map(from_sdk_load_balancer)
            .collect())
    }

    async fn describe_tags(&self, id: &str) -> ApiResult<Vec<TagDescription>> {
        let output = self
            .client
            .describe_tags()
            .resource_arns(id)
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .tag_descriptions()
            .iter()
            .map(|d| TagDescription {
                resource_id: d.resource_arn().unwrap_or_default().to_string(),
                tags: from_sdk_tags(d.tags()),
            })
            .collect())
    }

    async fn describe_attributes(&self, id: &str) -> ApiResult<Vec<Attribute>> {
        let output = self
            .client
            .describe_load_balancer_attributes()
            .load_balancer_arn(id)
            .send()
            .await
            .map_err(api_error)?;

        Ok(output
            .attributes()
            .iter()
            .map(|a| Attribute::new(a.key().unwrap_or_default(), a.value().unwrap_or_default()))
            .collect())
    }

    async fn modify_attributes(&self, id: &str, attributes: &[Attribute]) -> ApiResult<()> {
        let attributes = attributes
            .iter()
            .map(|a| {
                LoadBalancerAttribute::builder()
                    .key(&a.key)
                    .value(&a.value)
                    .build()
            })
            .collect();

        self.client
            .modify_load_balancer_attributes()
            .load_balancer_arn(id)
            .set_attributes(Some(attributes))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn add_tags(&self, id: &str, tags: &[Tag]) -> ApiResult<()> {
        self.client
            .add_tags()
            .resource_arns(id)
            .set_tags(Some(to_sdk_tags(tags)))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn remove_tags(&self, id: &str, keys: &[String]) -> ApiResult<()> {
        self.client
            .remove_tags()
            .resource_arns(id)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn delete_load_balancer(&self, id: &str) -> ApiResult<()> {
        self.client
            .delete_load_balancer()
            .load_balancer_arn(id)
            .send()
            .await
            .map_err(api_error)?;
        Ok(())
    }
}
