use albflow_cloud::{ResourceConfig, ResourceSet, RetryConfig, StateManager};
use albflow_cloud_aws::{AlbProvider, ClientSettings, ElbV2Client, PROVIDER_NAME, RESOURCE_TYPE};
use albflow_config::Manifest;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// 読み込み済みのマニフェストと、状態ファイルを置くプロジェクトルート
pub struct Project {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

impl Project {
    pub fn load(file: Option<PathBuf>) -> anyhow::Result<Self> {
        let manifest_path = match file {
            Some(path) => path,
            None => albflow_config::find_manifest_file()?,
        };
        let manifest = albflow_config::load_manifest(&manifest_path).with_context(|| {
            format!(
                "マニフェストの読み込みに失敗しました: {}",
                manifest_path.display()
            )
        })?;
        let root = std::env::current_dir()?;

        Ok(Self {
            root,
            manifest_path,
            manifest,
        })
    }

    pub fn resource_set(&self) -> ResourceSet {
        let mut resources = ResourceSet::new();
        for (name, body) in &self.manifest.load_balancers {
            resources.add(ResourceConfig::new(
                RESOURCE_TYPE,
                name,
                PROVIDER_NAME,
                body.clone(),
            ));
        }
        resources
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }

    pub async fn provider(&self) -> AlbProvider<ElbV2Client> {
        let settings = &self.manifest.provider;
        let client = ElbV2Client::from_settings(&ClientSettings {
            region: settings.region.clone(),
            profile: settings.profile.clone(),
            endpoint_url: settings.endpoint_url.clone(),
        })
        .await;

        AlbProvider::new(client).with_create_retry(RetryConfig::with_timeout(Duration::from_secs(
            settings.create_timeout_secs,
        )))
    }
}
