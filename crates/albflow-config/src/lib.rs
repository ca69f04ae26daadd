pub mod error;
pub mod manifest;

pub use error::*;
pub use manifest::{
    DEFAULT_CREATE_TIMEOUT_SECS, ENV_PROFILE, ENV_REGION, Manifest, ProviderSettings,
    load_manifest,
};

use std::path::PathBuf;

/// マニフェストのパスを直接指定する環境変数
pub const ENV_CONFIG_PATH: &str = "ALB_CONFIG_PATH";

const CANDIDATES: [&str; 4] = ["alb.local.yaml", ".alb.local.yaml", "alb.yaml", ".alb.yaml"];

/// albflowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("albflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのマニフェストを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ALB_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: alb.local.yaml, .alb.local.yaml, alb.yaml, .alb.yaml
/// 3. ./.albflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/albflow/alb.yaml (グローバル設定)
pub fn find_manifest_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} does not exist: {}", ENV_CONFIG_PATH, path.display());
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.albflow/ ディレクトリで検索
    let project_dir = current_dir.join(".albflow");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("albflow").join("alb.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ManifestNotFound)
}
