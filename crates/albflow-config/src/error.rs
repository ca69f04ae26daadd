use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: alb.local.yaml, .alb.local.yaml, alb.yaml, .alb.yaml\n\
        - ./.albflow/ ディレクトリ\n\
        - ~/.config/albflow/alb.yaml\n\
        または ALB_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("マニフェストの解析に失敗しました ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("不正な設定値: {0}")]
    Invalid(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
