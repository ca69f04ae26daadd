mod commands;
mod project;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alb")]
#[command(about = "宣言したとおりの ALB を。YAML から AWS Application Load Balancer を管理", long_about = None)]
struct Cli {
    /// マニフェストのパス (省略時は alb.yaml などを自動検索)
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,

    /// 詳細ログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 変更計画を表示
    Plan,
    /// 変更計画を適用
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 管理中の ALB を再取得して状態ファイルを更新
    Refresh,
    /// ALB の現在の状態を表示
    Show {
        /// マニフェスト上の名前
        name: String,
    },
    /// 既存の ALB を管理対象に取り込む
    Import {
        /// マニフェスト上の名前
        name: String,
        /// 取り込む ALB の ARN
        arn: String,
    },
    /// ALB を削除
    Destroy {
        /// マニフェスト上の名前 (省略時は管理中の全 ALB)
        name: Option<String>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// マニフェストを検証 (AWS には接続しない)
    Validate,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ。RUST_LOG があればそちらを優先
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("albflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = project::Project::load(cli.file)?;

    match cli.command {
        Commands::Plan => commands::plan::handle(&project).await?,
        Commands::Apply { yes } => commands::apply::handle(&project, yes).await?,
        Commands::Refresh => commands::refresh::handle(&project).await?,
        Commands::Show { name } => commands::show::handle(&project, &name).await?,
        Commands::Import { name, arn } => commands::import::handle(&project, &name, &arn).await?,
        Commands::Destroy { name, yes } => {
            commands::destroy::handle(&project, name.as_deref(), yes).await?
        }
        Commands::Validate => commands::validate::handle(&project)?,
        Commands::Version => unreachable!("Version is handled before manifest loading"),
    }

    Ok(())
}
