use crate::project::Project;
use anyhow::Context;
use colored::Colorize;

pub async fn handle(project: &Project, name: &str) -> anyhow::Result<()> {
    let state = project.state_manager().load().await?;
    let Some(entry) = state.get_resource(&albflow_cloud_aws::state_key(name)) else {
        anyhow::bail!("ALB '{}' は管理対象ではありません", name);
    };
    let provider = project.provider().await;
    println!("{} {}", name.cyan().bold(), format!("({})", entry.status).dimmed());

    match provider.show(name, &state).await? {
        Some(remote) => {
            let yaml = serde_yaml::to_string(&remote).context("表示用の変換に失敗しました")?;
            println!("{}", yaml);
        }
        None => {
            println!(
                "{}",
                format!("ALB {} は AWS 上に存在しません (alb refresh で状態から削除できます)", entry.id)
                    .yellow()
            );
        }
    }
    Ok(())
}
