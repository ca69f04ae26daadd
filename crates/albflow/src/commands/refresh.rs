use crate::project::Project;
use crate::utils;
use albflow_cloud::CloudProvider;
use colored::Colorize;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "管理中の ALB を再取得中...".blue());

    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;
    let provider = project.provider().await;

    let result = provider.refresh(&mut state).await;
    manager.save(&state).await?;
    lock.release().await?;

    let result = result?;
    utils::print_apply_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} 件の ALB を取得できませんでした", result.failed.len());
    }
    Ok(())
}
