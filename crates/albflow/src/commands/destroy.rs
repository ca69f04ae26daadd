use crate::project::Project;
use albflow_cloud::CloudProvider;
use albflow_cloud_aws::{PROVIDER_NAME, RESOURCE_TYPE};
use colored::Colorize;

pub async fn handle(project: &Project, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let manager = project.state_manager();
    let state = manager.load().await?;

    let prefix = albflow_cloud_aws::state_key("");
    let targets: Vec<String> = match name {
        Some(name) => vec![name.to_string()],
        None => state
            .get_provider_resources(PROVIDER_NAME)
            .into_iter()
            .filter_map(|(key, _)| key.strip_prefix(&prefix).map(str::to_string))
            .collect(),
    };

    if targets.is_empty() {
        println!("{}", "削除対象の ALB はありません".dimmed());
        return Ok(());
    }

    println!("{}", format!("削除対象 ({} 個):", targets.len()).bold());
    for target in &targets {
        println!("  {} {}", "-".red().bold(), target.cyan());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!("{}", "警告: ALB を AWS から削除します。".yellow());
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;
    let provider = project.provider().await;

    let mut failures = 0;
    for target in &targets {
        match provider.destroy(RESOURCE_TYPE, target, &mut state).await {
            Ok(()) => println!("  {} {} を削除しました", "✓".green(), target),
            Err(e) => {
                failures += 1;
                eprintln!("  {} {}: {}", "✗".red(), target, e);
            }
        }
    }
    manager.save(&state).await?;
    lock.release().await?;

    if failures > 0 {
        anyhow::bail!("{} 件の削除に失敗しました", failures);
    }
    Ok(())
}
