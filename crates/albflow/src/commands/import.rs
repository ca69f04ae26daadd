use crate::project::Project;
use albflow_cloud::CloudProvider;
use albflow_cloud_aws::RESOURCE_TYPE;
use colored::Colorize;

pub async fn handle(project: &Project, name: &str, arn: &str) -> anyhow::Result<()> {
    println!("{}", format!("ALB {} を取り込み中...", arn).blue());

    if !project.manifest.load_balancers.contains_key(name) {
        println!(
            "{}",
            format!(
                "警告: '{}' はマニフェストに宣言されていません。次回の apply で削除されます。",
                name
            )
            .yellow()
        );
    }

    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;
    let provider = project.provider().await;

    provider.import(RESOURCE_TYPE, name, arn, &mut state).await?;
    manager.save(&state).await?;
    lock.release().await?;

    println!("{}", format!("✓ {} として取り込みました", name).green());
    Ok(())
}
