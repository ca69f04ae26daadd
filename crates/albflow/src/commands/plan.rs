use crate::project::Project;
use crate::utils;
use albflow_cloud::CloudProvider;
use colored::Colorize;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "変更計画を作成中...".blue());
    utils::print_manifest_path(project);

    let state = project.state_manager().load().await?;
    let provider = project.provider().await;
    let plan = provider.plan(&project.resource_set(), &state).await?;

    utils::print_plan(&plan);
    if plan.has_changes {
        println!();
        println!("適用するには {} を実行してください", "alb apply --yes".cyan());
    } else {
        println!("{}", "✓ 変更はありません".green());
    }

    Ok(())
}
