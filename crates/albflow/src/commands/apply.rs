use crate::project::Project;
use crate::utils;
use albflow_cloud::{ApplyResult, CloudProvider, Plan, ResourceSet, StateManager};
use colored::Colorize;

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    println!("{}", "変更を適用します...".blue().bold());
    utils::print_manifest_path(project);

    let manager = project.state_manager();
    let state = manager.load().await?;
    let provider = project.provider().await;
    let desired = project.resource_set();
    let plan = provider.plan(&desired, &state).await?;

    utils::print_plan(&plan);
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません".green());
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            "警告: 上記の変更を AWS に適用します。再作成・削除される ALB に注意してください。"
                .yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let (_, result) = apply_locked(&manager, &provider, &desired).await?;
    utils::print_apply_result(&result);

    if !result.is_success() {
        anyhow::bail!("{} 件のアクションが失敗しました", result.failed.len());
    }
    println!("{}", "✓ 適用が完了しました".green().bold());
    Ok(())
}

/// ロックを取ったうえで状態を読み直し、計画し直してから適用する
async fn apply_locked<P: CloudProvider>(
    manager: &StateManager,
    provider: &P,
    desired: &ResourceSet,
) -> anyhow::Result<(Plan, ApplyResult)> {
    let lock = manager.acquire_lock().await?;
    // ロック取得までに他プロセスが書き換えている可能性がある
    let mut state = manager.load().await?;
    let plan = provider.plan(desired, &state).await?;

    let result = provider.apply(&plan, desired, &mut state).await;
    // 失敗したアクションがあっても、成功分と tainted の記録は残す
    manager.save(&state).await?;
    lock.release().await?;

    Ok((plan, result?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use albflow_cloud::{ActionType, GlobalState, ResourceConfig};
    use albflow_cloud_aws::fake::FakeLoadBalancerApi;
    use albflow_cloud_aws::{AlbProvider, PROVIDER_NAME, RESOURCE_TYPE};

    fn web() -> ResourceSet {
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new(
            RESOURCE_TYPE,
            "web",
            PROVIDER_NAME,
            serde_json::json!({ "name": "web", "subnets": ["subnet-a"] }),
        ));
        set
    }

    #[tokio::test]
    async fn test_apply_replans_against_state_written_meanwhile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        let provider = AlbProvider::new(FakeLoadBalancerApi::new());
        let desired = web();

        // 確認待ちの間に計画した内容
        let stale = provider.plan(&desired, &GlobalState::new()).await.unwrap();
        assert_eq!(stale.summary().create, 1);

        // 別プロセスが先に適用した
        let (first, _) = apply_locked(&manager, &provider, &desired).await.unwrap();
        assert_eq!(first.summary().create, 1);

        let (plan, result) = apply_locked(&manager, &provider, &desired).await.unwrap();

        assert!(plan.actions.iter().all(|a| a.action_type == ActionType::NoOp));
        assert!(result.is_success());
        assert_eq!(provider.api().load_balancer_count(), 1);
        assert!(!temp_dir.path().join(".albflow/lock.json").exists());
    }
}
