use crate::project::Project;
use albflow_cloud::{ActionType, ApplyResult, Plan};
use colored::Colorize;

pub fn print_manifest_path(project: &Project) {
    println!(
        "マニフェスト: {}",
        project.manifest_path.display().to_string().cyan()
    );
}

fn action_symbol(action_type: ActionType) -> colored::ColoredString {
    match action_type {
        ActionType::Create => "+".green().bold(),
        ActionType::Update => "~".yellow().bold(),
        ActionType::Replace => "-/+".magenta().bold(),
        ActionType::Delete => "-".red().bold(),
        ActionType::NoOp => " ".normal(),
    }
}

pub fn print_plan(plan: &Plan) {
    println!();
    if plan.actions.is_empty() {
        println!("{}", "管理対象の ALB はありません".dimmed());
        return;
    }

    for action in &plan.actions {
        let line = format!(
            "  {} {} {}",
            action_symbol(action.action_type),
            action.resource_key.cyan(),
            action.description
        );
        if action.action_type == ActionType::NoOp {
            println!("{}", line.dimmed());
        } else {
            println!("{}", line);
        }
        if let Some(id) = action.remote_id() {
            if action.action_type != ActionType::NoOp {
                println!("      {}", id.dimmed());
            }
        }
    }

    println!();
    println!("{}", format!("計画: {}", plan.summary()).bold());
}

pub fn print_apply_result(result: &ApplyResult) {
    println!();
    for succeeded in &result.succeeded {
        println!("  {} {}", "✓".green(), succeeded.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.action_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!(
        "{} 成功, {} 失敗 ({} ms)",
        result.succeeded.len().to_string().green(),
        result.failed.len().to_string().red(),
        result.duration_ms
    );
}
