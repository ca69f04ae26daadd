use crate::project::Project;
use crate::utils;
use albflow_cloud_aws::DesiredState;
use colored::Colorize;

pub fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "マニフェストを検証中...".blue());
    utils::print_manifest_path(project);

    let mut errors = Vec::new();
    let mut valid = Vec::new();
    for (name, body) in &project.manifest.load_balancers {
        match serde_json::from_value::<DesiredState>(body.clone()) {
            Ok(desired) => valid.push((name, desired)),
            Err(e) => errors.push((name, e)),
        }
    }

    if !errors.is_empty() {
        eprintln!();
        eprintln!("{}", "✗ 設定エラー".red().bold());
        for (name, e) in &errors {
            eprintln!("  {}: {}", name.cyan(), e);
        }
        std::process::exit(1);
    }

    println!("{}", "✓ マニフェストは正常です！".green().bold());
    println!();
    println!("サマリー:");
    if let Some(region) = &project.manifest.provider.region {
        println!("  リージョン: {}", region.cyan());
    }
    println!("  ALB: {}個", valid.len());
    for (name, desired) in &valid {
        let scheme = if desired.internal {
            "internal"
        } else {
            "internet-facing"
        };
        println!(
            "    - {} ({}, {}, サブネット {}個)",
            name.cyan(),
            desired.name,
            scheme,
            desired.subnets.len()
        );
    }

    Ok(())
}
