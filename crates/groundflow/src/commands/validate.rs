use crate::project::Project;
use colored::Colorize;

pub async fn handle(vars: &[String]) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let project = Project::load(vars)?;
    println!(
        "プロジェクトルート: {}",
        project.root.display().to_string().cyan()
    );
    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();

    println!("サマリー:");
    println!(
        "  リソース: {}個（依存辺 {}本）",
        project.graph.len(),
        project.graph.edge_count()
    );
    for node in project.graph.topological() {
        let deps = if node.depends_on.is_empty() {
            String::new()
        } else {
            format!(
                " ← {}",
                node.depends_on
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        println!("    - {}{}", node.address().to_string().cyan(), deps);
    }

    if !project.manifest.providers.is_empty() {
        println!("  プロバイダー: {}個", project.manifest.providers.len());
        for (name, config) in &project.manifest.providers {
            println!("    - {} ({})", name.cyan(), config.kind);
        }
    }

    if !project.manifest.variables.is_empty() {
        println!("  変数: {}個", project.manifest.variables.len());
    }

    Ok(())
}
