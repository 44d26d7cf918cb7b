use crate::project::Project;
use crate::utils;
use colored::Colorize;
use groundflow_state::StateStore;

pub async fn handle(vars: &[String]) -> anyhow::Result<()> {
    println!("{}", "変更計画を計算中...".blue());

    let project = Project::load(vars)?;
    let state = project.store.read(project.artifact()).await?;
    let changeset = groundflow_engine::plan(
        &project.manifest,
        &project.graph,
        &state,
        &project.registry,
    )?;

    println!();
    utils::print_changeset(&changeset);

    if !changeset.has_changes() {
        println!();
        println!(
            "{}",
            "宣言と状態は一致しています。変更はありません。".green()
        );
    }

    Ok(())
}
