use crate::project::Project;
use crate::utils;
use colored::Colorize;
use groundflow_engine::{Executor, ExecutorOptions};
use groundflow_state::StateStore;
use std::time::Duration;

pub async fn handle(
    vars: &[String],
    yes: bool,
    parallelism: usize,
    lock_ttl: u64,
    lock_retry: u32,
) -> anyhow::Result<()> {
    println!("{}", "適用を開始します...".blue().bold());

    let project = Project::load(vars)?;
    let executor = Executor::new(
        project.registry.clone(),
        project.store.clone(),
        project.locks.clone(),
    )
    .with_options(ExecutorOptions {
        parallelism,
        lock_ttl: Duration::from_secs(lock_ttl),
        ..Default::default()
    });

    let cancel = utils::cancel_on_ctrl_c();

    // 状態が先行して書き換わっていた場合はプランからやり直す
    let mut replans = 0;
    let report = loop {
        let state = project.store.read(project.artifact()).await?;
        let changeset = groundflow_engine::plan(
            &project.manifest,
            &project.graph,
            &state,
            &project.registry,
        )?;

        if replans == 0 {
            println!();
            utils::print_changeset(&changeset);
        }

        if !changeset.has_changes() {
            println!();
            println!("{}", "変更はありません。".green());
            return Ok(());
        }

        if !yes {
            println!();
            println!(
                "{}",
                "警告: 上記の変更をクラウドリソースに適用します。".yellow()
            );
            println!("実行するには --yes オプションを指定してください");
            return Ok(());
        }

        println!();
        match utils::apply_with_lock_retry(
            &executor,
            project.artifact(),
            &changeset,
            &cancel,
            lock_retry,
        )
        .await
        {
            Ok(report) => break report,
            Err(e) if utils::is_replannable(&e) && replans < 2 => {
                replans += 1;
                println!(
                    "{}",
                    "状態が変化したため、計画を再計算します...".yellow()
                );
            }
            Err(e) => return Err(e.into()),
        }
    };

    println!();
    utils::print_report(&report);

    if !report.is_success() {
        anyhow::bail!("一部のリソースを適用できませんでした");
    }

    println!();
    println!("{}", "✓ 適用が完了しました！".green().bold());
    Ok(())
}
