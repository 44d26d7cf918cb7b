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
    println!("{}", "破棄を開始します...".red().bold());

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

    let mut replans = 0;
    let report = loop {
        let state = project.store.read(project.artifact()).await?;
        if state.is_empty() {
            println!();
            println!("{}", "破棄対象のリソースはありません。".green());
            return Ok(());
        }

        let changeset = groundflow_engine::plan_destroy(&state, &project.registry)?;

        if replans == 0 {
            println!();
            utils::print_changeset(&changeset);
        }

        if !yes {
            println!();
            println!(
                "{}",
                "警告: 管理下の全リソースを破棄します。この操作は取り消せません。".yellow()
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
        anyhow::bail!("一部のリソースを破棄できませんでした");
    }

    println!();
    println!("{}", "✓ 破棄が完了しました".green().bold());
    Ok(())
}
