use colored::Colorize;
use groundflow_core::AttrValue;
use groundflow_engine::{
    ApplyReport, CancelToken, ChangeKind, ChangeSet, EngineError, Executor, NodeOutcome,
};
use groundflow_state::StateError;
use std::time::Duration;

/// 終了コードの決定（0: 成功, 1: エラー, 2: ロック競合）
pub fn exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(state) = cause.downcast_ref::<StateError>()
            && matches!(state, StateError::AlreadyLocked { .. })
        {
            return 2;
        }
        if let Some(engine) = cause.downcast_ref::<EngineError>()
            && matches!(
                engine,
                EngineError::State(StateError::AlreadyLocked { .. })
            )
        {
            return 2;
        }
    }
    1
}

/// 変更計画を表示
pub fn print_changeset(changeset: &ChangeSet) {
    for entry in &changeset.entries {
        let address = entry.address.to_string();
        match entry.kind {
            ChangeKind::Create => {
                println!("  {} {}", "+".green().bold(), address.cyan());
            }
            ChangeKind::Update => {
                println!("  {} {}", "~".yellow().bold(), address.cyan());
                print_attribute_diff(entry);
            }
            ChangeKind::Replace => {
                println!("  {} {}", "-/+".red().bold(), address.cyan());
                print_attribute_diff(entry);
            }
            ChangeKind::Destroy => {
                println!("  {} {}", "-".red().bold(), address.cyan());
            }
            ChangeKind::NoOp => {
                println!("    {} {}", address, "(変更なし)".dimmed());
            }
        }
    }

    let summary = changeset.summary();
    println!();
    println!(
        "計画: 作成 {}, 更新 {}, 置換 {}, 破棄 {}, 変更なし {}",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().red(),
        summary.destroy.to_string().red(),
        summary.no_change
    );
}

/// 変更された属性の差分を表示
fn print_attribute_diff(entry: &groundflow_engine::ChangeEntry) {
    for attr in &entry.changed {
        let before = entry
            .before
            .as_ref()
            .and_then(|b| b.get(attr))
            .map(format_value)
            .unwrap_or_else(|| "(未設定)".to_string());

        let after = match entry.desired.as_ref().and_then(|d| d.get(attr)) {
            Some(AttrValue::Literal(v)) => format_value(v),
            Some(AttrValue::Reference { target, attr }) => {
                format!("(apply後に確定: {target}.{attr})")
            }
            None => "(削除)".to_string(),
        };

        println!("      {attr}: {before} → {after}");
    }
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// 適用結果を表示
pub fn print_report(report: &ApplyReport) {
    for result in &report.results {
        let address = result.address.to_string();
        match result.outcome {
            NodeOutcome::Applied => {
                println!("  {} {} ({})", "✓".green(), address.cyan(), result.kind);
            }
            NodeOutcome::Failed => {
                let message = result.message.as_deref().unwrap_or("不明なエラー");
                println!("  {} {} - {}", "✗".red().bold(), address.cyan(), message);
            }
            NodeOutcome::Skipped => {
                let message = result.message.as_deref().unwrap_or("");
                println!("  {} {} (スキップ: {})", "-".yellow(), address, message);
            }
            NodeOutcome::NoOp => {
                println!("    {} {}", address, "(変更なし)".dimmed());
            }
        }
    }

    println!();
    println!(
        "適用 {}, 失敗 {}, スキップ {}, 変更なし {} ({}ms)",
        report.count(NodeOutcome::Applied).to_string().green(),
        report.count(NodeOutcome::Failed).to_string().red(),
        report.count(NodeOutcome::Skipped).to_string().yellow(),
        report.count(NodeOutcome::NoOp),
        report.duration_ms
    );
}

/// ロック競合をリトライしながら適用を実行
pub async fn apply_with_lock_retry(
    executor: &Executor,
    artifact: &str,
    changeset: &ChangeSet,
    cancel: &CancelToken,
    retries: u32,
) -> groundflow_engine::Result<ApplyReport> {
    let mut attempt = 0;
    loop {
        match executor.apply(artifact, changeset, cancel).await {
            Err(EngineError::State(StateError::AlreadyLocked { holder, .. }))
                if attempt < retries =>
            {
                attempt += 1;
                let wait = Duration::from_secs(2u64.pow(attempt.min(5)));
                println!(
                    "ロックは {} が保持しています。{}秒後にリトライします ({}/{})",
                    holder.cyan(),
                    wait.as_secs(),
                    attempt,
                    retries
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}

/// 状態が変化していた場合に再プランすべきエラーか
pub fn is_replannable(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::StalePlan { .. } | EngineError::State(StateError::VersionConflict { .. })
    )
}

/// Ctrl-C で発火するキャンセルトークンを用意
pub fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!();
                eprintln!(
                    "{}",
                    "中断要求を受け付けました。実行中の操作の完了を待っています...".yellow()
                );
                cancel.cancel();
            }
        });
    }
    cancel
}
