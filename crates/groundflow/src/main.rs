mod commands;
mod project;
mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ground")]
#[command(about = "宣言した姿へ、土台を流し込む。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定を検証してリソースグラフを表示
    Validate {
        /// 変数のオーバーライド (KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
    /// 宣言と状態を比較して変更計画を表示
    Plan {
        /// 変数のオーバーライド (KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
    /// 変更計画を実行してリソースを収束させる
    Apply {
        /// 変数のオーバーライド (KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// 確認をスキップして実行
        #[arg(short, long)]
        yes: bool,
        /// プロバイダー操作の並列実行数
        #[arg(long, default_value = "4")]
        parallelism: usize,
        /// ロックTTL（秒）
        #[arg(long = "lock-ttl", default_value = "120")]
        lock_ttl: u64,
        /// ロックが取得できない場合のリトライ回数
        #[arg(long = "lock-retry", default_value = "0")]
        lock_retry: u32,
    },
    /// 管理下の全リソースを逆順で破棄
    Destroy {
        /// 変数のオーバーライド (KEY=VALUE)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// 確認をスキップして実行
        #[arg(short, long)]
        yes: bool,
        /// プロバイダー操作の並列実行数
        #[arg(long, default_value = "4")]
        parallelism: usize,
        /// ロックTTL（秒）
        #[arg(long = "lock-ttl", default_value = "120")]
        lock_ttl: u64,
        /// ロックが取得できない場合のリトライ回数
        #[arg(long = "lock-retry", default_value = "0")]
        lock_retry: u32,
    },
    /// バージョンを表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("groundflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let result = match cli.command {
        Commands::Validate { vars } => commands::validate::handle(&vars).await,
        Commands::Plan { vars } => commands::plan::handle(&vars).await,
        Commands::Apply {
            vars,
            yes,
            parallelism,
            lock_ttl,
            lock_retry,
        } => commands::apply::handle(&vars, yes, parallelism, lock_ttl, lock_retry).await,
        Commands::Destroy {
            vars,
            yes,
            parallelism,
            lock_ttl,
            lock_retry,
        } => commands::destroy::handle(&vars, yes, parallelism, lock_ttl, lock_retry).await,
        Commands::Version => unreachable!("Version is handled before dispatch"),
    };

    if let Err(e) = result {
        use colored::Colorize;
        eprintln!();
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(utils::exit_code(&e));
    }

    Ok(())
}
