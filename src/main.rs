use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use schema_sync::cli::commands::sync::{SyncCommand, SyncCommandHandler};
use schema_sync::cli::{Cli, Commands};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// トレーシングを初期化
///
/// RUST_LOG が設定されていればそれを優先し、未設定なら --verbose に応じて
/// info / debug を使用します。ログは標準エラーに出力します。
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,schema_sync={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    match cli.command {
        Commands::Sync {
            source,
            target,
            output_dir,
            dry_run,
        } => {
            let handler = SyncCommandHandler::new();
            let command = SyncCommand {
                project_path,
                config_path,
                env: cli.env,
                source,
                target,
                output_dir,
                dry_run,
                format: cli.format,
            };
            handler.execute(&command).await
        }
    }
}
