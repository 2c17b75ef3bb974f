// syncコマンドハンドラー
//
// スキーマ同期の実行を実装します。
// - 設定の読み込みと実行パラメータの検証
// - データベース接続の確立
// - 同期パイプラインの実行
// - 結果サマリーの表示

use crate::adapters::postgres_catalog::PostgresCatalog;
use crate::adapters::schema_catalog::SchemaCatalog;
use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::comparison::ExclusionPolicy;
use crate::core::config::Dialect;
use crate::core::run_parameters::RunParameters;
use crate::services::statement_executor::ExecutionMode;
use crate::services::sync_pipeline::SyncPipeline;
use crate::services::sync_report::SyncReport;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// syncコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    #[serde(flatten)]
    pub report: SyncReport,
}

impl CommandOutput for SyncOutput {
    fn to_text(&self) -> String {
        let report = &self.report;
        let mut lines = Vec::new();

        let mode = if report.dry_run {
            format!(" {}", "(dry run)".yellow())
        } else {
            String::new()
        };
        lines.push(format!(
            "{} {} -> {}{}",
            "Schema sync:".bold(),
            report.source,
            report.target,
            mode
        ));

        for stage in &report.stages {
            let failed = if stage.failed > 0 {
                format!("failed {}", stage.failed).red().to_string()
            } else {
                format!("failed {}", stage.failed)
            };
            let mut counts = vec![
                format!("drop {}", stage.drops),
                format!("create {}", stage.creates),
                format!("executed {}", stage.executed),
            ];
            if stage.skipped > 0 {
                counts.push(format!("skipped {}", stage.skipped));
            }
            counts.push(failed);
            lines.push(format!("  {:<10} {}", stage.stage.to_string(), counts.join(", ")));
        }

        if report.failure_count() == 0 {
            lines.push(format!("{} No exceptions recorded", "✓".green()));
        } else {
            lines.push(format!(
                "{} {} exception(s) recorded",
                "⚠".yellow(),
                report.failure_count()
            ));
            if let Some(path) = report.exception_artifacts.first() {
                lines.push(format!("  see {}", path.display()));
            }
        }

        lines.push(format!("Artifacts: {}", report.output_dir.display()));
        lines.push(format!(
            "Started: {}",
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines.push(format!(
            "Elapsed: {:.2}s",
            report.elapsed_ms as f64 / 1000.0
        ));

        lines.join("\n")
    }
}

/// syncコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct SyncCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 対象環境
    pub env: String,
    /// ソーススキーマ
    pub source: String,
    /// ターゲットスキーマ
    pub target: String,
    /// 成果物の出力ディレクトリ
    pub output_dir: PathBuf,
    /// Dry run - DDL/GRANTを実行しない
    pub dry_run: bool,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// syncコマンドハンドラー
#[derive(Debug, Default)]
pub struct SyncCommandHandler {}

impl SyncCommandHandler {
    /// 新しいSyncCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// syncコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - syncコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は同期結果のサマリー、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &SyncCommand) -> Result<String> {
        // 設定ファイルを読み込む
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
            &command.env,
        )?;

        // 実行パラメータを検証（接続前に不正な引数を弾く）
        let params = RunParameters::new(
            &command.source,
            &command.target,
            command.output_dir.clone(),
            context.identifier_case(),
        )
        .with_context(|| "Invalid sync arguments")?;
        debug!(
            source = %params.source,
            target = %params.target,
            output_dir = %params.output_dir.display(),
            "Resolved run parameters"
        );

        let conn = context.connect(&command.env).await?;
        info!(env = %command.env, "Connected to database");
        let catalog = PostgresCatalog::new(conn);

        let output = self
            .sync_with_catalog(
                &params,
                context.dialect(),
                context.exclusion_policy(),
                command.dry_run,
                catalog,
            )
            .await?;

        render_output(&output, &command.format)
    }

    /// 接続済みのカタログに対して同期を実行
    pub async fn sync_with_catalog<C: SchemaCatalog>(
        &self,
        params: &RunParameters,
        dialect: Dialect,
        exclusion: ExclusionPolicy,
        dry_run: bool,
        catalog: C,
    ) -> Result<SyncOutput> {
        let mode = if dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Apply
        };

        let report = SyncPipeline::new(params, dialect)
            .with_exclusion(exclusion)
            .with_mode(mode)
            .run(catalog)
            .await
            .with_context(|| "Schema synchronization failed")?;

        Ok(SyncOutput { report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::ExceptionRecord;
    use crate::services::sync_report::{StageReport, SyncStage};

    fn sample_output(exceptions: Vec<ExceptionRecord>) -> SyncOutput {
        let mut tables = StageReport::new(SyncStage::Tables);
        tables.drops = 1;
        tables.creates = 2;
        tables.executed = 3;

        SyncOutput {
            report: SyncReport {
                source: "app_8".to_string(),
                target: "app_6".to_string(),
                dry_run: false,
                started_at: chrono::Utc::now(),
                stages: vec![tables],
                exceptions,
                exception_artifacts: vec![PathBuf::from("/tmp/audit/exception_ddl_8_To_6.csv")],
                output_dir: PathBuf::from("/tmp/audit"),
                elapsed_ms: 1500,
            },
        }
    }

    #[test]
    fn test_text_output_without_exceptions() {
        colored::control::set_override(false);
        let text = sample_output(vec![]).to_text();

        assert!(text.contains("Schema sync: app_8 -> app_6"));
        assert!(text.contains("tables     drop 1, create 2, executed 3, failed 0"));
        assert!(text.contains("No exceptions recorded"));
        assert!(text.contains("Elapsed: 1.50s"));
    }

    #[test]
    fn test_text_output_with_exceptions() {
        colored::control::set_override(false);
        let failure = crate::core::error::StatementFailure::new("42P07", "already exists");
        let text = sample_output(vec![ExceptionRecord::new(
            "CREATE TABLE",
            "orders",
            "CREATE TABLE ...",
            &failure,
        )])
        .to_text();

        assert!(text.contains("1 exception(s) recorded"));
        assert!(text.contains("exception_ddl_8_To_6.csv"));
    }

    #[test]
    fn test_json_output_contains_stages_and_exceptions() {
        let output = sample_output(vec![]);
        let json = render_output(&output, &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"], "app_8");
        assert_eq!(value["stages"][0]["stage"], "tables");
        assert_eq!(value["stages"][0]["drops"], 1);
        assert!(value["exceptions"].as_array().unwrap().is_empty());
    }
}
