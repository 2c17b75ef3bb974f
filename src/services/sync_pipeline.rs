// スキーマ同期パイプラインサービス
//
// ソーススキーマとターゲットスキーマの差分を検出し、
// ターゲット側のオブジェクトを削除・再作成して権限を複製する。

use crate::adapters::artifact_writer::{format_count, ArtifactTable, ArtifactWriter};
use crate::adapters::schema_catalog::SchemaCatalog;
use crate::adapters::sql_generator::postgres::PostgresSqlGenerator;
use crate::adapters::sql_generator::SqlGenerator;
use crate::core::catalog::{ComparisonRow, GrantRecord, ObjectKind};
use crate::core::comparison::{CatalogComparator, ExclusionPolicy};
use crate::core::config::Dialect;
use crate::core::ledger::ExceptionLedger;
use crate::core::run_parameters::RunParameters;
use crate::services::ddl_generator::DdlGenerator;
use crate::services::statement_executor::{ExecutionMode, PlannedStatement, StatementExecutor};
use crate::services::sync_report::{StageReport, SyncReport, SyncStage};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// 成果物名
pub mod artifacts {
    pub const TABLE_DROP: &str = "table_drop";
    pub const TABLE_CREATE: &str = "table_create";
    pub const INDEX_DROP: &str = "index_drop";
    pub const INDEX_CREATE: &str = "index_create";
    pub const ROUTINE_DROP: &str = "routine_drop";
    pub const ROUTINE_CREATE: &str = "routine_create";
    pub const GRANTOR: &str = "grantor";
    pub const GRANTEE: &str = "grantee";
    pub const EXCEPTION_DDL: &str = "exception_ddl";
    pub const EXCEPTION: &str = "exception";
}

/// パイプラインステージでのエラー
///
/// カタログ照会や成果物の書き出しなど、同期を継続できない失敗を表します。
#[derive(Debug, Error)]
#[error("[{stage}] {message}")]
pub struct PipelineStageError {
    /// エラーが発生したステージ
    pub stage: SyncStage,
    /// エラーメッセージ
    pub message: String,
}

impl PipelineStageError {
    fn new(stage: SyncStage, error: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: error.to_string(),
        }
    }
}

/// スキーマ同期パイプライン
///
/// パイプラインは以下のステージで構成される:
/// 1. prepare - 出力ディレクトリの作成
/// 2. session - セッション設定
/// 3. tables - 不一致テーブルの削除と欠落テーブルの作成
/// 4. indexes - 不一致インデックスの削除と欠落インデックスの作成
/// 5. routines - 不一致ルーチンの削除と欠落・差異ルーチンの作成
/// 6. grants - 付与者方向・被付与者方向の権限複製
/// 7. finalize - 例外台帳の書き出し
pub struct SyncPipeline<'a> {
    params: &'a RunParameters,
    comparator: CatalogComparator,
    generator: Box<dyn SqlGenerator + Send + Sync>,
    executor: StatementExecutor,
    writer: ArtifactWriter,
    ddl: DdlGenerator,
}

impl<'a> SyncPipeline<'a> {
    /// 新しいパイプラインを作成
    ///
    /// # Arguments
    ///
    /// * `params` - 実行パラメータ
    /// * `dialect` - データベース方言
    pub fn new(params: &'a RunParameters, dialect: Dialect) -> Self {
        Self {
            params,
            comparator: CatalogComparator::default(),
            generator: Self::sql_generator(dialect),
            executor: StatementExecutor::default(),
            writer: ArtifactWriter::new(params.output_dir.clone()),
            ddl: DdlGenerator::new(params.source.clone(), params.target.clone()),
        }
    }

    /// 除外ポリシーを設定
    pub fn with_exclusion(mut self, exclusion: ExclusionPolicy) -> Self {
        self.comparator = CatalogComparator::new(exclusion);
        self
    }

    /// 実行モードを設定
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.executor = StatementExecutor::new(mode);
        self
    }

    fn sql_generator(dialect: Dialect) -> Box<dyn SqlGenerator + Send + Sync> {
        match dialect {
            Dialect::PostgreSQL => Box::new(PostgresSqlGenerator::new()),
        }
    }

    /// 同期を実行
    ///
    /// ステージを順に実行し、成否に関わらず最後にカタログの接続を閉じます。
    pub async fn run<C: SchemaCatalog>(
        &self,
        mut catalog: C,
    ) -> Result<SyncReport, PipelineStageError> {
        let result = self.run_stages(&mut catalog).await;

        if let Err(e) = catalog.close().await {
            warn!(error = %e, "Failed to close catalog connection");
        }

        result
    }

    async fn run_stages<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
    ) -> Result<SyncReport, PipelineStageError> {
        let started = Instant::now();
        let started_at = Utc::now();
        let source = &self.params.source;
        let target = &self.params.target;
        info!(
            source = %source,
            target = %target,
            dry_run = self.is_dry_run(),
            "Starting schema synchronization"
        );

        // ステージ1: prepare - 出力ディレクトリの作成
        self.writer
            .ensure_output_dir()
            .map_err(|e| PipelineStageError::new(SyncStage::Prepare, e))?;

        let mut ledger = ExceptionLedger::new();
        let mut stages = Vec::new();

        // ステージ2: session - セッション設定
        stages.push(self.stage_session(catalog, &mut ledger).await);

        // ステージ3: tables
        stages.push(self.stage_tables(catalog, &mut ledger).await?);

        // ステージ4: indexes
        stages.push(self.stage_indexes(catalog, &mut ledger).await?);

        // ステージ5: routines
        stages.push(self.stage_routines(catalog, &mut ledger).await?);

        // ステージ6: grants
        stages.push(self.stage_grants(catalog, &mut ledger).await?);

        // ステージ7: finalize - 例外台帳の書き出し
        let exception_artifacts = self.stage_finalize(&ledger)?;

        info!(
            exceptions = ledger.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Schema synchronization finished"
        );

        Ok(SyncReport {
            source: source.to_string(),
            target: target.to_string(),
            dry_run: self.is_dry_run(),
            started_at,
            stages,
            exceptions: ledger.entries().to_vec(),
            exception_artifacts,
            output_dir: self.params.output_dir.clone(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn is_dry_run(&self) -> bool {
        self.executor.mode() == ExecutionMode::DryRun
    }

    /// セッション設定（失敗は台帳に記録して継続）
    async fn stage_session<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
    ) -> StageReport {
        let mut report = StageReport::new(SyncStage::Session);

        for sql in catalog.session_statements() {
            let statement = PlannedStatement::new("SESSION", "session setup", sql);
            // 後続のDDL抽出に影響するため、ドライランでも適用する
            report.tally(self.executor.apply(catalog, ledger, &statement).await);
        }

        info!(failed = report.failed, "Session configuration is finished");
        report
    }

    async fn stage_tables<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
    ) -> Result<StageReport, PipelineStageError> {
        let stage = SyncStage::Tables;
        let source = &self.params.source;
        let target = &self.params.target;
        let mut report = StageReport::new(stage);

        let source_tables = catalog
            .table_cardinalities(source)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let target_tables = catalog
            .table_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;

        // 削除: 両側に存在しカラム数が異なるテーブル
        let drops = self.comparator.mismatched(&source_tables, &target_tables);
        report.drops = drops.len();
        let mut table = ArtifactTable::new(&["OBJECT_TYPE", "TABLE_NAME", "C1", "C2"]);
        for row in &drops {
            table.push_row(vec![
                row.kind.label().to_string(),
                row.name.clone(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::TABLE_DROP, &table)?);

        for row in &drops {
            let statement = PlannedStatement::new(
                "DROP TABLE",
                row.name.clone(),
                self.generator.generate_drop_table(target.as_str(), &row.name),
            );
            report.tally(self.executor.execute(catalog, ledger, &statement).await);
        }
        info!(count = drops.len(), "Table deletion is finished");

        // 作成: 削除後に再照会し、ターゲットに存在しないテーブル
        let target_tables = catalog
            .table_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let missing = self.comparator.missing(&source_tables, &target_tables);
        report.creates = missing.len();
        let creates = self
            .generate_creates(catalog, ledger, &mut report, &missing)
            .await;

        let mut table = ArtifactTable::new(&[
            "OBJECT_TYPE",
            "TABLE_NAME",
            "CREATE_TABLE_SQL",
            "C1",
            "C2",
        ]);
        for (row, ddl) in &creates {
            table.push_row(vec![
                row.kind.label().to_string(),
                row.name.clone(),
                ddl.clone().unwrap_or_default(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::TABLE_CREATE, &table)?);

        self.execute_creates(catalog, ledger, &mut report, &creates)
            .await;
        info!(count = missing.len(), "Table creation is finished");

        Ok(report)
    }

    async fn stage_indexes<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
    ) -> Result<StageReport, PipelineStageError> {
        let stage = SyncStage::Indexes;
        let source = &self.params.source;
        let target = &self.params.target;
        let mut report = StageReport::new(stage);

        let source_indexes = catalog
            .index_cardinalities(source)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let target_indexes = catalog
            .index_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;

        // 削除: 両側に存在し構成カラム数が異なるインデックス
        let drops = self.comparator.mismatched(&source_indexes, &target_indexes);
        report.drops = drops.len();
        let mut table =
            ArtifactTable::new(&["OBJECT_TYPE", "TABLE_NAME", "INDEX_NAME", "C1", "C2"]);
        for row in &drops {
            table.push_row(vec![
                row.kind.label().to_string(),
                row.parent.clone().unwrap_or_default(),
                row.name.clone(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::INDEX_DROP, &table)?);

        for row in &drops {
            let statement = PlannedStatement::new(
                "DROP INDEX",
                row.name.clone(),
                self.generator.generate_drop_index(target.as_str(), &row.name),
            );
            report.tally(self.executor.execute(catalog, ledger, &statement).await);
        }
        info!(count = drops.len(), "Index deletion is finished");

        let target_indexes = catalog
            .index_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let missing = self.comparator.missing(&source_indexes, &target_indexes);
        report.creates = missing.len();
        let creates = self
            .generate_creates(catalog, ledger, &mut report, &missing)
            .await;

        let mut table = ArtifactTable::new(&[
            "OBJECT_TYPE",
            "TABLE_NAME",
            "INDEX_NAME",
            "CREATE_INDEX_SQL",
            "C1",
            "C2",
        ]);
        for (row, ddl) in &creates {
            table.push_row(vec![
                row.kind.label().to_string(),
                row.parent.clone().unwrap_or_default(),
                row.name.clone(),
                ddl.clone().unwrap_or_default(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::INDEX_CREATE, &table)?);

        self.execute_creates(catalog, ledger, &mut report, &creates)
            .await;
        info!(count = missing.len(), "Index creation is finished");

        Ok(report)
    }

    async fn stage_routines<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
    ) -> Result<StageReport, PipelineStageError> {
        let stage = SyncStage::Routines;
        let source = &self.params.source;
        let target = &self.params.target;
        let mut report = StageReport::new(stage);

        let source_routines = catalog
            .routine_cardinalities(source)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let target_routines = catalog
            .routine_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;

        // 削除: 両側に存在し行数が異なるルーチン
        let drops = self
            .comparator
            .mismatched(&source_routines, &target_routines);
        report.drops = drops.len();
        let mut table = ArtifactTable::new(&["TYPE", "NAME", "C1", "C2"]);
        for row in &drops {
            table.push_row(vec![
                row.kind.label().to_string(),
                row.display_name(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::ROUTINE_DROP, &table)?);

        for row in &drops {
            let ObjectKind::Routine(kind) = row.kind else {
                continue;
            };
            let statement = PlannedStatement::new(
                format!("DROP {}", kind),
                row.display_name(),
                self.generator.generate_drop_routine(
                    kind,
                    target.as_str(),
                    &row.name,
                    row.signature.as_deref(),
                ),
            );
            report.tally(self.executor.execute(catalog, ledger, &statement).await);
        }
        info!(count = drops.len(), "Routine deletion is finished");

        // 作成: 存在しない、または行数が異なるルーチン
        let target_routines = catalog
            .routine_cardinalities(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let missing = self.comparator.missing(&source_routines, &target_routines);
        report.creates = missing.len();
        let creates = self
            .generate_creates(catalog, ledger, &mut report, &missing)
            .await;

        let mut table = ArtifactTable::new(&["NAME", "TYPE", "SCRIPT_BODY", "C1", "C2"]);
        for (row, ddl) in &creates {
            table.push_row(vec![
                row.display_name(),
                row.kind.label().to_string(),
                ddl.clone().unwrap_or_default(),
                format_count(row.source),
                format_count(row.target),
            ]);
        }
        report
            .artifacts
            .push(self.write_artifact(stage, artifacts::ROUTINE_CREATE, &table)?);

        self.execute_creates(catalog, ledger, &mut report, &creates)
            .await;
        info!(count = missing.len(), "Routine creation is finished");

        Ok(report)
    }

    async fn stage_grants<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
    ) -> Result<StageReport, PipelineStageError> {
        let stage = SyncStage::Grants;
        let source = &self.params.source;
        let target = &self.params.target;
        let mut report = StageReport::new(stage);

        // 付与者方向: ソーススキーマのオブジェクトに付いている権限
        let source_grants = catalog
            .object_grants(source)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let target_grants = catalog
            .object_grants(target)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let grantor: Vec<PlannedStatement> = self
            .comparator
            .pending_object_grants(&source_grants, &target_grants)
            .iter()
            .map(|grant| {
                PlannedStatement::new(
                    "GRANTOR",
                    grant.object.clone(),
                    self.generator
                        .generate_grant(grant, target.as_str(), &grant.grantee),
                )
            })
            .collect();

        // 被付与者方向: ソース主体が他スキーマのオブジェクトに持つ権限
        let excluded = [source, target];
        let source_held = catalog
            .principal_grants(source, &excluded)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let target_held = catalog
            .principal_grants(target, &excluded)
            .await
            .map_err(|e| PipelineStageError::new(stage, e))?;
        let grantee: Vec<PlannedStatement> = self
            .comparator
            .pending_holder_grants(&source_held, &target_held)
            .iter()
            .map(|grant: &GrantRecord| {
                PlannedStatement::new(
                    "GRANTEE",
                    format!("{}.{}", grant.schema, grant.object),
                    self.generator
                        .generate_grant(grant, &grant.schema, target.as_str()),
                )
            })
            .collect();

        report.creates = grantor.len() + grantee.len();

        for (artifact, statements) in [
            (artifacts::GRANTOR, &grantor),
            (artifacts::GRANTEE, &grantee),
        ] {
            let mut table = ArtifactTable::new(&["GRANT_SQL"]);
            for statement in statements {
                table.push_row(vec![statement.sql.clone()]);
            }
            report
                .artifacts
                .push(self.write_artifact(stage, artifact, &table)?);

            for statement in statements {
                report.tally(self.executor.execute(catalog, ledger, statement).await);
            }
        }
        info!(
            grantor = grantor.len(),
            grantee = grantee.len(),
            "Grant replication is finished"
        );

        Ok(report)
    }

    /// 例外台帳を2形式で書き出す
    fn stage_finalize(&self, ledger: &ExceptionLedger) -> Result<Vec<PathBuf>, PipelineStageError> {
        let stage = SyncStage::Finalize;

        let mut detailed = ArtifactTable::new(&[
            "OBJECT_TYPE",
            "OBJECT_NAME",
            "OBJECT_CODE",
            "ERROR_CODE",
            "ERROR_MESSAGE",
        ]);
        let mut summary =
            ArtifactTable::new(&["OBJECT_TYPE", "OBJECT_NAME", "ERROR_CODE", "ERROR_MESSAGE"]);
        for record in ledger.entries() {
            detailed.push_row(vec![
                record.object_type.clone(),
                record.object_name.clone(),
                record.object_code.clone(),
                record.error_code.clone(),
                record.error_message.clone(),
            ]);
            summary.push_row(vec![
                record.object_type.clone(),
                record.object_name.clone(),
                record.error_code.clone(),
                record.error_message.clone(),
            ]);
        }

        Ok(vec![
            self.write_artifact(stage, artifacts::EXCEPTION_DDL, &detailed)?,
            self.write_artifact(stage, artifacts::EXCEPTION, &summary)?,
        ])
    }

    /// 欠落オブジェクトのDDLを生成（失敗は台帳に記録し、DDLなしで返す）
    async fn generate_creates<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
        report: &mut StageReport,
        missing: &[ComparisonRow],
    ) -> Vec<(ComparisonRow, Option<String>)> {
        let mut creates = Vec::with_capacity(missing.len());

        for row in missing {
            match self.ddl.generate(catalog, row).await {
                Ok(ddl) => creates.push((row.clone(), Some(ddl))),
                Err(failure) => {
                    let statement = PlannedStatement::new(
                        format!("CREATE {}", row.kind),
                        row.display_name(),
                        self.ddl.extraction_label(row),
                    );
                    self.executor.record_failure(ledger, &statement, &failure);
                    report.failed += 1;
                    creates.push((row.clone(), None));
                }
            }
        }

        creates
    }

    async fn execute_creates<C: SchemaCatalog>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
        report: &mut StageReport,
        creates: &[(ComparisonRow, Option<String>)],
    ) {
        for (row, ddl) in creates {
            if let Some(ddl) = ddl {
                let statement = PlannedStatement::new(
                    format!("CREATE {}", row.kind),
                    row.display_name(),
                    ddl.clone(),
                );
                report.tally(self.executor.execute(catalog, ledger, &statement).await);
            }
        }
    }

    fn write_artifact(
        &self,
        stage: SyncStage,
        artifact: &str,
        table: &ArtifactTable,
    ) -> Result<PathBuf, PipelineStageError> {
        self.writer
            .write(&self.params.artifact_file_name(artifact), table)
            .map_err(|e| PipelineStageError::new(stage, e))
    }
}
