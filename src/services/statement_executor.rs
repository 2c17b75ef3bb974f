// ステートメント実行サービス
//
// DDL・GRANT文を1件ずつ実行し、失敗は例外台帳に記録して処理を継続します。
// ドライラン時はステートメントをログに出すだけで実行しません。

use crate::adapters::schema_catalog::SchemaCatalog;
use crate::core::error::StatementFailure;
use crate::core::ledger::{ExceptionLedger, ExceptionRecord};
use tracing::{debug, warn};

/// 実行モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// ステートメントを実行する
    #[default]
    Apply,
    /// 実行せずに計画のみ出力する
    DryRun,
}

/// 1ステートメントの実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    Executed,
    Skipped,
    Failed,
}

/// 実行予定のステートメント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    /// 操作種別（台帳の OBJECT_TYPE）
    pub object_type: String,
    /// 対象オブジェクト名
    pub object_name: String,
    /// SQL本文
    pub sql: String,
}

impl PlannedStatement {
    pub fn new(
        object_type: impl Into<String>,
        object_name: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_name: object_name.into(),
            sql: sql.into(),
        }
    }
}

/// ステートメント実行サービス
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    mode: ExecutionMode,
}

impl StatementExecutor {
    /// 実行モードを指定して作成
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    /// 実行モード
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// ステートメントを実行（ドライラン時はスキップ）
    pub async fn execute<C>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
        statement: &PlannedStatement,
    ) -> StatementOutcome
    where
        C: SchemaCatalog + ?Sized,
    {
        if self.mode == ExecutionMode::DryRun {
            debug!(
                object_type = %statement.object_type,
                object_name = %statement.object_name,
                sql = %statement.sql,
                "Dry run: statement not executed"
            );
            return StatementOutcome::Skipped;
        }

        self.apply(catalog, ledger, statement).await
    }

    /// 実行モードに関わらずステートメントを実行
    ///
    /// セッション設定のように、後続の照会結果に影響する文に使用します。
    pub async fn apply<C>(
        &self,
        catalog: &mut C,
        ledger: &mut ExceptionLedger,
        statement: &PlannedStatement,
    ) -> StatementOutcome
    where
        C: SchemaCatalog + ?Sized,
    {
        debug!(
            object_type = %statement.object_type,
            object_name = %statement.object_name,
            sql = %statement.sql,
            "Executing statement"
        );

        match catalog.execute(&statement.sql).await {
            Ok(()) => StatementOutcome::Executed,
            Err(failure) => {
                self.record_failure(ledger, statement, &failure);
                StatementOutcome::Failed
            }
        }
    }

    /// 失敗を例外台帳に記録
    pub fn record_failure(
        &self,
        ledger: &mut ExceptionLedger,
        statement: &PlannedStatement,
        failure: &StatementFailure,
    ) {
        warn!(
            object_type = %statement.object_type,
            object_name = %statement.object_name,
            error_code = %failure.code,
            "Statement failed: {}",
            failure.message
        );
        ledger.record(ExceptionRecord::new(
            statement.object_type.clone(),
            statement.object_name.clone(),
            statement.sql.clone(),
            failure,
        ));
    }
}
