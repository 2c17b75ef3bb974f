// 同期結果レポート
//
// ステージごとの件数と、実行全体の結果を保持します。
// CLIのテキスト・JSON出力の元データになります。

use crate::core::ledger::ExceptionRecord;
use crate::services::statement_executor::StatementOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// 同期のステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// 出力ディレクトリの準備
    Prepare,
    /// セッション設定
    Session,
    /// テーブル
    Tables,
    /// インデックス
    Indexes,
    /// プロシージャ・ファンクション
    Routines,
    /// 権限
    Grants,
    /// 例外台帳の書き出し
    Finalize,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Prepare => "prepare",
            SyncStage::Session => "session",
            SyncStage::Tables => "tables",
            SyncStage::Indexes => "indexes",
            SyncStage::Routines => "routines",
            SyncStage::Grants => "grants",
            SyncStage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// 1ステージ分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: SyncStage,
    /// 削除対象の件数
    pub drops: usize,
    /// 作成対象の件数（権限ステージでは付与文の件数）
    pub creates: usize,
    /// 成功したステートメント数
    pub executed: usize,
    /// ドライランで実行しなかったステートメント数
    pub skipped: usize,
    /// 例外台帳に記録した件数
    pub failed: usize,
    /// 書き出した成果物
    pub artifacts: Vec<PathBuf>,
}

impl StageReport {
    /// 空のレポートを作成
    pub fn new(stage: SyncStage) -> Self {
        Self {
            stage,
            drops: 0,
            creates: 0,
            executed: 0,
            skipped: 0,
            failed: 0,
            artifacts: Vec::new(),
        }
    }

    /// ステートメントの結果を集計
    pub fn tally(&mut self, outcome: StatementOutcome) {
        match outcome {
            StatementOutcome::Executed => self.executed += 1,
            StatementOutcome::Skipped => self.skipped += 1,
            StatementOutcome::Failed => self.failed += 1,
        }
    }
}

/// 同期全体の結果
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub target: String,
    pub dry_run: bool,
    /// 開始時刻
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
    /// 例外台帳の内容（記録順）
    pub exceptions: Vec<ExceptionRecord>,
    /// 例外台帳の成果物
    pub exception_artifacts: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub elapsed_ms: u128,
}

impl SyncReport {
    /// ステージのレポートを取得
    pub fn stage(&self, stage: SyncStage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    /// 全ステージで成功したステートメント数
    pub fn total_executed(&self) -> usize {
        self.stages.iter().map(|report| report.executed).sum()
    }

    /// 例外台帳の件数
    pub fn failure_count(&self) -> usize {
        self.exceptions.len()
    }
}
