// 例外台帳
//
// ステートメント実行に失敗したオブジェクトを順に記録する追記専用のリストです。
// ステージ間では値として受け渡され、共有の可変状態にはしません。

use crate::core::error::StatementFailure;
use serde::Serialize;

/// 例外レコード
///
/// 追記後に変更されることはありません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    /// 操作種別（"DROP TABLE", "CREATE INDEX", "GRANTOR" など）
    pub object_type: String,
    /// オブジェクト名
    pub object_name: String,
    /// 失敗したステートメント
    pub object_code: String,
    /// データベースのエラーコード
    pub error_code: String,
    /// エラーメッセージ
    pub error_message: String,
}

impl ExceptionRecord {
    /// 失敗情報からレコードを作成
    pub fn new(
        object_type: impl Into<String>,
        object_name: impl Into<String>,
        object_code: impl Into<String>,
        failure: &StatementFailure,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_name: object_name.into(),
            object_code: object_code.into(),
            error_code: failure.code.clone(),
            error_message: failure.message.clone(),
        }
    }
}

/// 例外台帳
#[derive(Debug, Clone, Default)]
pub struct ExceptionLedger {
    records: Vec<ExceptionRecord>,
}

impl ExceptionLedger {
    /// 空の台帳を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// レコードを追記
    pub fn record(&mut self, record: ExceptionRecord) {
        self.records.push(record);
    }

    /// 記録順のレコード一覧
    pub fn entries(&self) -> &[ExceptionRecord] {
        &self.records
    }

    /// 記録件数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
