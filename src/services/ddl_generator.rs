// DDL生成サービス
//
// カタログからソースオブジェクトのDDLを抽出し、
// ターゲットスキーマで実行できる形に整えます。

use crate::adapters::schema_catalog::SchemaCatalog;
use crate::adapters::schema_rewrite::{rewrite_schema_qualifier, strip_statement_terminators};
use crate::core::catalog::ComparisonRow;
use crate::core::error::StatementFailure;
use crate::core::run_parameters::SchemaName;

/// DDL生成サービス
#[derive(Debug, Clone)]
pub struct DdlGenerator {
    source: SchemaName,
    target: SchemaName,
}

impl DdlGenerator {
    /// ソースとターゲットのスキーマを指定して作成
    pub fn new(source: SchemaName, target: SchemaName) -> Self {
        Self { source, target }
    }

    /// ターゲットスキーマ用のDDLを生成
    ///
    /// カタログが付け替えに対応していない場合に備えて、
    /// 抽出結果に残ったソース修飾子は常に書き換えます。
    pub async fn generate<C>(
        &self,
        catalog: &mut C,
        row: &ComparisonRow,
    ) -> Result<String, StatementFailure>
    where
        C: SchemaCatalog + ?Sized,
    {
        let raw = catalog
            .extract_ddl(row, &self.source, &self.target)
            .await?;
        Ok(self.finalize(&raw))
    }

    /// 修飾子の書き換えと終端子の除去
    pub fn finalize(&self, raw: &str) -> String {
        let rewritten = rewrite_schema_qualifier(raw, self.source.as_str(), self.target.as_str());
        strip_statement_terminators(&rewritten)
    }

    /// 抽出失敗時に台帳へ残す説明
    pub fn extraction_label(&self, row: &ComparisonRow) -> String {
        format!(
            "extract {} {}.{}",
            row.kind.label(),
            self.source,
            row.display_name()
        )
    }
}
