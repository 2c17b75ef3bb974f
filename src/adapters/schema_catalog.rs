// スキーマカタログ
//
// 同期処理が必要とするカタログ操作（件数照会・DDL抽出・権限照会・ステートメント実行）を
// 抽象化するインターフェース。
// PostgreSQL実装は postgres_catalog、テストではメモリ上の実装を使用します。

use crate::core::catalog::{ComparisonRow, GrantRecord, ObjectCardinality};
use crate::core::error::{DatabaseError, StatementFailure};
use crate::core::run_parameters::SchemaName;
use async_trait::async_trait;

/// スキーマカタログ操作インターフェース
///
/// 1本のセッション上で順に呼び出されることを前提とします。
#[async_trait]
pub trait SchemaCatalog: Send {
    /// 同期開始前に適用するセッション設定ステートメント
    ///
    /// DDL抽出の出力形式を固定するための設定です。
    fn session_statements(&self) -> Vec<String>;

    /// テーブルごとのカラム数を取得
    async fn table_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError>;

    /// インデックスごとの構成カラム数を取得（所属テーブル付き）
    async fn index_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError>;

    /// プロシージャ・ファンクションごとのソース行数を取得
    async fn routine_cardinalities(
        &mut self,
        schema: &SchemaName,
    ) -> Result<Vec<ObjectCardinality>, DatabaseError>;

    /// オブジェクトの作成DDLを抽出
    ///
    /// `owner` スキーマにあるオブジェクトのDDLを取得します。
    /// カタログがスキーマの付け替えに対応している場合は `remap_to` を修飾子とした
    /// DDLを返し、対応していない場合は `owner` 修飾のまま返します。
    async fn extract_ddl(
        &mut self,
        row: &ComparisonRow,
        owner: &SchemaName,
        remap_to: &SchemaName,
    ) -> Result<String, StatementFailure>;

    /// スキーマ上のオブジェクトに対して、所有者以外へ付与されている権限を取得
    async fn object_grants(&mut self, schema: &SchemaName)
        -> Result<Vec<GrantRecord>, DatabaseError>;

    /// 主体が他スキーマのオブジェクトに対して保持している権限を取得
    ///
    /// `excluded` に含まれるスキーマ上のオブジェクトは対象外とします。
    async fn principal_grants(
        &mut self,
        principal: &SchemaName,
        excluded: &[&SchemaName],
    ) -> Result<Vec<GrantRecord>, DatabaseError>;

    /// ステートメントを実行（各ステートメントは即時に確定される）
    async fn execute(&mut self, statement: &str) -> Result<(), StatementFailure>;

    /// 接続を閉じる
    async fn close(self) -> Result<(), DatabaseError>
    where
        Self: Sized;
}
