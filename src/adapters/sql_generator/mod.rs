// SQL生成アダプター
//
// カタログから取得した定義情報とオブジェクト名から、
// 各データベース方言用のDROP / CREATE TABLE / GRANT 文を生成するアダプター層。

pub mod postgres;

use crate::core::catalog::{GrantRecord, RoutineKind};

/// カラムの自動採番方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// GENERATED ALWAYS AS IDENTITY
    Always,
    /// GENERATED BY DEFAULT AS IDENTITY
    ByDefault,
}

/// カラム定義（カタログから取得した生の情報）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// カラム名
    pub name: String,
    /// データ型（カタログが整形した型文字列）
    pub data_type: String,
    /// NULL許可フラグ
    pub nullable: bool,
    /// デフォルト式
    pub default_expression: Option<String>,
    /// IDENTITY列の方式
    pub identity: Option<IdentityKind>,
    /// 生成列の式（STORED）
    pub generated_expression: Option<String>,
}

/// 表制約（主キー・一意・CHECK）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDefinition {
    /// 制約名
    pub name: String,
    /// 制約本体（`PRIMARY KEY (id)` など）
    pub definition: String,
}

/// テーブル定義
///
/// 外部キーは含みません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<ConstraintDefinition>,
    /// パーティションキー（`RANGE (created_at)` など）
    pub partition_key: Option<String>,
}

/// SQL生成インターフェース
pub trait SqlGenerator {
    /// DROP TABLE文を生成
    ///
    /// # Arguments
    ///
    /// * `schema` - 所属スキーマ
    /// * `table` - テーブル名
    fn generate_drop_table(&self, schema: &str, table: &str) -> String;

    /// DROP INDEX文を生成
    fn generate_drop_index(&self, schema: &str, index: &str) -> String;

    /// DROP PROCEDURE / DROP FUNCTION文を生成
    ///
    /// # Arguments
    ///
    /// * `kind` - ルーチン種別
    /// * `schema` - 所属スキーマ
    /// * `name` - ルーチン名
    /// * `signature` - 引数シグネチャ（オーバーロードの特定に使用）
    fn generate_drop_routine(
        &self,
        kind: RoutineKind,
        schema: &str,
        name: &str,
        signature: Option<&str>,
    ) -> String;

    /// CREATE TABLE文を生成
    ///
    /// # Arguments
    ///
    /// * `schema` - 作成先スキーマ
    /// * `table` - テーブル定義
    fn generate_create_table(&self, schema: &str, table: &TableDefinition) -> String;

    /// GRANT文を生成
    ///
    /// `schema` / `grantee` で権限レコードのスキーマと主体を差し替えて出力します。
    ///
    /// # Arguments
    ///
    /// * `grant` - 権限レコード
    /// * `schema` - 対象オブジェクトのスキーマ
    /// * `grantee` - 権限を受ける主体
    fn generate_grant(&self, grant: &GrantRecord, schema: &str, grantee: &str) -> String;
}
