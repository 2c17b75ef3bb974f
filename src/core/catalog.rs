// カタログドメインモデル
//
// カタログ照会の結果として得られるオブジェクトの件数情報、
// ソースとターゲットを突き合わせた比較行、権限レコードを定義します。

use std::fmt;

/// ルーチンの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    /// DDLで使うキーワード
    pub fn keyword(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 比較対象オブジェクトの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Table,
    Index,
    Routine(RoutineKind),
}

impl ObjectKind {
    /// 成果物・台帳で使うラベル
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::Index => "INDEX",
            ObjectKind::Routine(kind) => kind.keyword(),
        }
    }

    /// 「欠落」とみなす条件
    pub fn missing_policy(&self) -> MissingPolicy {
        match self {
            ObjectKind::Table | ObjectKind::Index => MissingPolicy::AbsentOnly,
            ObjectKind::Routine(_) => MissingPolicy::AbsentOrDifferent,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 欠落判定の方針
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// ターゲットに存在しない場合のみ
    AbsentOnly,
    /// ターゲットに存在しない、または件数が異なる場合
    AbsentOrDifferent,
}

/// カタログ上の1オブジェクトと、その件数
///
/// テーブルはカラム数、インデックスは構成カラム数、ルーチンはソース行数です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCardinality {
    pub kind: ObjectKind,
    /// オブジェクト名
    pub name: String,
    /// 所属テーブル（インデックスのみ）
    pub parent: Option<String>,
    /// 引数シグネチャ（ルーチンのみ、オーバーロードの識別に使用）
    pub signature: Option<String>,
    /// 件数
    pub cardinality: i64,
}

impl ObjectCardinality {
    /// テーブルの件数情報を作成
    pub fn table(name: impl Into<String>, columns: i64) -> Self {
        Self {
            kind: ObjectKind::Table,
            name: name.into(),
            parent: None,
            signature: None,
            cardinality: columns,
        }
    }

    /// インデックスの件数情報を作成
    pub fn index(table: impl Into<String>, name: impl Into<String>, columns: i64) -> Self {
        Self {
            kind: ObjectKind::Index,
            name: name.into(),
            parent: Some(table.into()),
            signature: None,
            cardinality: columns,
        }
    }

    /// ルーチンの件数情報を作成
    pub fn routine(
        kind: RoutineKind,
        name: impl Into<String>,
        signature: impl Into<String>,
        lines: i64,
    ) -> Self {
        Self {
            kind: ObjectKind::Routine(kind),
            name: name.into(),
            parent: None,
            signature: Some(signature.into()),
            cardinality: lines,
        }
    }

    /// ソースとターゲットを突き合わせるためのキー
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity {
            kind: self.kind,
            parent: self.parent.clone(),
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// オブジェクトの同一性キー
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectIdentity {
    pub kind: ObjectKind,
    pub parent: Option<String>,
    pub name: String,
    pub signature: Option<String>,
}

/// ソースとターゲットの件数を突き合わせた比較行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub kind: ObjectKind,
    pub name: String,
    pub parent: Option<String>,
    pub signature: Option<String>,
    /// ソース側の件数（C1）
    pub source: Option<i64>,
    /// ターゲット側の件数（C2）
    pub target: Option<i64>,
}

impl ComparisonRow {
    /// 両側に存在し件数が異なるか
    pub fn is_mismatched(&self) -> bool {
        matches!((self.source, self.target), (Some(s), Some(t)) if s != t)
    }

    /// 種別の欠落方針に照らして再作成が必要か
    pub fn is_missing(&self) -> bool {
        match (self.source, self.target, self.kind.missing_policy()) {
            (Some(_), None, _) => true,
            (Some(s), Some(t), MissingPolicy::AbsentOrDifferent) => s != t,
            _ => false,
        }
    }

    /// 表示用の名前（ルーチンはシグネチャ付き）
    pub fn display_name(&self) -> String {
        match &self.signature {
            Some(signature) => format!("{}({})", self.name, signature),
            None => self.name.clone(),
        }
    }
}

/// 権限レコード
///
/// あるスキーマ上のオブジェクトに対して、ある主体が持つ1つの権限を表します。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrantRecord {
    /// オブジェクトの所属スキーマ
    pub schema: String,
    /// オブジェクト名
    pub object: String,
    /// 権限を受ける主体（PUBLICを含む）
    pub grantee: String,
    /// 権限名（SELECT, INSERT, ...）
    pub privilege: String,
    /// WITH GRANT OPTION 付きか
    pub grantable: bool,
}

impl GrantRecord {
    /// 権限の方向別比較に使うキー（スキーマを除く）
    pub fn object_key(&self) -> (String, String, String) {
        (
            self.object.clone(),
            self.grantee.clone(),
            self.privilege.clone(),
        )
    }

    /// 被付与側の比較に使うキー（主体を除く）
    pub fn holder_key(&self) -> (String, String, String) {
        (
            self.schema.clone(),
            self.object.clone(),
            self.privilege.clone(),
        )
    }
}
