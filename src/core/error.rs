// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、ParameterError, ConfigError, DatabaseError, StatementFailure, IoError を定義します。

use thiserror::Error;

/// 実行パラメータのエラー
///
/// コマンドライン引数で渡されたスキーマ名などの検証時に発生するエラーを表現します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// スキーマ名が空
    #[error("{role} schema name must not be empty")]
    EmptySchemaName {
        /// "source" または "target"
        role: String,
    },

    /// スキーマ名として不正な文字列
    #[error("Invalid {role} schema name '{name}': {reason}")]
    InvalidSchemaName {
        /// "source" または "target"
        role: String,
        /// 指定されたスキーマ名
        name: String,
        /// 不正な理由
        reason: String,
    },

    /// ソースとターゲットが同一
    #[error("Source and target schema must differ (both are '{name}')")]
    SameSchema {
        /// スキーマ名
        name: String,
    },
}

/// 設定ファイルのエラー
///
/// 設定ファイルの読み込み・検証時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// バージョン未指定
    #[error("Config file version is not specified")]
    MissingVersion,

    /// 環境設定なし
    #[error("At least one environment configuration is required")]
    NoEnvironments,

    /// 環境が見つからない
    #[error("Environment '{name}' not found. Available environments: {available:?}")]
    EnvironmentNotFound {
        /// 指定された環境名
        name: String,
        /// 利用可能な環境名リスト
        available: Vec<String>,
    },

    /// データベース名未指定
    #[error("Database name is not specified")]
    MissingDatabaseName,

    /// 除外パターンが不正
    #[error("Invalid exclusion pattern '{pattern}': {reason}")]
    InvalidExclusion {
        /// 指定されたパターン
        pattern: String,
        /// 不正な理由
        reason: String,
    },

    /// 環境別設定の検証エラー
    #[error("Invalid config for environment '{environment}': {source}")]
    InvalidEnvironment {
        /// 環境名
        environment: String,
        /// 原因
        #[source]
        source: Box<ConfigError>,
    },
}

/// データベースエラー
///
/// カタログ照会など、失敗すると同期全体を継続できない操作のエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },
}

impl DatabaseError {
    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }
}

/// 個別ステートメントの失敗
///
/// DDLやGRANTの実行、DDL抽出の失敗を表します。
/// 同期処理は中断せず、例外台帳に記録して次のステートメントへ進みます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct StatementFailure {
    /// データベースのエラーコード（PostgreSQLではSQLSTATE）
    pub code: String,
    /// エラーメッセージ
    pub message: String,
}

impl StatementFailure {
    /// 新しいStatementFailureを作成
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// I/Oエラー
///
/// 監査用成果物の書き出し時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum IoError {
    /// File write error
    #[error("Failed to write file: {path} (cause: {cause})")]
    FileWrite {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// Directory creation error
    #[error("Failed to create directory: {path} (cause: {cause})")]
    DirectoryCreate {
        /// ディレクトリパス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl IoError {
    /// ファイル書き込みエラーかどうか
    pub fn is_file_write(&self) -> bool {
        matches!(self, IoError::FileWrite { .. })
    }

    /// ディレクトリ作成エラーかどうか
    pub fn is_directory_create(&self) -> bool {
        matches!(self, IoError::DirectoryCreate { .. })
    }
}
