// 設定ファイル管理
//
// 設定ファイル（YAML形式）の内容を表す構造体と、
// 環境別のデータベース接続設定・除外パターン・識別子の大文字小文字規則を管理します。

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// SSL接続モード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    Disable,
    #[serde(rename = "prefer")]
    Prefer,
    Require,
    #[serde(rename = "verify-ca")]
    VerifyCa,
    #[serde(rename = "verify-full")]
    VerifyFull,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
            SslMode::VerifyCa => write!(f, "verify-ca"),
            SslMode::VerifyFull => write!(f, "verify-full"),
        }
    }
}

/// データベース方言
///
/// メタデータ抽出機能（DDL生成関数）を持つカタログのみを対象とします。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "postgresql")]
    PostgreSQL,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
        }
    }
}

impl Dialect {
    /// Dialectに応じたデフォルトポートを返す
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::PostgreSQL => 5432,
        }
    }

    /// 引用符なし識別子をカタログが正規化する大文字小文字規則
    ///
    /// PostgreSQLは小文字に畳み込みます。
    pub fn default_identifier_case(&self) -> IdentifierCase {
        match self {
            Dialect::PostgreSQL => IdentifierCase::Lower,
        }
    }
}

/// スキーマ名の大文字小文字の畳み込み規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierCase {
    /// 大文字に変換
    Upper,
    /// 小文字に変換
    Lower,
    /// 入力のまま
    Preserve,
}

impl IdentifierCase {
    /// 規則を適用した名前を返す
    pub fn apply(&self, name: &str) -> String {
        match self {
            IdentifierCase::Upper => name.to_uppercase(),
            IdentifierCase::Lower => name.to_lowercase(),
            IdentifierCase::Preserve => name.to_string(),
        }
    }
}

/// 比較対象から除外する名前パターン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// ごみ箱オブジェクトの接頭辞（前方一致）
    #[serde(default = "default_recycle_bin_prefix")]
    pub recycle_bin_prefix: String,

    /// 一時テーブルの目印（部分一致）
    #[serde(default = "default_temp_marker")]
    pub temp_marker: String,
}

fn default_recycle_bin_prefix() -> String {
    "BIN$".to_string()
}

fn default_temp_marker() -> String {
    "TMP".to_string()
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            recycle_bin_prefix: default_recycle_bin_prefix(),
            temp_marker: default_temp_marker(),
        }
    }
}

impl ExclusionConfig {
    /// パターンの妥当性を検証
    ///
    /// 空文字列はすべての名前に一致してしまうため受け付けません。
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in [&self.recycle_bin_prefix, &self.temp_marker] {
            if pattern.trim().is_empty() {
                return Err(ConfigError::InvalidExclusion {
                    pattern: pattern.clone(),
                    reason: "pattern must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// データベース方言
    #[serde(default)]
    pub dialect: Dialect,

    /// スキーマ名の大文字小文字規則（未指定なら方言の既定値）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_case: Option<IdentifierCase>,

    /// 除外パターン
    #[serde(default)]
    pub exclusion: ExclusionConfig,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 単一環境の設定を作成（設定ファイルがない場合に使用）
    pub fn single_environment(environment: &str, database: DatabaseConfig) -> Self {
        let mut environments = HashMap::new();
        environments.insert(environment.to_string(), database);
        Self {
            version: "1.0".to_string(),
            dialect: Dialect::default(),
            identifier_case: None,
            exclusion: ExclusionConfig::default(),
            environments,
        }
    }

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig, ConfigError> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            let mut available: Vec<String> = self.environments.keys().cloned().collect();
            available.sort();
            ConfigError::EnvironmentNotFound {
                name: environment.to_string(),
                available,
            }
        })
    }

    /// 解決済みの大文字小文字規則
    pub fn resolved_identifier_case(&self) -> IdentifierCase {
        self.identifier_case
            .unwrap_or_else(|| self.dialect.default_identifier_case())
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::MissingVersion);
        }

        if self.environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }

        self.exclusion.validate()?;

        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .map_err(|source| ConfigError::InvalidEnvironment {
                    environment: env_name.clone(),
                    source: Box::new(source),
                })?;
        }

        Ok(())
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 接続URL（指定時は他の接続項目より優先）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// ホスト名
    #[serde(default = "default_host", skip_serializing_if = "String::is_empty")]
    pub host: String,

    /// ポート番号（Noneの場合はDialectのデフォルトポートを使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// データベース名
    #[serde(default)]
    pub database: String,

    /// ユーザー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// パスワード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// SSL接続モード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<SslMode>,

    /// 追加接続オプション（クエリパラメータとして付与）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: None,
            database: String::new(),
            user: None,
            password: None,
            timeout: None,
            ssl_mode: None,
            options: None,
        }
    }
}

impl DatabaseConfig {
    /// 接続URLのみを持つ設定を作成
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Dialectに応じた解決済みポート番号を取得
    pub fn resolved_port(&self, dialect: Dialect) -> u16 {
        self.port.unwrap_or_else(|| dialect.default_port())
    }

    /// Validate database configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_none() && self.database.is_empty() {
            return Err(ConfigError::MissingDatabaseName);
        }

        Ok(())
    }
}
