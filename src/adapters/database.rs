// データベース接続アダプター
//
// SQLxを使用したデータベース接続の確立を行います。
// 同期処理は1本の接続上でセッション設定からGRANTまでを順に実行するため、
// プールではなく単一の AnyConnection を返します。

use crate::adapters::connection_string::build_connection_string;
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::DatabaseError;
use sqlx::{AnyConnection, Connection};
use std::time::Duration;
use tracing::debug;

/// 接続タイムアウトのデフォルト値（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// データベース接続サービス
///
/// データベース接続の初期化を行います。
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続文字列を構築
    pub fn build_connection_string(&self, dialect: Dialect, config: &DatabaseConfig) -> String {
        build_connection_string(dialect, config)
    }

    /// データベースに接続
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続済みのコネクション、または接続エラー
    pub async fn connect(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyConnection, DatabaseError> {
        let connection_string = self.build_connection_string(dialect, config);
        let timeout = Duration::from_secs(config.timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS));

        debug!(
            dialect = %dialect,
            host = %config.host,
            timeout_secs = timeout.as_secs(),
            "Connecting to database"
        );

        match tokio::time::timeout(timeout, AnyConnection::connect(&connection_string)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DatabaseError::Connection {
                message: format!("データベースへの接続に失敗しました: {}", dialect),
                cause: e.to_string(),
            }),
            Err(_) => Err(DatabaseError::Connection {
                message: format!("データベースへの接続がタイムアウトしました: {}", dialect),
                cause: format!("no response within {} seconds", timeout.as_secs()),
            }),
        }
    }
}
