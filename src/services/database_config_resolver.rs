// データベース設定の解決サービス
//
// 環境変数による上書きをCLI/サービス層で扱い、coreは純粋な構造体に保つ。
// 認証情報は設定ファイルに書かず、環境変数から与えることを想定しています。

use crate::core::config::DatabaseConfig;
use crate::core::naming::env_var;

/// データベース設定の解決ユーティリティ
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigResolver;

impl DatabaseConfigResolver {
    /// 環境変数による上書きを適用
    ///
    /// `SCHEMA_SYNC_DB_HOST` / `_PORT` / `_DATABASE` / `_USER` / `_PASSWORD` を参照します。
    pub fn apply_env_overrides(base: &DatabaseConfig) -> DatabaseConfig {
        let mut config = base.clone();

        if let Ok(host) = std::env::var(env_var("HOST")) {
            config.host = host;
        }
        if let Ok(port) = std::env::var(env_var("PORT")) {
            if let Ok(port_num) = port.parse::<u16>() {
                config.port = Some(port_num);
            }
        }
        if let Ok(database) = std::env::var(env_var("DATABASE")) {
            config.database = database;
        }
        if let Ok(user) = std::env::var(env_var("USER")) {
            config.user = Some(user);
        }
        if let Ok(password) = std::env::var(env_var("PASSWORD")) {
            config.password = Some(password);
        }

        config
    }
}
