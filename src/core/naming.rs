// 命名ポリシー
//
// 設定ファイル名と環境変数名の単一ソースを提供します。

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".schema-sync.yaml";

/// 既定の接続環境名
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// 接続設定を上書きする環境変数のプレフィックス
pub const ENV_PREFIX: &str = "SCHEMA_SYNC_DB";

/// 設定ファイルがない場合に参照する接続URLの環境変数
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// 上書き用の環境変数名を組み立てる
///
/// `env_var("PASSWORD")` は `SCHEMA_SYNC_DB_PASSWORD` を返します。
pub fn env_var(suffix: &str) -> String {
    format!("{}_{}", ENV_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var("HOST"), "SCHEMA_SYNC_DB_HOST");
        assert_eq!(env_var("PASSWORD"), "SCHEMA_SYNC_DB_PASSWORD");
    }
}
