// コマンド共通コンテキスト
//
// 設定ファイル読み込みと接続確立の重複をCLI層で集約する。

use crate::adapters::database::DatabaseConnectionService;
use crate::core::comparison::ExclusionPolicy;
use crate::core::config::{Config, DatabaseConfig, Dialect, IdentifierCase};
use crate::core::naming::DATABASE_URL_ENV;
use crate::services::config_loader::ConfigLoader;
use crate::services::database_config_resolver::DatabaseConfigResolver;
use anyhow::{anyhow, Context, Result};
use sqlx::AnyConnection;
use std::path::PathBuf;
use tracing::debug;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    /// 読み込んだ設定ファイル（DATABASE_URL から構成した場合はNone）
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl CommandContext {
    /// カスタム設定ファイルパスを指定してコンテキストを作成
    ///
    /// 設定ファイルが指定されておらず既定のファイルもない場合は、
    /// `DATABASE_URL` から `env` 環境のみを持つ設定を構成します。
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
        env: &str,
    ) -> Result<Self> {
        let explicit = custom_config_path.is_some();
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if config_path.exists() {
            let config = ConfigLoader::from_file(&config_path)
                .with_context(|| "Failed to read config file")?;
            debug!(path = %config_path.display(), "Loaded config file");
            return Ok(Self {
                project_path,
                config_path: Some(config_path),
                config,
            });
        }

        if explicit {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.is_empty() => {
                debug!("No config file found, using {}", DATABASE_URL_ENV);
                Ok(Self {
                    project_path,
                    config_path: None,
                    config: Config::single_environment(env, DatabaseConfig::from_url(url)),
                })
            }
            _ => Err(anyhow!(
                "Config file not found: {:?}. Create it or set {}.",
                config_path,
                DATABASE_URL_ENV
            )),
        }
    }

    /// 環境に応じたデータベース設定を取得（環境変数上書き込み）
    pub fn database_config(&self, env: &str) -> Result<DatabaseConfig> {
        let config = self
            .config
            .get_database_config(env)
            .with_context(|| format!("Config for environment '{}' not found", env))?;
        Ok(DatabaseConfigResolver::apply_env_overrides(&config))
    }

    /// データベース方言を取得
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// スキーマ名の大文字小文字規則
    pub fn identifier_case(&self) -> IdentifierCase {
        self.config.resolved_identifier_case()
    }

    /// 除外ポリシー
    pub fn exclusion_policy(&self) -> ExclusionPolicy {
        ExclusionPolicy::from(&self.config.exclusion)
    }

    /// データベースに接続
    pub async fn connect(&self, env: &str) -> Result<AnyConnection> {
        let db_config = self.database_config(env)?;
        let db_service = DatabaseConnectionService::new();
        db_service
            .connect(self.config.dialect, &db_config)
            .await
            .with_context(|| "Failed to connect to database")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_load_from_default_config_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(".schema-sync.yaml"),
            r#"version: "1.0"
environments:
  development:
    database: stage
"#,
        )
        .unwrap();

        let context =
            CommandContext::load_with_config(temp_dir.path().to_path_buf(), None, "development")
                .unwrap();

        assert!(context.config_path.is_some());
        assert_eq!(context.identifier_case(), IdentifierCase::Lower);
        assert_eq!(
            context.database_config("development").unwrap().database,
            "stage"
        );
    }

    #[test]
    #[serial]
    fn test_load_falls_back_to_database_url() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var(DATABASE_URL_ENV, "postgresql://sync@localhost:5432/stage");

        let context =
            CommandContext::load_with_config(temp_dir.path().to_path_buf(), None, "staging");
        std::env::remove_var(DATABASE_URL_ENV);

        let context = context.unwrap();
        assert!(context.config_path.is_none());
        let db = context.database_config("staging").unwrap();
        assert_eq!(
            db.url.as_deref(),
            Some("postgresql://sync@localhost:5432/stage")
        );
    }

    #[test]
    #[serial]
    fn test_load_without_config_or_url_fails() {
        let temp_dir = TempDir::new().unwrap();
        std::env::remove_var(DATABASE_URL_ENV);

        let result =
            CommandContext::load_with_config(temp_dir.path().to_path_buf(), None, "development");

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Config file not found"));
    }

    #[test]
    #[serial]
    fn test_explicit_missing_config_fails_even_with_url() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var(DATABASE_URL_ENV, "postgresql://sync@localhost/stage");

        let result = CommandContext::load_with_config(
            temp_dir.path().to_path_buf(),
            Some(temp_dir.path().join("custom.yaml")),
            "development",
        );
        std::env::remove_var(DATABASE_URL_ENV);

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_unknown_environment_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var(DATABASE_URL_ENV, "postgresql://sync@localhost/stage");

        let context =
            CommandContext::load_with_config(temp_dir.path().to_path_buf(), None, "development");
        std::env::remove_var(DATABASE_URL_ENV);

        let result = context.unwrap().database_config("production");
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("production"));
    }
}
