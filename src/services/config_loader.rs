// 設定ファイル読み込みサービス
//
// core::config の純粋性を保つため、ファイルI/Oはこのサービスに集約する。

use crate::core::config::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// 設定ファイル読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// YAMLファイルから設定を読み込み、検証する
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IdentifierCase;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_file_reads_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".schema-sync.yaml");
        fs::write(
            &path,
            r#"version: "1.0"
identifier_case: upper
exclusion:
  recycle_bin_prefix: "BIN$"
environments:
  development:
    host: db.local
    port: 5433
    database: stage
    user: sync
"#,
        )
        .unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();

        assert_eq!(config.resolved_identifier_case(), IdentifierCase::Upper);
        assert_eq!(config.exclusion.recycle_bin_prefix, "BIN$");
        assert_eq!(config.exclusion.temp_marker, "TMP");
        let db = config.get_database_config("development").unwrap();
        assert_eq!(db.host, "db.local");
        assert_eq!(db.port, Some(5433));
    }

    #[test]
    fn test_from_file_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigLoader::from_file(&temp_dir.path().join("nope.yaml"));

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".schema-sync.yaml");
        fs::write(
            &path,
            r#"version: "1.0"
environments:
  development:
    host: localhost
"#,
        )
        .unwrap();

        let result = ConfigLoader::from_file(&path);

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("Invalid config file"));
    }
}
