// 実行パラメータ
//
// ソース／ターゲットのスキーマ名と成果物ディレクトリを保持します。
// 1回の実行の間は変更されません。

use crate::core::config::IdentifierCase;
use crate::core::error::ParameterError;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// 引用符なしで扱えるスキーマ名
static SCHEMA_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").expect("schema name pattern is a valid regex")
});

/// スキーマ名
///
/// 空でなく、大文字小文字規則を適用済みであることが保証されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName(String);

impl SchemaName {
    /// 入力文字列を検証してスキーマ名を作成
    ///
    /// # Arguments
    ///
    /// * `role` - エラーメッセージ用の役割名（"source" / "target"）
    /// * `raw` - コマンドラインで渡された文字列
    /// * `case` - 大文字小文字の畳み込み規則
    pub fn parse(role: &str, raw: &str, case: IdentifierCase) -> Result<Self, ParameterError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParameterError::EmptySchemaName {
                role: role.to_string(),
            });
        }

        if !SCHEMA_NAME_PATTERN.is_match(trimmed) {
            return Err(ParameterError::InvalidSchemaName {
                role: role.to_string(),
                name: trimmed.to_string(),
                reason: "only letters, digits, '_', '$' and '#' are allowed, starting with a letter or '_'"
                    .to_string(),
            });
        }

        Ok(Self(case.apply(trimmed)))
    }

    /// 名前を文字列として取得
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 成果物ファイル名に使う末尾2文字
    pub fn suffix(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let start = chars.len().saturating_sub(2);
        chars[start..].iter().collect()
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 同期1回分の実行パラメータ
#[derive(Debug, Clone)]
pub struct RunParameters {
    /// ソーススキーマ
    pub source: SchemaName,
    /// ターゲットスキーマ
    pub target: SchemaName,
    /// 成果物の出力ディレクトリ
    pub output_dir: PathBuf,
}

impl RunParameters {
    /// 引数を検証して実行パラメータを作成
    pub fn new(
        source: &str,
        target: &str,
        output_dir: PathBuf,
        case: IdentifierCase,
    ) -> Result<Self, ParameterError> {
        let source = SchemaName::parse("source", source, case)?;
        let target = SchemaName::parse("target", target, case)?;

        if source == target {
            return Err(ParameterError::SameSchema {
                name: source.to_string(),
            });
        }

        Ok(Self {
            source,
            target,
            output_dir,
        })
    }

    /// 成果物ファイル名を生成
    ///
    /// `<artifact>_<src-suffix>_To<tgt-suffix>.csv` 形式です。
    pub fn artifact_file_name(&self, artifact: &str) -> String {
        format!(
            "{}_{}_To{}.csv",
            artifact,
            self.source.suffix(),
            self.target.suffix()
        )
    }

    /// 成果物ファイルのパス
    pub fn artifact_path(&self, artifact: &str) -> PathBuf {
        self.output_dir.join(self.artifact_file_name(artifact))
    }
}
