// 監査用成果物ライター
//
// 比較結果・生成したステートメント・例外台帳を、
// パイプ区切りのCSVファイルとして出力ディレクトリに書き出します。
//
// 形式:
// - 1行目はヘッダー。先頭に空の列名（行番号列）を置く
// - 各行の先頭は0始まりの行番号
// - `|`, `"`, 改行を含む値のみダブルクォートで囲み、内部の `"` は二重化する
// - 値なしは空文字列

use crate::core::error::IoError;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// 区切り文字
const DELIMITER: char = '|';

/// 成果物の表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ArtifactTable {
    /// 列名を指定して空の表を作成
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// 行を追加
    ///
    /// 列数が足りない場合は空文字列で補います。
    pub fn push_row(&mut self, mut row: Vec<String>) {
        if row.len() < self.columns.len() {
            row.resize(self.columns.len(), String::new());
        }
        self.rows.push(row);
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 区切りテキストに変換
    pub fn render(&self) -> String {
        let mut out = String::new();

        let header: Vec<String> = std::iter::once(String::new())
            .chain(self.columns.iter().map(|c| escape_field(c)))
            .collect();
        out.push_str(&header.join(&DELIMITER.to_string()));
        out.push('\n');

        for (index, row) in self.rows.iter().enumerate() {
            let fields: Vec<String> = std::iter::once(index.to_string())
                .chain(row.iter().map(|f| escape_field(f)))
                .collect();
            out.push_str(&fields.join(&DELIMITER.to_string()));
            out.push('\n');
        }

        out
    }
}

/// 値のエスケープ（必要な場合のみクォート）
fn escape_field(value: &str) -> String {
    let needs_quote = value
        .chars()
        .any(|c| c == DELIMITER || c == '"' || c == '\n' || c == '\r');
    if needs_quote {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// 件数の表示（値なしは空文字列）
pub fn format_count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// 成果物ライター
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// 出力ディレクトリを指定して作成
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 出力ディレクトリを作成（存在する場合は何もしない）
    pub fn ensure_output_dir(&self) -> Result<(), IoError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| IoError::DirectoryCreate {
            path: self.output_dir.display().to_string(),
            cause: e.to_string(),
        })
    }

    /// 表をファイルに書き出し、書き出したパスを返す
    ///
    /// 同名のファイルは上書きします。
    pub fn write(&self, file_name: &str, table: &ArtifactTable) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, table.render()).map_err(|e| IoError::FileWrite {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        debug!(path = %path.display(), rows = table.len(), "Artifact written");
        Ok(path)
    }
}
