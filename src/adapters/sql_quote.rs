// SQL識別子クォートユーティリティ
//
// PostgreSQL用の識別子クォート関数を提供します。
// sql_generator と schema_rewrite の両方から使用される共有モジュールです。

/// PostgreSQL用識別子クォート（ダブルクォート）
///
/// 識別子内のダブルクォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use schema_sync::adapters::sql_quote::quote_identifier_postgres;
/// assert_eq!(quote_identifier_postgres("users"), r#""users""#);
/// assert_eq!(quote_identifier_postgres(r#"table"name"#), r#""table""name""#);
/// ```
pub fn quote_identifier_postgres(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// スキーマ修飾付きの識別子を生成
///
/// # Examples
/// ```
/// use schema_sync::adapters::sql_quote::quote_qualified_postgres;
/// assert_eq!(quote_qualified_postgres("app", "orders"), r#""app"."orders""#);
/// ```
pub fn quote_qualified_postgres(schema: &str, name: &str) -> String {
    format!(
        "{}.{}",
        quote_identifier_postgres(schema),
        quote_identifier_postgres(name)
    )
}

/// 引用符なしで書ける識別子か
///
/// 小文字・数字・アンダースコアのみで構成され、数字で始まらないものを対象とします。
pub fn is_plain_identifier_postgres(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => chars
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$'),
        _ => false,
    }
}

/// 必要な場合のみクォートした識別子を返す
pub fn quote_identifier_if_needed_postgres(name: &str) -> String {
    if is_plain_identifier_postgres(name) {
        name.to_string()
    } else {
        quote_identifier_postgres(name)
    }
}
