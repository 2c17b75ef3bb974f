// スキーマ修飾子の書き換え
//
// 抽出したDDLに含まれるソーススキーマの修飾子（`src.` / `"src".`）を
// ターゲットスキーマに置き換えます。
// コメントと文字列リテラルの中は原則として書き換えません。
// 例外は `'src.seq'::regclass` のようなオブジェクト参照のリテラルと、
// 関数本体内の動的SQL（`EXECUTE '... src.t ...'`）です。
// ドル引用符で囲まれた関数本体はコードとして走査し、本体内の修飾子も置き換えます。

use crate::adapters::sql_quote::{quote_identifier_if_needed_postgres, quote_identifier_postgres};

/// ソーススキーマの修飾子をターゲットスキーマに置き換える
///
/// 引用符なしの識別子はPostgreSQLの規則どおり小文字に畳み込んで比較し、
/// 引用符付きの識別子は完全一致で比較します。
/// いずれも直後に `.` が続く場合のみ修飾子とみなします。
///
/// # Examples
/// ```
/// use schema_sync::adapters::schema_rewrite::rewrite_schema_qualifier;
/// let ddl = "CREATE INDEX idx ON app_8.orders USING btree (id)";
/// assert_eq!(
///     rewrite_schema_qualifier(ddl, "app_8", "app_6"),
///     "CREATE INDEX idx ON app_6.orders USING btree (id)"
/// );
/// ```
pub fn rewrite_schema_qualifier(sql: &str, source: &str, target: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let len = chars.len();
    let unquoted_target = quote_identifier_if_needed_postgres(target);
    let quoted_target = quote_identifier_postgres(target);
    let mut out = String::with_capacity(sql.len());
    // 走査中の関数本体のドル引用符タグ
    let mut body_tag: Option<String> = None;
    let mut i = 0;

    while i < len {
        let c = chars[i];

        // 行コメント
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            let end = position_from(&chars, i, |ch| ch == '\n').map_or(len, |p| p + 1);
            push_range(&mut out, &chars, i, end);
            i = end;
            continue;
        }

        // ブロックコメント
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let end = block_comment_end(&chars, i + 2);
            push_range(&mut out, &chars, i, end);
            i = end;
            continue;
        }

        if c == '$' {
            if let Some(end) = dollar_tag_end(&chars, i) {
                let tag: String = chars[i..end].iter().collect();
                if body_tag.is_none() {
                    body_tag = Some(tag.clone());
                } else if body_tag.as_deref() == Some(tag.as_str()) {
                    body_tag = None;
                }
                out.push_str(&tag);
                i = end;
                continue;
            }
        }

        match c {
            '\'' => {
                let end = literal_end(&chars, i, false);
                if body_tag.is_some() || is_regclass_cast(&chars, end) {
                    out.push_str(&rewrite_literal(&chars[i..end], source, target));
                } else {
                    push_range(&mut out, &chars, i, end);
                }
                i = end;
            }
            '"' => {
                let end = quoted_identifier_end(&chars, i);
                let is_qualifier = chars.get(end) == Some(&'.');
                if is_qualifier && unquote(&chars[i..end]).as_deref() == Some(source) {
                    out.push_str(&quoted_target);
                } else {
                    push_range(&mut out, &chars, i, end);
                }
                i = end;
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < len && is_identifier_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                // E'...' はバックスラッシュエスケープを持つ文字列
                if (word == "E" || word == "e") && chars.get(i) == Some(&'\'') {
                    out.push_str(&word);
                    let end = literal_end(&chars, i, true);
                    push_range(&mut out, &chars, i, end);
                    i = end;
                    continue;
                }

                let is_qualifier = chars.get(i) == Some(&'.');
                if is_qualifier
                    && !chars[start].is_ascii_digit()
                    && word.to_lowercase() == source
                {
                    out.push_str(&unquoted_target);
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// 末尾のステートメント終端子（`;`）と空白を取り除く
///
/// 本体内部のセミコロンは残します。
pub fn strip_statement_terminators(sql: &str) -> String {
    let mut s = sql.trim();
    while let Some(rest) = s.strip_suffix(';') {
        s = rest.trim_end();
    }
    s.to_string()
}

/// 文字列リテラル内のSQL片の修飾子を置き換える
///
/// 閉じていないリテラルはそのまま返します。
fn rewrite_literal(literal: &[char], source: &str, target: &str) -> String {
    let text: String = literal.iter().collect();
    if literal.len() < 2 || literal[literal.len() - 1] != '\'' {
        return text;
    }
    let inner = text[1..text.len() - 1].replace("''", "'");
    let rewritten = rewrite_schema_qualifier(&inner, source, target);
    format!("'{}'", rewritten.replace('\'', "''"))
}

/// リテラル直後が `::regclass` キャストかどうか
fn is_regclass_cast(chars: &[char], end: usize) -> bool {
    let rest: String = chars[end..]
        .iter()
        .skip_while(|c| c.is_whitespace())
        .take("::regclass".len() + 1)
        .collect::<String>()
        .to_lowercase();
    rest.strip_prefix("::regclass")
        .is_some_and(|after| !after.chars().next().is_some_and(is_identifier_char))
}

/// ドル引用符タグ（`$tag$` / `$$`）の終端を返す
///
/// `$1` のような位置パラメータはタグとみなしません。
fn dollar_tag_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    if chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    while i < chars.len() {
        match chars[i] {
            '$' => return Some(i + 1),
            c if c.is_alphanumeric() || c == '_' => i += 1,
            _ => return None,
        }
    }
    None
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn push_range(out: &mut String, chars: &[char], start: usize, end: usize) {
    out.extend(&chars[start..end]);
}

fn position_from(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> Option<usize> {
    chars[start..].iter().position(|&c| pred(c)).map(|p| p + start)
}

/// ブロックコメントの終端（`*/` の直後）を返す
fn block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// 文字列リテラルの終端（閉じ引用符の直後）を返す
fn literal_end(chars: &[char], open: usize, backslash_escapes: bool) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if backslash_escapes => i += 2,
            '\'' if chars.get(i + 1) == Some(&'\'') => i += 2,
            '\'' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// 引用符付き識別子の終端（閉じ引用符の直後）を返す
fn quoted_identifier_end(chars: &[char], open: usize) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == '"' {
            if chars.get(i + 1) == Some(&'"') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// 引用符付き識別子の中身を取り出す（閉じていなければNone）
fn unquote(quoted: &[char]) -> Option<String> {
    if quoted.len() < 2 || quoted[quoted.len() - 1] != '"' {
        return None;
    }
    let inner: String = quoted[1..quoted.len() - 1].iter().collect();
    Some(inner.replace("\"\"", "\""))
}
