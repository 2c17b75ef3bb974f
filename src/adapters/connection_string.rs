// 接続文字列ビルダー
//
// DatabaseConfig と Dialect から接続文字列を生成する。

use crate::core::config::{DatabaseConfig, Dialect};
use urlencoding::encode;

/// 接続文字列を生成
///
/// `url` が設定されている場合はそれをそのまま使用します。
/// ユーザー名とパスワードはパーセントエンコードされます。
/// これにより、`@`, `:`, `/`, `#`, `?` などの特殊文字を含むパスワードでも
/// 正しく接続文字列が構築されます。
pub fn build_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    if let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    match dialect {
        Dialect::PostgreSQL => {
            let user = config.user.as_deref().unwrap_or("postgres");
            let encoded_user = encode(user);
            let auth = match config.password.as_deref() {
                Some(password) if !password.is_empty() => {
                    let encoded_password = encode(password);
                    format!("{}:{}", encoded_user, encoded_password)
                }
                _ => encoded_user.to_string(),
            };
            let port = config.resolved_port(dialect);
            let base = format!(
                "postgresql://{}@{}:{}/{}",
                auth,
                config.host,
                port,
                encode(&config.database)
            );

            let params = query_parameters(config);
            if params.is_empty() {
                base
            } else {
                format!("{}?{}", base, params.join("&"))
            }
        }
    }
}

/// クエリパラメータ（sslmode, connect_timeout, 追加オプション）を組み立てる
///
/// 追加オプションはキー順に並べ、出力を安定させます。
fn query_parameters(config: &DatabaseConfig) -> Vec<String> {
    let mut params = Vec::new();

    if let Some(ssl_mode) = &config.ssl_mode {
        params.push(format!("sslmode={}", ssl_mode));
    }
    if let Some(timeout) = config.timeout {
        params.push(format!("connect_timeout={}", timeout));
    }
    if let Some(options) = &config.options {
        let mut keys: Vec<&String> = options.keys().collect();
        keys.sort();
        for key in keys {
            params.push(format!("{}={}", encode(key), encode(&options[key])));
        }
    }

    params
}
