// Adapters Layer
// 外部システム（データベース・ファイルシステム）との接続を担当

pub mod artifact_writer;
pub mod connection_string;
pub mod database;
pub mod postgres_catalog;
pub mod schema_catalog;
pub mod schema_rewrite;
pub mod sql_generator;
pub mod sql_quote;
