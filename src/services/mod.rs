// Services Layer
// ドメインロジックを実行するサービス層

pub mod config_loader;
pub mod database_config_resolver;
pub mod ddl_generator;
pub mod statement_executor;
pub mod sync_pipeline;
pub mod sync_report;
