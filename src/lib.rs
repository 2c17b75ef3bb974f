// schema-syncライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインロジック（件数比較、除外判定、例外台帳、設定）
// - adapters: データベースとファイルシステムへのアクセスを抽象化
// - services: 同期パイプラインと各ステージの実行

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
