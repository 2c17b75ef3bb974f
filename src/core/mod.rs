// Core Domain
// スキーマ比較・除外判定・例外台帳・設定の純粋なドメインロジック

pub mod catalog;
pub mod comparison;
pub mod config;
pub mod error;
pub mod ledger;
pub mod naming;
pub mod run_parameters;
