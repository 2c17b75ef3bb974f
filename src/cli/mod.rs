// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use crate::core::naming::DEFAULT_ENVIRONMENT;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// schema-sync - Source to target schema reconciler
///
/// Compares two schemas in the same catalog and rebuilds the target's
/// tables, indexes, routines and grants to match the source.
#[derive(Parser, Debug)]
#[command(name = "schema-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile a target schema against a source schema")]
#[command(long_about = "schema-sync - Source to target schema reconciler

Compares object cardinalities (column counts, index column counts, routine
line counts) between a source and a target schema in the same database,
drops mismatched target objects, recreates missing ones from the source DDL
and replicates grants in both directions.

Every statement runs independently: failures are recorded in an exception
ledger and written to the output directory with the comparison artifacts.

Supported databases: PostgreSQL")]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
  Reconcile app_6 with app_8 and write artifacts to ./audit:
    schema-sync sync app_8 app_6 ./audit

  Preview without changing the target:
    schema-sync sync app_8 app_6 ./audit --dry-run

Connection settings come from .schema-sync.yaml (or DATABASE_URL when no
config file exists) and can be overridden with SCHEMA_SYNC_DB_HOST, _PORT,
_DATABASE, _USER and _PASSWORD.")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target environment in the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_ENVIRONMENT)]
    pub env: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the target schema against the source schema
    ///
    /// Runs the session, table, index, routine and grant stages in order
    /// and writes the comparison results, generated statements and the
    /// exception ledger to OUTPUT_DIR.
    ///
    /// EXAMPLES:
    ///   # Synchronize app_6 from app_8
    ///   schema-sync sync app_8 app_6 ./audit
    ///
    ///   # Show what would change without executing any statement
    ///   schema-sync sync app_8 app_6 ./audit --dry-run
    Sync {
        /// Source schema (the reference)
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Target schema (modified to match the source)
        #[arg(value_name = "TARGET")]
        target: String,

        /// Directory for the audit artifacts
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Dry run - compare and write artifacts without executing DDL or GRANT
        #[arg(long)]
        dry_run: bool,
    },
}
