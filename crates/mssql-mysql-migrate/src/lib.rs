//! # mssql-mysql-migrate
//!
//! Convert SQL Server scripts (SSMS and Navicat exports) to MySQL and run
//! them against a MySQL server.
//!
//! The library provides:
//!
//! - **Translation** of T-SQL DDL and DML into MySQL through an ordered
//!   pipeline of rewrite passes
//! - **Statement splitting** that respects quotes, escapes and nesting
//! - **Execution** with one transaction per statement, a JSONL error log and
//!   dry-run previews
//! - **Type mapping** from SQL Server column types to MySQL
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use mssql_mysql_migrate::{Config, Orchestrator, RunMode};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> mssql_mysql_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config);
//!     let result = orchestrator
//!         .run(Path::new("source-data/shop.sql"), RunMode::Full, None, false, &CancellationToken::new())
//!         .await?;
//!     println!("{}", result.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod orchestrator;
pub mod splitter;
pub mod translate;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, ExecutionConfig, OutputConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use executor::{ExecutionReport, Executor, MysqlRunner, StatementFailure, StatementRunner};
pub use orchestrator::{ConversionResult, MigrationResult, Orchestrator, RunMode};
pub use splitter::{split, split_with, SplitOptions};
pub use translate::{translate, Pass, TranslateOptions, Translator};
