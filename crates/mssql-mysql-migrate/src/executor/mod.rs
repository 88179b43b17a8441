//! Statement execution against MySQL.
//!
//! Statements run in source order, each in its own transaction. A failing
//! statement is rolled back, recorded and logged; the batch always continues.
//! Cancellation is checked between statements; a cancelled run still
//! returns the report of what ran.

mod error_log;
mod mysql;

pub use error_log::ErrorLog;
pub use mysql::MysqlRunner;

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ExecutionConfig;
use crate::error::Result;

/// Characters of a statement shown in progress logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// Executes one statement as a complete transaction.
#[async_trait]
pub trait StatementRunner: Send {
    /// Begin, run `sql`, commit. Roll back and return the error on failure.
    async fn execute(&mut self, sql: &str) -> Result<()>;
}

/// One failed statement, as written to the JSONL error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementFailure {
    pub timestamp: DateTime<Utc>,
    pub sql_file: String,
    /// 1-based position in the statement list.
    pub statement_index: usize,
    pub statement_preview: String,
    pub error_message: String,
    pub full_statement: String,
}

/// A statement shown in dry-run mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementPreview {
    pub statement_index: usize,
    pub preview: String,
}

/// Outcome of executing (or previewing) one script.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub sql_file: PathBuf,
    pub dry_run: bool,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StatementFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previews: Vec<StatementPreview>,
    /// Stopped early by cancellation; statements after the stop are not counted.
    pub cancelled: bool,
    pub duration_seconds: f64,
}

impl ExecutionReport {
    fn new(sql_file: &Path, total: usize, dry_run: bool) -> Self {
        Self {
            sql_file: sql_file.to_path_buf(),
            dry_run,
            total,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
            previews: Vec::new(),
            cancelled: false,
            duration_seconds: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// First `max_chars` characters of `statement`, with `...` when cut.
pub fn preview(statement: &str, max_chars: usize) -> String {
    match statement.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &statement[..cut]),
        None => statement.to_string(),
    }
}

/// Empty and comment-only statements are not sent to the server.
fn is_skippable(statement: &str) -> bool {
    let trimmed = statement.trim();
    trimmed.is_empty() || trimmed.starts_with("--")
}

/// Runs statement lists and reports per-statement outcomes.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutionConfig,
    error_log: Option<ErrorLog>,
}

impl Executor {
    pub fn new(config: ExecutionConfig) -> Self {
        let error_log = config.error_log.clone().map(ErrorLog::new);
        Self { config, error_log }
    }

    /// Execute `statements` in order through `runner`.
    ///
    /// Per-statement errors land in the report. When `cancel` fires the loop
    /// stops before the next statement and the partial report comes back
    /// with `cancelled` set.
    pub async fn run<R>(
        &self,
        runner: &mut R,
        sql_file: &Path,
        statements: &[String],
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport>
    where
        R: StatementRunner + ?Sized,
    {
        let started = Instant::now();
        let total = statements.len();
        let mut report = ExecutionReport::new(sql_file, total, false);
        let file_label = sql_file.display().to_string();

        info!("Executing {} statements from {}", total, file_label);

        for (i, statement) in statements.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Execution cancelled after {} of {} statements",
                    i, total
                );
                report.cancelled = true;
                break;
            }

            let index = i + 1;
            if is_skippable(statement) {
                report.skipped += 1;
                continue;
            }

            debug!(
                "[{}/{}] {}",
                index,
                total,
                preview(statement, LOG_PREVIEW_CHARS)
            );

            let statement_started = Instant::now();
            match runner.execute(statement).await {
                Ok(()) => {
                    report.succeeded += 1;
                    debug!(
                        "[{}/{}] ok in {:.3}s",
                        index,
                        total,
                        statement_started.elapsed().as_secs_f64()
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    let failure = StatementFailure {
                        timestamp: Utc::now(),
                        sql_file: file_label.clone(),
                        statement_index: index,
                        statement_preview: preview(statement, self.config.preview_chars),
                        error_message: e.to_string(),
                        full_statement: statement.clone(),
                    };
                    error!(
                        "Statement {} failed: {} ({})",
                        index, failure.error_message, failure.statement_preview
                    );
                    self.record(&failure);
                    report.failures.push(failure);
                }
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Finished {}: {} succeeded, {} failed, {} skipped, {} total",
            file_label, report.succeeded, report.failed, report.skipped, report.total
        );
        Ok(report)
    }

    /// Dry run: preview every statement without executing anything.
    pub fn preview(&self, sql_file: &Path, statements: &[String]) -> ExecutionReport {
        let mut report = ExecutionReport::new(sql_file, statements.len(), true);
        info!(
            "Dry run: {} statements in {}",
            statements.len(),
            sql_file.display()
        );
        for (i, statement) in statements.iter().enumerate() {
            if is_skippable(statement) {
                report.skipped += 1;
                continue;
            }
            let shown = preview(statement, self.config.dry_run_preview_chars);
            info!("[{}/{}] {}", i + 1, statements.len(), shown);
            report.previews.push(StatementPreview {
                statement_index: i + 1,
                preview: shown,
            });
        }
        report
    }

    fn record(&self, failure: &StatementFailure) {
        let Some(log) = &self.error_log else {
            return;
        };
        match log.append(failure) {
            Ok(()) => debug!("Failure recorded in {}", log.path().display()),
            Err(e) => warn!(
                "Could not write error log {}: {}",
                log.path().display(),
                e
            ),
        }
    }
}
