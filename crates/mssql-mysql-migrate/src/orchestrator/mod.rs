//! Migration orchestrator - file-level workflow coordinator.
//!
//! Converts SQL Server scripts to MySQL, executes scripts against MySQL, or
//! both in sequence.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::executor::{ExecutionReport, Executor, MysqlRunner};
use crate::splitter;
use crate::translate::Translator;

/// Directory created next to the input's parent when no output dir is configured.
const DEFAULT_OUTPUT_DIR: &str = "target-data";

/// Which halves of a migration to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Convert, then execute the converted script.
    #[default]
    Full,
    /// Only write the converted script.
    ConvertOnly,
    /// Execute a previously converted script.
    ExecuteOnly,
}

/// Result of converting one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub original_lines: usize,
    pub converted_lines: usize,
    pub original_bytes: usize,
    pub converted_bytes: usize,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub mode: RunMode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionReport>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// No statement failed.
    pub fn is_success(&self) -> bool {
        self.execution.as_ref().map_or(true, ExecutionReport::is_success)
    }
}

/// Migration orchestrator.
#[derive(Debug)]
pub struct Orchestrator {
    config: Config,
    translator: Translator,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let translator = Translator::new(config.translate.clone());
        Self { config, translator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that `path` names a non-empty regular file.
    ///
    /// A missing file is an I/O error; a directory or empty file is invalid
    /// input. Extensions other than `.sql` only produce a warning.
    pub fn validate_input_file(path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(MigrateError::InvalidInput("input path is empty".into()));
        }
        if !path.exists() {
            return Err(MigrateError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("input file '{}' does not exist", path.display()),
            )));
        }
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(MigrateError::InvalidInput(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(MigrateError::InvalidInput(format!(
                "input file '{}' is empty",
                path.display()
            )));
        }
        let is_sql = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if !is_sql {
            warn!(
                "'{}' does not have a .sql extension, processing anyway",
                path.display()
            );
        }
        Ok(())
    }

    /// Where the converted form of `input` is written.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let dir = match &self.config.output.dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_OUTPUT_DIR),
        };

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let file_name = match input.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.config.output.suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, self.config.output.suffix),
        };
        dir.join(file_name)
    }

    /// Translate `input` and write the MySQL script.
    pub fn convert(&self, input: &Path, output: Option<&Path>) -> Result<ConversionResult> {
        Self::validate_input_file(input)?;
        let original = std::fs::read_to_string(input)?;
        info!("Converting {} ({} bytes)", input.display(), original.len());

        let converted = self.translator.translate(&original);

        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output_path_for(input));
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&output, &converted)?;

        let result = ConversionResult {
            input: input.to_path_buf(),
            output,
            original_lines: original.split('\n').count(),
            converted_lines: converted.split('\n').count(),
            original_bytes: original.len(),
            converted_bytes: converted.len(),
        };
        info!(
            "Wrote {}: {} lines -> {} lines",
            result.output.display(),
            result.original_lines,
            result.converted_lines
        );
        Ok(result)
    }

    /// Split `input` and run its statements, or only preview them.
    pub async fn execute(
        &self,
        input: &Path,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport> {
        Self::validate_input_file(input)?;
        let content = std::fs::read_to_string(input)?;
        let statements = splitter::split_with(&content, &self.config.execution.split_options());
        debug!(
            "Parsed {} statements from {}",
            statements.len(),
            input.display()
        );

        let executor = Executor::new(self.config.execution.clone());
        if dry_run {
            return Ok(executor.preview(input, &statements));
        }

        self.config.validate_for_execution()?;
        let mut runner = MysqlRunner::connect(&self.config.target).await?;
        let report = executor.run(&mut runner, input, &statements, cancel).await;
        if let Err(e) = runner.close().await {
            warn!("Error closing MySQL connection: {}", e);
        }
        report
    }

    /// Run the halves selected by `mode`.
    pub async fn run(
        &self,
        input: &Path,
        mode: RunMode,
        output: Option<&Path>,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let started = Instant::now();

        let (conversion, execution) = match mode {
            RunMode::ConvertOnly => (Some(self.convert(input, output)?), None),
            RunMode::Full => {
                let conversion = self.convert(input, output)?;
                let execution = self.execute(&conversion.output, dry_run, cancel).await?;
                (Some(conversion), Some(execution))
            }
            RunMode::ExecuteOnly => {
                let converted = output
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.output_path_for(input));
                info!("Executing converted script {}", converted.display());
                (None, Some(self.execute(&converted, dry_run, cancel).await?))
            }
        };

        let result = MigrationResult {
            started_at,
            duration_seconds: started.elapsed().as_secs_f64(),
            mode,
            conversion,
            execution,
        };
        info!(
            "Run ({:?}) finished in {:.1}s",
            result.mode, result.duration_seconds
        );
        Ok(result)
    }
}
