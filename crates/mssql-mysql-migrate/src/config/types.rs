//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::splitter::SplitOptions;
use crate::translate::TranslateOptions;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target database configuration (MySQL).
    #[serde(default)]
    pub target: TargetConfig,

    /// Dialect translation tunables.
    #[serde(default)]
    pub translate: TranslateOptions,

    /// Statement execution behavior.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Where converted scripts are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target database (MySQL) configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database type (always "mysql" for now).
    #[serde(default = "default_mysql")]
    pub r#type: String,

    /// Database host (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name. Required for execution.
    #[serde(default)]
    pub database: String,

    /// Username (default: "root").
    #[serde(default = "default_user")]
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Connection character set (default: "utf8mb4").
    #[serde(default = "default_charset")]
    pub charset: String,

    /// SSL mode: disable, prefer, require (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            r#type: default_mysql(),
            host: default_host(),
            port: default_mysql_port(),
            database: String::new(),
            user: default_user(),
            password: String::new(),
            charset: default_charset(),
            ssl_mode: default_prefer(),
        }
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("charset", &self.charset)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Statement execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// JSONL file receiving one record per failed statement. `None` disables it.
    #[serde(default = "default_error_log")]
    pub error_log: Option<PathBuf>,

    /// Characters of a failed statement kept in its preview (default: 100).
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Characters shown per statement in dry-run mode (default: 200).
    #[serde(default = "default_dry_run_preview_chars")]
    pub dry_run_preview_chars: usize,

    /// Apply the best-effort splitter repairs (default: false).
    #[serde(default)]
    pub repair_statements: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            error_log: default_error_log(),
            preview_chars: default_preview_chars(),
            dry_run_preview_chars: default_dry_run_preview_chars(),
            repair_statements: false,
        }
    }
}

impl ExecutionConfig {
    /// Splitter options matching `repair_statements`.
    pub fn split_options(&self) -> SplitOptions {
        if self.repair_statements {
            SplitOptions::best_effort()
        } else {
            SplitOptions::default()
        }
    }
}

/// Output location of converted scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory. Defaults to `target-data` next to the input's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Appended to the input file stem (default: "_mysql").
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            suffix: default_suffix(),
        }
    }
}

// Default value functions for serde
fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_error_log() -> Option<PathBuf> {
    Some(PathBuf::from("sql_execution_errors.jsonl"))
}

fn default_preview_chars() -> usize {
    100
}

fn default_dry_run_preview_chars() -> usize {
    200
}

fn default_suffix() -> String {
    "_mysql".to_string()
}
