//! Configuration loading and validation.
//!
//! A YAML file is optional; every field has a default. Connection settings
//! given on the command line or in the environment are layered on top by the
//! CLI before [`Config::validate_for_execution`] runs.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Validate the connection settings needed to execute statements.
    pub fn validate_for_execution(&self) -> Result<()> {
        validation::validate(self)?;
        validation::validate_for_execution(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use std::io::Write;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml("target:\n  database: shop\n").unwrap();
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.target.port, 3306);
        assert_eq!(config.target.user, "root");
        assert_eq!(config.target.charset, "utf8mb4");
        assert_eq!(config.target.database, "shop");
        assert_eq!(config.execution.preview_chars, 100);
        assert_eq!(config.execution.dry_run_preview_chars, 200);
        assert_eq!(
            config.execution.error_log.as_deref(),
            Some(Path::new("sql_execution_errors.jsonl"))
        );
        assert_eq!(config.output.suffix, "_mysql");
        assert_eq!(config.translate.schemas, vec!["dbo"]);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
target:
  host: db.internal
  port: 3307
  database: legacy
  user: migrator
  password: hunter2
  charset: utf8
  ssl_mode: require
translate:
  collations: [Chinese_PRC_CI_AS, SQL_Latin1_General_CP1_CI_AS]
  stop_at_trailing_constraints: false
execution:
  error_log: null
  repair_statements: true
output:
  dir: /tmp/out
  suffix: _my
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target.port, 3307);
        assert_eq!(config.target.password, "hunter2");
        assert_eq!(config.translate.collations.len(), 2);
        assert!(!config.translate.stop_at_trailing_constraints);
        assert_eq!(config.execution.error_log, None);
        assert_eq!(config.execution.split_options(), crate::splitter::SplitOptions::best_effort());
        assert_eq!(config.output.dir.as_deref(), Some(Path::new("/tmp/out")));
    }

    #[test]
    fn test_invalid_yaml_is_yaml_error() {
        let err = Config::from_yaml("target: [unclosed").unwrap_err();
        assert!(matches!(err, MigrateError::Yaml(_)));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target:\n  database: from_file").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.database, "from_file");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
    }
}
