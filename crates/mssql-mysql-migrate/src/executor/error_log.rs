//! Append-only JSONL log of failed statements.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::StatementFailure;
use crate::error::Result;

/// One JSON object per line, appended across runs.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure record.
    pub fn append(&self, failure: &StatementFailure) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(failure)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every record back.
    pub fn read_all(&self) -> Result<Vec<StatementFailure>> {
        let content = std::fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn failure(index: usize) -> StatementFailure {
        StatementFailure {
            timestamp: Utc::now(),
            sql_file: "data/orders_mysql.sql".to_string(),
            statement_index: index,
            statement_preview: "INSERT INTO t VALUES ('中文')".to_string(),
            error_message: "Table 't' doesn't exist".to_string(),
            full_statement: "INSERT INTO t VALUES ('中文')".to_string(),
        }
    }

    #[test]
    fn test_append_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("logs").join("errors.jsonl"));

        log.append(&failure(1)).unwrap();
        log.append(&failure(4)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("中文"), "non-ASCII must not be escaped");

        let records = log.read_all().unwrap();
        assert_eq!(records[0].statement_index, 1);
        assert_eq!(records[1].statement_index, 4);
        assert_eq!(records[1].error_message, "Table 't' doesn't exist");
    }

    #[test]
    fn test_record_field_names() {
        let value = serde_json::to_value(failure(2)).unwrap();
        for key in [
            "timestamp",
            "sql_file",
            "statement_index",
            "statement_preview",
            "error_message",
            "full_statement",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
