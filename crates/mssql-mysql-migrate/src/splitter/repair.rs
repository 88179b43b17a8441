//! Best-effort repairs for damaged exports.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::lexer::{self, LiteralMap, QuoteRules};

static INSERT_INTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bINSERT\s+INTO\b").expect("valid regex"));

static LEADING_INSERT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^INSERT\b").expect("valid regex"));

static VALUES_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bVALUES\b").expect("valid regex"));

static SELECT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSELECT\b").expect("valid regex"));

/// Cut statements with several `INSERT INTO` markers apart and terminate
/// every fragment with `;`. Statements with at most one marker pass through.
pub fn split_merged_inserts(statements: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(statements.len());
    for statement in statements {
        let literals = LiteralMap::new(&statement, QuoteRules::MYSQL);
        let markers: Vec<usize> = INSERT_INTO
            .find_iter(&statement)
            .map(|m| m.start())
            .filter(|&start| !literals.contains(start))
            .collect();

        if markers.len() < 2 {
            out.push(statement);
            continue;
        }

        let mut bounds = vec![0];
        bounds.extend(markers.iter().skip(1).copied());
        bounds.push(statement.len());

        for window in bounds.windows(2) {
            let fragment = statement[window[0]..window[1]].trim();
            if fragment.is_empty() {
                continue;
            }
            if fragment.ends_with(';') {
                out.push(fragment.to_string());
            } else {
                out.push(format!("{fragment};"));
            }
        }
    }
    out
}

/// Drop `INSERT` statements that carry neither `VALUES` nor `SELECT`.
pub fn drop_malformed_inserts(statements: Vec<String>) -> Vec<String> {
    statements
        .into_iter()
        .filter(|s| {
            !LEADING_INSERT.is_match(s.trim_start())
                || VALUES_KEYWORD.is_match(s)
                || SELECT_KEYWORD.is_match(s)
        })
        .collect()
}

/// Insert a `'` right after the last quote when the count of unescaped
/// single quotes is odd.
pub fn repair_unbalanced_quotes(statement: &str) -> Cow<'_, str> {
    if lexer::count_unescaped(statement, '\'') % 2 == 0 {
        return Cow::Borrowed(statement);
    }
    match statement.rfind('\'') {
        Some(pos) => {
            let mut repaired = String::with_capacity(statement.len() + 1);
            repaired.push_str(&statement[..=pos]);
            repaired.push('\'');
            repaired.push_str(&statement[pos + 1..]);
            Cow::Owned(repaired)
        }
        None => Cow::Borrowed(statement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merged_inserts_are_cut() {
        let input = owned(&["INSERT INTO a VALUES (1) insert  into b VALUES (2)"]);
        assert_eq!(
            split_merged_inserts(input),
            vec!["INSERT INTO a VALUES (1);", "insert  into b VALUES (2);"]
        );
    }

    #[test]
    fn test_single_insert_untouched() {
        let input = owned(&["INSERT INTO a VALUES (1)", "SELECT 1"]);
        assert_eq!(split_merged_inserts(input.clone()), input);
    }

    #[test]
    fn test_marker_inside_literal_ignored() {
        let input = owned(&["INSERT INTO log VALUES ('INSERT INTO x')"]);
        assert_eq!(split_merged_inserts(input.clone()), input);
    }

    #[test]
    fn test_drop_malformed_inserts() {
        let input = owned(&[
            "INSERT INTO t",
            "INSERT INTO t (a) VALUES (1)",
            "INSERT INTO t SELECT * FROM u",
            "UPDATE t SET a = 1",
        ]);
        assert_eq!(
            drop_malformed_inserts(input),
            vec![
                "INSERT INTO t (a) VALUES (1)",
                "INSERT INTO t SELECT * FROM u",
                "UPDATE t SET a = 1"
            ]
        );
    }

    #[test]
    fn test_quote_repair() {
        assert_eq!(
            repair_unbalanced_quotes("INSERT INTO t VALUES ('abc)"),
            "INSERT INTO t VALUES (''abc)"
        );
        assert!(matches!(
            repair_unbalanced_quotes("SELECT 'ok'"),
            Cow::Borrowed("SELECT 'ok'")
        ));
        assert_eq!(repair_unbalanced_quotes(r"SELECT 'a\'b'"), r"SELECT 'a\'b'");
    }
}
