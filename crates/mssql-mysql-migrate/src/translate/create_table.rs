//! Structural rewrite of `CREATE TABLE` bodies.
//!
//! Each body is split into top-level clauses. Column clauses lose their
//! `IDENTITY` property (replaced by `AUTO_INCREMENT` on integer columns),
//! bracket quoting and collations, and have their type mapped to MySQL.
//! The first `NOT NULL` identity column becomes the primary key when the
//! table declares none.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::QUALIFIED_NAME;
use crate::core::identifier;
use crate::lexer::{self, QuoteRules, Segment, SegmentKind};
use crate::typemap;

static CREATE_TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bCREATE\s+TABLE\s+(?P<name>{QUALIFIED_NAME})\s*\("
    ))
    .expect("valid regex")
});

static IDENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\bIDENTITY\b(?:\s*\(\s*-?\d+\s*,\s*-?\d+\s*\))?").expect("valid regex")
});

static COLLATE_ANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bCOLLATE\s+[^\s,()]+").expect("valid regex"));

static CLUSTERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\b(?:NON)?CLUSTERED\b").expect("valid regex"));

static NOT_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").expect("valid regex"));

static PRIMARY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("valid regex"));

/// One part of a possibly qualified type name.
const TYPE_PART: &str = r"(?:\[[^\]\n]*\]|`[^`\n]*`|[A-Za-z_]\w*)";

static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<type>{TYPE_PART}(?:\s*\.\s*{TYPE_PART})*)(?:\s*\((?P<args>[^()]*)\))?"
    ))
    .expect("valid regex")
});

const CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "UNIQUE",
    "INDEX",
    "KEY",
    "FOREIGN",
    "CHECK",
];

/// Location of one complete `CREATE TABLE name ( body )` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableSpan {
    /// Offset of `CREATE`.
    pub start: usize,
    /// The table name as written.
    pub name: Range<usize>,
    /// Text between the outer parentheses.
    pub body: Range<usize>,
    /// Offset one past the closing parenthesis.
    pub end: usize,
}

/// Find every paren-balanced `CREATE TABLE` span outside literals and comments.
pub(crate) fn locate(text: &str) -> Vec<TableSpan> {
    let segs = lexer::segments(text, QuoteRules::MSSQL);
    let mut spans = Vec::new();
    let mut last_end = 0;

    for caps in CREATE_TABLE_HEADER.captures_iter(text) {
        let (Some(header), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        if header.start() < last_end || !starts_in_code(&segs, header.start()) {
            continue;
        }
        let open = header.end() - 1;
        let Some(close) = lexer::matching_paren(&segs, open) else {
            continue;
        };
        spans.push(TableSpan {
            start: header.start(),
            name: name.range(),
            body: open + 1..close,
            end: close + 1,
        });
        last_end = close + 1;
    }
    spans
}

fn starts_in_code(segs: &[Segment<'_>], offset: usize) -> bool {
    let idx = segs.partition_point(|s| s.end() <= offset);
    segs.get(idx).is_some_and(|s| s.kind == SegmentKind::Code)
}

/// One top-level clause of a table body after rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name as rendered for MySQL; `None` for constraint clauses.
    pub name: Option<String>,
    pub text: String,
    pub has_identity: bool,
    pub is_auto_increment_primary_candidate: bool,
}

impl ColumnDefinition {
    fn plain(text: String) -> Self {
        Self {
            name: None,
            text,
            has_identity: false,
            is_auto_increment_primary_candidate: false,
        }
    }
}

/// Result of rewriting one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRewriteResult {
    pub table_name: String,
    /// Clauses joined with `,\n`, each indented by two spaces.
    pub rewritten_body: String,
    /// Column that received a synthesized `PRIMARY KEY` clause.
    pub primary_key_column: Option<String>,
}

impl TableRewriteResult {
    pub fn render(&self) -> String {
        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.table_name, self.rewritten_body
        )
    }
}

/// Rewrite every `CREATE TABLE` statement of `text`. Unbalanced spans are
/// left as they are. `schemas` are dropped from qualified column types.
pub fn rewrite_create_tables(text: &str, schemas: &[String]) -> String {
    let spans = locate(text);
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&text[last..span.start]);
        let rewritten = rewrite_table(&text[span.name.clone()], &text[span.body.clone()], schemas);
        out.push_str(&rewritten.render());
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Rewrite a single table given its name and the text between its parentheses.
pub fn rewrite_table(name: &str, body: &str, schemas: &[String]) -> TableRewriteResult {
    let columns: Vec<ColumnDefinition> = lexer::split_top_level(body, QuoteRules::MSSQL, b',')
        .into_iter()
        .map(|clause| lexer::collapse_whitespace(clause, QuoteRules::MSSQL))
        .map(|clause| clause.trim().trim_end_matches(',').trim_end().to_string())
        .filter(|clause| !clause.is_empty())
        .map(|clause| rewrite_clause(&clause, schemas))
        .collect();

    let has_primary_key = columns.iter().any(|c| has_keyword(&c.text, &PRIMARY_KEY));
    let primary_key_column = if has_primary_key {
        None
    } else {
        columns
            .iter()
            .find(|c| c.is_auto_increment_primary_candidate)
            .and_then(|c| c.name.clone())
    };

    let mut clauses: Vec<String> = columns.into_iter().map(|c| c.text).collect();
    if let Some(column) = &primary_key_column {
        clauses.push(format!("PRIMARY KEY ({})", column));
    }

    let rewritten_body = clauses
        .iter()
        .map(|c| format!("  {}", c))
        .collect::<Vec<_>>()
        .join(",\n");

    TableRewriteResult {
        table_name: identifier::strip_brackets(name.trim()),
        rewritten_body,
        primary_key_column,
    }
}

fn rewrite_clause(clause: &str, schemas: &[String]) -> ColumnDefinition {
    let first_word = clause
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if CONSTRAINT_KEYWORDS.contains(&first_word.as_str()) {
        let text = remove_all(&clean(clause, schemas), &CLUSTERED);
        return ColumnDefinition::plain(tidy(&text));
    }
    rewrite_column(clause, schemas).unwrap_or_else(|| ColumnDefinition::plain(tidy(&clean(clause, schemas))))
}

/// `name type[(args)] rest`; `None` when the clause does not look like that.
fn rewrite_column(clause: &str, schemas: &[String]) -> Option<ColumnDefinition> {
    let (name, rest) = split_column_name(clause)?;
    let caps = COLUMN_TYPE.captures(rest)?;
    let type_match = caps.get(0)?;
    let qualified_type = caps.name("type")?;
    let args = caps.name("args").map(|a| a.as_str());
    // a qualifier other than a configured schema never maps to a built-in type
    let type_name = identifier::normalize_table_name(qualified_type.as_str(), schemas);

    let mut has_identity = false;
    let tail = lexer::replace_outside_literals(
        &rest[type_match.end()..],
        QuoteRules::MSSQL,
        &IDENTITY,
        |_| {
            has_identity = true;
            String::new()
        },
    );
    let tail = tidy(&clean(&tail, schemas));

    let integer = typemap::is_integer_type(&type_name);
    let mut column_type = typemap::mssql_to_mysql(&type_name, args).unwrap_or_else(|| {
        format!(
            "{}{}",
            identifier::mysql_table_name(qualified_type.as_str(), schemas),
            identifier::strip_brackets(&rest[qualified_type.end()..type_match.end()])
        )
    });
    if has_identity && integer {
        column_type.push_str(" AUTO_INCREMENT");
    }

    let is_auto_increment_primary_candidate =
        has_identity && integer && has_keyword(&tail, &NOT_NULL);

    let name = match name.chars().next() {
        Some('[') | Some('"') => identifier::mysql_identifier(&identifier::unquote(name)),
        _ => name.to_string(),
    };
    let text = if tail.is_empty() {
        format!("{} {}", name, column_type)
    } else {
        format!("{} {} {}", name, column_type, tail)
    };

    Some(ColumnDefinition {
        name: Some(name),
        text,
        has_identity,
        is_auto_increment_primary_candidate,
    })
}

fn split_column_name(clause: &str) -> Option<(&str, &str)> {
    let end = match clause.chars().next()? {
        '[' | '"' | '`' => {
            let first = lexer::segments(clause, QuoteRules::MSSQL).into_iter().next()?;
            if first.kind == SegmentKind::Code {
                return None;
            }
            first.end()
        }
        _ => clause.find(char::is_whitespace)?,
    };
    Some((&clause[..end], clause[end..].trim_start()))
}

/// Strip bracket quoting, configured schema qualifiers and collations.
fn clean(text: &str, schemas: &[String]) -> String {
    let unbracketed = identifier::strip_brackets(text);
    remove_all(&identifier::strip_schema_qualifiers(&unbracketed, schemas), &COLLATE_ANY)
}

fn remove_all(text: &str, re: &Regex) -> String {
    lexer::replace_outside_literals(text, QuoteRules::MSSQL, re, |_| String::new())
}

fn tidy(text: &str) -> String {
    lexer::collapse_whitespace(text, QuoteRules::MSSQL)
        .trim()
        .trim_end_matches(',')
        .trim_end()
        .to_string()
}

fn has_keyword(text: &str, re: &Regex) -> bool {
    let literals = lexer::LiteralMap::new(text, QuoteRules::MSSQL);
    re.find_iter(text).any(|m| !literals.contains(m.start()))
}
