//! Identifier handling for SQL Server object names.
//!
//! SQL Server scripts name the same table as `Customers`, `[Customers]`,
//! `dbo.Customers` or `[dbo].[Customers]`. These helpers reduce such spellings
//! to a comparable form and replace bracket quoting, which MySQL does not
//! accept, with bare or backtick-quoted names.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexer::{self, QuoteRules, SegmentKind};

static SCHEMA_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?P<schema>\w+)[ \t]*\.[ \t]*(?P<next>[\w\[`"])"#).expect("valid regex")
});

/// Remove one level of `[]`, `""` or backtick delimiters from a name part.
///
/// Doubled closing delimiters inside the name are unescaped.
///
/// ```
/// use mssql_mysql_migrate::core::identifier::unquote;
///
/// assert_eq!(unquote("[Order Details]"), "Order Details");
/// assert_eq!(unquote("[a]]b]"), "a]b");
/// assert_eq!(unquote("plain"), "plain");
/// ```
pub fn unquote(part: &str) -> String {
    let part = part.trim();
    let delimiters = [('[', ']'), ('"', '"'), ('`', '`')];
    for (open, close) in delimiters {
        if part.len() >= 2 && part.starts_with(open) && part.ends_with(close) {
            let inner = &part[1..part.len() - 1];
            let doubled: String = [close, close].iter().collect();
            return inner.replace(&doubled, &close.to_string());
        }
    }
    part.to_string()
}

/// Split a possibly qualified name on dots that are outside delimiters.
///
/// ```
/// use mssql_mysql_migrate::core::identifier::split_qualified;
///
/// assert_eq!(split_qualified("[dbo].[a.b]"), vec!["[dbo]", "[a.b]"]);
/// ```
pub fn split_qualified(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut closer: Option<char> = None;
    let mut last = 0;

    let mut chars = name.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match closer {
            Some(close) if c == close => {
                if chars.peek().map(|&(_, n)| n) == Some(close) {
                    chars.next();
                } else {
                    closer = None;
                }
            }
            Some(_) => {}
            None => match c {
                '[' => closer = Some(']'),
                '"' => closer = Some('"'),
                '`' => closer = Some('`'),
                '.' => {
                    parts.push(name[last..i].trim());
                    last = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(name[last..].trim());
    parts
}

/// Comparable form of a table name: delimiters removed, and a leading
/// schema dropped when it is one of `schemas` (case-insensitive).
///
/// Two spellings refer to the same table when their normalized forms are
/// equal.
pub fn normalize_table_name(name: &str, schemas: &[String]) -> String {
    let mut parts: Vec<String> = split_qualified(name).into_iter().map(unquote).collect();
    if parts.len() > 1 && schemas.iter().any(|s| s.eq_ignore_ascii_case(&parts[0])) {
        parts.remove(0);
    }
    parts.join(".")
}

/// Same as [`normalize_table_name`], but every remaining part is rendered as
/// a MySQL identifier.
pub fn mysql_table_name(name: &str, schemas: &[String]) -> String {
    let mut parts: Vec<&str> = split_qualified(name);
    if parts.len() > 1 && schemas.iter().any(|s| s.eq_ignore_ascii_case(&unquote(parts[0]))) {
        parts.remove(0);
    }
    parts
        .into_iter()
        .map(|part| mysql_identifier(&unquote(part)))
        .collect::<Vec<_>>()
        .join(".")
}

/// Render an unquoted name part for MySQL: bare when it is a plain word,
/// backtick-quoted otherwise.
///
/// ```
/// use mssql_mysql_migrate::core::identifier::mysql_identifier;
///
/// assert_eq!(mysql_identifier("Customers"), "Customers");
/// assert_eq!(mysql_identifier("Order Details"), "`Order Details`");
/// assert_eq!(mysql_identifier("a`b"), "`a``b`");
/// ```
pub fn mysql_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !name.chars().all(|c| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Drop `schema.` prefixes outside literals when the schema is one of
/// `schemas` (case-insensitive). Bracketed schemas must already be stripped.
///
/// ```
/// use mssql_mysql_migrate::core::identifier::strip_schema_qualifiers;
///
/// let schemas = vec!["dbo".to_string()];
/// assert_eq!(
///     strip_schema_qualifiers("SELECT * FROM dbo.t JOIN sales.o ON 'dbo.x' = 1.5", &schemas),
///     "SELECT * FROM t JOIN sales.o ON 'dbo.x' = 1.5"
/// );
/// ```
pub fn strip_schema_qualifiers(text: &str, schemas: &[String]) -> String {
    lexer::replace_outside_literals(text, QuoteRules::MSSQL, &SCHEMA_QUALIFIER, |caps| {
        let schema = &caps["schema"];
        if schemas.iter().any(|s| s.eq_ignore_ascii_case(schema)) {
            caps["next"].to_string()
        } else {
            caps[0].to_string()
        }
    })
}

/// Last part of a qualified name without delimiters.
pub fn bare_name(name: &str) -> String {
    split_qualified(name)
        .last()
        .map(|part| unquote(part))
        .unwrap_or_default()
}

/// Replace every `[name]` outside literals and comments with `name`, or with
/// `` `name` `` when the name is not a plain word.
pub fn strip_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in lexer::segments(text, QuoteRules::MSSQL) {
        if seg.kind == SegmentKind::Identifier && seg.text.starts_with('[') {
            out.push_str(&mysql_identifier(&unquote(seg.text)));
        } else {
            out.push_str(seg.text);
        }
    }
    out
}
