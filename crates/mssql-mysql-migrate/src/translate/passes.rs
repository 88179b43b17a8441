//! The individual translation passes, in pipeline order.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::create_table;
use super::{Pass, QUALIFIED_NAME};
use crate::core::identifier;
use crate::lexer::{self, LiteralMap, QuoteRules, SegmentKind};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Replace matches starting outside T-SQL literals.
fn replace<F>(text: &str, re: &Regex, f: F) -> String
where
    F: FnMut(&Captures<'_>) -> String,
{
    lexer::replace_outside_literals(text, QuoteRules::MSSQL, re, f)
}

// ---------------------------------------------------------------------------
// 1. normalize-comments
// ---------------------------------------------------------------------------

static BANNER_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)^--[ \t]*(?:-{4,}[ \t]*$|Records of\b|Primary Key structure for table\b)")
});

static TRAILING_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)[ \t]+$"));

/// Unifies line endings, drops ordinary `--` comments and trailing blanks.
/// Export banners and block comments survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeComments;

impl Pass for NormalizeComments {
    fn name(&self) -> &'static str {
        "normalize-comments"
    }

    fn apply(&self, sql: &str) -> String {
        let unified = sql.replace("\r\n", "\n");
        let stripped = lexer::strip_line_comments_except(&unified, QuoteRules::MSSQL, |c| {
            BANNER_COMMENT.is_match(c)
        });
        replace(&stripped, &TRAILING_WHITESPACE, |_| String::new())
    }
}

// ---------------------------------------------------------------------------
// 2. collapse-drop-guards
// ---------------------------------------------------------------------------

static EXISTS_DROP_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\bIF\s+EXISTS\s*\(\s*SELECT\b[^;\n]*?\bOBJECT_ID\s*\(\s*N?'(?P<guard>[^'\n]*)'[^;\n]*?\)\s*DROP\s+TABLE\s+(?P<table>{QUALIFIED_NAME})"
    ))
});

static OBJECT_ID_DROP_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\bIF\s+OBJECT_ID\s*\(\s*N?'(?P<guard>[^'\n]*)'(?:\s*,\s*N?'[^'\n]*')?\s*\)\s+IS\s+NOT\s+NULL\s+DROP\s+TABLE\s+(?P<table>{QUALIFIED_NAME})"
    ))
});

/// `IF EXISTS (... OBJECT_ID(N'x') ...) DROP TABLE x` becomes
/// `DROP TABLE IF EXISTS x` when the guard and the dropped table agree.
#[derive(Debug, Clone, Default)]
pub struct CollapseDropGuards {
    schemas: Vec<String>,
}

impl CollapseDropGuards {
    pub fn new(schemas: Vec<String>) -> Self {
        Self { schemas }
    }

    fn collapse(&self, caps: &Captures<'_>) -> String {
        let guard = identifier::normalize_table_name(&caps["guard"], &self.schemas);
        let table = identifier::normalize_table_name(&caps["table"], &self.schemas);
        if guard.is_empty() || guard != table {
            return caps[0].to_string();
        }
        format!(
            "DROP TABLE IF EXISTS {}",
            identifier::mysql_table_name(&caps["table"], &self.schemas)
        )
    }
}

impl Pass for CollapseDropGuards {
    fn name(&self) -> &'static str {
        "collapse-drop-guards"
    }

    fn apply(&self, sql: &str) -> String {
        let sql = replace(sql, &EXISTS_DROP_GUARD, |caps| self.collapse(caps));
        replace(&sql, &OBJECT_ID_DROP_GUARD, |caps| self.collapse(caps))
    }
}

// ---------------------------------------------------------------------------
// 3. rewrite-identity-insert
// ---------------------------------------------------------------------------

static IDENTITY_INSERT: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\bSET\s+IDENTITY_INSERT\s+{QUALIFIED_NAME}\s+(?P<state>ON|OFF)\b[ \t]*;?"
    ))
});

/// `SET IDENTITY_INSERT t ON|OFF` toggles foreign-key checks instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteIdentityInsert;

impl Pass for RewriteIdentityInsert {
    fn name(&self) -> &'static str {
        "rewrite-identity-insert"
    }

    fn apply(&self, sql: &str) -> String {
        replace(sql, &IDENTITY_INSERT, |caps| {
            if caps["state"].eq_ignore_ascii_case("ON") {
                "SET FOREIGN_KEY_CHECKS=0;".to_string()
            } else {
                "SET FOREIGN_KEY_CHECKS=1;".to_string()
            }
        })
    }
}

// ---------------------------------------------------------------------------
// 4. remove-lock-escalation
// ---------------------------------------------------------------------------

static LOCK_ESCALATION: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\bALTER\s+TABLE\s+{QUALIFIED_NAME}\s+SET\s*\(\s*LOCK_ESCALATION\s*=\s*\w+\s*\)[ \t]*;?"
    ))
});

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveLockEscalation;

impl Pass for RemoveLockEscalation {
    fn name(&self) -> &'static str {
        "remove-lock-escalation"
    }

    fn apply(&self, sql: &str) -> String {
        replace(sql, &LOCK_ESCALATION, |_| String::new())
    }
}

// ---------------------------------------------------------------------------
// 5. remove-primary-key-storage
// ---------------------------------------------------------------------------

fn alter_primary_key() -> String {
    format!(
        r"ALTER\s+TABLE\s+{QUALIFIED_NAME}\s+ADD\s+CONSTRAINT\s+{QUALIFIED_NAME}\s+PRIMARY\s+KEY\s*(?:(?:NON)?CLUSTERED\s*)?\([^()]*\)\s*WITH\s*\([^()]*\)\s*ON\s+{QUALIFIED_NAME}[ \t]*;?"
    )
}

static BANNERED_PRIMARY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)--[ \t]*-{{4,}}[ \t]*\n--[ \t]*Primary Key structure for table[^\n]*\n--[ \t]*-{{4,}}[ \t]*\n\s*{}",
        alter_primary_key()
    ))
});

static ALTER_PRIMARY_KEY: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)\b{}", alter_primary_key())));

static INDEX_STORAGE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\s*\bWITH\s*\([^()]*\)\s*ON\s+(?:\[PRIMARY\]|PRIMARY\b)")
});

static TABLE_STORAGE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\)[ \t]*ON\s+(?:\[PRIMARY\]|PRIMARY\b)(?:\s*TEXTIMAGE_ON\s+(?:\[PRIMARY\]|PRIMARY\b))?")
});

/// Drops clustered primary-key statements carrying index storage options,
/// with or without their export banner, plus leftover filegroup directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovePrimaryKeyStorage;

impl Pass for RemovePrimaryKeyStorage {
    fn name(&self) -> &'static str {
        "remove-primary-key-storage"
    }

    fn apply(&self, sql: &str) -> String {
        let sql = replace(sql, &BANNERED_PRIMARY_KEY, |_| String::new());
        let sql = replace(&sql, &ALTER_PRIMARY_KEY, |_| String::new());
        let sql = replace(&sql, &INDEX_STORAGE, |_| String::new());
        replace(&sql, &TABLE_STORAGE, |_| ")".to_string())
    }
}

// ---------------------------------------------------------------------------
// 6. normalize-lexemes
// ---------------------------------------------------------------------------

static COLLATE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)[ \t]*\bCOLLATE\s+(?P<name>\w+)"));

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bnumeric\b"));

static BATCH_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?im)^[ \t]*GO(?:[ \t]+\d+)?[ \t]*;?[ \t]*$"));

/// Token-level cleanup: collations, bracket quoting outside table bodies,
/// schema qualifiers, `N'...'` prefixes, `numeric`, and `GO` separators.
#[derive(Debug, Clone, Default)]
pub struct NormalizeLexemes {
    collations: Vec<String>,
    schemas: Vec<String>,
}

impl NormalizeLexemes {
    pub fn new(collations: Vec<String>, schemas: Vec<String>) -> Self {
        Self {
            collations,
            schemas,
        }
    }

    fn remove_collations(&self, sql: &str) -> String {
        replace(sql, &COLLATE_CLAUSE, |caps| {
            let name = &caps["name"];
            if self.collations.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
    }

    fn strip_schemas(&self, sql: &str) -> String {
        identifier::strip_schema_qualifiers(sql, &self.schemas)
    }
}

/// Strip brackets everywhere except inside `CREATE TABLE` bodies.
fn strip_brackets_outside_tables(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for span in create_table::locate(sql) {
        out.push_str(&identifier::strip_brackets(&sql[last..span.body.start]));
        out.push_str(&sql[span.body.clone()]);
        last = span.body.end;
    }
    out.push_str(&identifier::strip_brackets(&sql[last..]));
    out
}

/// `N'text'` becomes `'text'`.
fn strip_unicode_prefixes(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for seg in lexer::segments(sql, QuoteRules::MSSQL) {
        if seg.kind == SegmentKind::Quoted && seg.text.starts_with('\'') && ends_with_prefix(&out) {
            out.pop();
        }
        out.push_str(seg.text);
    }
    out
}

/// Whether `text` ends with a standalone `N`, not the tail of a word.
fn ends_with_prefix(text: &str) -> bool {
    let mut rev = text.chars().rev();
    match rev.next() {
        Some('N') | Some('n') => {}
        _ => return false,
    }
    !rev
        .next()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$'))
}

impl Pass for NormalizeLexemes {
    fn name(&self) -> &'static str {
        "normalize-lexemes"
    }

    fn apply(&self, sql: &str) -> String {
        let sql = self.remove_collations(sql);
        let sql = strip_brackets_outside_tables(&sql);
        let sql = self.strip_schemas(&sql);
        let sql = strip_unicode_prefixes(&sql);
        let sql = replace(&sql, &NUMERIC, |_| "decimal".to_string());
        replace(&sql, &BATCH_SEPARATOR, |_| ";".to_string())
    }
}

// ---------------------------------------------------------------------------
// 7. suppress-trailing-constraints
// ---------------------------------------------------------------------------

static DASH_RULE: LazyLock<Regex> = LazyLock::new(|| compile(r"^--[ \t]*-{4,}[ \t]*$"));

static RECORDS_BANNER: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^--[ \t]*Records of\b"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuppressState {
    Scanning,
    Suppressing,
}

/// Drops export banner lines and, when enabled, everything from the first
/// trailing primary-key block to the end of the document.
#[derive(Debug, Clone, Copy)]
pub struct SuppressTrailingConstraints {
    stop_at_trailing_constraints: bool,
}

impl SuppressTrailingConstraints {
    pub fn new(stop_at_trailing_constraints: bool) -> Self {
        Self {
            stop_at_trailing_constraints,
        }
    }

    fn is_trigger(line: &str) -> bool {
        let upper = line.to_uppercase();
        (upper.contains("ALTER TABLE")
            && upper.contains("ADD CONSTRAINT")
            && upper.contains("PRIMARY KEY"))
            || upper.contains("PRIMARY KEY STRUCTURE")
    }

    fn is_banner(line: &str) -> bool {
        let line = line.trim();
        DASH_RULE.is_match(line) || RECORDS_BANNER.is_match(line)
    }
}

/// The characters of `line` (starting at `start` in the document) that lie
/// outside string literals.
fn outside_literals(line: &str, start: usize, literals: &LiteralMap) -> String {
    line.char_indices()
        .filter(|&(i, _)| !literals.contains(start + i))
        .map(|(_, c)| c)
        .collect()
}

impl Default for SuppressTrailingConstraints {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Pass for SuppressTrailingConstraints {
    fn name(&self) -> &'static str {
        "suppress-trailing-constraints"
    }

    fn apply(&self, sql: &str) -> String {
        let literals = LiteralMap::new(sql, QuoteRules::MSSQL);
        let mut state = SuppressState::Scanning;
        let mut kept: Vec<&str> = Vec::new();
        let mut offset = 0;
        for line in sql.split('\n') {
            let start = offset;
            offset += line.len() + 1;

            let code = outside_literals(line, start, &literals);
            if self.stop_at_trailing_constraints && Self::is_trigger(&code) {
                state = SuppressState::Suppressing;
            }
            if state == SuppressState::Suppressing {
                break;
            }
            let indent = line.len() - line.trim_start().len();
            if literals.contains(start + indent) || !Self::is_banner(line) {
                kept.push(line);
            }
        }
        kept.join("\n")
    }
}

// ---------------------------------------------------------------------------
// 8. rewrite-create-tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RewriteCreateTables {
    schemas: Vec<String>,
}

impl RewriteCreateTables {
    pub fn new(schemas: Vec<String>) -> Self {
        Self { schemas }
    }
}

impl Pass for RewriteCreateTables {
    fn name(&self) -> &'static str {
        "rewrite-create-tables"
    }

    fn apply(&self, sql: &str) -> String {
        create_table::rewrite_create_tables(sql, &self.schemas)
    }
}

// ---------------------------------------------------------------------------
// 9. collapse-blank-lines
// ---------------------------------------------------------------------------

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| compile(r"\n(?:[ \t]*\n){2,}"));

#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseBlankLines;

impl Pass for CollapseBlankLines {
    fn name(&self) -> &'static str {
        "collapse-blank-lines"
    }

    fn apply(&self, sql: &str) -> String {
        replace(sql, &BLANK_LINES, |_| "\n\n".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dbo() -> Vec<String> {
        vec!["dbo".to_string()]
    }

    fn lexemes() -> NormalizeLexemes {
        NormalizeLexemes::new(vec!["Chinese_PRC_CI_AS".to_string()], dbo())
    }

    #[test]
    fn test_normalize_comments() {
        let input = "SELECT 1 -- note  \r\n-- ------------\r\n-- Records of t\r\n/* keep\r\n me */ SELECT '--x'   \r\n";
        assert_eq!(
            NormalizeComments.apply(input),
            "SELECT 1\n-- ------------\n-- Records of t\n/* keep\n me */ SELECT '--x'\n"
        );
    }

    #[test]
    fn test_trailing_whitespace_inside_literal_kept() {
        let input = "SELECT 'a  \nb'";
        assert_eq!(NormalizeComments.apply(input), input);
    }

    #[test]
    fn test_drop_guard_collapses() {
        let pass = CollapseDropGuards::new(dbo());
        let input = "IF EXISTS (SELECT * FROM sys.all_objects WHERE object_id = OBJECT_ID(N'[dbo].[Customers]') AND type IN ('U'))\n\tDROP TABLE [dbo].[Customers]\nGO";
        assert_eq!(pass.apply(input), "DROP TABLE IF EXISTS Customers\nGO");
    }

    #[test]
    fn test_drop_guard_mismatch_untouched() {
        let pass = CollapseDropGuards::new(dbo());
        let input = "IF EXISTS (SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'[dbo].[A]'))\nDROP TABLE [dbo].[B]";
        assert_eq!(pass.apply(input), input);
    }

    #[test]
    fn test_object_id_guard_collapses() {
        let pass = CollapseDropGuards::new(dbo());
        let input = "IF OBJECT_ID(N'dbo.Orders', N'U') IS NOT NULL\n  DROP TABLE dbo.Orders;";
        assert_eq!(pass.apply(input), "DROP TABLE IF EXISTS Orders;");
    }

    #[test]
    fn test_drop_guard_quotes_spaced_name() {
        let pass = CollapseDropGuards::new(dbo());
        let input = "IF OBJECT_ID(N'[dbo].[Order Details]', N'U') IS NOT NULL DROP TABLE [dbo].[Order Details]";
        assert_eq!(pass.apply(input), "DROP TABLE IF EXISTS `Order Details`");
    }

    #[test]
    fn test_drop_guard_other_schema_kept_qualified() {
        let pass = CollapseDropGuards::new(dbo());
        let input = "IF OBJECT_ID('sales.Orders') IS NOT NULL DROP TABLE [sales].[Orders]";
        assert_eq!(pass.apply(input), "DROP TABLE IF EXISTS sales.Orders");
    }

    #[test]
    fn test_identity_insert() {
        let input = "SET IDENTITY_INSERT [dbo].[T] ON\nGO\nset identity_insert T off;\n";
        assert_eq!(
            RewriteIdentityInsert.apply(input),
            "SET FOREIGN_KEY_CHECKS=0;\nGO\nSET FOREIGN_KEY_CHECKS=1;\n"
        );
    }

    #[test]
    fn test_lock_escalation_removed() {
        let input = "ALTER TABLE [dbo].[T] SET (LOCK_ESCALATION = TABLE)\nGO";
        assert_eq!(RemoveLockEscalation.apply(input), "\nGO");
    }

    #[test]
    fn test_bannered_primary_key_removed() {
        let input = "SELECT 1\n-- ----------------------------\n-- Primary Key structure for table T\n-- ----------------------------\nALTER TABLE [dbo].[T] ADD CONSTRAINT [PK_T] PRIMARY KEY CLUSTERED ([id])\nWITH (PAD_INDEX = OFF, IGNORE_DUP_KEY = OFF)\nON [PRIMARY]\nGO";
        assert_eq!(RemovePrimaryKeyStorage.apply(input), "SELECT 1\n\nGO");
    }

    #[test]
    fn test_inline_primary_key_removed() {
        let input = "ALTER TABLE T ADD CONSTRAINT PK_T PRIMARY KEY NONCLUSTERED (id) WITH (PAD_INDEX = OFF) ON [PRIMARY];\nSELECT 2";
        assert_eq!(RemovePrimaryKeyStorage.apply(input), "\nSELECT 2");
    }

    #[test]
    fn test_storage_directives_removed() {
        let input = "CREATE TABLE [T] ([id] int, CONSTRAINT [PK] PRIMARY KEY CLUSTERED ([id] ASC) WITH (PAD_INDEX = OFF) ON [PRIMARY]) ON [PRIMARY] TEXTIMAGE_ON [PRIMARY]";
        assert_eq!(
            RemovePrimaryKeyStorage.apply(input),
            "CREATE TABLE [T] ([id] int, CONSTRAINT [PK] PRIMARY KEY CLUSTERED ([id] ASC))"
        );
    }

    #[test]
    fn test_collation_removed_only_when_configured() {
        let out = lexemes().apply("SELECT a COLLATE Chinese_PRC_CI_AS, b COLLATE Latin1_General_CI_AS");
        assert_eq!(out, "SELECT a, b COLLATE Latin1_General_CI_AS");
    }

    #[test]
    fn test_brackets_stripped_outside_literals_and_table_bodies() {
        let input = "INSERT INTO [dbo].[T] ([a]) VALUES ('[x]');\nCREATE TABLE [dbo].[U] ([id] int)";
        assert_eq!(
            lexemes().apply(input),
            "INSERT INTO T (a) VALUES ('[x]');\nCREATE TABLE U ([id] int)"
        );
    }

    #[test]
    fn test_unicode_prefix_removed() {
        assert_eq!(
            lexemes().apply("VALUES (N'a', n'b', NN'c', 'N')"),
            "VALUES ('a', 'b', NN'c', 'N')"
        );
    }

    #[test]
    fn test_numeric_and_go() {
        let input = "a numeric(10,2)\nGO\n  go 5  \nGOTO x\nSELECT 'GO'";
        assert_eq!(
            lexemes().apply(input),
            "a decimal(10,2)\n;\n;\nGOTO x\nSELECT 'GO'"
        );
    }

    #[test]
    fn test_schema_strip_keeps_other_qualifiers() {
        assert_eq!(
            lexemes().apply("SELECT * FROM dbo.A JOIN sales.B ON dbo.A.id = B.id"),
            "SELECT * FROM A JOIN sales.B ON A.id = B.id"
        );
    }

    #[test]
    fn test_trailing_constraints_suppressed() {
        let input = "CREATE TABLE t (id int)\n;\n-- ----------\n-- Records of t\nINSERT INTO t VALUES (1)\n;\nALTER TABLE t ADD CONSTRAINT pk PRIMARY KEY (id)\n;\nINSERT INTO t VALUES (2)";
        assert_eq!(
            SuppressTrailingConstraints::new(true).apply(input),
            "CREATE TABLE t (id int)\n;\nINSERT INTO t VALUES (1)\n;"
        );
    }

    #[test]
    fn test_banner_trigger_suppresses() {
        let input = "SELECT 1\n-- Primary Key structure for table t\nSELECT 2";
        assert_eq!(SuppressTrailingConstraints::default().apply(input), "SELECT 1");
    }

    #[test]
    fn test_constraint_text_inside_literal_is_not_a_trigger() {
        let input = "INSERT INTO notes VALUES ('ALTER TABLE x ADD CONSTRAINT pk PRIMARY KEY (id)')\n;\nINSERT INTO notes VALUES ('multi\n-- ----------\nline')\n;";
        assert_eq!(SuppressTrailingConstraints::default().apply(input), input);
    }

    #[test]
    fn test_suppression_disabled_keeps_rest() {
        let input = "-- ----------\nALTER TABLE t ADD CONSTRAINT pk PRIMARY KEY (id)\nSELECT 2";
        assert_eq!(
            SuppressTrailingConstraints::new(false).apply(input),
            "ALTER TABLE t ADD CONSTRAINT pk PRIMARY KEY (id)\nSELECT 2"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(
            CollapseBlankLines.apply("a\n\n\n\nb\n \t\n\nc\n\nd"),
            "a\n\nb\n\nc\n\nd"
        );
    }
}
