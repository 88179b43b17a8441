//! Statement splitter.
//!
//! Turns a SQL document into the ordered list of statements to execute.
//! A `;` ends a statement only outside quoted literals and at zero
//! paren/bracket/brace depth. Malformed input never fails: the best
//! segmentation is returned and broken statements surface at execution time.
//!
//! ```
//! use mssql_mysql_migrate::splitter::split;
//!
//! let statements = split("SELECT 'a;b' FROM t; DELETE FROM t");
//! assert_eq!(statements, vec!["SELECT 'a;b' FROM t", "DELETE FROM t"]);
//! ```

mod repair;

pub use repair::{drop_malformed_inserts, repair_unbalanced_quotes, split_merged_inserts};

use serde::{Deserialize, Serialize};

use crate::lexer::{self, QuoteRules};

/// Which quote character opened the current literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }

    fn state(self) -> ScanState {
        match self {
            Quote::Single => ScanState::InSingleQuote,
            Quote::Double => ScanState::InDoubleQuote,
        }
    }
}

/// Literal state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Normal,
    InSingleQuote,
    InDoubleQuote,
    /// A backslash was seen inside a literal; the next character is data.
    EscapePending(Quote),
}

/// Open `(`, `[` and `{` groups outside literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nesting {
    pub paren: usize,
    pub bracket: usize,
    pub brace: usize,
}

impl Nesting {
    pub fn is_balanced(&self) -> bool {
        self.paren == 0 && self.bracket == 0 && self.brace == 0
    }
}

/// What the splitter does with the character just fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Append the character to the current statement.
    Emit,
    /// Append the character and the lookahead character (doubled quote).
    EmitPair,
    /// The character ends the current statement and is dropped.
    Terminate,
}

/// Scanner state for one splitting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexState {
    pub state: ScanState,
    pub nesting: Nesting,
}

impl LexState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_string(&self) -> bool {
        self.state != ScanState::Normal
    }

    /// Transition on `c`, with `next` as the one-character lookahead.
    pub fn step(&mut self, c: char, next: Option<char>) -> Step {
        match self.state {
            ScanState::EscapePending(quote) => {
                self.state = quote.state();
                Step::Emit
            }
            ScanState::InSingleQuote => self.step_in_literal(Quote::Single, c, next),
            ScanState::InDoubleQuote => self.step_in_literal(Quote::Double, c, next),
            ScanState::Normal => self.step_normal(c),
        }
    }

    fn step_in_literal(&mut self, quote: Quote, c: char, next: Option<char>) -> Step {
        if c == '\\' {
            self.state = ScanState::EscapePending(quote);
            return Step::Emit;
        }
        if c == quote.as_char() {
            if next == Some(c) {
                return Step::EmitPair;
            }
            self.state = ScanState::Normal;
        }
        Step::Emit
    }

    fn step_normal(&mut self, c: char) -> Step {
        let nesting = &mut self.nesting;
        match c {
            '\'' => self.state = ScanState::InSingleQuote,
            '"' => self.state = ScanState::InDoubleQuote,
            '(' => nesting.paren += 1,
            ')' => nesting.paren = nesting.paren.saturating_sub(1),
            '[' => nesting.bracket += 1,
            ']' => nesting.bracket = nesting.bracket.saturating_sub(1),
            '{' => nesting.brace += 1,
            '}' => nesting.brace = nesting.brace.saturating_sub(1),
            ';' if nesting.is_balanced() => return Step::Terminate,
            _ => {}
        }
        Step::Emit
    }
}

/// Optional best-effort repairs applied after the primary scan.
///
/// These are heuristics: they can fix common export damage but can also
/// misfire on unusual yet valid statements, so all are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitOptions {
    /// Cut statements holding several `INSERT INTO` clauses apart.
    #[serde(default)]
    pub merge_repair: bool,

    /// Drop `INSERT` fragments that have no `VALUES` clause.
    #[serde(default)]
    pub drop_malformed_inserts: bool,

    /// Close an odd trailing single quote.
    #[serde(default)]
    pub quote_repair: bool,
}

impl SplitOptions {
    /// All repairs enabled.
    pub fn best_effort() -> Self {
        Self {
            merge_repair: true,
            drop_malformed_inserts: true,
            quote_repair: true,
        }
    }
}

/// Split `text` into trimmed, non-empty statements in source order.
pub fn split(text: &str) -> Vec<String> {
    let cleaned = lexer::strip_comments(text, QuoteRules::MYSQL);
    scan(&cleaned)
}

/// [`split`] followed by the repairs enabled in `options`.
pub fn split_with(text: &str, options: &SplitOptions) -> Vec<String> {
    let mut statements = split(text);
    if options.merge_repair {
        statements = split_merged_inserts(statements);
    }
    if options.drop_malformed_inserts {
        statements = drop_malformed_inserts(statements);
    }
    if options.quote_repair {
        statements = statements
            .into_iter()
            .map(|s| repair_unbalanced_quotes(&s).into_owned())
            .collect();
    }
    statements
}

fn scan(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut lex = LexState::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match lex.step(c, chars.peek().copied()) {
            Step::Emit => buffer.push(c),
            Step::EmitPair => {
                buffer.push(c);
                if let Some(n) = chars.next() {
                    buffer.push(n);
                }
            }
            Step::Terminate => flush(&mut buffer, &mut statements),
        }
    }
    flush(&mut buffer, &mut statements);
    statements
}

fn flush(buffer: &mut String, statements: &mut Vec<String>) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    buffer.clear();
}
