//! Literal- and comment-aware scanning shared by the splitter and translator.
//!
//! Everything here works on byte offsets. All delimiters are ASCII, so every
//! offset produced is a valid `str` boundary even for non-ASCII input.

use std::ops::Range;

use regex::{Captures, Regex};

/// Quoting conventions of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRules {
    /// A backslash inside a literal escapes the next character.
    pub backslash_escapes: bool,
    /// `[name]` is an identifier (its contents are never literals).
    pub bracket_identifiers: bool,
    /// `` `name` `` is an identifier.
    pub backtick_identifiers: bool,
}

impl QuoteRules {
    /// SQL Server: bracket identifiers, no backslash escapes. Backticks are
    /// recognised too, as they appear in already-translated text.
    pub const MSSQL: QuoteRules = QuoteRules {
        backslash_escapes: false,
        bracket_identifiers: true,
        backtick_identifiers: true,
    };

    /// MySQL: backslash escapes inside literals, backtick identifiers.
    pub const MYSQL: QuoteRules = QuoteRules {
        backslash_escapes: true,
        bracket_identifiers: false,
        backtick_identifiers: true,
    };
}

/// What a span of source text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Plain SQL.
    Code,
    /// A delimited identifier (`[x]` or `` `x` ``).
    Identifier,
    /// A `'...'` or `"..."` literal, delimiters included.
    Quoted,
    /// `-- ...` up to (not including) the newline.
    LineComment,
    /// `/* ... */`.
    BlockComment,
}

/// A contiguous span of the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub start: usize,
    pub text: &'a str,
}

impl Segment<'_> {
    /// Byte offset one past the end of the segment.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Code or identifier, i.e. something rewrite rules may touch.
    pub fn is_code(&self) -> bool {
        matches!(self.kind, SegmentKind::Code | SegmentKind::Identifier)
    }
}

/// Split `text` into code, identifier, literal and comment segments.
///
/// Unterminated literals and comments run to the end of the input.
pub fn segments(text: &str, rules: QuoteRules) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let (kind, end) = match bytes[i] {
            b'\'' | b'"' => (SegmentKind::Quoted, literal_end(bytes, i, rules)),
            b'-' if bytes.get(i + 1) == Some(&b'-') => (SegmentKind::LineComment, line_end(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => (SegmentKind::BlockComment, block_end(bytes, i)),
            b'[' if rules.bracket_identifiers => match identifier_end(bytes, i, b']') {
                Some(end) => (SegmentKind::Identifier, end),
                None => {
                    i += 1;
                    continue;
                }
            },
            b'`' if rules.backtick_identifiers => match identifier_end(bytes, i, b'`') {
                Some(end) => (SegmentKind::Identifier, end),
                None => {
                    i += 1;
                    continue;
                }
            },
            _ => {
                i += 1;
                continue;
            }
        };

        if code_start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                start: code_start,
                text: &text[code_start..i],
            });
        }
        out.push(Segment {
            kind,
            start: i,
            text: &text[i..end],
        });
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            start: code_start,
            text: &text[code_start..],
        });
    }
    out
}

fn literal_end(bytes: &[u8], start: usize, rules: QuoteRules) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if rules.backslash_escapes && b == b'\\' {
            j += 2;
            continue;
        }
        if b == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn block_end(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

/// Delimited identifiers never span lines. A doubled closer (`]]`) is an
/// escaped character of the name.
fn identifier_end(bytes: &[u8], start: usize, close: u8) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() && bytes[j] != b'\n' {
        if bytes[j] == close {
            if bytes.get(j + 1) == Some(&close) {
                j += 2;
                continue;
            }
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

/// Byte ranges of the quoted literals of a text.
#[derive(Debug, Clone, Default)]
pub struct LiteralMap {
    ranges: Vec<Range<usize>>,
}

impl LiteralMap {
    pub fn new(text: &str, rules: QuoteRules) -> Self {
        let ranges = segments(text, rules)
            .into_iter()
            .filter(|s| s.kind == SegmentKind::Quoted)
            .map(|s| s.start..s.end())
            .collect();
        Self { ranges }
    }

    /// Whether `offset` falls on or inside a literal.
    pub fn contains(&self, offset: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= offset);
        self.ranges.get(idx).is_some_and(|r| r.start <= offset)
    }
}

/// Replace every match of `re` whose start is not inside a literal.
///
/// Matches may extend into literals (e.g. `OBJECT_ID(N'[dbo].[t]')`); only the
/// starting position decides.
pub fn replace_outside_literals<F>(text: &str, rules: QuoteRules, re: &Regex, mut replace: F) -> String
where
    F: FnMut(&Captures<'_>) -> String,
{
    let literals = LiteralMap::new(text, rules);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if literals.contains(m.start()) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(&replace(&caps));
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Apply `f` to every maximal run of code and identifiers; literals and
/// comments are copied through untouched.
pub fn map_code<F>(text: &str, rules: QuoteRules, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut run: Option<Range<usize>> = None;

    for seg in segments(text, rules) {
        if seg.is_code() {
            run = Some(match run {
                Some(r) => r.start..seg.end(),
                None => seg.start..seg.end(),
            });
            continue;
        }
        if let Some(r) = run.take() {
            out.push_str(&f(&text[r]));
        }
        out.push_str(seg.text);
    }
    if let Some(r) = run {
        out.push_str(&f(&text[r]));
    }
    out
}

/// Remove `--` and `/* */` comments. Newlines ending line comments are kept.
pub fn strip_comments(text: &str, rules: QuoteRules) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in segments(text, rules) {
        match seg.kind {
            SegmentKind::LineComment => {}
            SegmentKind::BlockComment => {
                // keep `a/**/b` from fusing into `ab`
                let before = out.chars().next_back();
                let after = text[seg.end()..].chars().next();
                if let (Some(b), Some(a)) = (before, after) {
                    if !b.is_whitespace() && !a.is_whitespace() {
                        out.push(' ');
                    }
                }
            }
            _ => out.push_str(seg.text),
        }
    }
    out
}

/// Remove `--` comments for which `keep` returns false. Block comments stay.
pub fn strip_line_comments_except<F>(text: &str, rules: QuoteRules, keep: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut out = String::with_capacity(text.len());
    for seg in segments(text, rules) {
        if seg.kind == SegmentKind::LineComment && !keep(seg.text) {
            continue;
        }
        out.push_str(seg.text);
    }
    out
}

/// Count `quote` characters not preceded by a backslash escape.
pub fn count_unescaped(text: &str, quote: char) -> usize {
    let mut count = 0;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            count += 1;
        }
    }
    count
}

/// Split on `sep` where it appears in plain code at parenthesis depth zero.
pub fn split_top_level(text: &str, rules: QuoteRules, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;

    for seg in segments(text, rules) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        for (k, b) in seg.text.bytes().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                _ if b == sep && depth == 0 => {
                    let pos = seg.start + k;
                    parts.push(&text[last..pos]);
                    last = pos + 1;
                }
                _ => {}
            }
        }
    }
    parts.push(&text[last..]);
    parts
}

/// Offset of the `)` closing the `(` at `open`, skipping literals, comments
/// and delimited identifiers.
pub fn matching_paren(segments: &[Segment<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for seg in segments {
        if seg.kind != SegmentKind::Code || seg.end() <= open {
            continue;
        }
        for (k, b) in seg.text.bytes().enumerate() {
            let pos = seg.start + k;
            if pos < open {
                continue;
            }
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(pos);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Collapse whitespace runs in code to single spaces.
pub fn collapse_whitespace(text: &str, rules: QuoteRules) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for seg in segments(text, rules) {
        if seg.kind != SegmentKind::Code {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push_str(seg.text);
            continue;
        }
        for c in seg.text.chars() {
            if c.is_whitespace() {
                pending_space = true;
            } else {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str, rules: QuoteRules) -> Vec<(SegmentKind, &str)> {
        segments(text, rules)
            .into_iter()
            .map(|s| (s.kind, s.text))
            .collect()
    }

    #[test]
    fn test_segments_basic() {
        let segs = kinds("SELECT 'a;b' -- note\nFROM [t]", QuoteRules::MSSQL);
        assert_eq!(
            segs,
            vec![
                (SegmentKind::Code, "SELECT "),
                (SegmentKind::Quoted, "'a;b'"),
                (SegmentKind::Code, " "),
                (SegmentKind::LineComment, "-- note"),
                (SegmentKind::Code, "\nFROM "),
                (SegmentKind::Identifier, "[t]"),
            ]
        );
    }

    #[test]
    fn test_doubled_quote_stays_in_literal() {
        let segs = kinds("VALUES ('it''s') x", QuoteRules::MSSQL);
        assert_eq!(segs[1], (SegmentKind::Quoted, "'it''s'"));
        assert_eq!(segs[2], (SegmentKind::Code, ") x"));
    }

    #[test]
    fn test_backslash_escape_depends_on_rules() {
        let text = r"'a\'b' c";
        assert_eq!(kinds(text, QuoteRules::MYSQL)[0], (SegmentKind::Quoted, r"'a\'b'"));
        // SQL Server has no backslash escapes: 'a\' closes after the backslash
        assert_eq!(kinds(text, QuoteRules::MSSQL)[0], (SegmentKind::Quoted, r"'a\'"));
    }

    #[test]
    fn test_bracket_identifier_hides_quote() {
        let segs = kinds("[it's] 'x'", QuoteRules::MSSQL);
        assert_eq!(segs[0], (SegmentKind::Identifier, "[it's]"));
        assert_eq!(segs[2], (SegmentKind::Quoted, "'x'"));
    }

    #[test]
    fn test_doubled_closing_bracket_stays_in_identifier() {
        let segs = kinds("SELECT [a]]b], [c]", QuoteRules::MSSQL);
        assert_eq!(segs[1], (SegmentKind::Identifier, "[a]]b]"));
        assert_eq!(segs[3], (SegmentKind::Identifier, "[c]"));
        assert_eq!(kinds("[a]]", QuoteRules::MSSQL), vec![(SegmentKind::Code, "[a]]")]);
    }

    #[test]
    fn test_unterminated_literal_runs_to_end() {
        let segs = kinds("SELECT 'abc", QuoteRules::MYSQL);
        assert_eq!(segs.last(), Some(&(SegmentKind::Quoted, "'abc")));
    }

    #[test]
    fn test_literal_map_contains() {
        let text = "a 'xy' b";
        let map = LiteralMap::new(text, QuoteRules::MYSQL);
        assert!(!map.contains(0));
        assert!(map.contains(2));
        assert!(map.contains(5));
        assert!(!map.contains(6));
    }

    #[test]
    fn test_strip_comments_is_literal_aware() {
        let text = "SELECT '--not' /* gone */ x -- gone\nFROM t/**/u";
        assert_eq!(
            strip_comments(text, QuoteRules::MYSQL),
            "SELECT '--not'  x \nFROM t u"
        );
    }

    #[test]
    fn test_strip_multiline_block_comment() {
        let text = "a /* line1\nline2 */ b";
        assert_eq!(strip_comments(text, QuoteRules::MYSQL), "a  b");
    }

    #[test]
    fn test_strip_line_comments_except() {
        let text = "-- keep me\n-- drop me\nSELECT 1";
        let out = strip_line_comments_except(text, QuoteRules::MSSQL, |c| c.contains("keep"));
        assert_eq!(out, "-- keep me\n\nSELECT 1");
    }

    #[test]
    fn test_map_code_skips_literals() {
        let out = map_code("abc 'abc' [abc]", QuoteRules::MSSQL, |s| s.to_uppercase());
        assert_eq!(out, "ABC 'abc' [ABC]");
    }

    #[test]
    fn test_replace_outside_literals() {
        let re = Regex::new(r"\[(\w+)\]").unwrap();
        let out = replace_outside_literals("[a] '[b]'", QuoteRules::MYSQL, &re, |c| c[1].to_string());
        assert_eq!(out, "a '[b]'");
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level("a int, b numeric(18,2), c char(1) DEFAULT ','", QuoteRules::MSSQL, b',');
        assert_eq!(parts, vec!["a int", " b numeric(18,2)", " c char(1) DEFAULT ','"]);
    }

    #[test]
    fn test_matching_paren() {
        let text = "CREATE TABLE t (a int DEFAULT ((0)), b varchar(5) DEFAULT ')') x";
        let segs = segments(text, QuoteRules::MSSQL);
        let open = text.find('(').unwrap();
        let close = matching_paren(&segs, open).unwrap();
        assert_eq!(&text[close..], ") x");
    }

    #[test]
    fn test_matching_paren_unbalanced() {
        let text = "CREATE TABLE t (a int";
        let segs = segments(text, QuoteRules::MSSQL);
        assert_eq!(matching_paren(&segs, text.find('(').unwrap()), None);
    }

    #[test]
    fn test_count_unescaped() {
        assert_eq!(count_unescaped(r"'a\'b'", '\''), 2);
        assert_eq!(count_unescaped("'it''s'", '\''), 4);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("id  int \t NOT   NULL DEFAULT 'a  b'", QuoteRules::MSSQL),
            "id int NOT NULL DEFAULT 'a  b'"
        );
    }
}
