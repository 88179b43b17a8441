//! SQL Server to MySQL dialect translation.
//!
//! The translator is an ordered pipeline of named [`Pass`]es, each a pure
//! `&str -> String` rewrite over the whole document. Order matters: drop
//! guards are collapsed before brackets disappear, and `CREATE TABLE` bodies
//! keep their bracket quoting until the structural rewrite has detected
//! identity columns.
//!
//! ```
//! use mssql_mysql_migrate::translate::translate;
//!
//! let mysql = translate("CREATE TABLE [dbo].[T] ([id] int IDENTITY(1,1) NOT NULL)\nGO\n");
//! assert!(mysql.contains("id int AUTO_INCREMENT NOT NULL"));
//! assert!(mysql.contains("PRIMARY KEY (id)"));
//! ```

mod create_table;
mod passes;

pub use create_table::{rewrite_create_tables, rewrite_table, ColumnDefinition, TableRewriteResult};
pub use passes::{
    CollapseBlankLines, CollapseDropGuards, NormalizeComments, NormalizeLexemes,
    RemoveLockEscalation, RemovePrimaryKeyStorage, RewriteCreateTables, RewriteIdentityInsert,
    SuppressTrailingConstraints,
};

use serde::{Deserialize, Serialize};

/// A bracketed, quoted, backticked or bare name part, optionally dot-qualified.
pub(crate) const QUALIFIED_NAME: &str = r#"(?:\[[^\]\n]*\]|"[^"\n]*"|`[^`\n]*`|[\w$#@]+)(?:\s*\.\s*(?:\[[^\]\n]*\]|"[^"\n]*"|`[^`\n]*`|[\w$#@]+))*"#;

/// One rewrite step of the translation pipeline.
pub trait Pass: Send + Sync {
    /// Stable kebab-case name, used in logs.
    fn name(&self) -> &'static str;

    /// Rewrite the whole document. Spans a rule cannot handle stay unchanged.
    fn apply(&self, sql: &str) -> String;
}

/// Tunables of the translation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Collation names whose `COLLATE` clauses are removed everywhere.
    pub collations: Vec<String>,

    /// Schema qualifiers stripped from object names.
    pub schemas: Vec<String>,

    /// Discard everything from the first trailing primary-key block on.
    pub stop_at_trailing_constraints: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            collations: vec!["Chinese_PRC_CI_AS".to_string()],
            schemas: vec!["dbo".to_string()],
            stop_at_trailing_constraints: true,
        }
    }
}

/// Ordered pass pipeline.
pub struct Translator {
    passes: Vec<Box<dyn Pass>>,
}

impl Translator {
    /// Build the standard pipeline.
    pub fn new(options: TranslateOptions) -> Self {
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(NormalizeComments),
            Box::new(CollapseDropGuards::new(options.schemas.clone())),
            Box::new(RewriteIdentityInsert),
            Box::new(RemoveLockEscalation),
            Box::new(RemovePrimaryKeyStorage),
            Box::new(NormalizeLexemes::new(
                options.collations.clone(),
                options.schemas.clone(),
            )),
            Box::new(SuppressTrailingConstraints::new(
                options.stop_at_trailing_constraints,
            )),
            Box::new(RewriteCreateTables::new(options.schemas.clone())),
            Box::new(CollapseBlankLines),
        ];
        Self { passes }
    }

    /// Names of the passes in execution order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass in order over `text`.
    pub fn translate(&self, text: &str) -> String {
        self.passes
            .iter()
            .fold(text.to_string(), |sql, pass| pass.apply(&sql))
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslateOptions::default())
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("passes", &self.pass_names())
            .finish()
    }
}

/// Translate with the default options.
pub fn translate(text: &str) -> String {
    Translator::default().translate(text)
}
