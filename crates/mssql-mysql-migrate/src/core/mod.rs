//! Shared building blocks used by the translator.
//!
//! - [`identifier`]: SQL Server object-name normalization and bracket stripping

pub mod identifier;

pub use identifier::{
    bare_name, mysql_identifier, mysql_table_name, normalize_table_name, split_qualified,
    strip_brackets, strip_schema_qualifiers, unquote,
};
