//! Type mapping from SQL Server column types to MySQL.
//!
//! Only types whose spelling differs are mapped; everything else (`int`,
//! `varchar(50)`, `datetime`, `decimal(18,2)`, ...) passes through. Every
//! output is itself a pass-through type, so mapping twice is a no-op.

/// Largest `varchar` length MySQL accepts.
const MYSQL_MAX_VARCHAR: u32 = 65535;

/// Largest `char` length MySQL accepts.
const MYSQL_MAX_CHAR: u32 = 255;

/// Map an MSSQL data type to MySQL.
///
/// `type_name` is the bare type token, `args` the text between its
/// parentheses (if any). Returns `None` when the type is spelled the same in
/// MySQL.
///
/// ```
/// use mssql_mysql_migrate::typemap::mssql_to_mysql;
///
/// assert_eq!(mssql_to_mysql("money", None).as_deref(), Some("decimal(19,4)"));
/// assert_eq!(mssql_to_mysql("NVARCHAR", Some("MAX")).as_deref(), Some("longtext"));
/// assert_eq!(mssql_to_mysql("int", None), None);
/// ```
pub fn mssql_to_mysql(type_name: &str, args: Option<&str>) -> Option<String> {
    let args = args.map(|a| a.split_whitespace().collect::<String>());
    let is_max = args.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("max"));
    let length = args.as_deref().and_then(|a| a.parse::<u32>().ok());

    let mapped = match type_name.to_lowercase().as_str() {
        // Money
        "money" => "decimal(19,4)".to_string(),
        "smallmoney" => "decimal(10,4)".to_string(),

        // Exact numerics
        "numeric" => match &args {
            Some(a) => format!("decimal({})", a),
            None => "decimal".to_string(),
        },

        // Strings
        "varchar" | "nvarchar" if is_max => "longtext".to_string(),
        "nvarchar" => match length {
            Some(n) if n > MYSQL_MAX_VARCHAR => "longtext".to_string(),
            Some(n) => format!("varchar({})", n),
            None => "varchar(255)".to_string(),
        },
        "nchar" => match length {
            Some(n) if n > MYSQL_MAX_CHAR => "longtext".to_string(),
            Some(n) => format!("char({})", n),
            None => "char(1)".to_string(),
        },
        "text" | "ntext" | "xml" => "longtext".to_string(),

        // Binary
        "image" => "longblob".to_string(),
        "varbinary" if is_max => "longblob".to_string(),

        // Date/time
        "datetime2" => match length {
            Some(n) => format!("datetime({})", n.min(6)),
            None => "datetime".to_string(),
        },
        "smalldatetime" | "datetimeoffset" => "datetime".to_string(),

        // GUID (stored as VARCHAR(36))
        "uniqueidentifier" => "varchar(36)".to_string(),

        // Boolean
        "bit" => "tinyint(1)".to_string(),

        // Floating point
        "float" if args.is_none() => "double".to_string(),
        "real" => "float(24)".to_string(),

        // Spatial types (convert to text)
        "geometry" | "geography" => "longtext".to_string(),

        _ => return None,
    };
    Some(mapped)
}

/// Integer types that can carry `AUTO_INCREMENT`.
pub fn is_integer_type(type_name: &str) -> bool {
    matches!(
        type_name.to_lowercase().as_str(),
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(type_name: &str, args: Option<&str>) -> Option<String> {
        mssql_to_mysql(type_name, args)
    }

    #[test]
    fn test_money_types() {
        assert_eq!(map("money", None).as_deref(), Some("decimal(19,4)"));
        assert_eq!(map("MONEY", None).as_deref(), Some("decimal(19,4)"));
        assert_eq!(map("smallmoney", None).as_deref(), Some("decimal(10,4)"));
    }

    #[test]
    fn test_numeric_keeps_precision() {
        assert_eq!(map("numeric", Some("18, 2")).as_deref(), Some("decimal(18,2)"));
        assert_eq!(map("numeric", None).as_deref(), Some("decimal"));
        assert_eq!(map("decimal", Some("18,2")), None);
    }

    #[test]
    fn test_string_types() {
        assert_eq!(map("nvarchar", Some("50")).as_deref(), Some("varchar(50)"));
        assert_eq!(map("nvarchar", Some("max")).as_deref(), Some("longtext"));
        assert_eq!(map("varchar", Some("MAX")).as_deref(), Some("longtext"));
        assert_eq!(map("varchar", Some("50")), None);
        assert_eq!(map("nchar", Some("10")).as_deref(), Some("char(10)"));
        assert_eq!(map("nchar", Some("4000")).as_deref(), Some("longtext"));
        assert_eq!(map("ntext", None).as_deref(), Some("longtext"));
        assert_eq!(map("text", None).as_deref(), Some("longtext"));
        assert_eq!(map("xml", None).as_deref(), Some("longtext"));
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(map("image", None).as_deref(), Some("longblob"));
        assert_eq!(map("varbinary", Some("max")).as_deref(), Some("longblob"));
        assert_eq!(map("varbinary", Some("16")), None);
    }

    #[test]
    fn test_datetime_types() {
        assert_eq!(map("datetime2", Some("7")).as_deref(), Some("datetime(6)"));
        assert_eq!(map("datetime2", Some("3")).as_deref(), Some("datetime(3)"));
        assert_eq!(map("datetime2", None).as_deref(), Some("datetime"));
        assert_eq!(map("smalldatetime", None).as_deref(), Some("datetime"));
        assert_eq!(map("datetimeoffset", None).as_deref(), Some("datetime"));
        assert_eq!(map("datetime", None), None);
    }

    #[test]
    fn test_special_types() {
        assert_eq!(map("uniqueidentifier", None).as_deref(), Some("varchar(36)"));
        assert_eq!(map("bit", None).as_deref(), Some("tinyint(1)"));
        assert_eq!(map("float", None).as_deref(), Some("double"));
        assert_eq!(map("float", Some("53")), None);
        assert_eq!(map("real", None).as_deref(), Some("float(24)"));
        assert_eq!(map("geography", None).as_deref(), Some("longtext"));
    }

    #[test]
    fn test_outputs_are_fixed_points() {
        let inputs = [
            ("money", None),
            ("smallmoney", None),
            ("numeric", Some("10,2")),
            ("nvarchar", Some("max")),
            ("nvarchar", Some("20")),
            ("nchar", Some("3")),
            ("ntext", None),
            ("image", None),
            ("datetime2", Some("7")),
            ("uniqueidentifier", None),
            ("bit", None),
            ("float", None),
            ("real", None),
        ];
        for (type_name, args) in inputs {
            let mapped = map(type_name, args).unwrap();
            let (name, rest) = match mapped.find('(') {
                Some(i) => (&mapped[..i], Some(mapped[i + 1..mapped.len() - 1].to_string())),
                None => (mapped.as_str(), None),
            };
            assert_eq!(map(name, rest.as_deref()), None, "{mapped} maps again");
        }
    }

    #[test]
    fn test_integer_types() {
        assert!(is_integer_type("INT"));
        assert!(is_integer_type("bigint"));
        assert!(!is_integer_type("decimal"));
        assert!(!is_integer_type("uniqueidentifier"));
    }
}
