//! SQL quoting utilities
//!
//! Every identifier that reaches generated DDL goes through [`quote_ident`];
//! every identifier embedded in a string literal (the `pg_constraint` guards)
//! goes through [`escape_sql_string`].

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and doubles any embedded double
/// quotes, following the SQL standard.
///
/// # Examples
/// ```
/// use tm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("orders"), r#""orders""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Quote a string as a SQL literal, including the surrounding quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}
