/// SQL statements fed to the `mysql` client on stdin.
///
/// Identifiers reaching these builders are already reduced to
/// `[A-Za-z0-9_-]`, so backtick quoting is sufficient; string literals go
/// through [`escape_literal`].
use crate::common::security::{sanitize, sanitized_token, ValidationError};

use super::types::Database;

/// Schemas the panel never lists, creates or drops
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "performance_schema", "mysql", "sys"];

const MAX_IDENTIFIER_LEN: usize = 64;
const MAX_DB_USER_LEN: usize = 32;

pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Sanitized schema name; `.` is not allowed in schema names
pub fn database_name(raw: &str) -> Result<String, ValidationError> {
    identifier("name", raw, MAX_IDENTIFIER_LEN)
}

pub fn database_user(raw: &str) -> Result<String, ValidationError> {
    identifier("db_user", raw, MAX_DB_USER_LEN)
}

fn identifier(field: &str, raw: &str, max: usize) -> Result<String, ValidationError> {
    let name = sanitized_token(field, raw)?;
    if name.contains('.') {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            value: name,
        });
    }
    if name.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: max,
            actual: name.len(),
        });
    }
    Ok(name)
}

/// Account host: `%`, or a sanitized host name or address
pub fn account_host(raw: Option<&str>) -> Result<String, ValidationError> {
    match raw.map(str::trim).filter(|h| !h.is_empty()) {
        None => Ok("localhost".to_string()),
        Some("%") => Ok("%".to_string()),
        Some(h) => {
            let host = sanitize(h);
            if host.is_empty() {
                return Err(ValidationError::InvalidCharacters {
                    field: "host".to_string(),
                    value: h.to_string(),
                });
            }
            Ok(host)
        }
    }
}

/// Escape a value for a single-quoted SQL literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}

/// Every schema with its size in MB and table count, one query
pub fn list_databases_sql() -> &'static str {
    "SELECT s.schema_name, \
     COALESCE(ROUND(SUM(t.data_length + t.index_length) / 1024 / 1024, 1), 0), \
     COUNT(t.table_name) \
     FROM information_schema.schemata s \
     LEFT JOIN information_schema.tables t ON t.table_schema = s.schema_name \
     GROUP BY s.schema_name ORDER BY s.schema_name;\n"
}

pub fn schema_exists_sql(name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = '{}';\n",
        escape_literal(name)
    )
}

pub fn create_database_sql(name: &str) -> String {
    format!(
        "CREATE DATABASE `{}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;\n",
        name
    )
}

pub fn drop_database_sql(name: &str) -> String {
    format!("DROP DATABASE `{}`;\n", name)
}

pub fn show_tables_sql(name: &str) -> String {
    format!("SHOW TABLES FROM `{}`;\n", name)
}

pub fn grant_sql(database: &str, user: &str, host: &str, password: &str) -> String {
    let account = format!("'{}'@'{}'", user, escape_literal(host));
    format!(
        "CREATE USER {account} IDENTIFIED BY '{}';\n\
         GRANT ALL PRIVILEGES ON `{database}`.* TO {account};\n\
         FLUSH PRIVILEGES;\n",
        escape_literal(password)
    )
}

/// Parse `--batch --skip-column-names` output of [`list_databases_sql`]
pub fn parse_database_rows(output: &str) -> Vec<Database> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split('\t');
            let name = cols.next()?.trim();
            if name.is_empty() || is_system_schema(name) {
                return None;
            }
            let size = cols.next().map(str::trim).filter(|s| *s != "NULL").unwrap_or("0");
            let tables = cols.next().and_then(|c| c.trim().parse().ok()).unwrap_or(0);
            Some(Database {
                name: name.to_string(),
                size: format!("{} MB", size),
                tables,
            })
        })
        .collect()
}
