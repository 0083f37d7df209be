//! DuckDB connection with the DuckLake catalog attached.

use duckdb::Connection;

use crate::config::LakeConfig;
use crate::error::{LakeError, Result};

/// An in-memory DuckDB connection with the lake catalog attached and selected.
///
/// Held for the duration of one command and closed afterwards.
pub struct LakeSession {
    conn: Connection,
    alias: String,
}

impl LakeSession {
    /// Open a connection, load the extension and attach the catalog.
    pub fn open(lake: &LakeConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        for statement in attach_statements(lake) {
            tracing::debug!(statement = %statement, "Preparing lake session");
            conn.execute_batch(&statement)?;
        }
        tracing::debug!(
            alias = %lake.alias,
            catalog = %lake.catalog_path.display(),
            "Lake catalog attached"
        );
        Ok(Self::from_connection(conn, lake.alias.clone()))
    }

    /// Wrap a connection that has already been prepared by the caller.
    pub fn from_connection(conn: Connection, alias: impl Into<String>) -> Self {
        Self {
            conn,
            alias: alias.into(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `<alias>.<table>`.
    pub fn qualified(&self, table: &str) -> String {
        format!("{}.{}", self.alias, table)
    }

    /// Probe a table with a cheap count query.
    pub fn table_exists(&self, table: &str) -> bool {
        let probe = format!("SELECT COUNT(*) FROM {} LIMIT 1", self.qualified(table));
        match self.conn.query_row(&probe, [], |row| row.get::<_, i64>(0)) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(table = %table, error = %e, "Table probe failed");
                false
            }
        }
    }

    /// Close the underlying connection, surfacing any close error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| LakeError::Database(e))
    }
}

/// Statements that install and load DuckLake, attach the catalog and select it.
pub fn attach_statements(lake: &LakeConfig) -> Vec<String> {
    vec![
        "INSTALL ducklake;".to_string(),
        "LOAD ducklake;".to_string(),
        format!(
            "ATTACH {} AS {} (DATA_PATH {});",
            quote_literal(&format!("ducklake:{}", lake.catalog_path.display())),
            lake.alias,
            quote_literal(&lake.data_path)
        ),
        format!("USE {};", lake.alias),
    ]
}

/// Render a string as a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Accept only plain identifiers (letters, digits, underscore) for interpolated table names.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(LakeError::Configuration(format!(
            "'{}' is not a valid table name",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_attach_statements() {
        let lake = LakeConfig {
            alias: "lake".to_string(),
            catalog_path: PathBuf::from("catalog/ducklake.ducklake"),
            data_path: "data/lake/".to_string(),
            scripts_dir: PathBuf::from("scripts"),
        };
        let statements = attach_statements(&lake);
        assert_eq!(statements[0], "INSTALL ducklake;");
        assert_eq!(
            statements[2],
            "ATTACH 'ducklake:catalog/ducklake.ducklake' AS lake (DATA_PATH 'data/lake/');"
        );
        assert_eq!(statements[3], "USE lake;");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("data/o'brien"), "'data/o''brien'");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("lineitem").is_ok());
        assert!(validate_identifier("orders_raw").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1orders").is_err());
        assert!(validate_identifier("orders; DROP TABLE x").is_err());
    }

    #[test]
    fn test_table_exists_on_plain_connection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE orders (id INTEGER);").unwrap();
        let session = LakeSession::from_connection(conn, "memory");

        assert!(session.table_exists("orders"));
        assert!(!session.table_exists("lineitem"));
        assert_eq!(session.qualified("orders"), "memory.orders");
        session.close().unwrap();
    }
}
