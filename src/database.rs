//! SQLite lookups for entity example values
//!
//! Some grammar worlds expand value terminals from the actual database
//! contents. This wraps the read-only lookup they need.

use crate::error::{ReaderError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use std::path::Path;
use tracing::warn;

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub struct EntityDatabase {
    connection: Connection,
}

impl EntityDatabase {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let connection = Connection::open(path.as_ref())?;
        Ok(Self { connection })
    }

    /// Open the database if the file exists; a missing database just means
    /// the reader runs without a value source.
    pub fn open_if_exists(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!("database file {} not found, continuing without it", path.display());
            return None;
        }
        match Self::open(path) {
            Ok(database) => Some(database),
            Err(e) => {
                warn!("failed to open database {}: {e}", path.display());
                None
            }
        }
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        Ok(Self {
            connection: Connection::open_in_memory()?,
        })
    }

    /// Up to `limit` distinct values of `table.column`, as strings.
    pub fn column_values(&self, table: &str, column: &str, limit: usize) -> Result<Vec<String>> {
        for identifier in [table, column] {
            if !IDENTIFIER_RE.is_match(identifier) {
                return Err(ReaderError::Schema(format!(
                    "invalid identifier in value lookup: {identifier}"
                )));
            }
        }
        let query = format!(
            "SELECT DISTINCT \"{column}\" FROM \"{table}\" WHERE \"{column}\" IS NOT NULL LIMIT ?1"
        );
        let mut statement = self.connection.prepare(&query)?;
        let rows = statement.query_map([limit as i64], |row| {
            row.get::<_, rusqlite::types::Value>(0).map(|value| match value {
                rusqlite::types::Value::Text(text) => text,
                rusqlite::types::Value::Integer(i) => i.to_string(),
                rusqlite::types::Value::Real(f) => f.to_string(),
                rusqlite::types::Value::Null => String::new(),
                rusqlite::types::Value::Blob(_) => String::new(),
            })
        })?;
        let mut values = Vec::new();
        for value in rows {
            values.push(value?);
        }
        Ok(values)
    }
}
