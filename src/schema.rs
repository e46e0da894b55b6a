//! Dataset schema loading
//!
//! Each text2sql dataset ships a CSV describing its database schema. The
//! reader itself never looks at the schema; grammar worlds consume it to
//! build their table/column rules.

use crate::error::{ReaderError, Result};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub column_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

// The csv deserializer wants one flat struct per row.
#[derive(Debug, Clone, Deserialize)]
struct SchemaRow {
    #[serde(rename = "Table Name")]
    table_name: String,
    #[serde(rename = "Field Name")]
    field_name: String,
    #[serde(rename = "Is Primary Key", deserialize_with = "yes_no", default)]
    is_primary_key: bool,
    #[serde(rename = "Is Foreign Key", deserialize_with = "yes_no", default)]
    is_foreign_key: bool,
    #[serde(rename = "Type", default)]
    column_type: String,
}

/// Schema description keyed by table name, columns in file order.
pub type DatasetSchema = HashMap<String, Vec<TableColumn>>;

/// Read a schema CSV with `Table Name, Field Name, Is Primary Key,
/// Is Foreign Key, Type` columns. Separator rows (table name starting
/// with `-`) are skipped.
pub fn read_dataset_schema(path: impl AsRef<Path>) -> Result<DatasetSchema> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ReaderError::Schema(format!("failed to open schema file {}: {e}", path.display()))
    })?;
    schema_from_reader(file)
}

pub fn schema_from_reader(reader: impl Read) -> Result<DatasetSchema> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut schema: DatasetSchema = HashMap::new();
    for row in csv_reader.deserialize::<SchemaRow>() {
        let row = row?;
        if row.table_name.starts_with('-') {
            continue;
        }
        schema
            .entry(row.table_name)
            .or_insert_with(Vec::new)
            .push(TableColumn {
                name: row.field_name,
                column_type: row.column_type,
                is_primary_key: row.is_primary_key,
                is_foreign_key: row.is_foreign_key,
            });
    }

    if schema.is_empty() {
        return Err(ReaderError::Schema(
            "schema file contains no tables".to_string(),
        ));
    }
    Ok(schema)
}

fn yes_no<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(matches!(
        value.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_CSV: &str = "\
Table Name,Field Name,Is Primary Key,Is Foreign Key,Type
CITY,CITY_NAME,y,n,varchar(255)
CITY,POPULATION,n,n,integer
CITY,STATE_NAME,n,y,varchar(255)
-,-,-,-,-
RIVER,RIVER_NAME,y,n,varchar(255)
RIVER,TRAVERSE,n,y,varchar(255)
";

    #[test]
    fn tables_and_columns_are_grouped() {
        let schema = schema_from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema["CITY"].len(), 3);
        assert_eq!(schema["RIVER"].len(), 2);
        assert_eq!(schema["CITY"][0].name, "CITY_NAME");
        assert_eq!(schema["CITY"][1].column_type, "integer");
    }

    #[test]
    fn key_flags_are_parsed() {
        let schema = schema_from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        assert!(schema["CITY"][0].is_primary_key);
        assert!(!schema["CITY"][0].is_foreign_key);
        assert!(schema["CITY"][2].is_foreign_key);
    }

    #[test]
    fn empty_schema_is_an_error() {
        let err = schema_from_reader("Table Name,Field Name,Is Primary Key,Is Foreign Key,Type\n".as_bytes());
        assert!(matches!(err, Err(ReaderError::Schema(_))));
    }
}
