//! text2sql dataset records
//!
//! Parses the JSON produced by the text2sql-data reformatting scripts and
//! flattens each entry into one record per (sentence, sql) pair. The SQL in
//! these files is pre-tokenized and carries placeholder variables
//! (`city_name0`, `DERIVED_TABLEalias0.x`, ...) instead of raw values.

use crate::error::Result;
use crate::world::{DerivedColumn, LinkedEntity, PrelinkedEntities};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    static ref DERIVED_TABLE_RE: Regex = Regex::new(r"^DERIVED_TABLEalias\d+$").unwrap();
    static ref DERIVED_FIELD_RE: Regex =
        Regex::new(r"^(DERIVED_TABLEalias\d+)\.(\w+)$").unwrap();
    static ref TRAILING_INDEX_RE: Regex = Regex::new(r"\d+$").unwrap();
}

/// One entry of a text2sql dataset file: several phrasings of the same
/// question paired with one or more equivalent SQL queries.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub sentences: Vec<Sentence>,
    pub sql: Vec<String>,
    #[serde(default)]
    pub variables: Vec<VariableRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sentence {
    pub text: String,
    #[serde(rename = "question-split", default)]
    pub question_split: String,
    /// Placeholder variable -> the value it takes in this sentence.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Half-open token spans aligned to SQL fragments, when the file was
    /// produced with alignment information.
    #[serde(default)]
    pub spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    #[serde(default)]
    pub example: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

/// One flattened example, ready for instance assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlData {
    /// The question tokens, variable placeholders kept inline.
    pub text_with_variables: Vec<String>,
    /// The tokenized target SQL.
    pub sql: Vec<String>,
    /// Placeholder variable -> linked entity.
    pub sql_variables: PrelinkedEntities,
    /// Columns projected out of derived (sub-select) tables.
    pub derived_cols: Vec<DerivedColumn>,
    /// Aliases of derived tables appearing in the SQL.
    pub derived_tables: Vec<String>,
    /// Raw half-open span annotations for this sentence.
    pub spans: Vec<(usize, usize)>,
}

/// Parse a dataset file's JSON payload.
pub fn parse_dataset(json: &str) -> Result<Vec<DatasetEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Flatten dataset entries into `SqlData` records.
///
/// `use_all_sql` keeps every semantically equivalent SQL query instead of
/// just the first; `use_all_queries` keeps duplicate (question, sql) pairs
/// instead of deduplicating them across the whole file.
pub fn process_sql_data(
    entries: &[DatasetEntry],
    use_all_sql: bool,
    use_all_queries: bool,
) -> Vec<SqlData> {
    let mut seen: HashSet<(Vec<String>, Vec<String>)> = HashSet::new();
    let mut records = Vec::new();

    for entry in entries {
        let sqls: &[String] = if use_all_sql {
            &entry.sql
        } else {
            &entry.sql[..entry.sql.len().min(1)]
        };

        for sentence in &entry.sentences {
            let text_tokens: Vec<String> =
                sentence.text.split_whitespace().map(str::to_string).collect();

            for sql in sqls {
                let sql_tokens: Vec<String> =
                    sql.split_whitespace().map(str::to_string).collect();

                if !use_all_queries
                    && !seen.insert((text_tokens.clone(), sql_tokens.clone()))
                {
                    continue;
                }

                records.push(SqlData {
                    sql_variables: link_variables(&entry.variables, &sentence.variables),
                    derived_cols: derived_cols(&sql_tokens),
                    derived_tables: derived_tables(&sql_tokens),
                    spans: sentence.spans.clone(),
                    text_with_variables: text_tokens.clone(),
                    sql: sql_tokens,
                });
            }
        }
    }
    records
}

/// Build one `SqlData` from a single (question, sql, variables) record,
/// the shape used when rebuilding an instance outside a dataset file.
/// Entity types are recovered by stripping the trailing index from the
/// variable name (`city_name0` -> `city_name`); no span annotations exist
/// on this path.
pub fn sql_data_from_question(
    question: &str,
    sql: &str,
    variables: &BTreeMap<String, String>,
) -> SqlData {
    let sql_tokens: Vec<String> = sql.split_whitespace().map(str::to_string).collect();
    let sql_variables = variables
        .iter()
        .map(|(name, value)| {
            let entity_type = TRAILING_INDEX_RE.replace(name, "").to_string();
            (
                name.clone(),
                LinkedEntity {
                    example: value.clone(),
                    entity_type,
                },
            )
        })
        .collect();
    SqlData {
        text_with_variables: question.split_whitespace().map(str::to_string).collect(),
        derived_cols: derived_cols(&sql_tokens),
        derived_tables: derived_tables(&sql_tokens),
        sql: sql_tokens,
        sql_variables,
        spans: Vec::new(),
    }
}

fn link_variables(
    variables: &[VariableRecord],
    sentence_values: &BTreeMap<String, String>,
) -> PrelinkedEntities {
    variables
        .iter()
        .map(|var| {
            // The sentence carries the value this phrasing actually used;
            // fall back to the entry-level example.
            let example = sentence_values
                .get(&var.name)
                .filter(|v| !v.is_empty())
                .unwrap_or(&var.example)
                .clone();
            (
                var.name.clone(),
                LinkedEntity {
                    example,
                    entity_type: var.entity_type.clone(),
                },
            )
        })
        .collect()
}

fn derived_tables(sql_tokens: &[String]) -> Vec<String> {
    sql_tokens
        .iter()
        .filter(|token| DERIVED_TABLE_RE.is_match(token))
        .unique()
        .cloned()
        .collect()
}

fn derived_cols(sql_tokens: &[String]) -> Vec<DerivedColumn> {
    sql_tokens
        .iter()
        .filter_map(|token| {
            DERIVED_FIELD_RE
                .captures(token)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        })
        .unique()
        .collect()
}
