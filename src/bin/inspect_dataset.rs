//! Dataset inspection
//!
//! Sanity-checks a text2sql dataset before a training run: parses each
//! file, flattens it the way the reader would, normalizes the span
//! annotations and reports what it finds. Grammar derivation needs a
//! concrete grammar world and is not attempted here.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use text2sql_reader::database::EntityDatabase;
use text2sql_reader::dataset;
use text2sql_reader::schema::read_dataset_schema;
use text2sql_reader::spans::fix_spans_coverage;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "inspect_dataset")]
#[command(about = "Inspect a text2sql dataset and its schema")]
struct Args {
    /// A dataset .json file or a directory of them
    dataset_path: PathBuf,

    /// Path to the dataset's schema CSV
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Path to the dataset's SQLite database, for checking that schema
    /// columns have example values
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Use every semantically equivalent SQL query, not just the first
    #[arg(long)]
    use_all_sql: bool,

    /// Keep duplicate (question, sql) pairs
    #[arg(long, default_value_t = true)]
    use_all_queries: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if let Some(schema_path) = &args.schema {
        let schema = read_dataset_schema(schema_path)
            .with_context(|| format!("loading schema from {}", schema_path.display()))?;
        let columns: usize = schema.values().map(Vec::len).sum();
        info!(
            "schema: {} tables, {} columns",
            schema.len(),
            columns
        );

        if let Some(db_path) = &args.database {
            if let Some(db) = EntityDatabase::open_if_exists(db_path) {
                let mut empty_columns = 0usize;
                for (table, table_columns) in &schema {
                    for column in table_columns {
                        match db.column_values(table, &column.name, 1) {
                            Ok(values) if values.is_empty() => {
                                warn!("{table}.{} has no values", column.name);
                                empty_columns += 1;
                            }
                            Ok(_) => {}
                            Err(e) => warn!("{table}.{}: {e}", column.name),
                        }
                    }
                }
                info!("database check: {empty_columns} columns without values");
            }
        }
    }

    let files: Vec<PathBuf> = if args.dataset_path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&args.dataset_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        files.sort();
        files
    } else {
        vec![args.dataset_path.clone()]
    };

    for file in files {
        let contents = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        let entries = dataset::parse_dataset(&contents)
            .with_context(|| format!("parsing {}", file.display()))?;
        let records = dataset::process_sql_data(&entries, args.use_all_sql, args.use_all_queries);

        let mut annotated = 0usize;
        let mut bad_spans = 0usize;
        for record in &records {
            if !record.spans.is_empty() {
                annotated += 1;
            }
            if let Err(e) =
                fix_spans_coverage(&record.spans, record.text_with_variables.len())
            {
                warn!("{}: {e}", file.display());
                bad_spans += 1;
            }
        }

        info!(
            "{}: {} entries, {} records, {} with span annotations, {} with invalid spans",
            file.display(),
            entries.len(),
            records.len(),
            annotated,
            bad_spans
        );
    }

    Ok(())
}
