//! Grammar-constrained training instances for text2sql semantic parsing.
//!
//! Converts (question, SQL) examples plus their pre-linked entities into
//! instances a type-constrained parser can train on: question tokens, span
//! supervision, the full action catalog and the gold derivation indexed
//! into it. The grammar itself lives behind the [`world::GrammarWorld`]
//! trait.

pub mod actions;
pub mod cache;
pub mod config;
pub mod database;
pub mod dataset;
pub mod error;
pub mod instance;
pub mod reader;
pub mod schema;
pub mod spans;
pub mod tokenizer;
pub mod world;

pub use actions::{ActionCatalog, ProductionRule, NO_DERIVATION};
pub use config::ReaderConfig;
pub use error::{ReaderError, Result};
pub use instance::Instance;
pub use reader::{reader_from_name, GrammarBasedReader};
pub use spans::Span;
pub use world::{GrammarWorld, LinkedEntity, PrelinkedEntities};
