//! Grammar-based dataset reader
//!
//! Turns text2sql examples into training instances for a type-constrained
//! semantic parser: the tokenized question, its span annotations, the full
//! action catalog at the current grammar state and the gold derivation as
//! indices into that catalog.

use crate::actions::{nonterminal_of, ActionCatalog, ProductionRule};
use crate::cache::InstanceCache;
use crate::config::ReaderConfig;
use crate::dataset::{self, SqlData};
use crate::error::{ReaderError, Result};
use crate::instance::Instance;
use crate::spans::fix_spans_coverage;
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::world::{DerivedColumn, GrammarWorld, PrelinkedEntities};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Build a reader from its configuration name.
///
/// The reader flavor is selected by name in experiment configs; unknown
/// names fail up front instead of at read time.
pub fn reader_from_name(
    name: &str,
    config: ReaderConfig,
    world: Arc<dyn GrammarWorld>,
) -> Result<GrammarBasedReader> {
    match name {
        "grammar_based_spans" => GrammarBasedReader::new(config, world),
        other => Err(ReaderError::Config(format!(
            "unknown dataset reader: {other}"
        ))),
    }
}

pub struct GrammarBasedReader {
    config: ReaderConfig,
    tokenizer: Box<dyn Tokenizer>,
    world: Arc<dyn GrammarWorld>,
}

impl GrammarBasedReader {
    pub fn new(config: ReaderConfig, world: Arc<dyn GrammarWorld>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tokenizer: Box::new(WhitespaceTokenizer),
            world,
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read a dataset file, or every `.json` file in a dataset directory.
    ///
    /// Files belonging to the excluded cross-validation split are skipped.
    /// Examples the grammar cannot derive are dropped or kept according to
    /// `keep_if_unparsable`; a per-example hard failure is logged and skips
    /// that example only.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        for file in self.dataset_files(path.as_ref())? {
            let cache = InstanceCache::for_dataset_file(&file);
            let mut load_cache = self.config.load_cache;
            if load_cache {
                cache.announce_load();
                if !cache.exists() {
                    info!(
                        "cache {} does not exist, processing from scratch",
                        cache.directory().display()
                    );
                    load_cache = false;
                }
            }
            if self.config.save_cache {
                cache.create()?;
            }

            let contents = fs::read_to_string(&file)?;
            let entries = dataset::parse_dataset(&contents)?;
            let records = dataset::process_sql_data(
                &entries,
                self.config.use_all_sql,
                self.config.use_all_queries,
            );

            for (example_index, sql_data) in records.iter().enumerate() {
                if let Some(limit) = self.config.loading_limit {
                    if instances.len() == limit {
                        return Ok(instances);
                    }
                }
                if load_cache {
                    if let Some(instance) = cache.load(example_index) {
                        instances.push(instance);
                        continue;
                    }
                }
                match self.instance_from_sql_data(sql_data) {
                    Ok(Some(instance)) => {
                        if self.config.save_cache {
                            if let Err(e) = cache.store(example_index, &instance) {
                                warn!(
                                    "failed to cache instance {example_index} of {}: {e}",
                                    file.display()
                                );
                            }
                        }
                        instances.push(instance);
                    }
                    // unparsable under the drop policy
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            "skipping example {example_index} of {}: {e}",
                            file.display()
                        );
                    }
                }
            }
        }
        Ok(instances)
    }

    /// Assemble one instance.
    ///
    /// Returns `Ok(None)` when the grammar has no derivation for the SQL
    /// and unparsable examples are being dropped; callers filtering a
    /// dataset stream skip those silently.
    pub fn text_to_instance(
        &self,
        query: &[String],
        derived_cols: &[DerivedColumn],
        derived_tables: &[String],
        prelinked_entities: Option<&PrelinkedEntities>,
        sql: &[String],
        spans: Option<&[(usize, usize)]>,
    ) -> Result<Option<Instance>> {
        let tokens: Vec<String> = self
            .tokenizer
            .tokenize(&query.join(" "))
            .into_iter()
            .map(|token| token.text)
            .collect();

        let spans = fix_spans_coverage(spans.unwrap_or(&[]), tokens.len())?;

        let (action_sequence, all_actions) = self.world.action_sequence_and_all_actions(
            sql,
            derived_cols,
            derived_tables,
            prelinked_entities,
        );
        let action_sequence = match action_sequence {
            Some(sequence) => sequence,
            None if self.config.keep_if_unparsable => {
                warn!("no grammar derivation for: {}", sql.join(" "));
                Vec::new()
            }
            None => return Ok(None),
        };

        let mut production_rules = Vec::with_capacity(all_actions.len());
        for rule in all_actions {
            let nonterminal = nonterminal_of(&rule)?.to_string();
            let is_global = self.world.is_global_rule(&nonterminal);
            production_rules.push(ProductionRule {
                rule,
                nonterminal,
                is_global,
            });
        }
        let valid_actions = ActionCatalog::new(production_rules);
        let action_sequence = valid_actions.index_sequence(&action_sequence)?;

        Ok(Some(Instance {
            tokens,
            spans,
            valid_actions,
            action_sequence,
        }))
    }

    /// Rebuild an instance from a single (question, sql, variables) record,
    /// the shape served outside of dataset files. No span annotations exist
    /// on this path, so the instance carries only the size-1 spans.
    pub fn question_to_instance(
        &self,
        question: &str,
        sql: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<Option<Instance>> {
        let data = dataset::sql_data_from_question(question, sql, variables);
        self.instance_from_sql_data(&data)
    }

    fn instance_from_sql_data(&self, data: &SqlData) -> Result<Option<Instance>> {
        let prelinked_entities = self
            .config
            .use_prelinked_entities
            .then_some(&data.sql_variables);
        self.text_to_instance(
            &data.text_with_variables,
            &data.derived_cols,
            &data.derived_tables,
            prelinked_entities,
            &data.sql,
            Some(&data.spans),
        )
    }

    fn dataset_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = if path.is_dir() {
            fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
                .collect()
        } else {
            vec![path.to_path_buf()]
        };
        files.sort();
        if let Some(split) = self.config.cross_validation_split_to_exclude {
            let excluded = format!("split_{split}");
            files.retain(|p| {
                !p.file_name()
                    .map_or(false, |name| name.to_string_lossy().contains(&excluded))
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::Span;

    /// A tiny grammar world: three global rules plus one local rule per
    /// prelinked entity. Derivation succeeds unless told not to.
    pub(crate) struct StubWorld {
        pub parsable: bool,
    }

    impl GrammarWorld for StubWorld {
        fn action_sequence_and_all_actions(
            &self,
            _sql: &[String],
            _derived_cols: &[DerivedColumn],
            _derived_tables: &[String],
            prelinked_entities: Option<&PrelinkedEntities>,
        ) -> (Option<Vec<String>>, Vec<String>) {
            let mut all_actions = vec![
                "query -> [select_core]".to_string(),
                "select_core -> [col_ref]".to_string(),
                "col_ref -> [\"CITY.CITY_NAME\"]".to_string(),
            ];
            if let Some(entities) = prelinked_entities {
                for name in entities.keys() {
                    all_actions.push(format!("value -> [\"'{name}'\"]"));
                }
            }
            let sequence = self.parsable.then(|| {
                vec![
                    "query -> [select_core]".to_string(),
                    "select_core -> [col_ref]".to_string(),
                ]
            });
            (sequence, all_actions)
        }

        fn is_global_rule(&self, nonterminal: &str) -> bool {
            nonterminal != "value"
        }
    }

    fn reader(config: ReaderConfig, parsable: bool) -> GrammarBasedReader {
        GrammarBasedReader::new(config, Arc::new(StubWorld { parsable })).unwrap()
    }

    fn query() -> Vec<String> {
        vec!["where".into(), "is".into(), "city_name0".into(), "?".into()]
    }

    fn sql() -> Vec<String> {
        vec!["SELECT".into(), "CITY_NAME".into(), ";".into()]
    }

    fn entities() -> PrelinkedEntities {
        let mut entities = PrelinkedEntities::new();
        entities.insert(
            "city_name0".to_string(),
            crate::world::LinkedEntity {
                example: "austin".to_string(),
                entity_type: "city_name".to_string(),
            },
        );
        entities
    }

    #[test]
    fn assembles_a_full_instance() {
        let reader = reader(ReaderConfig::default(), true);
        let entities = entities();
        let instance = reader
            .text_to_instance(&query(), &[], &[], Some(&entities), &sql(), Some(&[(0, 3)]))
            .unwrap()
            .unwrap();

        assert_eq!(instance.tokens, vec!["where", "is", "city_name0", "?"]);
        // (0,3) half-open -> (0,2) inclusive, plus the four unigrams
        assert_eq!(
            instance.spans,
            vec![
                Span::new(0, 0),
                Span::new(0, 2),
                Span::new(1, 1),
                Span::new(2, 2),
                Span::new(3, 3),
            ]
        );
        assert_eq!(instance.valid_actions.len(), 4);
        assert_eq!(instance.action_sequence, vec![0, 1]);
    }

    #[test]
    fn entity_rules_are_local_and_grammar_rules_global() {
        let reader = reader(ReaderConfig::default(), true);
        let entities = entities();
        let instance = reader
            .text_to_instance(&query(), &[], &[], Some(&entities), &sql(), None)
            .unwrap()
            .unwrap();

        let rules = instance.valid_actions.rules();
        assert!(rules[0].is_global);
        assert_eq!(rules[0].nonterminal, "query");
        let entity_rule = rules.last().unwrap();
        assert_eq!(entity_rule.nonterminal, "value");
        assert!(!entity_rule.is_global);
    }

    #[test]
    fn unparsable_is_dropped_by_default() {
        let reader = reader(ReaderConfig::default(), false);
        let result = reader
            .text_to_instance(&query(), &[], &[], None, &sql(), None)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unparsable_is_kept_with_the_sentinel_when_configured() {
        let config = ReaderConfig {
            keep_if_unparsable: true,
            ..ReaderConfig::default()
        };
        let reader = reader(config, false);
        let instance = reader
            .text_to_instance(&query(), &[], &[], None, &sql(), None)
            .unwrap()
            .unwrap();
        assert_eq!(instance.action_sequence, vec![-1]);
        // the catalog is still fully constructed
        assert_eq!(instance.valid_actions.len(), 3);
    }

    #[test]
    fn question_path_has_only_unigram_spans() {
        let reader = reader(ReaderConfig::default(), true);
        let mut variables = BTreeMap::new();
        variables.insert("city_name0".to_string(), "austin".to_string());
        let instance = reader
            .question_to_instance("where is city_name0 ?", "SELECT CITY_NAME ;", &variables)
            .unwrap()
            .unwrap();
        assert_eq!(instance.spans.len(), instance.tokens.len());
        assert!(instance.spans.iter().all(|span| span.start == span.end));
    }

    #[test]
    fn unknown_reader_name_is_a_config_error() {
        let result = reader_from_name(
            "seq2seq",
            ReaderConfig::default(),
            Arc::new(StubWorld { parsable: true }),
        );
        assert!(matches!(result, Err(ReaderError::Config(_))));
    }
}
