//! Production rules and action indexing
//!
//! The grammar world hands back actions as plain `"LHS -> RHS"` strings.
//! For training we need them as an indexed catalog, with the gold
//! derivation expressed as positions into that catalog.

use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel index emitted when an example has no gold derivation.
pub const NO_DERIVATION: i64 = -1;

/// One legal grammar expansion, annotated for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRule {
    /// The full rule string, e.g. `"query -> [select_core, groupby_clause]"`.
    pub rule: String,
    /// The left-hand side of the rule.
    pub nonterminal: String,
    /// Whether the rule is shared across the whole grammar, as opposed to
    /// being added for this example's linked entities.
    pub is_global: bool,
}

/// Extract the left-hand side of a `"LHS -> RHS"` rule string.
pub fn nonterminal_of(rule: &str) -> Result<&str> {
    rule.split(" ->")
        .next()
        .filter(|lhs| !lhs.is_empty() && *lhs != rule)
        .ok_or_else(|| ReaderError::MalformedRule(rule.to_string()))
}

/// The full inventory of actions legal at the current grammar state,
/// indexed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCatalog {
    rules: Vec<ProductionRule>,
}

impl ActionCatalog {
    /// Catalog entries are assumed unique; the grammar world guarantees
    /// this upstream.
    pub fn new(rules: Vec<ProductionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ProductionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProductionRule> {
        self.rules.get(index)
    }

    fn index(&self) -> HashMap<&str, usize> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, action)| (action.rule.as_str(), i))
            .collect()
    }

    /// Convert the gold action sequence into positions in this catalog.
    ///
    /// An empty sequence means the example had no valid derivation and maps
    /// to the single [`NO_DERIVATION`] sentinel. A sequence entry absent
    /// from the catalog is a grammar-world contract violation and fails
    /// hard.
    pub fn index_sequence(&self, action_sequence: &[String]) -> Result<Vec<i64>> {
        if action_sequence.is_empty() {
            return Ok(vec![NO_DERIVATION]);
        }
        let action_map = self.index();
        action_sequence
            .iter()
            .map(|rule| {
                action_map
                    .get(rule.as_str())
                    .map(|&i| i as i64)
                    .ok_or_else(|| ReaderError::UnknownAction(rule.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(rules: &[&str]) -> ActionCatalog {
        ActionCatalog::new(
            rules
                .iter()
                .map(|r| ProductionRule {
                    rule: r.to_string(),
                    nonterminal: nonterminal_of(r).unwrap().to_string(),
                    is_global: true,
                })
                .collect(),
        )
    }

    #[test]
    fn nonterminal_is_the_lhs() {
        assert_eq!(nonterminal_of("query -> [select_core]").unwrap(), "query");
        assert_eq!(nonterminal_of("col_ref -> [\"city.name\"]").unwrap(), "col_ref");
    }

    #[test]
    fn rule_without_arrow_is_malformed() {
        assert!(matches!(
            nonterminal_of("query"),
            Err(ReaderError::MalformedRule(_))
        ));
    }

    #[test]
    fn gold_sequence_round_trips_through_indices() {
        let catalog = catalog(&["A -> B", "A -> C", "B -> d"]);
        let gold = vec!["A -> B".to_string(), "B -> d".to_string()];
        let indices = catalog.index_sequence(&gold).unwrap();
        assert_eq!(indices, vec![0, 2]);

        let decoded: Vec<&str> = indices
            .iter()
            .map(|&i| catalog.get(i as usize).unwrap().rule.as_str())
            .collect();
        assert_eq!(decoded, vec!["A -> B", "B -> d"]);
    }

    #[test]
    fn repeated_rules_keep_their_index() {
        let catalog = catalog(&["A -> B", "B -> d"]);
        let gold = vec!["A -> B".to_string(), "A -> B".to_string(), "B -> d".to_string()];
        assert_eq!(catalog.index_sequence(&gold).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn empty_sequence_becomes_the_sentinel() {
        let catalog = catalog(&["A -> B", "A -> C", "B -> d"]);
        assert_eq!(catalog.index_sequence(&[]).unwrap(), vec![NO_DERIVATION]);
        // catalog size is irrelevant
        let empty = ActionCatalog::new(Vec::new());
        assert_eq!(empty.index_sequence(&[]).unwrap(), vec![NO_DERIVATION]);
    }

    #[test]
    fn missing_rule_fails_hard() {
        let catalog = catalog(&["A -> B"]);
        let gold = vec!["A -> Z".to_string()];
        assert!(matches!(
            catalog.index_sequence(&gold),
            Err(ReaderError::UnknownAction(_))
        ));
    }

    #[test]
    fn index_covers_every_catalog_position() {
        let catalog = catalog(&["A -> B", "A -> C", "B -> d", "C -> e"]);
        let index = catalog.index();
        let mut positions: Vec<usize> = index.values().copied().collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }
}
