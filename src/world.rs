//! Grammar world interface
//!
//! The context-free grammar over SQL, and the derivation of a query into a
//! rule sequence, live in an external grammar engine. The reader only needs
//! these two operations from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pre-linked entity: the placeholder variable in the question text
/// mapped back to the value it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEntity {
    /// An example database value for the variable, e.g. `"new york"`.
    pub example: String,
    /// The entity type, e.g. `"city_name"` for variable `city_name0`.
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Placeholder variable name -> linked entity, in a deterministic order.
pub type PrelinkedEntities = BTreeMap<String, LinkedEntity>;

/// A column produced by a derived (sub-select) table, as (table alias, column).
pub type DerivedColumn = (String, String);

/// The two capabilities the reader needs from a grammar engine.
///
/// Implementations must be safe to call from multiple examples at once:
/// either stateless per call or internally synchronized.
pub trait GrammarWorld: Send + Sync {
    /// Derive `sql` under the grammar.
    ///
    /// Returns the gold action sequence (or `None` when the query has no
    /// valid derivation) together with every action legal at this grammar
    /// state. The catalog is returned even when derivation fails.
    fn action_sequence_and_all_actions(
        &self,
        sql: &[String],
        derived_cols: &[DerivedColumn],
        derived_tables: &[String],
        prelinked_entities: Option<&PrelinkedEntities>,
    ) -> (Option<Vec<String>>, Vec<String>);

    /// Whether `nonterminal` heads a grammar-wide rule category, as opposed
    /// to rules added per example for its linked entities.
    fn is_global_rule(&self, nonterminal: &str) -> bool;
}
