//! The assembled training instance

use crate::actions::ActionCatalog;
use crate::spans::Span;
use serde::{Deserialize, Serialize};

/// One fully processed (question, SQL) example.
///
/// Constructed once per example and immutable afterwards; the trainer
/// consumes exactly these four fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// The tokenized question, variable placeholders inlined.
    pub tokens: Vec<String>,
    /// Inclusive spans over `tokens`, sorted by (start, end).
    pub spans: Vec<Span>,
    /// Every action legal at this grammar state.
    pub valid_actions: ActionCatalog,
    /// The gold derivation as positions into `valid_actions`, or the
    /// `[-1]` sentinel when the example had no derivation.
    pub action_sequence: Vec<i64>,
}
