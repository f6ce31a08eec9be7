//! Single-statement evaluation against an operation

use crate::matcher::field_specificity;
use crate::policy::{Effect, Statement};
use crate::types::Operation;

/// Outcome of a statement matching an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementMatch {
    /// Effect of the matching statement
    pub effect: Effect,

    /// Best specificity among the statement's action patterns
    pub action_specificity: usize,

    /// Best specificity among the statement's resource patterns
    pub resource_specificity: usize,
}

impl StatementMatch {
    /// Ranking key; action specificity dominates, resource breaks ties
    pub fn rank(&self) -> (usize, usize) {
        (self.action_specificity, self.resource_specificity)
    }
}

/// Evaluate `statement` against `op`.
///
/// Both fields must match. Action and resource are maximized independently,
/// so the winning action pattern and resource pattern need not have been
/// declared together.
pub fn evaluate(statement: &Statement, op: &Operation) -> Option<StatementMatch> {
    let action_specificity = field_specificity(&statement.actions, &op.action)?;
    let resource_specificity = field_specificity(&statement.resource, &op.resource)?;

    Some(StatementMatch {
        effect: statement.effect,
        action_specificity,
        resource_specificity,
    })
}
