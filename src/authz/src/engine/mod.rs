//! Specificity-based policy resolution
//!
//! Resolves operations against an ordered set of policies:
//!
//! ```text
//! policies → flatten statements → evaluate each → rank (action, resource) → Decision
//! ```
//!
//! The most specific matching statement decides. Action specificity is
//! compared first and resource specificity only breaks ties. When several
//! statements share the top rank, Deny wins over Allow. An operation that
//! no statement matches is denied by default.

pub mod decision;
pub mod evaluator;

pub use decision::Decision;
pub use evaluator::{evaluate, StatementMatch};

use std::sync::Arc;
use tracing::debug;

use crate::error::AuthzError;
use crate::policy::{Effect, Policy, Statement};
use crate::types::Operation;

/// A statement together with the policy that declares it
#[derive(Debug, Clone)]
struct Rule {
    policy: Arc<Policy>,
    index: usize,
}

impl Rule {
    fn statement(&self) -> &Statement {
        &self.policy.statements[self.index]
    }
}

/// Stateless evaluator over a fixed, ordered policy set
///
/// Cheap to clone and safe to share across threads. Build one per request
/// from [`PolicyStore::user_policies`](crate::store::PolicyStore::user_policies),
/// or keep one around while the policy set is known to be unchanged.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    rules: Vec<Rule>,
}

impl Resolver {
    /// Create a resolver from policies in precedence-neutral declaration order
    pub fn new<I>(policies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Policy>>,
    {
        let rules = policies
            .into_iter()
            .map(Into::into)
            .flat_map(|policy: Arc<Policy>| {
                (0..policy.statements.len()).map(move |index| Rule {
                    policy: Arc::clone(&policy),
                    index,
                })
            })
            .collect();

        Self { rules }
    }

    /// Number of statements considered by this resolver
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Authorize every operation; all must be allowed.
    ///
    /// Operations are checked in order and the first denial is returned.
    /// An empty operation list is denied.
    pub fn is_authorized(&self, ops: &[Operation]) -> Decision {
        if ops.is_empty() {
            return Decision::deny(AuthzError::NoOperations);
        }

        for op in ops {
            let decision = self.authorize(op);
            if !decision.allowed() {
                return decision;
            }
        }

        Decision::allow()
    }

    /// Authorize a single operation
    pub fn authorize(&self, op: &Operation) -> Decision {
        let mut best: Option<(&Rule, StatementMatch)> = None;

        for rule in &self.rules {
            let Some(candidate) = evaluate(rule.statement(), op) else {
                continue;
            };

            // Strictly higher rank replaces; on an equal rank only the first
            // Deny may replace an Allow, so the first Deny in declaration
            // order is the one reported.
            let replace = match &best {
                None => true,
                Some((_, current)) => {
                    candidate.rank() > current.rank()
                        || (candidate.rank() == current.rank()
                            && current.effect == Effect::Allow
                            && candidate.effect == Effect::Deny)
                }
            };

            if replace {
                best = Some((rule, candidate));
            }
        }

        let Some((rule, winner)) = best else {
            debug!(action = %op.action, resource = %op.resource, "no statement matches");
            return Decision::deny(AuthzError::NotAllowed {
                action: op.action.clone(),
                resource: op.resource.clone(),
            });
        };

        let statement = rule.statement();
        debug!(
            action = %op.action,
            resource = %op.resource,
            policy = %rule.policy.name,
            statement = %statement.name,
            effect = %winner.effect,
            action_specificity = winner.action_specificity,
            resource_specificity = winner.resource_specificity,
            "statement selected"
        );

        match winner.effect {
            Effect::Allow => Decision::allow(),
            Effect::Deny => Decision::deny(AuthzError::Denied {
                action: op.action.clone(),
                resource: op.resource.clone(),
                policy: rule.policy.name.clone(),
                statement: statement.name.clone(),
            }),
        }
    }
}
