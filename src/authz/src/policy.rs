//! Policy, statement and group definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthzError, Result};
use crate::matcher::Pattern;

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the operation
    Allow,
    /// Deny the operation
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => f.write_str("Allow"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

/// One Allow/Deny rule pairing action patterns with resource patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement name, used in denial messages only
    #[serde(default)]
    pub name: String,

    /// Effect applied when this statement wins resolution
    pub effect: Effect,

    /// Action patterns (e.g., "secret.read", "secret.*")
    pub actions: Vec<Pattern>,

    /// Resource patterns (e.g., "/kv/payments/*")
    pub resource: Vec<Pattern>,
}

impl Statement {
    /// Create a statement from raw pattern strings
    pub fn new<A, R>(name: impl Into<String>, effect: Effect, actions: A, resource: R) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Ok(Self {
            name: name.into(),
            effect,
            actions: parse_patterns(actions)?,
            resource: parse_patterns(resource)?,
        })
    }
}

fn parse_patterns<I>(raw: I) -> Result<Vec<Pattern>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    raw.into_iter().map(|p| p.as_ref().parse()).collect()
}

/// Named, ordered collection of statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy name
    pub name: String,

    /// Statements in declaration order
    pub statements: Vec<Statement>,
}

impl Policy {
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }
}

/// Named collection of policy names, binding policies to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group name
    pub name: String,

    /// Policy names in declaration order
    pub policies: Vec<String>,
}

impl Group {
    pub fn new<I>(name: impl Into<String>, policies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            policies: policies.into_iter().map(Into::into).collect(),
        }
    }
}

/// `specs` payload of a `Policy` manifest entry
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySpec {
    pub statements: Vec<Statement>,
}

/// `specs` payload of a `Group` manifest entry
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub policies: Vec<String>,
}

impl PolicySpec {
    /// Decode a policy spec, attributing failures to the entry `name`
    pub fn from_value(name: &str, specs: serde_json::Value) -> Result<Self> {
        serde_json::from_value(specs).map_err(|e| AuthzError::invalid_spec(name, e))
    }
}

impl GroupSpec {
    /// Decode a group spec, attributing failures to the entry `name`
    pub fn from_value(name: &str, specs: serde_json::Value) -> Result<Self> {
        serde_json::from_value(specs).map_err(|e| AuthzError::invalid_spec(name, e))
    }
}
