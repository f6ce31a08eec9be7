//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// The `Display` output of the authorization and catalog variants is relied
/// upon by callers and must stay byte-for-byte stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// No statement matched the operation (default deny)
    #[error("action \"{action}\" on resource \"{resource}\" not allowed")]
    NotAllowed { action: String, resource: String },

    /// An explicit Deny statement won resolution
    #[error("action \"{action}\" on resource \"{resource}\" denied by policy \"{policy}\" statement \"{statement}\"")]
    Denied {
        action: String,
        resource: String,
        policy: String,
        statement: String,
    },

    /// Authorization was requested for an empty set of operations
    #[error("no operations to authorize")]
    NoOperations,

    /// Policy not found
    #[error("policy \"{0}\" not found")]
    PolicyNotFound(String),

    /// Group not found
    #[error("group \"{0}\" not found")]
    GroupNotFound(String),

    /// Policy name already taken
    #[error("policy \"{0}\" already exist")]
    PolicyAlreadyExists(String),

    /// Group name already taken
    #[error("group \"{0}\" already exist")]
    GroupAlreadyExists(String),

    /// Manifest entry could not be parsed into a policy or group
    #[error("invalid spec for \"{name}\": {reason}")]
    InvalidSpec { name: String, reason: String },

    /// Manifest entry of a kind the store does not handle
    #[error("unknown manifest kind \"{0}\"")]
    UnknownKind(String),

    /// Store started twice, or stopped while not running
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Manifest source subscription failure
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Manifest source could not read or decode its input
    #[error("Manifest error: {0}")]
    Manifest(String),
}

/// Coarse classification of [`AuthzError`], for callers that render
/// denials or map failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAllowed,
    Denied,
    NotFound,
    AlreadyExists,
    InvalidSpec,
    Internal,
}

impl AuthzError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::NotAllowed { .. } | AuthzError::NoOperations => ErrorKind::NotAllowed,
            AuthzError::Denied { .. } => ErrorKind::Denied,
            AuthzError::PolicyNotFound(_) | AuthzError::GroupNotFound(_) => ErrorKind::NotFound,
            AuthzError::PolicyAlreadyExists(_) | AuthzError::GroupAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            AuthzError::InvalidSpec { .. } | AuthzError::UnknownKind(_) => ErrorKind::InvalidSpec,
            AuthzError::Lifecycle(_) | AuthzError::Subscription(_) | AuthzError::Manifest(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether this error is an authorization denial, either default or explicit
    pub fn is_denial(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotAllowed | ErrorKind::Denied)
    }

    pub(crate) fn invalid_spec(name: impl Into<String>, reason: impl ToString) -> Self {
        AuthzError::InvalidSpec {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
