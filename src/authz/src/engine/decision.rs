//! Authorization decision returned by the resolver

use crate::error::{AuthzError, Result};

/// Authorization decision
///
/// A decision is either allowed with no error, or denied with an error
/// explaining why (`NotAllowed` for default deny, `Denied` for an explicit
/// Deny statement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    allowed: bool,
    error: Option<AuthzError>,
}

impl Decision {
    /// Allow decision
    pub fn allow() -> Self {
        Self {
            allowed: true,
            error: None,
        }
    }

    /// Deny decision carrying the reason
    pub fn deny(error: AuthzError) -> Self {
        Self {
            allowed: false,
            error: Some(error),
        }
    }

    /// Whether the operations are allowed
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Denial reason, `None` when allowed
    pub fn error(&self) -> Option<&AuthzError> {
        self.error.as_ref()
    }

    /// Convert into a `Result`, so callers can use `?` on denials
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_decision() {
        let decision = Decision::allow();
        assert!(decision.allowed());
        assert!(decision.error().is_none());
        assert!(decision.into_result().is_ok());
    }

    #[test]
    fn test_deny_decision() {
        let decision = Decision::deny(AuthzError::NotAllowed {
            action: "a".to_string(),
            resource: "r".to_string(),
        });

        assert!(!decision.allowed());
        assert_eq!(
            decision.error().map(ToString::to_string).as_deref(),
            Some(r#"action "a" on resource "r" not allowed"#)
        );
        assert!(decision.into_result().is_err());
    }
}
