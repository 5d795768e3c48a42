//! Caller identity - the explicit replacement for ambient "current user" lookups.
//!
//! Every caller-facing operation takes a [`RequestContext`] built by whatever sits in
//! front of the core (an HTTP layer, a CLI, a test). The context is never global.

use crate::errors::{Error, Result};

/// Identity of the caller for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Option<String>,
}

impl RequestContext {
    /// Context for an authenticated caller.
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Context without an identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// The caller's identity, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The caller's identity.
    ///
    /// # Errors
    /// Returns [`Error::NotAuthenticated`] for anonymous contexts.
    pub fn require_user(&self) -> Result<&str> {
        self.user_id().ok_or(Error::NotAuthenticated)
    }
}
