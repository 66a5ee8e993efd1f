//! Mock session validator for tests.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// [`SessionValidator`] with a fixed token-to-user table.
#[derive(Default)]
pub struct MockSessionValidator {
    users: HashMap<String, AuthenticatedUser>,
    unavailable: bool,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token that validates to `user`.
    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.users.insert(token.into(), user);
        self
    }

    /// Makes every validation fail as a service outage.
    pub fn unavailable() -> Self {
        Self {
            users: HashMap::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if self.unavailable {
            return Err(AuthError::service_unavailable("mock outage"));
        }
        self.users
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
