//! Session validator port.
//!
//! The only source of user identity in the system. Handlers receive an
//! [`AuthenticatedUser`] produced here via the auth middleware; identity is
//! never read from request payloads.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Port for verifying bearer tokens.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validates a bearer token and returns the verified identity.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for malformed or tampered tokens
    /// - `TokenExpired` for well-formed but expired tokens
    /// - `ServiceUnavailable` when the verifier itself fails
    async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
