//! JWT session validation.
//!
//! Verifies HS256 tokens issued by the identity service against a shared
//! secret. Claims carry the subject id and profile fields; the subject
//! becomes the `UserId` every handler acts on.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Claims expected in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,
    /// Email address.
    pub email: String,
    /// Display name, if the profile has one.
    #[serde(default)]
    pub name: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// [`SessionValidator`] backed by a shared-secret HS256 verifier.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            },
        )?;

        let id = UserId::new(data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::new(
            id,
            data.claims.email,
            data.claims.name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(claims: &SessionClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(exp_offset_secs: i64) -> SessionClaims {
        SessionClaims {
            sub: "user-123".to_string(),
            email: "user@example.com".to_string(),
            name: Some("Test User".to_string()),
            exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as u64,
        }
    }

    #[tokio::test]
    async fn valid_token_yields_the_authenticated_user() {
        let validator = JwtSessionValidator::new(SECRET);
        let user = validator
            .validate_token(&token(&claims(3600), SECRET))
            .await
            .unwrap();

        assert_eq!(user.id.as_str(), "user-123");
        assert_eq!(user.email, "user@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_as_expired() {
        let validator = JwtSessionValidator::new(SECRET);
        let err = validator
            .validate_token(&token(&claims(-3600), SECRET))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_as_invalid() {
        let validator = JwtSessionValidator::new(SECRET);
        let err = validator
            .validate_token(&token(&claims(3600), "other-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_rejected_as_invalid() {
        let validator = JwtSessionValidator::new(SECRET);
        let err = validator.validate_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
