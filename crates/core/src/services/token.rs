//! Access token issuing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use museum_common::{AppError, AppResult, config::AuthConfig};
use museum_db::entities::user;
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub username: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// HS256 token service.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service from the auth configuration.
    ///
    /// Fails with [`AppError::Config`] on an empty secret or a lifetime that
    /// does not fit in a duration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let secret = config.jwt_secret.as_bytes();
        if config.jwt_secret.trim().is_empty() {
            return Err(AppError::Config(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }
        let ttl = Duration::try_hours(config.token_ttl_hours).ok_or_else(|| {
            AppError::Config(format!(
                "auth.token_ttl_hours out of range: {}",
                config.token_ttl_hours
            ))
        })?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &user::Model) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(secret: &str, ttl_hours: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_hours: ttl_hours,
        }
    }

    fn test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            surname: "Liddell".to_string(),
            password_hash: String::new(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(&config("secret", 24)).unwrap();
        let token = tokens.issue(&test_user()).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "user1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenService::new(&config("secret", 24))
            .unwrap()
            .issue(&test_user())
            .unwrap();

        let result = TokenService::new(&config("other", 24))
            .unwrap()
            .verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60s leeway.
        let tokens = TokenService::new(&config("secret", -1)).unwrap();
        let token = tokens.issue(&test_user()).unwrap();

        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = TokenService::new(&config("secret", 24)).unwrap();
        assert!(tokens.verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = TokenService::new(&config("", 24));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_out_of_range_ttl_rejected() {
        let result = TokenService::new(&config("secret", i64::MAX));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
