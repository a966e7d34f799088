//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use museum_common::{AppError, AppResult, IdGenerator};
use museum_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::token::TokenService;

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub surname: String,
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(email, length(max = 256))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Public view of a user account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            name: u.name,
            surname: u.surname,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    tokens: TokenService,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, tokens: TokenService) -> Self {
        Self {
            user_repo,
            tokens,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        let input = SignupInput {
            name: input.name.trim().to_string(),
            surname: input.surname.trim().to_string(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            password: input.password,
        };
        input.validate()?;

        if self
            .user_repo
            .find_by_email_or_username(&input.email, &input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Email or username already in use".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            email: Set(input.email),
            name: Set(input.name),
            surname: Set(input.surname),
            password_hash: Set(password_hash),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Check credentials and issue an access token.
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginResponse> {
        input.validate()?;

        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user)?;
        Ok(LoginResponse {
            id: user.id,
            username: user.username,
            token,
        })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.tokens.verify(token)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use museum_common::config::AuthConfig;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn tokens() -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
        })
        .unwrap()
    }

    fn create_test_user(password: &str) -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            surname: "Liddell".to_string(),
            password_hash: hash_password(password).unwrap(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())), tokens())
    }

    fn signup_input() -> SignupInput {
        SignupInput {
            name: "Alice".to_string(),
            surname: "Liddell".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "wonderland".to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();
        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not_a_valid_hash").is_err());
    }

    #[test]
    fn test_signup_input_validation() {
        let mut input = signup_input();
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());

        let mut input = signup_input();
        input.password = "short".to_string();
        assert!(input.validate().is_err());

        assert!(signup_input().validate().is_ok());
    }

    #[tokio::test]
    async fn test_signup_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("whatever1")]]);

        let result = service(db).signup(signup_input()).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_success_issues_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("wonderland")]]);
        let service = service(db);

        let response = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "wonderland".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.id, "user1");
        let claims = tokens().verify(&response.token).unwrap();
        assert_eq!(claims.sub, "user1");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("wonderland")]]);

        let result = service(db)
            .login(LoginInput {
                username: "alice".to_string(),
                password: "looking-glass".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);

        let result = service(db)
            .login(LoginInput {
                username: "nobody".to_string(),
                password: "whatever1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
