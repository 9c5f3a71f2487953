//! Account registration, credential verification, and access token handling.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, password_hash::rand_core::OsRng};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("username already taken")]
    UsernameTaken,
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Resolved JWT parameters, validated at configuration load time.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub secret: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

/// Authenticated caller identity, injected into the request extensions by
/// the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserRecord,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, jwt: JwtConfig) -> Self {
        Self { users, jwt }
    }

    pub async fn register(&self, command: RegisterCommand) -> Result<AuthenticatedUser, AuthError> {
        validate_email(&command.email)?;
        validate_username(&command.username)?;
        if command.name.trim().is_empty() {
            return Err(AuthError::Validation("name must not be empty"));
        }
        if command.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "password must be at least 8 characters",
            ));
        }

        let password_hash = hash_password(&command.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                email: command.email.trim().to_string(),
                username: command.username.trim().to_string(),
                name: command.name.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(map_unique_violation)?;

        let access_token = self.issue_token(user.id)?;
        Ok(AuthenticatedUser { user, access_token })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            counter!("calamus_auth_failure_total").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            counter!("calamus_auth_failure_total").increment(1);
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.issue_token(user.id)?;
        Ok(AuthenticatedUser { user, access_token })
    }

    pub async fn load_user(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        self.users.find_by_id(id).await.map_err(AuthError::from)
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = now + self.jwt.ttl_seconds as i64;

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            exp: exp as usize,
            iat: now as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.jwt.audience.clone(),
            iss: self.jwt.issuer.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthPrincipal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.jwt.audience.as_str()]);
        validation.set_issuer(&[self.jwt.issuer.as_str()]);

        let data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.as_bytes()),
            &validation,
        )?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidCredentials)?;
        Ok(AuthPrincipal { user_id })
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let trimmed = email.trim();
    let Some((local, host)) = trimmed.split_once('@') else {
        return Err(AuthError::Validation("email address is not valid"));
    };
    if local.is_empty() || host.is_empty() || !host.contains('.') {
        return Err(AuthError::Validation("email address is not valid"));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let trimmed = username.trim();
    if trimmed.len() < 3 || trimmed.len() > MAX_USERNAME_LEN {
        return Err(AuthError::Validation(
            "username must be between 3 and 30 characters",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::Validation(
            "username may only contain letters, digits, `_`, and `-`",
        ));
    }
    Ok(())
}

fn map_unique_violation(err: RepoError) -> AuthError {
    match err {
        RepoError::Duplicate { ref constraint } if constraint.contains("email") => {
            AuthError::EmailTaken
        }
        RepoError::Duplicate { ref constraint } if constraint.contains("username") => {
            AuthError::UsernameTaken
        }
        other => AuthError::Repo(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            issuer: "calamus".to_string(),
            audience: "calamus-web".to_string(),
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            ttl_seconds: 3600,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("reader@nodot").is_err());
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("ink-and_quill").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has spaces").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn duplicate_constraints_map_to_specific_errors() {
        let email = map_unique_violation(RepoError::Duplicate {
            constraint: "users_email_key".to_string(),
        });
        assert!(matches!(email, AuthError::EmailTaken));

        let username = map_unique_violation(RepoError::Duplicate {
            constraint: "users_username_key".to_string(),
        });
        assert!(matches!(username, AuthError::UsernameTaken));
    }

    mod token {
        use super::*;
        use crate::application::repos::{
            CreateUserParams, ProfileCounts, UpdateProfileParams, UsersRepo,
        };
        use crate::domain::entities::UserRecord;
        use async_trait::async_trait;

        struct NoUsers;

        #[async_trait]
        impl UsersRepo for NoUsers {
            async fn create_user(&self, _: CreateUserParams) -> Result<UserRecord, RepoError> {
                Err(RepoError::NotFound)
            }
            async fn find_by_id(&self, _: Uuid) -> Result<Option<UserRecord>, RepoError> {
                Ok(None)
            }
            async fn find_by_email(&self, _: &str) -> Result<Option<UserRecord>, RepoError> {
                Ok(None)
            }
            async fn find_by_username(&self, _: &str) -> Result<Option<UserRecord>, RepoError> {
                Ok(None)
            }
            async fn update_profile(&self, _: UpdateProfileParams) -> Result<UserRecord, RepoError> {
                Err(RepoError::NotFound)
            }
            async fn profile_counts(&self, _: Uuid) -> Result<ProfileCounts, RepoError> {
                Ok(ProfileCounts {
                    posts: 0,
                    followers: 0,
                    following: 0,
                })
            }
        }

        #[test]
        fn token_round_trip_restores_principal() {
            let service = AuthService::new(std::sync::Arc::new(NoUsers), jwt_config());
            let user_id = Uuid::new_v4();
            let token = service.issue_token(user_id).expect("token");
            let principal = service.verify_token(&token).expect("principal");
            assert_eq!(principal.user_id, user_id);
        }

        #[test]
        fn token_from_other_audience_is_rejected() {
            let issuing = AuthService::new(std::sync::Arc::new(NoUsers), jwt_config());
            let mut other_config = jwt_config();
            other_config.audience = "someone-else".to_string();
            let verifying = AuthService::new(std::sync::Arc::new(NoUsers), other_config);

            let token = issuing.issue_token(Uuid::new_v4()).expect("token");
            assert!(verifying.verify_token(&token).is_err());
        }

        #[test]
        fn tampered_token_is_rejected() {
            let service = AuthService::new(std::sync::Arc::new(NoUsers), jwt_config());
            let mut token = service.issue_token(Uuid::new_v4()).expect("token");
            token.push('x');
            assert!(service.verify_token(&token).is_err());
        }
    }
}
