/*!
 * # Authentication Module
 *
 * Bearer-token authentication for the ledger API:
 *
 * - HS256 JWT access tokens whose subject is the account email
 * - Argon2id password hashing (see [`password`])
 * - `auth_middleware` / [`AuthRouterExt::with_auth`] to guard routers
 * - [`CurrentUser`] extractor for handlers behind the guard
 *
 * Every token failure is reported to the client the same way, so callers
 * cannot tell an expired token from a forged one or from a deleted account.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod password;
pub mod user;

/// Message for every rejected bearer token
pub const CREDENTIALS_REJECTED: &str = "Could not validate credentials";

/// Message for a failed password login
pub const LOGIN_REJECTED: &str = "Incorrect email or password";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account email)
    pub sub: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(cfg.jwt_secret.clone(), cfg.token_ttl())
    }
}

/// Account resolved from a valid bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Access token issued by `POST /auth/token`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token subject no longer exists")]
    UnknownSubject,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::UnknownSubject => ServiceError::JwtError(err.to_string()),
            AuthError::InvalidCredentials => ServiceError::Unauthorized(LOGIN_REJECTED.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            AuthError::DatabaseError(e) => ServiceError::DatabaseError(e),
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Issue an access token for the given account email
    pub fn generate_token(&self, email: &str) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Check an email/password pair and return the matching account
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, AuthError> {
        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        // Unknown emails and wrong passwords are indistinguishable to the caller
        let Some(account) = account else {
            warn!("login attempt for unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password_blocking(
            password.to_string(),
            account.hashed_password.clone(),
        )
        .await
        {
            warn!(user_id = account.id, "login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Resolve the account named by a bearer token
    pub async fn current_user(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        user::Entity::find()
            .filter(user::Column::Email.eq(claims.sub.as_str()))
            .one(&*self.db)
            .await?
            .map(CurrentUser::from)
            .ok_or(AuthError::UnknownSubject)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token.trim())
}

/// Authentication middleware that validates the bearer token and stores
/// the resolved [`CurrentUser`] in request extensions
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            error!("auth middleware reached without an AuthService extension");
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let resolved = match bearer_token(request.headers()) {
        Ok(token) => auth_service.current_user(token).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(reason = %e, "rejected bearer token");
            e.into_response()
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "k3Jd9q-Zp2LwX8vR4tYb6NmC1sFh7GuA0eQiOoWlTzVxSyPnMcKrEjDbHgUaIf5_";

    fn service(secret: &str) -> AuthService {
        AuthService::new(
            AuthConfig::new(secret.to_string(), Duration::from_secs(1800)),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_round_trips_subject() {
        let svc = service(SECRET);
        let token = svc.generate_token("farmer@example.com").unwrap();
        assert_eq!(token.token_type, "bearer");

        let claims = svc.validate_token(&token.access_token).unwrap();
        assert_eq!(claims.sub, "farmer@example.com");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(
            &Claims {
                sub: "farmer@example.com".into(),
                iat: now - 7200,
                exp: now - 3600,
            },
            SECRET,
        );
        assert_matches!(service(SECRET).validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = service(&SECRET.replace('k', "K"))
            .generate_token("farmer@example.com")
            .unwrap();
        assert_matches!(
            service(SECRET).validate_token(&token.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert_matches!(
            service(SECRET).validate_token("not.a.jwt"),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_matches!(bearer_token(&headers), Err(AuthError::MissingAuth));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_matches!(bearer_token(&headers), Err(AuthError::InvalidToken));

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_matches!(bearer_token(&headers), Err(AuthError::InvalidToken));

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn every_token_failure_maps_to_the_same_message() {
        for err in [
            AuthError::MissingAuth,
            AuthError::InvalidToken,
            AuthError::TokenExpired,
            AuthError::UnknownSubject,
        ] {
            let service_error = ServiceError::from(err);
            assert_eq!(service_error.response_message(), CREDENTIALS_REJECTED);
            assert_eq!(service_error.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }
}
