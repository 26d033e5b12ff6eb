use super::common::{created_response, success_response, validate_input, AppJson};
use crate::{
    auth::{AuthRouterExt, CurrentUser, TokenResponse},
    errors::{ApiError, ServiceError},
    handlers::AppState,
    services::users::RegisterUser,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

/// OAuth2 password-grant style credentials.
///
/// Accepted as `application/x-www-form-urlencoded` or as JSON.
#[derive(Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Account email
    pub username: String,
    pub password: String,
}

#[async_trait]
impl<S> FromRequest<S> for TokenRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(body) = Json::<TokenRequest>::from_request(req, state).await?;
            Ok(body)
        } else {
            let Form(body) = Form::<TokenRequest>::from_request(req, state).await?;
            Ok(body)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    summary = "Register account",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = CurrentUser),
        (status = 400, description = "Email already registered", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterUser>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let user = state.services.users.register(payload).await?;
    Ok(created_response(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    summary = "Obtain access token",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "JSON with the same fields is accepted too"
    ),
    responses(
        (status = 200, description = "Bearer token issued", body = TokenResponse),
        (status = 401, description = "Incorrect email or password", body = crate::errors::ErrorResponse),
        (status = 422, description = "Malformed body", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn issue_token(
    State(state): State<AppState>,
    credentials: TokenRequest,
) -> Result<Response, ApiError> {
    let account = state
        .auth
        .authenticate(&credentials.username, &credentials.password)
        .await
        .map_err(ServiceError::from)?;

    let token = state
        .auth
        .generate_token(&account.email)
        .map_err(ServiceError::from)?;

    info!(user_id = account.id, "access token issued");
    Ok(success_response(token))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    summary = "Current account",
    responses(
        (status = 200, description = "Account behind the bearer token", body = CurrentUser),
        (status = 401, description = "Could not validate credentials", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me(user: CurrentUser) -> Response {
    success_response(user)
}

/// Register and token endpoints stay public; everything else is guarded
pub fn auth_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(issue_token));

    let guarded = Router::new().route("/auth/me", get(me)).with_auth();

    public.merge(guarded)
}
