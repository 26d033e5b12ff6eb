//! Milk Ledger Library
//!
//! Suppliers, daily milk entries, monthly payment reports and account
//! management behind a bearer-token HTTP API, plus the conversational
//! assistant that drives the same API through tool calls.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod assistant;
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires services and the auth service around one connection pool
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// All `/api/v1` resources. Only registration and token issuance are public.
pub fn api_v1_routes() -> Router<AppState> {
    let protected = Router::new()
        .merge(handlers::suppliers::supplier_routes())
        .merge(handlers::entries::entry_routes())
        .merge(handlers::reports::report_routes())
        .merge(handlers::todos::todo_routes())
        .with_auth();

    Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(protected)
}

/// Builds the CORS layer from configuration.
///
/// Explicit origins win; otherwise permissive CORS is used only when opted
/// in or in development.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(middleware_helpers::REQUEST_ID_HEADER),
            ])
            .allow_credentials(cfg.cors_allow_credentials);
    }

    if cfg.should_allow_permissive_cors() || cfg.is_development() {
        ::tracing::info!("Using permissive CORS because explicit origins were not configured");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// The complete HTTP application: API, health, docs and middleware stack
pub fn build_app(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let body_limit = state.config.max_body_size;
    let cors = cors_layer(&state.config);

    Router::<AppState>::new()
        .route("/", get(|| async { "milk-ledger up" }))
        .merge(health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers_middleware,
        ))
        // Auth middleware looks the service up in request extensions
        .layer(Extension(auth_service))
        // Outermost so every span and error body can see the request id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
