#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use milk_ledger::{config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "k3Jd9q-Zp2LwX8vR4tYb6NmC1sFh7GuA0eQiOoWlTzVxSyPnMcKrEjDbHgUaIf5_";
pub const TEST_EMAIL: &str = "owner@dairy.test";
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Application wired exactly like the server binary, on a throwaway SQLite file
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _dir: TempDir,
}

impl TestApp {
    /// Fresh database, migrated, with one registered and logged-in account
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("ledger.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            1800,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = milk_ledger::build_app(state.clone());

        let mut app = Self {
            router,
            state,
            token: String::new(),
            _dir: dir,
        };
        app.token = app.register_and_login(TEST_EMAIL, TEST_PASSWORD).await;
        app
    }

    /// Bearer token of the default account
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Sends a fully built request
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn post_form(&self, uri: &str, pairs: &[(&str, &str)]) -> Response {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("failed to build request");
        self.send(request).await
    }

    /// Registers an account and returns a fresh bearer token for it
    pub async fn register_and_login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({"email": email, "password": password})),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "register {}", email);

        self.login(email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/api/v1/auth/token",
                &[("username", email), ("password", password)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login {}", email);
        let body = response_json(response).await;
        body["access_token"]
            .as_str()
            .expect("access_token in token response")
            .to_string()
    }

    pub async fn create_supplier(&self, name: &str, milk_type: &str, rate: f64) -> Value {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/suppliers",
                Some(json!({"name": name, "milk_type": milk_type, "rate_per_liter": rate})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "create supplier {}", name);
        response_json(response).await
    }

    pub async fn create_entry(&self, date: &str, supplier_id: i64, liters: f64) -> Value {
        let response = self
            .request_authenticated(
                Method::POST,
                "/api/v1/entries",
                Some(json!({"date": date, "supplier_id": supplier_id, "liters": liters})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "create entry on {}", date);
        response_json(response).await
    }

    /// Serves the app on an ephemeral local port and returns its base URL
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .expect("test server");
        });
        format!("http://{}", addr)
    }
}

/// Reads the whole body as JSON; an empty body reads as `null`
pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

fn form_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}
