use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::AssistantConfig;
use crate::auth::TokenResponse;

const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),
}

/// Status and decoded body of one API call
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body into a response type
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// The `message` of an error body, else the raw body text
    pub fn error_message(&self) -> String {
        match &self.body {
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string(),
            Value::String(text) if !text.is_empty() => text.clone(),
            _ => "Unknown error".to_string(),
        }
    }
}

/// HTTP client for the ledger API.
///
/// Logs in lazily with the configured account and keeps the access token
/// for later calls. A 401 from any endpoint drops the cached token so the
/// next call logs in again.
pub struct LedgerClient {
    http: Client,
    base_url: Url,
    email: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl LedgerClient {
    pub fn new(cfg: &AssistantConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(cfg.request_timeout()).build()?;
        Self::with_http(http, &cfg.api_base_url, &cfg.api_email, &cfg.api_password)
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url,
            email: email.to_string(),
            password: password.to_string(),
            token: RwLock::new(None),
        })
    }

    /// `{base}/api/v1/{segments...}` with every segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn clear_token(&self) {
        if self.token.write().await.take().is_some() {
            debug!("cached access token discarded");
        }
    }

    async fn token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another task may have logged in while we waited for the lock
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn login(&self) -> Result<String, ClientError> {
        let url = self.endpoint(&["auth", "token"])?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("username", self.email.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("login to ledger API rejected");
            return Err(ClientError::Auth(body));
        }

        let token: TokenResponse = response.json().await?;
        info!(email = %self.email, "logged in to ledger API");
        Ok(token.access_token)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<ApiReply, ClientError> {
        self.send(Method::GET, segments, query, None::<&()>).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<ApiReply, ClientError> {
        self.send(Method::POST, segments, &[], Some(body)).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<ApiReply, ClientError> {
        self.send(Method::PATCH, segments, &[], Some(body)).await
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<ApiReply, ClientError> {
        self.send(Method::DELETE, segments, &[], None::<&()>).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(segments)?;
        let token = self.token().await?;

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, path = %segments.join("/"), %status, "ledger API call");

        if status == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
        }

        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> LedgerClient {
        LedgerClient::with_http(Client::new(), base, "owner@farm.test", "pw").unwrap()
    }

    #[test]
    fn endpoint_encodes_segments_under_api_prefix() {
        let client = client("http://localhost:8080");
        let url = client
            .endpoint(&["suppliers", "by-name", "Green Valley"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/suppliers/by-name/Green%20Valley"
        );

        let nested = self::client("http://proxy.local/ledger/");
        assert_eq!(
            nested.endpoint(&["entries"]).unwrap().as_str(),
            "http://proxy.local/ledger/api/v1/entries"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(LedgerClient::with_http(Client::new(), "not a url", "", "").is_err());
        assert!(LedgerClient::with_http(Client::new(), "mailto:a@b.c", "", "").is_err());
    }

    #[test]
    fn error_message_prefers_message_field() {
        let reply = ApiReply {
            status: StatusCode::BAD_REQUEST,
            body: json!({"error": "Conflict", "message": "Supplier name already exists"}),
        };
        assert_eq!(reply.error_message(), "Supplier name already exists");

        let empty = ApiReply {
            status: StatusCode::BAD_GATEWAY,
            body: Value::Null,
        };
        assert_eq!(empty.error_message(), "Unknown error");
    }
}
