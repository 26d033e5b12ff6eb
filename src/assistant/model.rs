//! Chat-completions models with function calling.
//!
//! Both supported providers speak the OpenAI `chat/completions` dialect, so a
//! single [`OpenAiCompatModel`] serves either one, whole or as a
//! server-sent event stream. [`FallbackModel`] moves traffic from the primary
//! to the secondary provider once the primary reports an exhausted quota, and
//! never moves it back.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::AssistantConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Result of one tool call, answered back to the model
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDeclaration,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: function_kind(),
            function: FunctionDeclaration {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl ModelError {
    /// True when the provider is out of quota or throttling us
    pub fn is_quota_error(&self) -> bool {
        match self {
            ModelError::RateLimited(_) => true,
            ModelError::Status { status, message } => {
                matches!(*status, 429 | 503) || mentions_quota(message)
            }
            ModelError::Transport(_) | ModelError::Decode(_) => false,
        }
    }
}

fn mentions_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("quota") || lower.contains("rate")
}

/// A chat model that can request tool calls
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError>;

    /// Same as [`ChatModel::complete`], but text is also sent to `deltas` as
    /// it is produced. The response still carries the whole message.
    ///
    /// Models without a streaming transport send the answer as one delta.
    async fn stream(
        &self,
        request: &ChatRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<ChatResponse, ModelError> {
        let response = self.complete(request).await?;
        if let Some(text) = response.message.content.as_deref().filter(|t| !t.is_empty()) {
            let _ = deltas.send(text.to_string()).await;
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Splits a `text/event-stream` body into the `data` payloads of its events
#[derive(Debug, Default)]
struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete event carrying data; comment-only events are skipped
    fn next_data(&mut self) -> Option<String> {
        while let Some((end, separator)) = event_boundary(&self.pending) {
            let event: Vec<u8> = self.pending.drain(..end + separator).collect();
            if let Some(data) = event_data(&event[..end]) {
                return Some(data);
            }
        }
        None
    }

    /// Data of a trailing event the server did not terminate
    fn finish(self) -> Option<String> {
        event_data(&self.pending)
    }
}

fn event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|i| (i, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn event_data(event: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(event);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Rebuilds the assistant message from streamed deltas
#[derive(Debug, Default)]
struct StreamAccumulator {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl StreamAccumulator {
    /// Folds one chunk in and returns the text it added, if any
    fn apply(&mut self, chunk: StreamChunk) -> Option<String> {
        let mut text = String::new();
        for delta in chunk.choices.into_iter().filter_map(|c| c.delta) {
            if let Some(content) = delta.content {
                text.push_str(&content);
            }
            for call in delta.tool_calls.unwrap_or_default() {
                self.merge_tool_call(call);
            }
        }
        if text.is_empty() {
            return None;
        }
        self.content.push_str(&text);
        Some(text)
    }

    /// Argument fragments are appended to the call at the same index.
    /// Providers that omit the index send one complete call per delta.
    fn merge_tool_call(&mut self, delta: ToolCallDelta) {
        let next = self.tool_calls.len();
        let slot = match delta.index {
            Some(index) => index.min(next),
            None if delta.id.is_some() || next == 0 => next,
            None => next - 1,
        };
        if slot == next {
            self.tool_calls.push(ToolCall {
                id: String::new(),
                kind: function_kind(),
                function: FunctionCall {
                    name: String::new(),
                    arguments: String::new(),
                },
            });
        }

        let call = &mut self.tool_calls[slot];
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            call.id = id;
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                call.function.name = name;
            }
            if let Some(arguments) = function.arguments {
                call.function.arguments.push_str(&arguments);
            }
        }
    }

    fn finish(self) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls: (!self.tool_calls.is_empty()).then_some(self.tool_calls),
            tool_call_id: None,
        }
    }
}

/// Any provider exposing an OpenAI-compatible `chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    provider: String,
    model: String,
    endpoint: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatModel {
    pub fn new(
        provider: &str,
        base_url: &str,
        model: &str,
        api_key: &str,
        client: Client,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            client,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl OpenAiCompatModel {
    /// Posts the conversation and turns non-2xx replies into errors
    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<Response, ModelError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            tools: &request.tools,
            stream,
        };

        debug!(
            provider = %self.provider,
            model = %self.model,
            messages = request.messages.len(),
            stream,
            "sending chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(provider = %self.provider, %status, "chat completion failed");
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ModelError::RateLimited(message));
            }
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

/// Folds one event payload into `acc`, forwarding text while anyone listens.
/// Returns `true` on the `[DONE]` sentinel.
async fn apply_event(
    data: &str,
    acc: &mut StreamAccumulator,
    deltas: &mpsc::Sender<String>,
) -> Result<bool, ModelError> {
    if data.trim() == "[DONE]" {
        return Ok(true);
    }
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(text) = acc.apply(chunk) {
        if deltas.send(text).await.is_err() {
            debug!("delta receiver dropped, still collecting the reply");
        }
    }
    Ok(false)
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let response = self.send(request, false).await?;

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Decode("response contained no choices".to_string()))?;

        Ok(ChatResponse {
            message: choice.message,
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<ChatResponse, ModelError> {
        let response = self.send(request, true).await?;

        let mut body = response.bytes_stream();
        let mut events = SseBuffer::default();
        let mut acc = StreamAccumulator::default();
        let mut done = false;

        'read: while let Some(bytes) = body.next().await {
            events.push(&bytes?);
            while let Some(data) = events.next_data() {
                if apply_event(&data, &mut acc, &deltas).await? {
                    done = true;
                    break 'read;
                }
            }
        }
        if !done {
            if let Some(data) = events.finish() {
                apply_event(&data, &mut acc, &deltas).await?;
            }
        }

        debug!(provider = %self.provider, "chat completion stream finished");
        Ok(ChatResponse {
            message: acc.finish(),
        })
    }
}

/// Primary model with a one-way switch to a fallback on quota errors
pub struct FallbackModel {
    primary: Arc<dyn ChatModel>,
    fallback: Arc<dyn ChatModel>,
    use_fallback: AtomicBool,
}

impl FallbackModel {
    pub fn new(primary: Arc<dyn ChatModel>, fallback: Arc<dyn ChatModel>) -> Self {
        Self {
            primary,
            fallback,
            use_fallback: AtomicBool::new(false),
        }
    }

    pub fn is_using_fallback(&self) -> bool {
        self.use_fallback.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ChatModel for FallbackModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        if self.is_using_fallback() {
            debug!("using fallback model");
            return self.fallback.complete(request).await;
        }

        match self.primary.complete(request).await {
            Err(e) if e.is_quota_error() => {
                warn!(error = %e, "primary model exhausted, switching to fallback");
                self.use_fallback.store(true, Ordering::Release);
                self.fallback.complete(request).await
            }
            other => other,
        }
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<ChatResponse, ModelError> {
        if self.is_using_fallback() {
            debug!("streaming from fallback model");
            return self.fallback.stream(request, deltas).await;
        }

        match self.primary.stream(request, deltas.clone()).await {
            Err(e) if e.is_quota_error() => {
                warn!(error = %e, "primary model exhausted while streaming, switching to fallback");
                self.use_fallback.store(true, Ordering::Release);
                self.fallback.stream(request, deltas).await
            }
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelSetupError {
    #[error("No API keys configured. Set GEMINI_API_KEY or DEEPSEEK_API_KEY.")]
    NoApiKeys,
    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Picks the model from whichever provider keys are configured.
///
/// With both keys Gemini is primary and DeepSeek the fallback.
pub fn select_model(cfg: &AssistantConfig) -> Result<Arc<dyn ChatModel>, ModelSetupError> {
    let client = Client::builder().timeout(cfg.request_timeout()).build()?;

    let gemini = cfg.gemini_key().map(|key| {
        OpenAiCompatModel::new("gemini", &cfg.gemini_base_url, &cfg.gemini_model, key, client.clone())
    });
    let deepseek = cfg.deepseek_key().map(|key| {
        OpenAiCompatModel::new(
            "deepseek",
            &cfg.deepseek_base_url,
            &cfg.deepseek_model,
            key,
            client.clone(),
        )
    });

    match (gemini, deepseek) {
        (Some(primary), Some(fallback)) => {
            info!("using gemini with deepseek fallback");
            Ok(Arc::new(FallbackModel::new(
                Arc::new(primary),
                Arc::new(fallback),
            )))
        }
        (Some(model), None) | (None, Some(model)) => {
            info!(provider = model.provider(), "using single model provider");
            Ok(Arc::new(model))
        }
        (None, None) => Err(ModelSetupError::NoApiKeys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Model {}
        #[async_trait]
        impl ChatModel for Model {
            async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError>;
            async fn stream(
                &self,
                request: &ChatRequest,
                deltas: mpsc::Sender<String>,
            ) -> Result<ChatResponse, ModelError>;
        }
    }

    fn answer(text: &str) -> Result<ChatResponse, ModelError> {
        Ok(ChatResponse {
            message: ChatMessage::assistant(text),
        })
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("hello")],
            tools: Vec::new(),
        }
    }

    #[test]
    fn quota_detection_rules() {
        assert!(ModelError::RateLimited(String::new()).is_quota_error());
        for status in [429u16, 503] {
            let err = ModelError::Status {
                status,
                message: String::new(),
            };
            assert!(err.is_quota_error());
        }
        let quota = ModelError::Status {
            status: 400,
            message: "Quota exceeded for project".into(),
        };
        assert!(quota.is_quota_error());
        let rate = ModelError::Status {
            status: 403,
            message: "RATE limit reached".into(),
        };
        assert!(rate.is_quota_error());
        let other = ModelError::Status {
            status: 500,
            message: "internal failure".into(),
        };
        assert!(!other.is_quota_error());
        assert!(!ModelError::Decode("bad json".into()).is_quota_error());
    }

    #[tokio::test]
    async fn quota_error_switches_to_fallback_for_good() {
        let mut primary = MockModel::new();
        primary
            .expect_complete()
            .times(1)
            .returning(|_| Err(ModelError::RateLimited("quota".into())));
        let mut fallback = MockModel::new();
        fallback
            .expect_complete()
            .times(2)
            .returning(|_| answer("from fallback"));

        let model = FallbackModel::new(Arc::new(primary), Arc::new(fallback));

        let first = model.complete(&request()).await.unwrap();
        assert_eq!(first.message.content.as_deref(), Some("from fallback"));
        assert!(model.is_using_fallback());

        // The primary is not consulted again
        let second = model.complete(&request()).await.unwrap();
        assert_eq!(second.message.content.as_deref(), Some("from fallback"));
    }

    #[tokio::test]
    async fn other_errors_propagate_without_switching() {
        let mut primary = MockModel::new();
        primary.expect_complete().times(1).returning(|_| {
            Err(ModelError::Status {
                status: 500,
                message: "boom".into(),
            })
        });
        let mut fallback = MockModel::new();
        fallback.expect_complete().never();

        let model = FallbackModel::new(Arc::new(primary), Arc::new(fallback));
        let err = model.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 500, .. }));
        assert!(!model.is_using_fallback());
    }

    #[tokio::test]
    async fn primary_answers_while_healthy() {
        let mut primary = MockModel::new();
        primary
            .expect_complete()
            .times(1)
            .returning(|_| answer("from primary"));
        let mut fallback = MockModel::new();
        fallback.expect_complete().never();

        let model = FallbackModel::new(Arc::new(primary), Arc::new(fallback));
        let reply = model.complete(&request()).await.unwrap();
        assert_eq!(reply.message.content.as_deref(), Some("from primary"));
    }

    #[tokio::test]
    async fn streaming_quota_error_switches_to_fallback() {
        let mut primary = MockModel::new();
        primary
            .expect_stream()
            .times(1)
            .returning(|_, _| Err(ModelError::RateLimited("quota".into())));
        primary.expect_complete().never();
        let mut fallback = MockModel::new();
        fallback.expect_stream().times(2).returning(|_, deltas| {
            let _ = deltas.try_send("from ".to_string());
            let _ = deltas.try_send("fallback".to_string());
            answer("from fallback")
        });

        let model = FallbackModel::new(Arc::new(primary), Arc::new(fallback));

        let (tx, mut rx) = mpsc::channel(8);
        let reply = model.stream(&request(), tx).await.unwrap();
        assert_eq!(reply.message.content.as_deref(), Some("from fallback"));
        assert!(model.is_using_fallback());
        assert_eq!(rx.recv().await.as_deref(), Some("from "));
        assert_eq!(rx.recv().await.as_deref(), Some("fallback"));
        assert_eq!(rx.recv().await, None);

        let (tx, _rx) = mpsc::channel(8);
        model.stream(&request(), tx).await.unwrap();
    }

    #[tokio::test]
    async fn streaming_failures_other_than_quota_propagate() {
        let mut primary = MockModel::new();
        primary
            .expect_stream()
            .times(1)
            .returning(|_, _| Err(ModelError::Decode("garbled".into())));
        let mut fallback = MockModel::new();
        fallback.expect_stream().never();

        let model = FallbackModel::new(Arc::new(primary), Arc::new(fallback));
        let (tx, _rx) = mpsc::channel(8);
        let err = model.stream(&request(), tx).await.unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
        assert!(!model.is_using_fallback());
    }

    struct WholeAnswer;

    #[async_trait]
    impl ChatModel for WholeAnswer {
        async fn complete(&self, _: &ChatRequest) -> Result<ChatResponse, ModelError> {
            answer("all at once")
        }
    }

    #[tokio::test]
    async fn non_streaming_models_send_one_delta() {
        let (tx, mut rx) = mpsc::channel(4);
        let reply = WholeAnswer.stream(&request(), tx).await.unwrap();
        assert_eq!(reply.message.content.as_deref(), Some("all at once"));
        assert_eq!(rx.recv().await.as_deref(), Some("all at once"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn sse_events_survive_arbitrary_chunking() {
        let body = ": keep-alive\n\ndata: {\"a\":1}\n\ndata: first\ndata: second\r\n\r\ndata: [DONE]\n\n";
        let mut buffer = SseBuffer::default();
        let mut events = Vec::new();
        for piece in body.as_bytes().chunks(3) {
            buffer.push(piece);
            while let Some(data) = buffer.next_data() {
                events.push(data);
            }
        }
        assert_eq!(events, ["{\"a\":1}", "first\nsecond", "[DONE]"]);
        assert_eq!(buffer.finish(), None);

        let mut unterminated = SseBuffer::default();
        unterminated.push(b"data: tail");
        assert_eq!(unterminated.next_data(), None);
        assert_eq!(unterminated.finish().as_deref(), Some("tail"));
    }

    fn chunk(value: Value) -> StreamChunk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accumulator_joins_text_and_tool_call_fragments() {
        let mut acc = StreamAccumulator::default();
        assert_eq!(
            acc.apply(chunk(json!({"choices": [{"delta": {"role": "assistant", "content": "Let me "}}]}))),
            Some("Let me ".to_string())
        );
        assert_eq!(
            acc.apply(chunk(json!({"choices": [{"delta": {"content": "check."}}]}))),
            Some("check.".to_string())
        );
        acc.apply(chunk(json!({"choices": [{"delta": {"tool_calls": [{
            "index": 0, "id": "call_1", "type": "function",
            "function": {"name": "get_monthly_report", "arguments": ""}
        }]}}]})));
        acc.apply(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "{\"year\": 2025, "}}
        ]}}]})));
        acc.apply(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"month\": 1}"}}
        ]}}]})));
        // Providers that skip the index send whole calls
        acc.apply(chunk(json!({"choices": [{"delta": {"tool_calls": [
            {"id": "call_2", "function": {"name": "list_suppliers", "arguments": "{}"}}
        ]}}]})));
        assert_eq!(acc.apply(chunk(json!({"choices": [{"delta": null, "finish_reason": "tool_calls"}]}))), None);

        let message = acc.finish();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content.as_deref(), Some("Let me check."));
        let calls = message.requested_tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "get_monthly_report");
        assert_eq!(calls[0].function.arguments, r#"{"year": 2025, "month": 1}"#);
        assert_eq!(calls[1].id, "call_2");
        assert_eq!(calls[1].kind, "function");
    }

    #[test]
    fn empty_stream_gives_an_empty_message() {
        let message = StreamAccumulator::default().finish();
        assert_eq!(message.content, None);
        assert!(message.requested_tool_calls().is_empty());
    }

    #[test]
    fn stream_flag_is_only_sent_when_streaming() {
        let messages = [ChatMessage::user("hi")];
        let body = |stream| {
            serde_json::to_value(CompletionBody {
                model: "m",
                messages: &messages,
                tools: &[],
                stream,
            })
            .unwrap()
        };
        assert_eq!(body(true)["stream"], true);
        assert!(body(false).get("stream").is_none());
        assert!(body(true).get("tools").is_none());
    }

    #[test]
    fn select_model_requires_a_key() {
        let cfg = AssistantConfig::from_builder(config::Config::builder()).unwrap();
        let err = select_model(&cfg).err().unwrap();
        assert_eq!(
            err.to_string(),
            "No API keys configured. Set GEMINI_API_KEY or DEEPSEEK_API_KEY."
        );
    }

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        let model = OpenAiCompatModel::new(
            "gemini",
            "https://generativelanguage.googleapis.com/v1beta/openai/",
            "gemini-2.5-flash",
            "k",
            Client::new(),
        );
        assert_eq!(
            model.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn assistant_tool_calls_deserialize() {
        let message: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "list_suppliers", "arguments": "{}"}
            }]
        }))
        .unwrap();
        assert_eq!(message.requested_tool_calls().len(), 1);
        assert_eq!(message.requested_tool_calls()[0].function.name, "list_suppliers");
    }
}
