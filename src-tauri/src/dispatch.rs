//! One request/response cycle against an OpenAI-style chat-completion API.
//!
//! Provider differences (endpoint, model, extra headers) live entirely in the
//! [`ProviderTable`]; the code here never branches on the provider. Every
//! outcome, including transport faults, is folded into a [`DispatchResult`].

use std::error::Error as StdError;
use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config;
use crate::providers::adapter::{self, ChatRequest};
use crate::providers::{ProviderId, ProviderTable};

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("Failed to build HTTP client: {0}")]
  Client(String),
  #[error("{0}")]
  Transport(String),
  #[error("Failed to parse API response as JSON: {0}")]
  Parse(String),
  #[error("{0}")]
  Upstream(String),
  #[error("Invalid response format from API")]
  InvalidFormat,
  #[error("Message must not be empty")]
  EmptyMessage,
  #[error("Please enter your API key first!")]
  MissingCredential,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchResult {
  Success { text: String },
  Failure { reason: String },
}

impl From<Result<String, DispatchError>> for DispatchResult {
  fn from(result: Result<String, DispatchError>) -> Self {
    match result {
      Ok(text) => DispatchResult::Success { text },
      Err(err) => DispatchResult::Failure {
        reason: err.to_string(),
      },
    }
  }
}

#[derive(Clone, PartialEq)]
pub struct DispatchRequest {
  message: String,
  credential: String,
  provider: ProviderId,
}

impl DispatchRequest {
  /// `message` is forwarded verbatim; whitespace only matters for the
  /// emptiness check.
  pub fn new(message: &str, credential: &str, provider: ProviderId) -> Result<Self, DispatchError> {
    if message.trim().is_empty() {
      return Err(DispatchError::EmptyMessage);
    }
    let credential = credential.trim();
    if credential.is_empty() {
      return Err(DispatchError::MissingCredential);
    }
    Ok(Self {
      message: message.to_string(),
      credential: credential.to_string(),
      provider,
    })
  }
}

impl fmt::Debug for DispatchRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DispatchRequest")
      .field("message_len", &self.message.len())
      .field("credential", &"<redacted>")
      .field("provider", &self.provider)
      .finish()
  }
}

#[derive(Clone)]
pub struct Dispatcher {
  client: Client,
  providers: ProviderTable,
}

impl Dispatcher {
  /// Dispatcher over the built-in providers plus environment overrides.
  pub fn new() -> Result<Self, DispatchError> {
    Self::with_providers(config::provider_table())
  }

  pub fn with_providers(providers: ProviderTable) -> Result<Self, DispatchError> {
    let client = Client::builder()
      .build()
      .map_err(|e| DispatchError::Client(e.to_string()))?;
    Ok(Self { client, providers })
  }

  /// Sends `request` once and normalizes whatever comes back.
  pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult {
    let result = self.execute(request).await;
    if let Err(err) = &result {
      log::error!("dispatch via {} failed: {}", request.provider.as_str(), err);
    }
    result.into()
  }

  async fn execute(&self, request: &DispatchRequest) -> Result<String, DispatchError> {
    let config = self.providers.get(request.provider);
    log::info!(
      "dispatching to {} (model {})",
      request.provider.as_str(),
      config.model_id
    );

    let body = adapter::build_request(&ChatRequest {
      model: &config.model_id,
      prompt: &request.message,
    });

    let mut builder = self
      .client
      .post(&config.endpoint_url)
      .bearer_auth(&request.credential)
      .json(&body);
    for (name, value) in &config.extra_headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    log::info!("{} responded with {}", request.provider.as_str(), status);
    let text = response.text().await.map_err(transport_error)?;

    normalize_response(status.is_success(), &text)
  }
}

/// Maps a raw upstream body to message text or a failure reason.
pub fn normalize_response(success: bool, body: &str) -> Result<String, DispatchError> {
  let data: Value = serde_json::from_str(body).map_err(|e| DispatchError::Parse(e.to_string()))?;
  if !success {
    return Err(DispatchError::Upstream(upstream_error_message(&data)));
  }
  extract_content(&data)
}

fn upstream_error_message(data: &Value) -> String {
  data
    .pointer("/error/message")
    .and_then(Value::as_str)
    .filter(|message| !message.is_empty())
    .map(|message| message.to_string())
    .unwrap_or_else(|| data.to_string())
}

fn extract_content(data: &Value) -> Result<String, DispatchError> {
  data
    .pointer("/choices/0/message")
    .filter(|message| message.is_object())
    .and_then(|message| message.get("content"))
    .and_then(Value::as_str)
    .map(|content| content.to_string())
    .ok_or(DispatchError::InvalidFormat)
}

// reqwest's top-level message omits the cause ("error sending request for url"),
// so the source chain is appended.
fn transport_error(err: reqwest::Error) -> DispatchError {
  let mut description = err.to_string();
  let mut source = StdError::source(&err);
  while let Some(cause) = source {
    description.push_str(": ");
    description.push_str(&cause.to_string());
    source = StdError::source(cause);
  }
  DispatchError::Transport(description)
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  use axum::extract::State;
  use axum::http::header::CONTENT_TYPE;
  use axum::http::{HeaderMap, StatusCode};
  use axum::response::IntoResponse;
  use axum::routing::post;
  use axum::Router;
  use serde_json::{json, Value};
  use tokio::net::TcpListener;

  use super::*;

  #[derive(Clone)]
  struct StubState {
    status: StatusCode,
    body: String,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<(HeaderMap, String)>>>,
  }

  struct Stub {
    url: String,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<(HeaderMap, String)>>>,
  }

  async fn stub_handler(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: String,
  ) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.captured.lock().unwrap().push((headers, body));
    (state.status, [(CONTENT_TYPE, "application/json")], state.body.clone())
  }

  async fn spawn_stub(status: StatusCode, body: &str) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = StubState {
      status,
      body: body.to_string(),
      hits: Arc::new(AtomicUsize::new(0)),
      captured: Arc::new(Mutex::new(Vec::new())),
    };
    let stub = Stub {
      url: format!("http://{}/v1/chat/completions", addr),
      hits: state.hits.clone(),
      captured: state.captured.clone(),
    };
    let app = Router::new()
      .route("/v1/chat/completions", post(stub_handler))
      .with_state(state);
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    stub
  }

  fn dispatcher_for(provider: ProviderId, url: &str) -> Dispatcher {
    Dispatcher::with_providers(ProviderTable::default().with_endpoint(provider, url)).unwrap()
  }

  fn request(message: &str, provider: ProviderId) -> DispatchRequest {
    DispatchRequest::new(message, "sk-test", provider).unwrap()
  }

  #[tokio::test]
  async fn success_body_yields_message_content() {
    let stub = spawn_stub(StatusCode::OK, r#"{"choices":[{"message":{"content":"hi"}}]}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    assert_eq!(result, DispatchResult::Success { text: "hi".into() });
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn unauthorized_status_uses_upstream_error_message() {
    let stub = spawn_stub(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"invalid key"}}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    assert_eq!(result, DispatchResult::Failure { reason: "invalid key".into() });
  }

  #[tokio::test]
  async fn error_status_without_message_serializes_body() {
    let stub = spawn_stub(StatusCode::TOO_MANY_REQUESTS, r#"{"detail":"slow down"}"#).await;
    let dispatcher = dispatcher_for(ProviderId::OpenRouter, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::OpenRouter)).await;

    assert_eq!(result, DispatchResult::Failure { reason: r#"{"detail":"slow down"}"#.into() });
  }

  #[tokio::test]
  async fn missing_choices_is_invalid_format() {
    let stub = spawn_stub(StatusCode::OK, r#"{"id":"cmpl-1","object":"chat.completion"}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    assert_eq!(
      result,
      DispatchResult::Failure { reason: "Invalid response format from API".into() }
    );
  }

  #[tokio::test]
  async fn unparseable_body_is_failure() {
    let stub = spawn_stub(StatusCode::OK, "<html>gateway</html>").await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    match result {
      DispatchResult::Failure { reason } => {
        assert!(reason.starts_with("Failed to parse API response as JSON"), "{reason}")
      }
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn unparseable_error_body_reports_parse_failure() {
    let stub = spawn_stub(StatusCode::BAD_GATEWAY, "<html><body>502 Bad Gateway</body></html>").await;
    let dispatcher = dispatcher_for(ProviderId::OpenRouter, &stub.url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::OpenRouter)).await;

    match result {
      DispatchResult::Failure { reason } => {
        assert!(reason.starts_with("Failed to parse API response as JSON"), "{reason}");
        assert!(!reason.contains("502 Bad Gateway"), "{reason}");
      }
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn refused_connection_is_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{}/v1/chat/completions", addr);
    let dispatcher = dispatcher_for(ProviderId::Groq, &url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    match result {
      DispatchResult::Failure { reason } => assert!(!reason.is_empty()),
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn dropped_connection_is_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
      while let Ok((socket, _)) = listener.accept().await {
        counter.fetch_add(1, Ordering::SeqCst);
        drop(socket);
      }
    });
    let url = format!("http://{}/v1/chat/completions", addr);
    let dispatcher = dispatcher_for(ProviderId::Groq, &url);

    let result = dispatcher.dispatch(&request("hello", ProviderId::Groq)).await;

    assert!(matches!(result, DispatchResult::Failure { .. }));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn outbound_request_carries_body_and_auth() {
    let stub = spawn_stub(StatusCode::OK, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);
    let message = "Explain\n  ownership in \"Rust\" \u{1F980}";

    dispatcher.dispatch(&request(message, ProviderId::Groq)).await;

    let captured = stub.captured.lock().unwrap();
    let (headers, body) = &captured[0];
    assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert!(headers.get("http-referer").is_none());
    assert!(headers.get("x-title").is_none());

    let body: Value = serde_json::from_str(body).unwrap();
    assert_eq!(
      body,
      json!({
        "model": "llama-3.3-70b-versatile",
        "messages": [{ "role": "user", "content": message }],
        "temperature": 0.7,
        "max_tokens": 1024
      })
    );
  }

  #[tokio::test]
  async fn surrounding_whitespace_reaches_upstream_unchanged() {
    let stub = spawn_stub(StatusCode::OK, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);
    let message = "    fn main() {}\n";

    dispatcher.dispatch(&request(message, ProviderId::Groq)).await;

    let captured = stub.captured.lock().unwrap();
    let body: Value = serde_json::from_str(&captured[0].1).unwrap();
    assert_eq!(body["messages"][0]["content"], message);
  }

  #[tokio::test]
  async fn openrouter_merges_extra_headers() {
    let stub = spawn_stub(StatusCode::OK, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;
    let dispatcher = dispatcher_for(ProviderId::OpenRouter, &stub.url);

    dispatcher.dispatch(&request("hello", ProviderId::OpenRouter)).await;

    let captured = stub.captured.lock().unwrap();
    let (headers, body) = &captured[0];
    assert_eq!(headers.get("http-referer").unwrap(), "http://localhost");
    assert_eq!(headers.get("x-title").unwrap(), "AI Chat");
    assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
    let body: Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["model"], "google/gemini-2.0-flash-exp:free");
  }

  #[tokio::test]
  async fn identical_inputs_give_identical_results() {
    let stub = spawn_stub(StatusCode::OK, r#"{"choices":[{"message":{"content":"same"}}]}"#).await;
    let dispatcher = dispatcher_for(ProviderId::Groq, &stub.url);
    let req = request("hello", ProviderId::Groq);

    let first = dispatcher.dispatch(&req).await;
    let second = dispatcher.dispatch(&req).await;

    assert_eq!(first, second);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn request_keeps_message_and_trims_credential() {
    let req = DispatchRequest::new("  hi there \n", " key ", ProviderId::OpenRouter).unwrap();
    assert_eq!(req.message, "  hi there \n");
    assert_eq!(req.credential, "key");
    assert_eq!(req.provider, ProviderId::OpenRouter);

    assert!(matches!(
      DispatchRequest::new("   ", "key", ProviderId::Groq),
      Err(DispatchError::EmptyMessage)
    ));
    assert!(matches!(
      DispatchRequest::new("hi", " \t", ProviderId::Groq),
      Err(DispatchError::MissingCredential)
    ));
  }

  #[test]
  fn request_debug_redacts_credential() {
    let req = DispatchRequest::new("hi", "sk-secret", ProviderId::Groq).unwrap();
    let debug = format!("{req:?}");
    assert!(!debug.contains("sk-secret"));
    assert!(!debug.contains("hi\""));
  }

  #[test]
  fn normalize_requires_message_object() {
    let cases = [
      r#"{"choices":[]}"#,
      r#"{"choices":[{}]}"#,
      r#"{"choices":[{"message":null}]}"#,
      r#"{"choices":[{"message":"text"}]}"#,
      r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
    ];
    for body in cases {
      assert!(
        matches!(normalize_response(true, body), Err(DispatchError::InvalidFormat)),
        "{body}"
      );
    }
  }

  #[test]
  fn normalize_error_falls_back_to_body_when_message_blank() {
    let err = normalize_response(false, r#"{"error":{"message":""}}"#).unwrap_err();
    assert_eq!(err.to_string(), r#"{"error":{"message":""}}"#);

    let err = normalize_response(false, r#"{"error":"quota exceeded"}"#).unwrap_err();
    assert_eq!(err.to_string(), r#"{"error":"quota exceeded"}"#);
  }

  #[test]
  fn normalize_error_status_takes_precedence_over_choices() {
    let body = r#"{"error":{"message":"overloaded"},"choices":[{"message":{"content":"x"}}]}"#;
    assert_eq!(normalize_response(false, body).unwrap_err().to_string(), "overloaded");
  }

  #[test]
  fn result_serializes_with_status_tag() {
    let success = serde_json::to_value(DispatchResult::Success { text: "hi".into() }).unwrap();
    assert_eq!(success, json!({ "status": "success", "text": "hi" }));
    let failure = serde_json::to_value(DispatchResult::Failure { reason: "no".into() }).unwrap();
    assert_eq!(failure, json!({ "status": "failure", "reason": "no" }));
  }
}
