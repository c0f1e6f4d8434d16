use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kbchat_core::{
    ChatRequest, ChatResponse, ConversationDetail, ConversationList, HealthResponse,
    StatsResponse, ThreadId, ThreadSummary,
};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::{ApiError, ChatBackend, REQUEST_TIMEOUT_SECS, SessionContext};

/// Longest body excerpt carried inside an error.
const MAX_SNIPPET: usize = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// `ChatBackend` over HTTP.
///
/// `base_url` is the service root including any mount prefix, e.g. `http://localhost:8000/api`;
/// endpoint paths are appended as path segments so ids are percent-encoded.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    session: Arc<SessionContext>,
    cfg: ClientConfig,
}

impl HttpBackend {
    pub fn new(
        client: Client,
        base_url: &str,
        session: Arc<SessionContext>,
        cfg: ClientConfig,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base_url} cannot be a base URL")));
        }
        Ok(Self {
            client,
            base_url,
            session,
            cfg,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .timeout(self.cfg.timeout);
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends `builder` and returns the body of a 2xx response.
    async fn execute(&self, builder: RequestBuilder, url: &Url) -> Result<String, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        tracing::trace!(target: "api_json", %url, status, "{body}");

        if !(200..300).contains(&status) {
            return Err(error_for_status(status, &body, url));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let body = self.execute(self.request(Method::GET, url.clone()), &url).await?;
        parse_body(&body)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ApiError> {
        let list: ConversationList = self.get_json(&["conversations"]).await?;
        tracing::debug!(count = list.conversations.len(), "fetched thread list");
        Ok(list.conversations)
    }

    #[instrument(skip(self), fields(thread = %id))]
    async fn get_thread(&self, id: &ThreadId) -> Result<ConversationDetail, ApiError> {
        self.get_json(&["conversations", id.as_str()]).await
    }

    #[instrument(skip_all, fields(thread = ?request.thread_id))]
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = self.endpoint(&["chat"])?;
        let builder = self.request(Method::POST, url.clone()).json(request);
        let body = self.execute(builder, &url).await?;
        let resp: ChatResponse = parse_body(&body)?;
        tracing::debug!(thread = %resp.thread_id, sources = resp.sources.len(), "chat turn answered");
        Ok(resp)
    }

    #[instrument(skip(self), fields(thread = %id))]
    async fn rename_thread(&self, id: &ThreadId, title: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["conversations", id.as_str(), "title"])?;
        let builder = self
            .request(Method::PUT, url.clone())
            .query(&[("title", title)]);
        self.execute(builder, &url).await.map(|_| ())
    }

    #[instrument(skip(self), fields(thread = %id))]
    async fn delete_thread(&self, id: &ThreadId) -> Result<(), ApiError> {
        let url = self.endpoint(&["conversations", id.as_str()])?;
        self.execute(self.request(Method::DELETE, url.clone()), &url)
            .await
            .map(|_| ())
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get_json(&["health"]).await
    }

    async fn stats(&self) -> Result<StatsResponse, ApiError> {
        self.get_json(&["stats"]).await
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization {
        message: e.to_string(),
        body_snippet: Some(truncate_for_error(body, MAX_SNIPPET)),
    })
}

fn error_for_status(status: u16, body: &str, url: &Url) -> ApiError {
    let message = extract_detail(body)
        .or_else(|| (!body.trim().is_empty()).then(|| truncate_for_error(body, 200)))
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        401 | 403 => ApiError::Authentication { status, message },
        _ => ApiError::Api {
            status,
            message,
            url: Some(url.to_string()),
            body_snippet: (!body.is_empty()).then(|| truncate_for_error(body, MAX_SNIPPET)),
        },
    }
}

/// Pull the human-readable message out of an error body.
///
/// The service reports failures as `{"detail": "..."}`; request validation failures carry a list
/// of `{"msg": "..."}` objects under `detail` instead.
fn extract_detail(body: &str) -> Option<String> {
    use serde_json::Value;

    let v: Value = serde_json::from_str(body).ok()?;
    match v.get("detail").or_else(|| v.get("message"))? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

/// Truncate large response bodies so error strings remain bounded.
fn truncate_for_error(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…<snip>", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use kbchat_core::{Role, UserRole};
    use serde_json::json;

    use crate::Credential;

    fn backend_for(server: &MockServer, cfg: ClientConfig) -> HttpBackend {
        let session = Arc::new(SessionContext::default());
        session.login(Credential::new("tok-123", "ada", UserRole::EndUser));
        HttpBackend::new(Client::new(), &server.url("/api"), session, cfg).unwrap()
    }

    fn tid(s: &str) -> ThreadId {
        ThreadId::new(s).unwrap()
    }

    #[tokio::test]
    async fn list_threads_sends_bearer_token() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/conversations")
                    .header("authorization", "Bearer tok-123");
                then.status(200).json_body(json!({
                    "conversations": [{
                        "thread_id": "thread_a",
                        "title": "Visa",
                        "created_at": "2025-01-01T09:00:00",
                        "updated_at": "2025-01-01T09:30:00",
                        "message_count": 4
                    }]
                }));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        let threads = backend.list_threads().await.unwrap();

        m.assert_async().await;
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].thread_id, tid("thread_a"));
        assert_eq!(threads[0].message_count, 4);
    }

    #[tokio::test]
    async fn get_thread_reads_detail() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/conversations/thread_a");
                then.status(200).json_body(json!({
                    "thread_id": "thread_a",
                    "title": "Visa",
                    "created_at": "2025-01-01T09:00:00",
                    "updated_at": "2025-01-01T09:30:00",
                    "messages": [
                        {"role": "user", "content": "Which documents?", "timestamp": "2025-01-01T09:00:00"},
                        {"role": "assistant", "content": "A passport.", "timestamp": "2025-01-01T09:00:02",
                         "sources": [{"source": "policy.pdf", "chunk_text": "passport", "chunk_index": 3}]}
                    ]
                }));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        let detail = backend.get_thread(&tid("thread_a")).await.unwrap();
        assert_eq!(detail.title, "Visa");
        assert_eq!(detail.messages[1].role, Role::Assistant);
        assert_eq!(detail.messages[1].display_sources().len(), 1);
    }

    #[tokio::test]
    async fn draft_chat_turn_omits_thread_id() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat")
                    .json_body(json!({"query": "Hello"}));
                then.status(200).json_body(json!({
                    "answer": "Hi",
                    "thread_id": "t1",
                    "conversation_title": "New Conversation",
                    "sources": [],
                    "confidence_scores": []
                }));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        let resp = backend
            .send_chat(&ChatRequest {
                query: "Hello".into(),
                thread_id: None,
            })
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(resp.answer, "Hi");
        assert_eq!(resp.thread_id, tid("t1"));
        assert!(resp.sources.is_empty());
    }

    #[tokio::test]
    async fn rename_passes_title_as_query_param() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/conversations/thread_a/title")
                    .query_param("title", "Passport renewal");
                then.status(200)
                    .json_body(json!({"message": "Conversation title updated successfully"}));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        backend
            .rename_thread(&tid("thread_a"), "Passport renewal")
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn delete_missing_thread_is_not_found() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/conversations/thread_gone");
                then.status(404)
                    .json_body(json!({"detail": "Conversation not found: thread_gone"}));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        let err = backend.delete_thread(&tid("thread_gone")).await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            ApiError::Api { message, .. } => {
                assert_eq!(message, "Conversation not found: thread_gone")
            }
            other => panic!("unexpected error variant {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_unauthorized() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stats");
                then.status(401)
                    .json_body(json!({"detail": "Could not validate credentials"}));
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        match backend.stats().await.unwrap_err() {
            ApiError::Authentication { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Could not validate credentials");
            }
            other => panic!("unexpected error variant {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/health");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"status": "healthy", "pinecone_connected": true, "gemini_connected": true}));
            })
            .await;

        let cfg = ClientConfig {
            timeout: Duration::from_millis(50),
        };
        let backend = backend_for(&server, cfg);
        let err = backend.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_deserialization_error() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stats");
                then.status(200).body("<html>proxy error</html>");
            })
            .await;

        let backend = backend_for(&server, ClientConfig::default());
        match backend.stats().await.unwrap_err() {
            ApiError::Deserialization { body_snippet, .. } => {
                assert_eq!(body_snippet.as_deref(), Some("<html>proxy error</html>"));
            }
            other => panic!("unexpected error variant {other:?}"),
        }
    }

    #[test]
    fn endpoint_handles_trailing_slash_and_encoding() {
        let session = Arc::new(SessionContext::default());
        let backend = HttpBackend::new(
            Client::new(),
            "http://localhost:8000/api/",
            session,
            ClientConfig::default(),
        )
        .unwrap();
        let url = backend.endpoint(&["conversations", "thread 1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/conversations/thread%201");
    }

    #[test]
    fn rejects_non_base_urls() {
        let session = Arc::new(SessionContext::default());
        let err = HttpBackend::new(Client::new(), "mailto:ops@example.com", session, ClientConfig::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn extracts_validation_messages() {
        let body = r#"{"detail":[{"loc":["query","title"],"msg":"field required","type":"value_error.missing"}]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required"));
        assert_eq!(extract_detail("not json"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "é".repeat(10);
        let out = truncate_for_error(&s, 5);
        assert!(out.starts_with("éé"));
        assert!(out.ends_with("<snip>"));
    }
}
