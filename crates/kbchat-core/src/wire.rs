//! Request and response bodies of the remote conversation service.

use serde::{Deserialize, Serialize};

use crate::message::Source;
use crate::thread::{ThreadId, ThreadSummary};

/// Body of `POST /chat`. A missing `thread_id` asks the server to start a new thread.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub answer: String,
    pub thread_id: ThreadId,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Body of `GET /conversations`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ThreadSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub pinecone_connected: bool,
    pub gemini_connected: bool,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.pinecone_connected && self.gemini_connected
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatsResponse {
    pub total_vector_count: u64,
    pub dimension: u32,
    pub index_fullness: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn draft_request_omits_thread_id() {
        let req = ChatRequest {
            query: "Hello".into(),
            thread_id: None,
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"query": "Hello"}));
    }

    #[test]
    fn chat_response_tolerates_extra_fields() {
        let body = json!({
            "answer": "Hi",
            "thread_id": "thread_0011",
            "conversation_title": "Greetings",
            "sources": [{"source": "faq.pdf", "chunk_text": "...", "chunk_index": 4}],
            "confidence_scores": [0.82]
        });
        let resp: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.thread_id.as_str(), "thread_0011");
        assert_eq!(resp.sources[0].chunk_index, 4);
    }

    #[test]
    fn health_requires_both_backends() {
        let health = HealthResponse {
            status: "healthy".into(),
            pinecone_connected: true,
            gemini_connected: false,
        };
        assert!(!health.is_healthy());
    }
}
