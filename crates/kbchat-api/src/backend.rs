use async_trait::async_trait;
use kbchat_core::{
    ChatRequest, ChatResponse, ConversationDetail, HealthResponse, StatsResponse, ThreadId,
    ThreadSummary,
};

use crate::ApiError;

/// Operations the remote conversation service offers.
///
/// Implementations must be cheap to share (`Arc<dyn ChatBackend>`); the sync engine holds one
/// and never retries on failure.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /conversations`, in whatever order the server returns them.
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ApiError>;

    /// `GET /conversations/{id}`
    async fn get_thread(&self, id: &ThreadId) -> Result<ConversationDetail, ApiError>;

    /// `POST /chat`: sends one turn, creating the thread when `thread_id` is absent.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;

    /// `PUT /conversations/{id}/title?title=...`
    async fn rename_thread(&self, id: &ThreadId, title: &str) -> Result<(), ApiError>;

    /// `DELETE /conversations/{id}`
    async fn delete_thread(&self, id: &ThreadId) -> Result<(), ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;

    async fn stats(&self) -> Result<StatsResponse, ApiError>;
}
