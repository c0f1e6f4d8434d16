//! Scripted in-memory [`ChatBackend`] for engine and front-end tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fxhash::FxHashMap;
use kbchat_api::{ApiError, ChatBackend};
use kbchat_core::{
    ChatRequest, ChatResponse, ConversationDetail, HealthResponse, Message, StatsResponse,
    ThreadId, ThreadSummary,
};
use tokio::sync::oneshot;

#[derive(Debug, Default)]
pub struct CallCounts {
    list: AtomicUsize,
    get: AtomicUsize,
    chat: AtomicUsize,
    rename: AtomicUsize,
    delete: AtomicUsize,
}

impl CallCounts {
    pub fn list(&self) -> usize {
        self.list.load(Ordering::SeqCst)
    }
    pub fn get(&self) -> usize {
        self.get.load(Ordering::SeqCst)
    }
    pub fn chat(&self) -> usize {
        self.chat.load(Ordering::SeqCst)
    }
    pub fn rename(&self) -> usize {
        self.rename.load(Ordering::SeqCst)
    }
    pub fn delete(&self) -> usize {
        self.delete.load(Ordering::SeqCst)
    }
}

/// A backend holding threads in memory.
///
/// Chat replies are taken from a queue (falling back to an echo); a gate installed with
/// [`gate_chat`](Self::gate_chat) or [`gate_get`](Self::gate_get) holds the next such call until
/// the returned sender fires or is dropped.
#[derive(Debug, Default)]
pub struct MockBackend {
    summaries: Mutex<Vec<ThreadSummary>>,
    details: Mutex<FxHashMap<ThreadId, ConversationDetail>>,
    replies: Mutex<VecDeque<Result<ChatResponse, ApiError>>>,
    chat_gate: Mutex<Option<oneshot::Receiver<()>>>,
    get_gate: Mutex<Option<oneshot::Receiver<()>>>,
    requests: Mutex<Vec<ChatRequest>>,
    fail_next: Mutex<Option<ApiError>>,
    pub calls: CallCounts,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(self, id: &str, updated_at: &str, detail: ConversationDetail) -> Self {
        let thread_id = ThreadId::new(id).expect("valid mock thread id");
        self.summaries.lock().expect("mock lock").push(ThreadSummary {
            thread_id: thread_id.clone(),
            title: detail.title.clone(),
            created_at: updated_at.to_string(),
            updated_at: updated_at.to_string(),
            message_count: detail.messages.len() as u32,
        });
        self.details
            .lock()
            .expect("mock lock")
            .insert(thread_id, detail);
        self
    }

    pub fn push_reply(&self, reply: Result<ChatResponse, ApiError>) {
        self.replies.lock().expect("mock lock").push_back(reply);
    }

    /// Fails the next list/get/rename/delete call with `err`.
    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock().expect("mock lock") = Some(err);
    }

    pub fn gate_chat(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.chat_gate.lock().expect("mock lock") = Some(rx);
        tx
    }

    pub fn gate_get(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.get_gate.lock().expect("mock lock") = Some(rx);
        tx
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("mock lock").clone()
    }

    fn take_failure(&self) -> Result<(), ApiError> {
        match self.fail_next.lock().expect("mock lock").take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn not_found(id: &ThreadId) -> ApiError {
    ApiError::Api {
        status: 404,
        message: format!("Conversation not found: {id}"),
        url: None,
        body_snippet: None,
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ApiError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.summaries.lock().expect("mock lock").clone())
    }

    async fn get_thread(&self, id: &ThreadId) -> Result<ConversationDetail, ApiError> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        // Answer with the state at request time, even when the reply is held back.
        let snapshot = self.details.lock().expect("mock lock").get(id).cloned();
        let gate = self.get_gate.lock().expect("mock lock").take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        self.take_failure()?;
        snapshot.ok_or_else(|| not_found(id))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let n = self.calls.chat.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().expect("mock lock").push(request.clone());
        let gate = self.chat_gate.lock().expect("mock lock").take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        let reply = self.replies.lock().expect("mock lock").pop_front();
        let resp = reply.unwrap_or_else(|| {
            Ok(ChatResponse {
                answer: format!("echo: {}", request.query),
                thread_id: request.thread_id.clone().unwrap_or_else(|| {
                    ThreadId::new(format!("thread_{n}")).expect("valid mock thread id")
                }),
                sources: vec![],
            })
        })?;

        self.details
            .lock()
            .expect("mock lock")
            .entry(resp.thread_id.clone())
            .or_insert_with(|| ConversationDetail::untitled(vec![]))
            .messages
            .extend([
                Message::user(request.query.clone()),
                Message::assistant(resp.answer.clone(), resp.sources.clone()),
            ]);
        Ok(resp)
    }

    async fn rename_thread(&self, id: &ThreadId, title: &str) -> Result<(), ApiError> {
        self.calls.rename.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut details = self.details.lock().expect("mock lock");
        let detail = details.get_mut(id).ok_or_else(|| not_found(id))?;
        detail.title = title.to_string();
        for s in self.summaries.lock().expect("mock lock").iter_mut() {
            if &s.thread_id == id {
                s.title = title.to_string();
            }
        }
        Ok(())
    }

    async fn delete_thread(&self, id: &ThreadId) -> Result<(), ApiError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.details
            .lock()
            .expect("mock lock")
            .remove(id)
            .ok_or_else(|| not_found(id))?;
        self.summaries
            .lock()
            .expect("mock lock")
            .retain(|s| &s.thread_id != id);
        Ok(())
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: "healthy".into(),
            pinecone_connected: true,
            gemini_connected: true,
        })
    }

    async fn stats(&self) -> Result<StatsResponse, ApiError> {
        Ok(StatsResponse {
            total_vector_count: 1204,
            dimension: 768,
            index_fullness: 0.01,
        })
    }
}
