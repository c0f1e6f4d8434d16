//! Async shell around the synchronous sync-state machines.
//!
//! All state lives in one [`SyncState`] behind a tokio mutex. Each operation locks it, runs the
//! synchronous transition, releases it, awaits the backend, then locks again to settle. The lock
//! is never held across a backend call, so a pending chat turn does not block selection changes;
//! the generation tickets in [`ThreadSelectionController`] sort out completions that arrive late.

use std::sync::Arc;

use kbchat_api::{ApiError, ChatBackend};
use kbchat_core::{HealthResponse, Message, StatsResponse, ThreadId, ThreadSummary};
use kbchat_error::{CombinedPolicy, ErrorPolicy, TracingPolicy};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::{
    CacheScope, ConversationCache, EventBus, EventBusPolicy, LoadState, OptimisticChatMutation,
    Selection, SyncEvent, ThreadListController, ThreadSelectionController, TurnOutcome, TurnState,
};

#[derive(Debug, Default)]
pub struct SyncState {
    pub cache: ConversationCache,
    pub selection: ThreadSelectionController,
    pub mutation: OptimisticChatMutation,
    pub threads: ThreadListController,
    /// The composer's input buffer.
    pub input: String,
}

/// Point-in-time copy of what a front end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub active: Option<ThreadId>,
    pub visible_log: Vec<Message>,
    pub load: LoadState,
    pub turn: TurnState,
    pub input: String,
}

#[derive(Clone)]
pub struct ChatEngine {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<SyncState>>,
    events: Arc<EventBus>,
    policy: Arc<dyn ErrorPolicy>,
}

impl ChatEngine {
    /// Failures are logged through `tracing` and published on the bus's error channel.
    pub fn new(backend: Arc<dyn ChatBackend>, events: Arc<EventBus>) -> Self {
        let policy = CombinedPolicy::new()
            .push(TracingPolicy)
            .push(EventBusPolicy::new(Arc::clone(&events)));
        Self {
            backend,
            state: Arc::new(Mutex::new(SyncState::default())),
            events,
            policy: Arc::new(policy),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// An engine that reports failures only through the event bus.
    pub fn quiet(backend: Arc<dyn ChatBackend>, events: Arc<EventBus>) -> Self {
        let policy = EventBusPolicy::new(Arc::clone(&events));
        Self::new(backend, events).with_policy(Arc::new(policy))
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let st = self.state.lock().await;
        EngineSnapshot {
            active: st.selection.active().cloned(),
            visible_log: st.selection.visible_log().to_vec(),
            load: st.selection.load_state().clone(),
            turn: st.mutation.state(),
            input: st.input.clone(),
        }
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.lock().await.input = text.into();
    }

    /// Switches the active thread (`None` for a new chat) and loads its history.
    ///
    /// Cached threads are shown without a fetch. A fetch that completes after the user has moved
    /// on is stored in the cache but never reaches the visible log.
    #[instrument(skip(self))]
    pub async fn select_thread(&self, id: Option<ThreadId>) -> Result<(), ApiError> {
        let outcome = {
            let mut st = self.state.lock().await;
            let SyncState {
                cache, selection, ..
            } = &mut *st;
            let outcome = selection.select(id, cache);
            if outcome != Selection::Unchanged {
                self.events
                    .send(SyncEvent::SelectionChanged(selection.active().cloned()));
                self.events.send(SyncEvent::LogUpdated {
                    len: selection.visible_log().len(),
                });
            }
            outcome
        };

        let Selection::Fetch(ticket) = outcome else {
            return Ok(());
        };

        let result = self.backend.get_thread(&ticket.thread_id).await;

        let mut st = self.state.lock().await;
        let SyncState {
            cache, selection, ..
        } = &mut *st;
        match result {
            Ok(mut detail) => {
                if selection.apply_load(&ticket, &detail) {
                    // Turns that settled during the fetch are not in the fetched history.
                    detail
                        .messages
                        .extend(selection.settled_local().cloned().map(Message::settled));
                    self.events.send(SyncEvent::LogUpdated {
                        len: selection.visible_log().len(),
                    });
                }
                cache.put(ticket.thread_id, detail);
                Ok(())
            }
            Err(err) => {
                if selection.fail_load(&ticket, err.to_string()) {
                    // A turn settling during the fetch may have left a partial entry behind.
                    cache.invalidate(CacheScope::Thread(ticket.thread_id.clone()));
                    self.events.send(SyncEvent::HistoryLoadFailed {
                        thread_id: ticket.thread_id.clone(),
                        message: err.to_string(),
                    });
                }
                drop(st);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Sends a chat turn from the input buffer, or from `override_query` when given (starter
    /// prompts). The input buffer is cleared either way once the turn is dispatched.
    ///
    /// Returns `Ok(None)` when nothing was dispatched: a blank query or a turn already pending.
    #[instrument(skip(self))]
    pub async fn send(&self, override_query: Option<&str>) -> Result<Option<TurnOutcome>, ApiError> {
        let ticket = {
            let mut st = self.state.lock().await;
            let SyncState {
                selection,
                mutation,
                input,
                ..
            } = &mut *st;
            let query = override_query.map_or_else(|| input.clone(), str::to_string);
            let Some(ticket) = mutation.dispatch(&query, input, selection) else {
                return Ok(None);
            };
            self.events.send(SyncEvent::LogUpdated {
                len: selection.visible_log().len(),
            });
            ticket
        };

        let result = self.backend.send_chat(&ticket.request()).await;

        let mut st = self.state.lock().await;
        let SyncState {
            cache,
            selection,
            mutation,
            ..
        } = &mut *st;
        match result {
            Ok(resp) => {
                let outcome = mutation.settle_success(&ticket, resp, cache, selection);
                if let Some(outcome) = &outcome {
                    self.events.send(SyncEvent::ThreadListInvalidated);
                    if let TurnOutcome::Delivered {
                        thread_id,
                        promoted,
                    } = outcome
                    {
                        self.events.send(SyncEvent::LogUpdated {
                            len: selection.visible_log().len(),
                        });
                        if *promoted {
                            self.events.send(SyncEvent::ThreadPromoted(thread_id.clone()));
                            self.events
                                .send(SyncEvent::SelectionChanged(Some(thread_id.clone())));
                        }
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                if let Some(TurnOutcome::Failed { visible: true }) =
                    mutation.settle_error(&ticket, selection)
                {
                    self.events.send(SyncEvent::LogUpdated {
                        len: selection.visible_log().len(),
                    });
                }
                drop(st);
                self.events.send(SyncEvent::TurnFailed {
                    message: err.to_string(),
                });
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Thread summaries, newest first. Served locally until the list is invalidated.
    #[instrument(skip(self))]
    pub async fn threads(&self) -> Result<Vec<ThreadSummary>, ApiError> {
        let ticket = {
            let st = self.state.lock().await;
            if !st.threads.needs_refresh(&st.cache) {
                return Ok(st.threads.summaries().to_vec());
            }
            st.threads.begin_refresh(&st.cache)
        };

        let fetched = self
            .backend
            .list_threads()
            .await
            .inspect_err(|e| self.report(e))?;

        let mut st = self.state.lock().await;
        Ok(st.threads.apply(ticket, fetched).to_vec())
    }

    /// Renames `id`. A title that is blank after trimming is ignored and `Ok(false)` returned.
    #[instrument(skip(self))]
    pub async fn rename(&self, id: &ThreadId, title: &str) -> Result<bool, ApiError> {
        let Some(title) = ThreadListController::rename_title(title) else {
            return Ok(false);
        };
        self.backend
            .rename_thread(id, title)
            .await
            .inspect_err(|e| self.report(e))?;

        let mut st = self.state.lock().await;
        let SyncState { cache, threads, .. } = &mut *st;
        threads.after_rename(cache, id, title);
        self.events.send(SyncEvent::ThreadRenamed {
            thread_id: id.clone(),
            title: title.to_string(),
        });
        self.events.send(SyncEvent::ThreadListInvalidated);
        Ok(true)
    }

    /// Deletes `id`. Deleting the active thread drops the user back into a new chat.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ThreadId) -> Result<(), ApiError> {
        self.backend
            .delete_thread(id)
            .await
            .inspect_err(|e| self.report(e))?;

        let mut st = self.state.lock().await;
        let SyncState {
            cache,
            selection,
            threads,
            ..
        } = &mut *st;
        let cleared = threads.after_delete(cache, selection, id);
        self.events.send(SyncEvent::ThreadDeleted(id.clone()));
        self.events.send(SyncEvent::ThreadListInvalidated);
        if cleared {
            self.events.send(SyncEvent::SelectionChanged(None));
            self.events.send(SyncEvent::LogUpdated { len: 0 });
        }
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.backend.health().await.inspect_err(|e| self.report(e))
    }

    pub async fn stats(&self) -> Result<StatsResponse, ApiError> {
        self.backend.stats().await.inspect_err(|e| self.report(e))
    }

    fn report(&self, err: &ApiError) {
        self.policy.emit(&kbchat_error::Error::from(err.clone()));
    }
}
