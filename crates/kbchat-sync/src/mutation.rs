//! The optimistic chat turn.
//!
//! A turn moves `Idle -> Pending -> Idle`. Dispatch renders the user's message into the visible
//! log before the request leaves; settling reconciles the server's answer into both the log and
//! the [`ConversationCache`]. Only one turn may be pending at a time.

use kbchat_core::{ChatRequest, ChatResponse, Delivery, Message, ThreadId};

use crate::{CacheScope, ConversationCache, ThreadSelectionController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Pending,
}

/// Everything needed to settle a dispatched turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnTicket {
    turn: u64,
    pub query: String,
    /// Thread the turn was sent to; `None` when sent from a draft.
    pub target: Option<ThreadId>,
    /// Selection generation at dispatch.
    pub generation: u64,
    user_message: Message,
}

impl TurnTicket {
    pub fn request(&self) -> ChatRequest {
        ChatRequest {
            query: self.query.clone(),
            thread_id: self.target.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The answer landed in the visible log. `promoted` is set when the turn created the thread.
    Delivered { thread_id: ThreadId, promoted: bool },
    /// The thread is no longer shown (or was deleted) and the visible log was left alone.
    Stale { thread_id: ThreadId },
    /// The request failed. `visible` is set when the failure marker reached the visible log.
    Failed { visible: bool },
}

#[derive(Debug, Default)]
pub struct OptimisticChatMutation {
    pending: Option<u64>,
    next_turn: u64,
}

impl OptimisticChatMutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        match self.pending {
            Some(_) => TurnState::Pending,
            None => TurnState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a turn for `query`.
    ///
    /// Blank queries and dispatch while a turn is pending are silent no-ops returning `None`.
    /// Otherwise the user message is appended to the visible log as `Sending` and `input` is
    /// cleared before this returns.
    pub fn dispatch(
        &mut self,
        query: &str,
        input: &mut String,
        selection: &mut ThreadSelectionController,
    ) -> Option<TurnTicket> {
        if query.trim().is_empty() || self.pending.is_some() {
            return None;
        }

        self.next_turn += 1;
        let turn = self.next_turn;
        self.pending = Some(turn);

        let user_message = Message::user(query).with_turn(turn);
        selection.push_message(user_message.clone().with_delivery(Delivery::Sending));
        input.clear();

        let ticket = TurnTicket {
            turn,
            query: query.to_string(),
            target: selection.active().cloned(),
            generation: selection.generation(),
            user_message,
        };
        tracing::debug!(turn, target_thread = ?ticket.target, generation = ticket.generation, "turn dispatched");
        Some(ticket)
    }

    /// Reconciles a successful answer.
    ///
    /// The cache receives the user/assistant pair unless the thread was deleted meanwhile, and the
    /// thread list is invalidated. If the selection is unchanged since dispatch the pair lands in
    /// the visible log; if the user left and came back to the same thread, the log is re-seeded
    /// from the cache instead. Returns `None` for a ticket that is not the pending turn.
    pub fn settle_success(
        &mut self,
        ticket: &TurnTicket,
        response: ChatResponse,
        cache: &mut ConversationCache,
        selection: &mut ThreadSelectionController,
    ) -> Option<TurnOutcome> {
        self.finish(ticket)?;

        let ChatResponse {
            answer,
            thread_id,
            sources,
        } = response;
        let assistant = Message::assistant(answer, sources).with_turn(ticket.turn);

        let merged = cache.merge_append(
            thread_id.clone(),
            [ticket.user_message.clone(), assistant.clone()],
        );
        cache.invalidate(CacheScope::ThreadList);

        if merged.is_none() {
            return Some(TurnOutcome::Stale { thread_id });
        }

        if !selection.is_current(ticket.generation) {
            if selection.resync(&thread_id, cache) {
                tracing::debug!(thread = %thread_id, "turn settled after returning to its thread");
                return Some(TurnOutcome::Delivered {
                    thread_id,
                    promoted: false,
                });
            }
            tracing::debug!(thread = %thread_id, "turn settled after selection changed");
            return Some(TurnOutcome::Stale { thread_id });
        }

        selection.mark_delivery(ticket.turn, Delivery::Delivered);
        selection.push_message(assistant);

        let promoted = ticket.target.is_none();
        if promoted {
            selection.promote(thread_id.clone());
        }
        Some(TurnOutcome::Delivered {
            thread_id,
            promoted,
        })
    }

    /// Marks the optimistic message as failed and returns to idle. Nothing reaches the cache.
    pub fn settle_error(
        &mut self,
        ticket: &TurnTicket,
        selection: &mut ThreadSelectionController,
    ) -> Option<TurnOutcome> {
        self.finish(ticket)?;
        let visible = selection.is_current(ticket.generation)
            && selection.mark_delivery(ticket.turn, Delivery::Failed);
        Some(TurnOutcome::Failed { visible })
    }

    fn finish(&mut self, ticket: &TurnTicket) -> Option<()> {
        if self.pending != Some(ticket.turn) {
            tracing::warn!(turn = ticket.turn, "ignoring settle for a turn that is not pending");
            return None;
        }
        self.pending = None;
        Some(())
    }
}
