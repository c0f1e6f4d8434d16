//! Which thread is active and what its visible log currently shows.
//!
//! Every call to [`ThreadSelectionController::select`] bumps a generation counter. Anything that
//! completes later (a history fetch, a chat turn) carries the generation it started under and
//! may only touch the visible log if that generation is still current. This is what keeps the
//! log from ever mixing two threads' messages.
//!
//! Messages a chat turn adds are tagged with its turn id (`Message::local_turn`). They are
//! addressed by that id, never by position, and survive a history load that lands after them.

use kbchat_core::{ConversationDetail, Delivery, Message, ThreadId};

use crate::ConversationCache;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    /// History could not be fetched; front ends render the message in place of the log.
    Failed(String),
}

/// Issued when a selection needs a remote fetch. Hand it back with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub thread_id: ThreadId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No thread; the log is empty and the next turn creates one.
    Draft,
    /// The log was seeded from the cache without a fetch.
    Cached,
    /// The thread is not cached; fetch its detail and call [`ThreadSelectionController::apply_load`].
    Fetch(LoadTicket),
    /// The thread was already active; nothing changed.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ThreadSelectionController {
    active: Option<ThreadId>,
    visible_log: Vec<Message>,
    generation: u64,
    load: LoadState,
}

impl ThreadSelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `id` the active thread, or enters the draft state for `None`.
    ///
    /// Re-selecting the active thread is a no-op unless its last load failed, in which case the
    /// fetch is retried.
    pub fn select(&mut self, id: Option<ThreadId>, cache: &ConversationCache) -> Selection {
        if id.is_some() && id == self.active && !matches!(self.load, LoadState::Failed(_)) {
            return Selection::Unchanged;
        }

        self.generation += 1;
        self.visible_log.clear();
        self.active = id;
        tracing::debug!(thread = ?self.active, generation = self.generation, "selection changed");

        let Some(id) = self.active.clone() else {
            self.load = LoadState::Idle;
            return Selection::Draft;
        };

        match cache.get(&id) {
            Some(detail) => {
                self.visible_log = detail.messages.clone();
                self.load = LoadState::Idle;
                Selection::Cached
            }
            None => {
                self.load = LoadState::Loading;
                Selection::Fetch(LoadTicket {
                    thread_id: id,
                    generation: self.generation,
                })
            }
        }
    }

    /// Replaces the visible log with fetched history if `ticket` is still current.
    ///
    /// Messages of turns dispatched while the fetch was in flight are kept after the history.
    /// Returns `false` (and leaves the log alone) for a superseded load.
    pub fn apply_load(&mut self, ticket: &LoadTicket, detail: &ConversationDetail) -> bool {
        if !self.owns(ticket) {
            tracing::debug!(thread = %ticket.thread_id, generation = ticket.generation, "discarding superseded load");
            return false;
        }
        let local: Vec<Message> = self
            .visible_log
            .drain(..)
            .filter(|m| m.local_turn.is_some())
            .collect();
        if !local.is_empty() {
            tracing::debug!(thread = %ticket.thread_id, kept = local.len(), "history landed under local turns");
        }
        self.visible_log = detail.messages.clone();
        self.visible_log.extend(local);
        self.load = LoadState::Idle;
        true
    }

    /// Local turn messages in the log that the server has acknowledged.
    pub fn settled_local(&self) -> impl Iterator<Item = &Message> {
        self.visible_log
            .iter()
            .filter(|m| m.local_turn.is_some() && m.delivery == Delivery::Delivered)
    }

    /// Records a failed history fetch if `ticket` is still current.
    pub fn fail_load(&mut self, ticket: &LoadTicket, message: impl Into<String>) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.visible_log.clear();
        self.load = LoadState::Failed(message.into());
        true
    }

    fn owns(&self, ticket: &LoadTicket) -> bool {
        self.generation == ticket.generation && self.active.as_ref() == Some(&ticket.thread_id)
    }

    /// Turns the draft into `id` after the server minted it.
    ///
    /// Unlike [`select`](Self::select) this keeps the visible log and the generation, since the
    /// log already holds the turn that created the thread.
    pub fn promote(&mut self, id: ThreadId) {
        tracing::debug!(thread = %id, "draft promoted");
        self.active = Some(id);
        self.load = LoadState::Idle;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Re-seeds the log of `id` from the cache when it is active and not waiting on a fetch.
    ///
    /// Used when the cache moved ahead of a log that was seeded before the change landed.
    pub fn resync(&mut self, id: &ThreadId, cache: &ConversationCache) -> bool {
        if self.active.as_ref() != Some(id) || self.load != LoadState::Idle {
            return false;
        }
        let Some(detail) = cache.get(id) else {
            return false;
        };
        self.visible_log = detail.messages.clone();
        true
    }

    pub fn push_message(&mut self, message: Message) {
        self.visible_log.push(message);
    }

    /// Sets the delivery state of the user message `turn` added.
    pub fn mark_delivery(&mut self, turn: u64, delivery: Delivery) -> bool {
        match self
            .visible_log
            .iter_mut()
            .find(|m| m.is_user() && m.local_turn == Some(turn))
        {
            Some(msg) => {
                msg.delivery = delivery;
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<&ThreadId> {
        self.active.as_ref()
    }

    pub fn is_draft(&self) -> bool {
        self.active.is_none()
    }

    pub fn visible_log(&self) -> &[Message] {
        &self.visible_log
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> ThreadId {
        ThreadId::new(s).unwrap()
    }

    fn detail(contents: &[&str]) -> ConversationDetail {
        ConversationDetail::new(
            "T",
            contents.iter().map(|c| Message::user(*c)).collect(),
        )
    }

    #[test]
    fn selecting_none_clears_synchronously() {
        let mut cache = ConversationCache::new();
        cache.put(tid("a"), detail(&["x"]));
        let mut sel = ThreadSelectionController::new();

        assert_eq!(sel.select(Some(tid("a")), &cache), Selection::Cached);
        assert_eq!(sel.visible_log().len(), 1);

        assert_eq!(sel.select(None, &cache), Selection::Draft);
        assert!(sel.visible_log().is_empty());
        assert!(sel.is_draft());
        assert_eq!(sel.load_state(), &LoadState::Idle);
    }

    #[test]
    fn uncached_selection_requests_fetch() {
        let cache = ConversationCache::new();
        let mut sel = ThreadSelectionController::new();

        let Selection::Fetch(ticket) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };
        assert_eq!(ticket.thread_id, tid("a"));
        assert_eq!(sel.load_state(), &LoadState::Loading);

        assert!(sel.apply_load(&ticket, &detail(&["one", "two"])));
        assert_eq!(sel.visible_log().len(), 2);
        assert_eq!(sel.load_state(), &LoadState::Idle);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut cache = ConversationCache::new();
        cache.put(tid("b"), detail(&["b1"]));
        let mut sel = ThreadSelectionController::new();

        let Selection::Fetch(stale) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };
        sel.select(Some(tid("b")), &cache);

        assert!(!sel.apply_load(&stale, &detail(&["a1", "a2"])));
        let contents: Vec<_> = sel.visible_log().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["b1"]);
        assert!(!sel.fail_load(&stale, "boom"));
        assert_eq!(sel.load_state(), &LoadState::Idle);
    }

    #[test]
    fn reselecting_same_thread_after_away_and_back_discards_old_ticket() {
        let cache = ConversationCache::new();
        let mut sel = ThreadSelectionController::new();

        let Selection::Fetch(first) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };
        sel.select(None, &cache);
        let Selection::Fetch(second) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };

        assert!(!sel.apply_load(&first, &detail(&["old"])));
        assert!(sel.apply_load(&second, &detail(&["new"])));
        assert_eq!(sel.visible_log()[0].content, "new");
    }

    #[test]
    fn failed_load_is_recorded_and_retried_on_reselect() {
        let cache = ConversationCache::new();
        let mut sel = ThreadSelectionController::new();

        let Selection::Fetch(ticket) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };
        assert!(sel.fail_load(&ticket, "Conversation not found"));
        assert_eq!(
            sel.load_state(),
            &LoadState::Failed("Conversation not found".into())
        );

        assert!(matches!(sel.select(Some(tid("a")), &cache), Selection::Fetch(_)));
    }

    #[test]
    fn reselecting_active_thread_is_unchanged() {
        let mut cache = ConversationCache::new();
        cache.put(tid("a"), detail(&["x"]));
        let mut sel = ThreadSelectionController::new();
        sel.select(Some(tid("a")), &cache);
        let generation = sel.generation();

        assert_eq!(sel.select(Some(tid("a")), &cache), Selection::Unchanged);
        assert_eq!(sel.generation(), generation);
    }

    #[test]
    fn promote_keeps_log_and_generation() {
        let cache = ConversationCache::new();
        let mut sel = ThreadSelectionController::new();
        sel.select(None, &cache);
        let generation = sel.generation();
        sel.push_message(Message::user("Hello").with_delivery(Delivery::Sending).with_turn(1));

        sel.promote(tid("t1"));

        assert_eq!(sel.active(), Some(&tid("t1")));
        assert!(sel.is_current(generation));
        assert_eq!(sel.visible_log().len(), 1);
        assert!(sel.mark_delivery(1, Delivery::Delivered));
        assert_eq!(sel.visible_log()[0].delivery, Delivery::Delivered);
    }

    #[test]
    fn mark_delivery_ignores_assistant_and_history_messages() {
        let mut sel = ThreadSelectionController::new();
        sel.push_message(Message::user("from history"));
        sel.push_message(Message::assistant("hi", vec![]).with_turn(3));
        assert!(!sel.mark_delivery(3, Delivery::Failed));
        assert!(!sel.mark_delivery(4, Delivery::Failed));
        assert!(sel.visible_log().iter().all(|m| m.delivery == Delivery::Delivered));
    }

    #[test]
    fn history_landing_after_a_turn_keeps_the_turn() {
        let cache = ConversationCache::new();
        let mut sel = ThreadSelectionController::new();
        let Selection::Fetch(ticket) = sel.select(Some(tid("a")), &cache) else {
            panic!("expected fetch");
        };
        sel.push_message(Message::user("Hello").with_delivery(Delivery::Sending).with_turn(7));

        assert!(sel.apply_load(&ticket, &detail(&["one", "two"])));

        let contents: Vec<_> = sel.visible_log().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "Hello"]);
        assert_eq!(sel.settled_local().count(), 0);

        assert!(sel.mark_delivery(7, Delivery::Failed));
        assert_eq!(sel.visible_log()[0].delivery, Delivery::Delivered);
        assert_eq!(sel.visible_log()[2].delivery, Delivery::Failed);
    }

    #[test]
    fn resync_only_for_the_idle_active_thread() {
        let mut cache = ConversationCache::new();
        cache.put(tid("a"), detail(&["x"]));
        let mut sel = ThreadSelectionController::new();
        sel.select(Some(tid("a")), &cache);

        cache.merge_append(tid("a"), [Message::user("y")]);
        assert!(!sel.resync(&tid("b"), &cache));
        assert_eq!(sel.visible_log().len(), 1);
        assert!(sel.resync(&tid("a"), &cache));
        assert_eq!(sel.visible_log().len(), 2);

        let Selection::Fetch(_) = sel.select(Some(tid("c")), &cache) else {
            panic!("expected fetch");
        };
        cache.merge_append(tid("c"), [Message::user("partial")]);
        assert!(!sel.resync(&tid("c"), &cache));
        assert!(sel.visible_log().is_empty());
    }
}
