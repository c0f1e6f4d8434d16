//! Client-side store of conversation detail keyed by thread.
//!
//! The cache owns the canonical copy of every thread the client has seen. The visible log in
//! [`crate::ThreadSelectionController`] is only a working copy re-seeded from here.
//!
//! The thread-summary list is not stored here; the cache only tracks whether it is stale through a
//! monotonically increasing epoch that [`crate::ThreadListController`] compares against.

use fxhash::{FxHashMap, FxHashSet};
use kbchat_core::{ConversationDetail, Message, ThreadId};

/// What [`ConversationCache::invalidate`] marks stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    /// The sidebar list of thread summaries. Per-thread detail is kept.
    ThreadList,
    /// The detail of one thread; the next selection of it re-fetches.
    Thread(ThreadId),
}

#[derive(Debug, Default)]
pub struct ConversationCache {
    details: FxHashMap<ThreadId, ConversationDetail>,
    /// Threads deleted on the server. Late writes for these are dropped.
    deleted: FxHashSet<ThreadId>,
    list_epoch: u64,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ThreadId) -> Option<&ConversationDetail> {
        self.details.get(id)
    }

    pub fn contains(&self, id: &ThreadId) -> bool {
        self.details.contains_key(id)
    }

    /// Replaces the entry after an explicit fetch. A no-op for deleted threads.
    pub fn put(&mut self, id: ThreadId, detail: ConversationDetail) {
        if self.deleted.contains(&id) {
            tracing::debug!(thread = %id, "dropping fetched detail of a deleted thread");
            return;
        }
        tracing::trace!(thread = %id, messages = detail.messages.len(), "cache put");
        self.details.insert(id, detail);
    }

    /// Appends `messages` to the thread's detail, creating a "New Chat" entry when absent.
    ///
    /// Existing content and order are never touched. Messages are stored settled; transient
    /// delivery state only lives in the visible log. Returns the entry's new length, or `None`
    /// when the thread was deleted and nothing was stored.
    pub fn merge_append<I>(&mut self, id: ThreadId, messages: I) -> Option<usize>
    where
        I: IntoIterator<Item = Message>,
    {
        if self.deleted.contains(&id) {
            tracing::debug!(thread = %id, "not resurrecting a deleted thread");
            return None;
        }
        let entry = self
            .details
            .entry(id)
            .or_insert_with(|| ConversationDetail::untitled(Vec::new()));
        entry.messages.extend(messages.into_iter().map(Message::settled));
        Some(entry.messages.len())
    }

    pub fn invalidate(&mut self, scope: CacheScope) {
        match scope {
            CacheScope::ThreadList => {
                self.list_epoch += 1;
                tracing::trace!(epoch = self.list_epoch, "thread list invalidated");
            }
            CacheScope::Thread(id) => {
                self.details.remove(&id);
            }
        }
    }

    /// Patches the cached title of `id`. Returns `false` when the thread is not cached.
    pub fn set_title(&mut self, id: &ThreadId, title: &str) -> bool {
        match self.details.get_mut(id) {
            Some(detail) => {
                detail.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Drops `id` for good; later [`put`](Self::put) and [`merge_append`](Self::merge_append)
    /// calls for it are ignored.
    pub fn mark_deleted(&mut self, id: &ThreadId) -> Option<ConversationDetail> {
        self.deleted.insert(id.clone());
        self.details.remove(id)
    }

    pub fn is_deleted(&self, id: &ThreadId) -> bool {
        self.deleted.contains(id)
    }

    /// Current staleness epoch of the thread-summary list.
    pub fn list_epoch(&self) -> u64 {
        self.list_epoch
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}
