//! Sidebar thread list: sorted summaries plus the bookkeeping after rename and delete.

use std::cmp::Reverse;

use kbchat_core::{ThreadId, ThreadSummary, time::parse_timestamp};

use crate::{CacheScope, ConversationCache, Selection, ThreadSelectionController};

/// Handed out by [`ThreadListController::begin_refresh`]; records which list epoch the fetch
/// answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTicket {
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct ThreadListController {
    summaries: Vec<ThreadSummary>,
    synced_epoch: Option<u64>,
}

impl ThreadListController {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until a fetch started after the latest invalidation has been applied.
    pub fn needs_refresh(&self, cache: &ConversationCache) -> bool {
        self.synced_epoch != Some(cache.list_epoch())
    }

    pub fn begin_refresh(&self, cache: &ConversationCache) -> ListTicket {
        ListTicket {
            epoch: cache.list_epoch(),
        }
    }

    /// Stores a fetched list, newest activity first.
    ///
    /// An invalidation that landed while the fetch was in flight keeps the list stale.
    pub fn apply(&mut self, ticket: ListTicket, summaries: Vec<ThreadSummary>) -> &[ThreadSummary] {
        self.summaries = sort_by_recency(summaries);
        self.synced_epoch = Some(ticket.epoch);
        &self.summaries
    }

    pub fn summaries(&self) -> &[ThreadSummary] {
        &self.summaries
    }

    /// Trimmed rename title, or `None` when nothing is left to send.
    pub fn rename_title(title: &str) -> Option<&str> {
        let title = title.trim();
        (!title.is_empty()).then_some(title)
    }

    pub fn after_rename(&mut self, cache: &mut ConversationCache, id: &ThreadId, title: &str) {
        cache.set_title(id, title);
        if let Some(summary) = self.summaries.iter_mut().find(|s| &s.thread_id == id) {
            summary.title = title.to_string();
        }
        cache.invalidate(CacheScope::ThreadList);
    }

    /// Drops every local trace of `id`, including any a late turn or fetch would write back.
    /// Returns `true` when it was the active thread and the selection fell back to a draft.
    pub fn after_delete(
        &mut self,
        cache: &mut ConversationCache,
        selection: &mut ThreadSelectionController,
        id: &ThreadId,
    ) -> bool {
        cache.mark_deleted(id);
        self.summaries.retain(|s| &s.thread_id != id);
        cache.invalidate(CacheScope::ThreadList);

        if selection.active() == Some(id) {
            let cleared = selection.select(None, cache);
            debug_assert_eq!(cleared, Selection::Draft);
            return true;
        }
        false
    }
}

/// Sorts by `updated_at` descending. The sort is stable; unparseable timestamps go last.
pub fn sort_by_recency(mut summaries: Vec<ThreadSummary>) -> Vec<ThreadSummary> {
    summaries.sort_by_cached_key(|s| Reverse(parse_timestamp(&s.updated_at)));
    summaries
}
