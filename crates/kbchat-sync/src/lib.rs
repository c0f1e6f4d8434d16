//! Client-side conversation synchronization.
//!
//! The state machines in this crate are synchronous and do no I/O:
//!
//! - [`ConversationCache`]: canonical per-thread detail and the thread-list staleness epoch
//! - [`ThreadSelectionController`]: the active thread and its visible log
//! - [`OptimisticChatMutation`]: one chat turn from dispatch to settlement
//! - [`ThreadListController`]: sorted sidebar summaries, rename and delete bookkeeping
//!
//! [`ChatEngine`] drives them against a [`kbchat_api::ChatBackend`] and publishes what changed
//! on an [`EventBus`].

pub mod cache;
pub mod engine;
pub mod event_bus;
pub mod mutation;
pub mod selection;
pub mod thread_list;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{CacheScope, ConversationCache};
pub use engine::{ChatEngine, EngineSnapshot, SyncState};
pub use event_bus::{ErrorEvent, EventBus, EventBusCaps, EventBusPolicy, EventPriority, SyncEvent};
pub use mutation::{OptimisticChatMutation, TurnOutcome, TurnState, TurnTicket};
pub use selection::{LoadState, LoadTicket, Selection, ThreadSelectionController};
pub use thread_list::{ListTicket, ThreadListController, sort_by_recency};
