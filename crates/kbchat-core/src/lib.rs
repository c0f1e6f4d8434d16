//! Data model shared by every kbchat layer: thread identifiers, messages and their citation
//! sources, and the request/response bodies of the remote conversation service.

pub mod message;
pub mod sources;
pub mod starters;
pub mod thread;
pub mod time;
pub mod wire;

pub use message::{Delivery, Message, Role, Source};
pub use sources::dedup_sources;
pub use starters::{StarterPrompt, UserRole, starter_prompts};
pub use thread::{ConversationDetail, DEFAULT_TITLE, IdError, ThreadId, ThreadSummary};
pub use wire::{ChatRequest, ChatResponse, ConversationList, HealthResponse, StatsResponse};
