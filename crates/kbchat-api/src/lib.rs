//! HTTP access to the conversation service.
//!
//! [`ChatBackend`] is the seam the sync engine talks to; [`HttpBackend`] is the reqwest-backed
//! implementation, authenticated from a shared [`SessionContext`].

pub mod backend;
pub mod client;
pub mod error;
pub mod session;

pub use backend::ChatBackend;
pub use client::{ClientConfig, HttpBackend};
pub use error::ApiError;
pub use session::{Credential, SessionContext, Theme};

/// Default number of seconds before an outstanding request is abandoned.
///
/// Covers a full chat turn, which waits on retrieval plus generation server-side.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;
