use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::message::Message;

/// Title given to a thread the server has not named yet.
pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid thread identifier: {0}")]
    Invalid(&'static str),
}

/// Server-assigned conversation identifier.
///
/// Cheap to clone (shared `Arc<str>`), and borrows as `str` so maps keyed by `ThreadId` can be
/// queried with a plain `&str`. A draft has no `ThreadId`; model it as `Option<ThreadId>`.
#[repr(transparent)]
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ThreadId(Arc<str>);

impl ThreadId {
    pub fn new(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.trim().is_empty() {
            return Err(IdError::Invalid("empty"));
        }
        if s.contains('/') {
            return Err(IdError::Invalid("contains a path separator"));
        }
        Ok(Self(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadId").field(&self.as_str()).finish()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for ThreadId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ThreadId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ThreadId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ThreadId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ThreadId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ThreadId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ThreadId::new(s).map_err(serde::de::Error::custom)
    }
}

/// Sidebar row for one thread, as returned by `GET /conversations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    #[serde(default, deserialize_with = "de_title")]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub message_count: u32,
}

impl ThreadSummary {
    /// Title to show in a list; the server may hand back an empty or null title for
    /// threads it has not named yet.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }
}

/// Title plus the ordered message log of one thread; the unit the conversation cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(default, deserialize_with = "de_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationDetail {
    pub fn new(title: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            title: title.into(),
            messages,
        }
    }

    /// Entry created for a thread the client first learns about from a chat response.
    pub fn untitled(messages: Vec<Message>) -> Self {
        Self::new(DEFAULT_TITLE, messages)
    }
}

// `title` is nullable on the wire for threads that have not been named yet.
fn de_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let title = Option::<String>::deserialize(deserializer)?;
    Ok(title.unwrap_or_else(|| DEFAULT_TITLE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashMap;

    #[test]
    fn thread_id_rejects_blank_and_slashes() {
        assert!(ThreadId::new("   ").is_err());
        assert!(ThreadId::new("a/b").is_err());
        assert_eq!(ThreadId::new("thread_1a2b").unwrap().as_str(), "thread_1a2b");
    }

    #[test]
    fn thread_id_map_lookup_by_str() {
        let mut map = FxHashMap::default();
        map.insert(ThreadId::new("t1").unwrap(), 1);
        assert_eq!(map.get("t1"), Some(&1));
    }

    #[test]
    fn summary_with_null_title_displays_default() {
        let json = r#"{
            "thread_id": "thread_abc",
            "title": null,
            "created_at": "2025-01-01T10:00:00",
            "updated_at": "2025-01-01T10:05:00",
            "message_count": 2
        }"#;
        let summary: ThreadSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.display_title(), DEFAULT_TITLE);
        assert_eq!(summary.message_count, 2);
    }

    #[test]
    fn detail_ignores_extra_server_fields() {
        let json = r#"{
            "thread_id": "thread_abc",
            "title": "Visa questions",
            "created_at": "2025-01-01T10:00:00",
            "updated_at": "2025-01-01T10:05:00",
            "messages": [
                {"role": "user", "content": "hi", "timestamp": "2025-01-01T10:00:00"},
                {"role": "assistant", "content": "hello", "timestamp": "2025-01-01T10:00:01", "sources": null}
            ]
        }"#;
        let detail: ConversationDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.title, "Visa questions");
        assert_eq!(detail.messages.len(), 2);
        assert!(detail.messages[1].sources.is_none());
    }
}
