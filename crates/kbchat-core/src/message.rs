use serde::{Deserialize, Serialize};

use crate::sources::dedup_sources;
use crate::time::now_timestamp;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A reference excerpt the assistant cited. `source` is the citation key used for de-duplication.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub source: String,
    #[serde(default)]
    pub chunk_text: String,
    #[serde(default)]
    pub chunk_index: i64,
}

/// Client-side delivery state of a message. Never sent over the wire.
///
/// Everything the server hands back is `Delivered`; only the optimistic user message of a chat
/// turn passes through `Sending`, ending in `Delivered` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    #[default]
    Delivered,
    Sending,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Only assistant messages carry sources; `None` and `Some(vec![])` are both "no citations".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip)]
    pub delivery: Delivery,
    /// Local chat turn that produced this message; `None` for anything the server handed back.
    #[serde(skip)]
    pub local_turn: Option<u64>,
}

impl Message {
    /// A user message stamped with the client clock.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(now_timestamp()),
            sources: None,
            delivery: Delivery::Delivered,
            local_turn: None,
        }
    }

    /// An assistant reply stamped with the client clock.
    pub fn assistant(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(now_timestamp()),
            sources: Some(sources),
            delivery: Delivery::Delivered,
            local_turn: None,
        }
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_turn(mut self, turn: u64) -> Self {
        self.local_turn = Some(turn);
        self
    }

    /// Drops the client-only state, leaving what the server would hand back.
    pub fn settled(mut self) -> Self {
        self.delivery = Delivery::Delivered;
        self.local_turn = None;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Sources as they should be displayed: de-duplicated by citation key, first occurrence wins.
    pub fn display_sources(&self) -> Vec<Source> {
        match (&self.role, &self.sources) {
            (Role::Assistant, Some(sources)) => dedup_sources(sources),
            _ => Vec::new(),
        }
    }
}
