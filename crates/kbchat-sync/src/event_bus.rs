use std::sync::Arc;

use kbchat_core::ThreadId;
use kbchat_error::{Error, ErrorPolicy, Severity};
use tokio::sync::broadcast;
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPriority {
    Realtime,
    Background,
}

/// State changes a front end redraws on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The visible log changed; `len` is its new length.
    LogUpdated { len: usize },
    SelectionChanged(Option<ThreadId>),
    /// A draft became a server thread.
    ThreadPromoted(ThreadId),
    ThreadListInvalidated,
    /// A chat turn failed. Front ends show this as a blocking notification.
    TurnFailed { message: String },
    /// Rendered inline in place of the message log.
    HistoryLoadFailed { thread_id: ThreadId, message: String },
    ThreadDeleted(ThreadId),
    ThreadRenamed { thread_id: ThreadId, title: String },
}

impl SyncEvent {
    pub fn priority(&self) -> EventPriority {
        match self {
            SyncEvent::ThreadListInvalidated
            | SyncEvent::ThreadDeleted(_)
            | SyncEvent::ThreadRenamed { .. } => EventPriority::Background,
            _ => EventPriority::Realtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug)]
pub struct EventBus {
    realtime_tx: broadcast::Sender<SyncEvent>,
    background_tx: broadcast::Sender<SyncEvent>,
    error_tx: broadcast::Sender<ErrorEvent>,
}

/// Convenience struct to help with the initialization of EventBus
#[derive(Clone, Copy, Debug)]
pub struct EventBusCaps {
    pub realtime_cap: usize,
    pub background_cap: usize,
    pub error_cap: usize,
}

impl Default for EventBusCaps {
    fn default() -> Self {
        Self {
            realtime_cap: 100,
            background_cap: 1000,
            error_cap: 1000,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusCaps::default())
    }
}

impl EventBus {
    pub fn new(b: EventBusCaps) -> Self {
        Self {
            realtime_tx: broadcast::channel(b.realtime_cap).0,
            background_tx: broadcast::channel(b.background_cap).0,
            error_tx: broadcast::channel(b.error_cap).0,
        }
    }

    #[instrument(skip(self), level = "trace")]
    pub fn send(&self, event: SyncEvent) {
        let tx = match event.priority() {
            EventPriority::Realtime => &self.realtime_tx,
            EventPriority::Background => &self.background_tx,
        };
        let _ = tx.send(event); // Ignore receiver count
    }

    pub fn send_error(&self, message: String, severity: Severity) {
        let _ = self.error_tx.send(ErrorEvent { message, severity }); // Ignore receiver count
    }

    pub fn subscribe(&self, priority: EventPriority) -> broadcast::Receiver<SyncEvent> {
        match priority {
            EventPriority::Realtime => self.realtime_tx.subscribe(),
            EventPriority::Background => self.background_tx.subscribe(),
        }
    }

    pub fn error_subscriber(&self) -> broadcast::Receiver<ErrorEvent> {
        self.error_tx.subscribe()
    }
}

/// Publishes every emitted error on the bus's error channel.
#[derive(Debug, Clone)]
pub struct EventBusPolicy {
    bus: Arc<EventBus>,
}

impl EventBusPolicy {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl ErrorPolicy for EventBusPolicy {
    fn classify(&self, error: &Error) -> Severity {
        error.severity()
    }

    fn emit(&self, error: &Error) {
        self.bus.send_error(error.to_string(), self.classify(error));
    }
}

#[cfg(test)]
mod tests {
    use kbchat_error::CombinedPolicy;

    use super::*;

    #[tokio::test]
    async fn routes_by_priority() {
        let bus = EventBus::default();
        let mut rt = bus.subscribe(EventPriority::Realtime);
        let mut bg = bus.subscribe(EventPriority::Background);

        bus.send(SyncEvent::ThreadListInvalidated);
        bus.send(SyncEvent::LogUpdated { len: 1 });

        assert_eq!(rt.recv().await.unwrap(), SyncEvent::LogUpdated { len: 1 });
        assert_eq!(bg.recv().await.unwrap(), SyncEvent::ThreadListInvalidated);
        assert!(rt.try_recv().is_err());
    }

    #[tokio::test]
    async fn errors_have_their_own_channel() {
        let bus = EventBus::default();
        let mut errs = bus.error_subscriber();
        bus.send_error("Network error: refused".into(), Severity::Error);

        let ev = errs.recv().await.unwrap();
        assert_eq!(ev.severity, Severity::Error);
        assert!(ev.message.contains("refused"));
    }

    #[tokio::test]
    async fn policy_forwards_errors_with_their_severity() {
        let bus = Arc::new(EventBus::default());
        let mut errs = bus.error_subscriber();
        let policy = CombinedPolicy::new().push(EventBusPolicy::new(Arc::clone(&bus)));

        policy.emit(&Error::Auth("Could not validate credentials".into()));
        policy.emit(&Error::Config("unreadable config".into()));

        let first = errs.recv().await.unwrap();
        assert_eq!(first.severity, Severity::Fatal);
        assert!(first.message.contains("Could not validate credentials"));
        assert_eq!(errs.recv().await.unwrap().severity, Severity::Warning);
    }

    #[test]
    fn sending_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.send(SyncEvent::TurnFailed {
            message: "boom".into(),
        });
    }
}
