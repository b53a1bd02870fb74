//! Notification sink and in-process event bus
//!
//! The publisher reports every processed target as one human-readable
//! message through a [`Notifier`]. Hosts pick the sink: [`LogNotifier`]
//! writes through `tracing`, [`EventBus`] broadcasts structured [`Event`]s
//! to any number of subscribers.
//!
//! # Non-Blocking Behavior
//!
//! If no subscribers exist, events are dropped immediately. Subscribers can
//! lag without blocking the publisher.
//!
//! # Example
//!
//! ```no_run
//! use libcrosschannel::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::DispatchStarted {
//!     dispatch_id: "abc123".to_string(),
//!     targets: vec!["bluesky".to_string()],
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::publisher::{DispatchSummary, PublishOutcome};

/// Receives one message per dispatch outcome
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);

    /// Structured counterpart of `notify`; ignored by plain sinks
    fn event(&self, _event: Event) {}
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Event bus for distributing dispatch events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// The capacity determines how many events can be buffered per subscriber
    /// before older events are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Notifier for EventBus {
    fn notify(&self, message: &str) {
        self.emit(Event::Notice {
            message: message.to_string(),
        });
    }

    fn event(&self, event: Event) {
        self.emit(event);
    }
}

/// Events emitted during a dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A dispatch began
    DispatchStarted {
        dispatch_id: String,
        targets: Vec<String>,
    },

    /// One target finished (in any state)
    TargetCompleted {
        dispatch_id: String,
        outcome: PublishOutcome,
    },

    /// All targets finished or the dispatch was cancelled
    DispatchCompleted {
        dispatch_id: String,
        summary: DispatchSummary,
    },

    /// Free-form human-readable notification
    Notice { message: String },
}
