//! Cross-Channel - publish one message to many social networks
//!
//! This library provides the platform drivers (Bluesky, Mastodon, X, Slack),
//! the per-platform session store, an OAuth 1.0a request signer and the
//! publisher that fans a message out with per-target failure isolation.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod oauth;
pub mod platforms;
pub mod publisher;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{CrossChannelError, PlatformError, Result};
pub use events::{Event, EventBus, LogNotifier, Notifier};
pub use platforms::{Platform, PlatformId, Published};
pub use publisher::{
    DispatchMode, DispatchSummary, OutcomeStatus, PublishOutcome, PublishRequest, Publisher,
};
pub use registry::Registry;
pub use session::{Credential, SessionStore};
