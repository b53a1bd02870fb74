//! Platform abstraction and implementations
//!
//! Every supported network is a driver implementing [`Platform`]. A driver
//! owns one wire protocol and exposes exactly two capabilities: establish or
//! verify a session ([`Platform::authenticate`]) and publish text
//! ([`Platform::publish`]).
//!
//! # Examples
//!
//! ```no_run
//! use libcrosschannel::config::MastodonConfig;
//! use libcrosschannel::platforms::{mastodon::MastodonDriver, Platform};
//! use libcrosschannel::session::SessionStore;
//!
//! # async fn example() -> Result<(), libcrosschannel::error::PlatformError> {
//! let store = SessionStore::new("/tmp/cross-channel");
//! let config = MastodonConfig {
//!     host: "mastodon.social".to_string(),
//!     token: "access-token".to_string(),
//! };
//! let driver = MastodonDriver::new(Some(config), store, reqwest::Client::new());
//!
//! driver.authenticate().await?;
//! let published = driver.publish("Hello from every channel").await?;
//! println!("{:?}", published.post_id());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::error::PlatformError;

pub mod bluesky;
pub mod mastodon;
pub mod slack;
pub mod x;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Result type for driver operations
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Platform trait for unified publish operations
///
/// Drivers take `&self` for both operations so a registry can hand out
/// shared references and the publisher can run targets concurrently.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase identifier, also used to name the session file
    fn name(&self) -> &str;

    /// Establish or verify a session with the platform.
    ///
    /// This is the only operation that writes the platform's session.
    ///
    /// # Errors
    ///
    /// - `PlatformError::Configuration` if required settings are missing
    /// - `PlatformError::Authentication` if the platform rejects the credentials
    /// - `PlatformError::Network` / `PlatformError::Timeout` on transport failure
    async fn authenticate(&self) -> PlatformResult<()>;

    /// Publish text to the platform.
    ///
    /// Blank text is a no-op that returns [`Published::Skipped`] without any
    /// network activity.
    ///
    /// # Errors
    ///
    /// - `PlatformError::Authentication` if no usable session is stored
    /// - `PlatformError::Posting` / `PlatformError::Permission` if the
    ///   platform rejects the post
    async fn publish(&self, text: &str) -> PlatformResult<Published>;
}

/// Successful publish result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// The platform accepted the post
    Posted {
        /// Platform-specific identifier (AT URI, status id, tweet id, ts)
        post_id: Option<String>,
    },
    /// Nothing to publish
    Skipped,
}

impl Published {
    pub fn posted(post_id: impl Into<String>) -> Self {
        Published::Posted {
            post_id: Some(post_id.into()),
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            Published::Posted { post_id } => post_id.as_deref(),
            Published::Skipped => None,
        }
    }
}

/// Empty or whitespace-only text is never sent
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// The closed set of built-in platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformId {
    Bluesky,
    Mastodon,
    X,
    Slack,
}

impl PlatformId {
    pub const ALL: [PlatformId; 4] = [
        PlatformId::Bluesky,
        PlatformId::Mastodon,
        PlatformId::X,
        PlatformId::Slack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Bluesky => "bluesky",
            PlatformId::Mastodon => "mastodon",
            PlatformId::X => "x",
            PlatformId::Slack => "slack",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bluesky" | "bsky" => Ok(PlatformId::Bluesky),
            "mastodon" => Ok(PlatformId::Mastodon),
            "x" | "twitter" => Ok(PlatformId::X),
            "slack" => Ok(PlatformId::Slack),
            other => Err(format!(
                "Unknown platform: '{}'. Valid options: bluesky, mastodon, x, slack",
                other
            )),
        }
    }
}

/// Read a response body as text, never failing the caller over it
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable response body: {}>", e),
    }
}

/// Prefix `https://` unless the host already names a scheme
pub(crate) fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_id_round_trip_names() {
        for id in PlatformId::ALL {
            assert_eq!(id.as_str().parse::<PlatformId>().unwrap(), id);
            assert_eq!(id.to_string(), id.as_str());
        }
    }

    #[test]
    fn test_platform_id_aliases_and_case() {
        assert_eq!("Twitter".parse::<PlatformId>().unwrap(), PlatformId::X);
        assert_eq!("BLUESKY".parse::<PlatformId>().unwrap(), PlatformId::Bluesky);
        assert_eq!(" bsky ".parse::<PlatformId>().unwrap(), PlatformId::Bluesky);
    }

    #[test]
    fn test_platform_id_unknown() {
        let err = "myspace".parse::<PlatformId>().unwrap_err();
        assert!(err.contains("Unknown platform: 'myspace'"));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_blank("\n\t \n"));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("example.com"), "https://example.com");
        assert_eq!(base_url("example.com/"), "https://example.com");
        assert_eq!(base_url("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
        assert_eq!(base_url("https://mastodon.social"), "https://mastodon.social");
    }

    #[test]
    fn test_published_post_id() {
        assert_eq!(Published::posted("123").post_id(), Some("123"));
        assert_eq!(Published::Skipped.post_id(), None);
        assert_eq!(Published::Posted { post_id: None }.post_id(), None);
    }
}
