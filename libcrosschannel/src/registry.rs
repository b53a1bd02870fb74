//! Lookup table from platform identifier to driver

use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::platforms::bluesky::BlueskyDriver;
use crate::platforms::mastodon::MastodonDriver;
use crate::platforms::slack::SlackDriver;
use crate::platforms::x::XDriver;
use crate::platforms::{Platform, PlatformId};
use crate::session::SessionStore;

/// Drivers keyed by their `name()`, in registration order
#[derive(Clone, Default)]
pub struct Registry {
    drivers: Vec<Arc<dyn Platform>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver for every built-in platform.
    ///
    /// Platforms without a configuration section are still registered so
    /// that targeting them reports a configuration error rather than an
    /// unknown platform. All drivers share one HTTP client whose request
    /// timeout follows `defaults.timeout_secs`.
    /// Same as [`Registry::from_config`] with a caller-supplied client
    pub fn with_client(config: &Config, store: SessionStore, client: Client) -> Self {
        let mut registry = Self::new();

        registry.register(BlueskyDriver::new(
            config.bluesky.clone(),
            store.clone(),
            client.clone(),
        ));
        registry.register(MastodonDriver::new(
            config.mastodon.clone(),
            store.clone(),
            client.clone(),
        ));
        registry.register(XDriver::new(config.x.clone(), client.clone()));
        registry.register(SlackDriver::new(config.slack.clone(), store, client));

        tracing::debug!(platforms = ?registry.names(), "Registered platform drivers");
        registry
    }

    /// Add a driver, replacing any driver already registered under its name
    pub fn register<P: Platform + 'static>(&mut self, driver: P) {
        self.register_arc(Arc::new(driver));
    }

    pub fn register_arc(&mut self, driver: Arc<dyn Platform>) {
        match self
            .drivers
            .iter_mut()
            .find(|existing| existing.name() == driver.name())
        {
            Some(slot) => *slot = driver,
            None => self.drivers.push(driver),
        }
    }

    /// Look up a driver by name.
    ///
    /// Built-in names are matched case-insensitively and accept their aliases
    /// (`twitter`, `bsky`); any other name must match exactly.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Platform>> {
        let canonical = match name.parse::<PlatformId>() {
            Ok(id) => id.as_str().to_string(),
            Err(_) => name.to_string(),
        };
        self.drivers
            .iter()
            .find(|driver| driver.name() == canonical)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::MockPlatform;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_registers_every_builtin_platform() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_toml(
            r#"
            [mastodon]
            host = "mastodon.social"
            token = "t"
            "#,
        )
        .unwrap();

        let registry = Registry::from_config(&config, SessionStore::new(temp_dir.path())).unwrap();

        assert_eq!(registry.names(), vec!["bluesky", "mastodon", "x", "slack"]);
        assert!(registry.get("bluesky").is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_platform_reports_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Registry::with_client(
            &Config::default(),
            SessionStore::new(temp_dir.path()),
            Client::new(),
        );

        let bluesky = registry.get("bluesky").unwrap();
        assert!(matches!(
            bluesky.authenticate().await,
            Err(PlatformError::Configuration(_))
        ));

        let x = registry.get("x").unwrap();
        assert!(matches!(
            x.publish("hello").await,
            Err(PlatformError::Configuration(_))
        ));
    }

    #[test]
    fn test_get_accepts_aliases_and_case() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            x: Some(Default::default()),
            ..Default::default()
        };
        let registry = Registry::with_client(
            &config,
            SessionStore::new(temp_dir.path()),
            Client::new(),
        );

        assert_eq!(registry.get("twitter").unwrap().name(), "x");
        assert_eq!(registry.get("X").unwrap().name(), "x");
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = Registry::new();
        registry.register(MockPlatform::success("mock-a"));
        registry.register(MockPlatform::success("mock-b"));
        registry.register(MockPlatform::post_failure("mock-a", "replaced"));

        assert_eq!(registry.names(), vec!["mock-a", "mock-b"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_unknown_name() {
        let mut registry = Registry::new();
        registry.register(MockPlatform::success("mock-a"));

        assert!(registry.get("myspace").is_none());
        assert!(registry.get("MOCK-A").is_none());
    }
}
