//! Mock platform implementation for testing
//!
//! This module provides a configurable mock platform that can simulate
//! successes, failures, and delays. It's designed for use in integration
//! tests to verify dispatch logic without real credentials or network access.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::platforms::{is_blank, Platform, PlatformResult, Published};

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mock-bluesky")
    pub name: String,

    /// Error to return from `authenticate`, if any
    pub auth_error: Option<PlatformError>,

    /// Error to return from `publish`, if any
    pub post_error: Option<PlatformError>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Number of times authenticate has been called
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Number of times publish reached the (simulated) network
    pub post_call_count: Arc<Mutex<usize>>,

    /// Posts that have been made (for verification)
    pub posted_content: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_error: None,
            post_error: None,
            delay: Duration::from_millis(0),
            auth_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
///
/// Counters are shared through `Arc`, so a clone of the [`MockConfig`] kept
/// by a test still observes calls after the platform moves into a registry.
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_error: Some(PlatformError::Authentication(error.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails posting
    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::with_post_error(name, PlatformError::posting(error))
    }

    /// Create a mock platform whose `publish` fails with a specific error
    pub fn with_post_error(name: &str, error: PlatformError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_error: Some(error),
            ..Default::default()
        })
    }

    /// Create a mock platform with a delay
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Handle to the shared counters, usable after the platform is moved
    pub fn handle(&self) -> MockConfig {
        self.config.clone()
    }

    /// Get the number of times authenticate was called
    pub fn auth_call_count(&self) -> usize {
        self.config.auth_calls()
    }

    /// Get the number of times publish reached the network
    pub fn post_call_count(&self) -> usize {
        self.config.post_calls()
    }

    /// Get all content that was posted
    pub fn posted_content(&self) -> Vec<String> {
        self.config.posted()
    }
}

impl MockConfig {
    pub fn auth_calls(&self) -> usize {
        *self.auth_call_count.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn post_calls(&self) -> usize {
        *self.post_call_count.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn posted(&self) -> Vec<String> {
        self.posted_content
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn authenticate(&self) -> PlatformResult<()> {
        *self
            .config
            .auth_call_count
            .lock()
            .unwrap_or_else(|e| e.into_inner()) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        match &self.config.auth_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn publish(&self, text: &str) -> PlatformResult<Published> {
        if is_blank(text) {
            return Ok(Published::Skipped);
        }

        *self
            .config
            .post_call_count
            .lock()
            .unwrap_or_else(|e| e.into_inner()) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if let Some(error) = &self.config.post_error {
            return Err(error.clone());
        }

        self.config
            .posted_content
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());

        let post_id = format!("{}:mock-{}", self.config.name, uuid::Uuid::new_v4());
        Ok(Published::posted(post_id))
    }
}

/// Raw payload helper for tests that need a structured upstream error
pub fn raw_error(code: i64, message: &str) -> Value {
    serde_json::json!({ "errors": [{ "code": code, "message": message }] })
}
