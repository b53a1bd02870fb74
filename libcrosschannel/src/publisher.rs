//! Multi-platform publish orchestration
//!
//! A [`Publisher`] takes one message and a list of target platforms, then for
//! each target authenticates and publishes through the registered driver.
//! Failures are isolated: every processed target yields exactly one
//! [`PublishOutcome`], and one target's failure never stops the others.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_TIMEOUT_SECS};
use crate::error::PlatformError;
use crate::events::{Event, LogNotifier, Notifier};
use crate::platforms::{is_blank, PlatformResult, Published};
use crate::registry::Registry;

/// Text plus an ordered list of target identifiers (duplicates allowed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub text: String,
    pub targets: Vec<String>,
}

impl PublishRequest {
    pub fn new<I, S>(text: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    AuthFailed,
    PublishFailed,
}

/// Result of processing a single target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub platform: String,
    pub status: OutcomeStatus,
    /// Human-readable description of what happened
    pub detail: String,
    /// Structured error payload returned by the platform, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<Value>,
    #[serde(skip)]
    pub error: Option<PlatformError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// True when the text was blank and nothing was sent
    #[serde(default)]
    pub skipped: bool,
}

impl PublishOutcome {
    pub fn success(platform: &str, published: Published) -> Self {
        let skipped = published == Published::Skipped;
        let post_id = published.post_id().map(str::to_string);
        let detail = match (&post_id, skipped) {
            (_, true) => "skipped: nothing to publish".to_string(),
            (Some(id), false) => format!("posted ({})", id),
            (None, false) => "posted".to_string(),
        };
        Self {
            platform: platform.to_string(),
            status: OutcomeStatus::Success,
            detail,
            raw_error: None,
            error: None,
            post_id,
            skipped,
        }
    }

    pub fn auth_failed(platform: &str, error: PlatformError) -> Self {
        Self::failed(platform, OutcomeStatus::AuthFailed, error)
    }

    pub fn publish_failed(platform: &str, error: PlatformError) -> Self {
        Self::failed(platform, OutcomeStatus::PublishFailed, error)
    }

    pub fn unknown_platform(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            status: OutcomeStatus::PublishFailed,
            detail: "unknown platform".to_string(),
            raw_error: None,
            error: None,
            post_id: None,
            skipped: false,
        }
    }

    fn failed(platform: &str, status: OutcomeStatus, error: PlatformError) -> Self {
        Self {
            platform: platform.to_string(),
            status,
            detail: error.to_string(),
            raw_error: error.raw().cloned(),
            error: Some(error),
            post_id: None,
            skipped: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// One-line notification text
    pub fn message(&self) -> String {
        match self.status {
            OutcomeStatus::Success => format!("{}: {}", self.platform, self.detail),
            OutcomeStatus::AuthFailed => {
                format!("{}: authentication failed: {}", self.platform, self.detail)
            }
            OutcomeStatus::PublishFailed => {
                format!("{}: publish failed: {}", self.platform, self.detail)
            }
        }
    }
}

/// Counts over a finished (or cancelled) dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Targets that produced no outcome because the dispatch was cancelled
    pub cancelled: usize,
}

impl DispatchSummary {
    pub fn from_outcomes(requested: usize, outcomes: &[PublishOutcome]) -> Self {
        let mut summary = Self {
            requested,
            cancelled: requested.saturating_sub(outcomes.len()),
            ..Default::default()
        };
        for outcome in outcomes {
            match (outcome.status, outcome.skipped) {
                (OutcomeStatus::Success, true) => summary.skipped += 1,
                (OutcomeStatus::Success, false) => summary.succeeded += 1,
                _ => summary.failed += 1,
            }
        }
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// How targets are scheduled within one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One target after another, in request order
    #[default]
    Sequential,
    /// All targets at once; outcomes are still reported in request order
    Concurrent,
}

/// Fans one message out to many platforms with per-target isolation
pub struct Publisher {
    registry: Registry,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    mode: DispatchMode,
}

impl Publisher {
    /// Sequential publisher that notifies through the log
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            notifier: Arc::new(LogNotifier),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            mode: DispatchMode::Sequential,
        }
    }

    /// Publisher with timeout and dispatch mode taken from `[defaults]`
    pub fn from_config(config: &Config, registry: Registry) -> Self {
        let mode = if config.defaults.concurrent {
            DispatchMode::Concurrent
        } else {
            DispatchMode::Sequential
        };
        Self::new(registry)
            .with_timeout(config.timeout())
            .with_mode(mode)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Upper bound for each individual `authenticate` and `publish` call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Publish to every target and return one outcome per target, in order
    pub async fn dispatch(&self, request: &PublishRequest) -> Vec<PublishOutcome> {
        self.dispatch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Publisher::dispatch`], but stops early once `cancel` fires.
    ///
    /// Outcomes completed before cancellation are returned; targets that were
    /// in flight or not yet started produce no outcome.
    pub async fn dispatch_with_cancel(
        &self,
        request: &PublishRequest,
        cancel: &CancellationToken,
    ) -> Vec<PublishOutcome> {
        let dispatch_id = uuid::Uuid::new_v4().to_string();
        info!(
            dispatch_id = %dispatch_id,
            targets = ?request.targets,
            mode = ?self.mode,
            "Dispatching post"
        );
        self.notifier.event(Event::DispatchStarted {
            dispatch_id: dispatch_id.clone(),
            targets: request.targets.clone(),
        });

        let outcomes = match self.mode {
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(request.targets.len());
                for target in &request.targets {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        outcome = self.process_target(target, &request.text) => Some(outcome),
                    };
                    match outcome {
                        Some(outcome) => {
                            self.report(&dispatch_id, &outcome);
                            outcomes.push(outcome);
                        }
                        None => break,
                    }
                }
                outcomes
            }
            DispatchMode::Concurrent => {
                let futures = request.targets.iter().map(|target| async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        outcome = self.process_target(target, &request.text) => Some(outcome),
                    }
                });
                let outcomes: Vec<PublishOutcome> =
                    join_all(futures).await.into_iter().flatten().collect();
                for outcome in &outcomes {
                    self.report(&dispatch_id, outcome);
                }
                outcomes
            }
        };

        let summary = DispatchSummary::from_outcomes(request.targets.len(), &outcomes);
        if summary.cancelled > 0 {
            warn!(
                dispatch_id = %dispatch_id,
                cancelled = summary.cancelled,
                "Dispatch cancelled before all targets completed"
            );
        }
        self.notifier.event(Event::DispatchCompleted {
            dispatch_id,
            summary,
        });

        outcomes
    }

    /// Run only the authentication step for one platform
    pub async fn authenticate(&self, target: &str) -> PlatformResult<()> {
        let driver = self.registry.get(target).ok_or_else(|| {
            PlatformError::Configuration(format!("unknown platform: {}", target))
        })?;
        self.bounded(driver.authenticate()).await
    }

    async fn process_target(&self, target: &str, text: &str) -> PublishOutcome {
        let Some(driver) = self.registry.get(target) else {
            warn!("Skipping unknown platform '{}'", target);
            return PublishOutcome::unknown_platform(target);
        };
        let name = driver.name().to_string();

        // Nothing to send means nothing to authenticate for either
        if is_blank(text) {
            return PublishOutcome::success(&name, Published::Skipped);
        }

        if let Err(e) = self.bounded(driver.authenticate()).await {
            warn!("Authentication failed for {}: {}", name, e);
            return PublishOutcome::auth_failed(&name, e);
        }

        match self.bounded(driver.publish(text)).await {
            Ok(published) => {
                info!("Published to {}", name);
                PublishOutcome::success(&name, published)
            }
            Err(e) => {
                warn!("Failed to publish to {}: {}", name, e);
                PublishOutcome::publish_failed(&name, e)
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = PlatformResult<T>>,
    ) -> PlatformResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(PlatformError::Timeout))
    }

    fn report(&self, dispatch_id: &str, outcome: &PublishOutcome) {
        self.notifier.notify(&outcome.message());
        self.notifier.event(Event::TargetCompleted {
            dispatch_id: dispatch_id.to_string(),
            outcome: outcome.clone(),
        });
    }
}
