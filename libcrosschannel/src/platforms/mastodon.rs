//! Mastodon platform implementation
//!
//! Works against any server exposing the Mastodon REST API. The driver never
//! obtains a token itself: `authenticate` only verifies a token supplied by
//! the host and records it together with the instance host.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MastodonConfig;
use crate::error::PlatformError;
use crate::platforms::{base_url, body_text, is_blank, Platform, PlatformResult, Published};
use crate::session::SessionStore;

const NAME: &str = "mastodon";

/// Persisted as `mastodon_session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MastodonSession {
    pub host: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

pub struct MastodonDriver {
    config: Option<MastodonConfig>,
    store: SessionStore,
    client: Client,
}

impl MastodonDriver {
    pub fn new(config: Option<MastodonConfig>, store: SessionStore, client: Client) -> Self {
        Self {
            config,
            store,
            client,
        }
    }
}

#[async_trait]
impl Platform for MastodonDriver {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self) -> PlatformResult<()> {
        let config = self.config.as_ref().ok_or_else(|| {
            PlatformError::Configuration("Mastodon host and token are not configured".into())
        })?;
        if config.host.is_empty() || config.token.is_empty() {
            return Err(PlatformError::Configuration(
                "Mastodon host and token must not be empty".into(),
            ));
        }

        let url = format!(
            "{}/api/v1/accounts/verify_credentials",
            base_url(&config.host)
        );
        tracing::debug!(host = %config.host, "Verifying Mastodon credentials");

        let response = self
            .client
            .get(url)
            .bearer_auth(&config.token)
            .send()
            .await?;

        let status = response.status();
        let body = body_text(response).await;
        if status != StatusCode::OK {
            return Err(PlatformError::Authentication(format!(
                "Mastodon authentication failed: {}",
                body
            )));
        }

        let session = MastodonSession {
            host: config.host.clone(),
            access_token: config.token.clone(),
        };
        self.store.save_as(NAME, &session).map_err(|e| {
            PlatformError::Authentication(format!("Failed to persist Mastodon session: {}", e))
        })?;

        Ok(())
    }

    async fn publish(&self, text: &str) -> PlatformResult<Published> {
        if is_blank(text) {
            return Ok(Published::Skipped);
        }

        let session: MastodonSession = self.store.load_as(NAME)?;
        let url = format!("{}/api/v1/statuses", base_url(&session.host));

        tracing::debug!("Posting to Mastodon: {} characters", text.chars().count());

        let response = self
            .client
            .post(url)
            .bearer_auth(&session.access_token)
            .form(&[("status", text)])
            .send()
            .await?;

        let status = response.status();
        let body = body_text(response).await;
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            return Err(PlatformError::Posting {
                message: format!("Mastodon rejected the post: {}", body),
                raw: parsed,
            });
        }

        let post_id = parsed
            .as_ref()
            .and_then(|json| json.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::debug!(id = ?post_id, "Posted to Mastodon");

        Ok(Published::Posted { post_id })
    }
}
