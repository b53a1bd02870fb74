//! Bluesky platform implementation
//!
//! Talks XRPC directly: `com.atproto.server.createSession` to log in and
//! `com.atproto.repo.createRecord` to post. The full session-creation
//! response is persisted and reused until the next `authenticate`.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{BlueskyConfig, DEFAULT_BLUESKY_SERVICE};
use crate::error::PlatformError;
use crate::platforms::{body_text, is_blank, Platform, PlatformResult, Published};
use crate::session::{Credential, SessionStore};

const NAME: &str = "bluesky";
const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Fields of the stored session that posting depends on
#[derive(Debug, Deserialize)]
struct StoredSession {
    did: String,
    #[serde(rename = "accessJwt")]
    access_jwt: String,
}

pub struct BlueskyDriver {
    config: Option<BlueskyConfig>,
    store: SessionStore,
    client: Client,
}

impl BlueskyDriver {
    pub fn new(config: Option<BlueskyConfig>, store: SessionStore, client: Client) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    fn service(&self) -> &str {
        self.config
            .as_ref()
            .map(|c| c.service.as_str())
            .unwrap_or(DEFAULT_BLUESKY_SERVICE)
            .trim_end_matches('/')
    }

    fn langs(&self) -> Vec<String> {
        self.config
            .as_ref()
            .map(|c| c.langs.clone())
            .unwrap_or_else(|| vec!["ja".to_string()])
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service(), method)
    }
}

#[async_trait]
impl Platform for BlueskyDriver {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self) -> PlatformResult<()> {
        let config = self.config.as_ref().ok_or_else(|| {
            PlatformError::Configuration("Bluesky identifier and password are not configured".into())
        })?;
        if config.identifier.is_empty() || config.password.is_empty() {
            return Err(PlatformError::Configuration(
                "Bluesky identifier and password must not be empty".into(),
            ));
        }

        tracing::debug!(identifier = %config.identifier, "Creating Bluesky session");

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": config.identifier,
                "password": config.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or(status.as_str());
            return Err(PlatformError::Authentication(format!(
                "Bluesky authentication failed: {}",
                status_text
            )));
        }

        let session: Value = response.json().await.map_err(|e| {
            PlatformError::Authentication(format!("Bluesky returned an unreadable session: {}", e))
        })?;
        let credential = Credential::from_value(session).ok_or_else(|| {
            PlatformError::Authentication("Bluesky session response was not a JSON object".into())
        })?;

        self.store.save(NAME, &credential).map_err(|e| {
            PlatformError::Authentication(format!("Failed to persist Bluesky session: {}", e))
        })?;

        tracing::debug!("Bluesky session created");
        Ok(())
    }

    async fn publish(&self, text: &str) -> PlatformResult<Published> {
        if is_blank(text) {
            return Ok(Published::Skipped);
        }

        let session: StoredSession = self.store.load_as(NAME)?;

        tracing::debug!("Posting to Bluesky: {} characters", text.chars().count());

        let body = json!({
            "repo": session.did,
            "collection": POST_COLLECTION,
            "record": {
                "text": text,
                "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "langs": self.langs(),
            },
        });

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = body_text(response).await;
        let parsed: Option<Value> = serde_json::from_str(&raw).ok();

        if let Some(json) = &parsed {
            let error = json.get("error").filter(|e| !e.is_null());
            if let Some(error) = error {
                let code = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
                let message = json
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message");
                return Err(PlatformError::Posting {
                    message: format!("Bluesky rejected the post: {} : {}", code, message),
                    raw: parsed.clone(),
                });
            }
        }

        if !status.is_success() {
            return Err(PlatformError::Posting {
                message: format!("Bluesky returned HTTP {}: {}", status.as_u16(), raw),
                raw: parsed,
            });
        }

        let uri = parsed
            .as_ref()
            .and_then(|json| json.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::debug!(uri = ?uri, "Posted to Bluesky");

        Ok(Published::Posted { post_id: uri })
    }
}
