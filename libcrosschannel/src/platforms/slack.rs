//! Slack platform implementation
//!
//! Posts to a single channel with a bot or user token. Slack reports API
//! failures as `{"ok": false, "error": "..."}` with HTTP 200, so every
//! response is judged by its `ok` field.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{SlackConfig, DEFAULT_SLACK_API_URL};
use crate::error::PlatformError;
use crate::platforms::{body_text, is_blank, Platform, PlatformResult, Published};
use crate::session::SessionStore;

const NAME: &str = "slack";

/// Persisted as `slack_session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackSession {
    pub token: String,
    pub channel: String,
}

pub struct SlackDriver {
    config: Option<SlackConfig>,
    store: SessionStore,
    client: Client,
}

impl SlackDriver {
    pub fn new(config: Option<SlackConfig>, store: SessionStore, client: Client) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        let base = self
            .config
            .as_ref()
            .map(|c| c.api_url.as_str())
            .unwrap_or(DEFAULT_SLACK_API_URL)
            .trim_end_matches('/');
        format!("{}/{}", base, method)
    }
}

/// Returns the parsed body when Slack reports `ok: true`, or the error code
fn check_ok(status: reqwest::StatusCode, body: &str) -> Result<Value, (String, Option<Value>)> {
    match serde_json::from_str::<Value>(body) {
        Ok(json) if json.get("ok").and_then(Value::as_bool) == Some(true) => Ok(json),
        Ok(json) => {
            let code = json
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Err((code, Some(json)))
        }
        Err(_) => Err((format!("HTTP {}: {}", status.as_u16(), body), None)),
    }
}

#[async_trait]
impl Platform for SlackDriver {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self) -> PlatformResult<()> {
        let config = self.config.as_ref().ok_or_else(|| {
            PlatformError::Configuration("Slack token and channel are not configured".into())
        })?;
        if config.token.is_empty() || config.channel.is_empty() {
            return Err(PlatformError::Configuration(
                "Slack token and channel must not be empty".into(),
            ));
        }

        let response = self
            .client
            .post(self.api_url("auth.test"))
            .bearer_auth(&config.token)
            .send()
            .await?;

        let status = response.status();
        let body = body_text(response).await;
        if let Err((code, _)) = check_ok(status, &body) {
            return Err(PlatformError::Authentication(format!(
                "Slack authentication failed: {}",
                code
            )));
        }

        let session = SlackSession {
            token: config.token.clone(),
            channel: config.channel.clone(),
        };
        self.store.save_as(NAME, &session).map_err(|e| {
            PlatformError::Authentication(format!("Failed to persist Slack session: {}", e))
        })?;

        Ok(())
    }

    async fn publish(&self, text: &str) -> PlatformResult<Published> {
        if is_blank(text) {
            return Ok(Published::Skipped);
        }

        let session: SlackSession = self.store.load_as(NAME)?;

        let response = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&session.token)
            .json(&json!({ "channel": session.channel, "text": text }))
            .send()
            .await?;

        let status = response.status();
        let body = body_text(response).await;
        match check_ok(status, &body) {
            Ok(json) => Ok(Published::Posted {
                post_id: json.get("ts").and_then(Value::as_str).map(str::to_string),
            }),
            Err((code, raw)) => Err(PlatformError::Posting {
                message: format!("Slack rejected the message: {}", code),
                raw,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn driver(server: &MockServer, temp_dir: &TempDir) -> SlackDriver {
        SlackDriver::new(
            Some(SlackConfig {
                token: "xoxb-123".to_string(),
                channel: "C0123".to_string(),
                api_url: server.uri(),
            }),
            SessionStore::new(temp_dir.path()),
            Client::new(),
        )
    }

    #[tokio::test]
    async fn test_authenticate_and_publish() {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .and(header("Authorization", "Bearer xoxb-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_json(json!({"channel": "C0123", "text": "hello team"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1700000000.000100"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let driver = driver(&server, &temp_dir);
        driver.authenticate().await.unwrap();
        let published = driver.publish("hello team").await.unwrap();

        assert_eq!(published.post_id(), Some("1700000000.000100"));
    }

    #[tokio::test]
    async fn test_authenticate_not_ok_is_authentication_error() {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "invalid_auth"})),
            )
            .mount(&server)
            .await;

        match driver(&server, &temp_dir).authenticate().await {
            Err(PlatformError::Authentication(msg)) => assert!(msg.contains("invalid_auth")),
            other => panic!("Expected authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_not_ok_is_posting_error() {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        SessionStore::new(temp_dir.path())
            .save_as(
                NAME,
                &SlackSession {
                    token: "xoxb-123".to_string(),
                    channel: "C0123".to_string(),
                },
            )
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        match driver(&server, &temp_dir).publish("hi").await {
            Err(PlatformError::Posting { message, raw }) => {
                assert!(message.contains("channel_not_found"));
                assert_eq!(raw.unwrap()["ok"], false);
            }
            other => panic!("Expected posting error, got {:?}", other),
        }
    }
}
