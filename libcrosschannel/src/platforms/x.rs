//! X (formerly Twitter) platform implementation
//!
//! Posting uses OAuth 1.0a user context: every request is signed with the
//! four static secrets from configuration. No session is created or stored,
//! so `authenticate` is a no-op.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::config::XConfig;
use crate::error::PlatformError;
use crate::oauth::{self, OAuthCredentials};
use crate::platforms::{body_text, is_blank, Platform, PlatformResult, Published};

const NAME: &str = "x";
const TWEETS_PATH: &str = "/2/tweets";
const UNSUPPORTED_AUTHENTICATION: &str =
    "https://api.twitter.com/2/problems/unsupported-authentication";
const ACCESS_TIER_ERROR_CODE: i64 = 453;

pub struct XDriver {
    config: Option<XConfig>,
    client: Client,
}

impl XDriver {
    pub fn new(config: Option<XConfig>, client: Client) -> Self {
        Self { config, client }
    }

    fn credentials(&self) -> PlatformResult<(OAuthCredentials, String)> {
        let config = self.config.as_ref().ok_or_else(|| {
            PlatformError::Configuration("X API credentials are not configured".into())
        })?;

        let credentials = OAuthCredentials::from(config);
        credentials.validate()?;

        let url = format!("{}{}", config.api_url.trim_end_matches('/'), TWEETS_PATH);
        Ok((credentials, url))
    }
}

impl From<&XConfig> for OAuthCredentials {
    fn from(config: &XConfig) -> Self {
        OAuthCredentials {
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            token: config.access_token.clone(),
            token_secret: config.access_token_secret.clone(),
        }
    }
}

#[async_trait]
impl Platform for XDriver {
    fn name(&self) -> &str {
        NAME
    }

    async fn authenticate(&self) -> PlatformResult<()> {
        Ok(())
    }

    async fn publish(&self, text: &str) -> PlatformResult<Published> {
        if is_blank(text) {
            return Ok(Published::Skipped);
        }

        let (credentials, url) = self.credentials()?;
        let signed = oauth::sign("POST", &url, &credentials, &[])?;

        tracing::debug!("Posting to X: {} characters", text.chars().count());

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, signed.authorization_header)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        let body = body_text(response).await;
        classify_response(status, &body)
    }
}

/// Map an X API response onto the error taxonomy
fn classify_response(status: StatusCode, body: &str) -> PlatformResult<Published> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(json) = &parsed {
        let problem_status = json.get("status").and_then(Value::as_u64);
        let problem_type = json.get("type").and_then(Value::as_str);
        let forbidden = status == StatusCode::FORBIDDEN || problem_status == Some(403);

        if forbidden && problem_type == Some(UNSUPPORTED_AUTHENTICATION) {
            return Err(PlatformError::Configuration(format!(
                "X rejected the authentication scheme: application-only OAuth 2.0 tokens \
                 cannot post. Use OAuth 1.0a user-context credentials. See \
                 https://developer.x.com/en/support/x-api/error-troubleshooting#unsupported-authentication ({})",
                json.get("detail").and_then(Value::as_str).unwrap_or("403")
            )));
        }

        let first_error = json.pointer("/errors/0");
        if first_error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_i64)
            == Some(ACCESS_TIER_ERROR_CODE)
        {
            let detail = first_error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("access level does not permit this endpoint");
            return Err(PlatformError::Permission {
                message: format!("X access tier insufficient (code 453): {}", detail),
                hint: "Elevated API access is required, see https://developer.x.com/en/portal/product"
                    .to_string(),
                raw: parsed.clone(),
            });
        }

        if status.is_success() && first_error.is_none() {
            let post_id = json
                .pointer("/data/id")
                .and_then(Value::as_str)
                .map(str::to_string);
            tracing::debug!(id = ?post_id, "Posted to X");
            return Ok(Published::Posted { post_id });
        }
    }

    Err(PlatformError::Posting {
        message: format!("X rejected the post (HTTP {}): {}", status.as_u16(), body),
        raw: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: String) -> XConfig {
        XConfig {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
            api_url,
        }
    }

    #[test]
    fn test_credentials_from_config() {
        let mut x = config("https://api.x.com".to_string());
        assert!(OAuthCredentials::from(&x).validate().is_ok());

        x.access_token_secret.clear();
        let err = OAuthCredentials::from(&x).validate().unwrap_err();
        assert!(err.to_string().contains("access_token_secret"));
    }

    #[tokio::test]
    async fn test_authenticate_is_noop() {
        let driver = XDriver::new(None, Client::new());
        assert!(driver.authenticate().await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_signs_and_posts_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "1445880548472328192", "text": "Hello"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let driver = XDriver::new(Some(config(server.uri())), Client::new());
        let published = driver.publish("Hello").await.unwrap();
        assert_eq!(published.post_id(), Some("1445880548472328192"));

        let requests = server.received_requests().await.unwrap();
        let auth = requests[0]
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(auth.starts_with("OAuth "));
        assert!(auth.contains("oauth_consumer_key=\"ck\""));
        assert!(auth.contains("oauth_token=\"at\""));
        assert!(auth.contains("oauth_signature=\""));

        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body, json!({"text": "Hello"}));
    }

    #[tokio::test]
    async fn test_publish_access_tier_error_is_permission_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "errors": [{
                    "code": 453,
                    "message": "You currently have access to a subset of X API V2 endpoints"
                }]
            })))
            .mount(&server)
            .await;

        let driver = XDriver::new(Some(config(server.uri())), Client::new());
        match driver.publish("Hello").await {
            Err(PlatformError::Permission { message, hint, raw }) => {
                assert!(message.contains("453"));
                assert!(hint.contains("developer.x.com"));
                assert_eq!(raw.unwrap()["errors"][0]["code"], 453);
            }
            other => panic!("Expected permission error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_missing_secret_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut incomplete = config(server.uri());
        incomplete.consumer_secret = String::new();
        let driver = XDriver::new(Some(incomplete), Client::new());

        assert!(matches!(
            driver.publish("Hello").await,
            Err(PlatformError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_blank_text_without_config_is_skipped() {
        let driver = XDriver::new(None, Client::new());
        assert_eq!(driver.publish("").await.unwrap(), Published::Skipped);
    }

    #[test]
    fn test_classify_unsupported_authentication() {
        let body = json!({
            "title": "Unsupported Authentication",
            "detail": "Authenticating with OAuth 2.0 Application-Only is forbidden for this endpoint.",
            "type": "https://api.twitter.com/2/problems/unsupported-authentication",
            "status": 403
        })
        .to_string();

        match classify_response(StatusCode::FORBIDDEN, &body) {
            Err(PlatformError::Configuration(msg)) => {
                assert!(msg.contains("OAuth 1.0a"));
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_problem_status_in_body_only() {
        let body = json!({
            "type": "https://api.twitter.com/2/problems/unsupported-authentication",
            "status": 403
        })
        .to_string();

        assert!(matches!(
            classify_response(StatusCode::OK, &body),
            Err(PlatformError::Configuration(_))
        ));
    }

    #[test]
    fn test_classify_other_errors_are_posting_errors() {
        let duplicate = json!({
            "detail": "You are not allowed to create a Tweet with duplicate content.",
            "type": "about:blank",
            "status": 403
        })
        .to_string();
        assert!(matches!(
            classify_response(StatusCode::FORBIDDEN, &duplicate),
            Err(PlatformError::Posting { .. })
        ));

        assert!(matches!(
            classify_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            Err(PlatformError::Posting { raw: None, .. })
        ));

        let errors_on_200 = json!({"errors": [{"code": 187, "message": "Status is a duplicate."}]})
            .to_string();
        assert!(matches!(
            classify_response(StatusCode::OK, &errors_on_200),
            Err(PlatformError::Posting { .. })
        ));
    }
}
