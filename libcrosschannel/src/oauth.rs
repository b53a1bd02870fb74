//! OAuth 1.0a request signing (HMAC-SHA1, user context)
//!
//! The signer is a pure function of its inputs apart from the nonce and
//! timestamp, which [`sign`] generates fresh for every call. Tests and
//! interoperability checks use [`sign_with`] to pin both.
//!
//! JSON request bodies are never part of the signature base string. Only
//! query parameters or form-encoded bodies may be passed as `extra_params`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use sha1::Sha1;

use crate::error::PlatformError;

/// RFC 3986 unreserved characters (`A-Za-z0-9-._~`) stay as-is; everything
/// else is escaped, including `!*'()`.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;
const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The four static user-context secrets
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl OAuthCredentials {
    /// Reject empty secrets before anything touches the network
    pub fn validate(&self) -> Result<(), PlatformError> {
        let missing: Vec<&str> = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.token),
            ("access_token_secret", &self.token_secret),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PlatformError::Configuration(format!(
                "missing OAuth 1.0a credentials: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Output of a signing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Value for the `Authorization` header, starting with `OAuth `
    pub authorization_header: String,
    pub nonce: String,
    pub timestamp: u64,
    pub signature: String,
}

/// Sign a request with a freshly generated nonce and the current time
pub fn sign(
    method: &str,
    url: &str,
    credentials: &OAuthCredentials,
    extra_params: &[(String, String)],
) -> Result<SignedRequest, PlatformError> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| PlatformError::Configuration(format!("system clock before epoch: {e}")))?
        .as_secs();

    sign_with(
        method,
        url,
        credentials,
        extra_params,
        &generate_nonce(),
        timestamp,
    )
}

/// Sign a request with a caller-supplied nonce and timestamp
pub fn sign_with(
    method: &str,
    url: &str,
    credentials: &OAuthCredentials,
    extra_params: &[(String, String)],
    nonce: &str,
    timestamp: u64,
) -> Result<SignedRequest, PlatformError> {
    credentials.validate()?;

    let timestamp_str = timestamp.to_string();
    let mut oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp_str.as_str()),
        ("oauth_token", credentials.token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let param_string = parameter_string(&oauth_params, extra_params);
    let base = base_string(method, url, &param_string);
    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.token_secret)
    );
    let signature = hmac_sha1(&signing_key, &base)?;

    oauth_params.push(("oauth_signature", signature.as_str()));
    let header = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(SignedRequest {
        authorization_header: format!("OAuth {header}"),
        nonce: nonce.to_string(),
        timestamp,
        signature,
    })
}

/// Percent-encode a string according to RFC 3986
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Encoded, sorted `key=value&...` string over OAuth and extra parameters
fn parameter_string(oauth_params: &[(&str, &str)], extra_params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            extra_params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn base_string(method: &str, url: &str, param_string: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(param_string)
    )
}

/// 32 random lowercase base36 characters
fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

/// Compute HMAC-SHA1 and return the base64-encoded digest
fn hmac_sha1(key: &str, data: &str) -> Result<String, PlatformError> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| PlatformError::Configuration(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
