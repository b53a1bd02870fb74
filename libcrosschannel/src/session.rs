//! Persisted per-platform sessions
//!
//! Each platform that keeps state between runs owns exactly one JSON document,
//! `<root>/<platform>_session.json`. Documents are always read whole and
//! replaced whole: [`SessionStore::save`] writes to a temporary file in the
//! same directory and renames it over the target, so readers never observe a
//! half-written session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, SessionError};

/// Opaque session record: a JSON object of named fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(Map<String, Value>);

impl Credential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// File-backed store of platform sessions
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the root selected by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.session_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a platform's session document
    pub fn path_for(&self, platform: &str) -> PathBuf {
        self.root.join(format!("{}_session.json", platform))
    }

    pub fn exists(&self, platform: &str) -> bool {
        self.path_for(platform).is_file()
    }

    /// Read a platform's session in full
    pub fn load(&self, platform: &str) -> std::result::Result<Credential, SessionError> {
        let value: Value = self.load_as(platform)?;
        let path = self.path_for(platform);
        Credential::from_value(value).ok_or_else(|| SessionError::Corrupt {
            path,
            reason: "expected a JSON object".to_string(),
        })
    }

    /// Read a platform's session and decode it into the driver's own shape.
    ///
    /// A document that does not match `T` is reported as corrupt.
    pub fn load_as<T: DeserializeOwned>(
        &self,
        platform: &str,
    ) -> std::result::Result<T, SessionError> {
        let path = self.path_for(platform);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(path));
            }
            Err(e) => return Err(SessionError::Io(e)),
        };

        serde_json::from_str(&content).map_err(|e| SessionError::Corrupt {
            path,
            reason: e.to_string(),
        })
    }

    /// Replace a platform's session atomically
    pub fn save(
        &self,
        platform: &str,
        credential: &Credential,
    ) -> std::result::Result<(), SessionError> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(platform);
        let tmp_path = self
            .root
            .join(format!(".{}_session.{}.tmp", platform, Uuid::new_v4()));
        let content = serde_json::to_string_pretty(credential)?;

        if let Err(e) = write_private(&tmp_path, content.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(platform, path = %path.display(), "Saved session");
        Ok(())
    }

    /// Serialize a typed session and save it
    pub fn save_as<T: Serialize>(
        &self,
        platform: &str,
        session: &T,
    ) -> std::result::Result<(), SessionError> {
        let value = serde_json::to_value(session)?;
        let credential = Credential::from_value(value).ok_or_else(|| SessionError::Corrupt {
            path: self.path_for(platform),
            reason: "session must serialize to a JSON object".to_string(),
        })?;
        self.save(platform, &credential)
    }

    /// Remove a platform's session. Removing a missing session is not an error.
    pub fn delete(&self, platform: &str) -> std::result::Result<(), SessionError> {
        match fs::remove_file(self.path_for(platform)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write a new file readable only by the owner (sessions hold bearer tokens)
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn bluesky_session() -> Credential {
        Credential::new()
            .with("did", "did:plc:abc123")
            .with("handle", "me.bsky.social")
            .with("accessJwt", "access-token")
            .with("refreshJwt", "refresh-token")
            .with("active", true)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        let credential = bluesky_session();

        store.save("bluesky", &credential).unwrap();
        let loaded = store.load("bluesky").unwrap();

        assert_eq!(loaded, credential);
        assert_eq!(loaded.get_str("accessJwt"), Some("access-token"));
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("config");
        let store = SessionStore::new(&root);

        store
            .save("mastodon", &Credential::new().with("host", "example.com"))
            .unwrap();

        assert!(root.join("mastodon_session.json").is_file());
    }

    #[test]
    fn test_save_replaces_whole_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());

        store.save("bluesky", &bluesky_session()).unwrap();
        let replacement = Credential::new().with("did", "did:plc:other");
        store.save("bluesky", &replacement).unwrap();

        let loaded = store.load("bluesky").unwrap();
        assert_eq!(loaded, replacement);
        assert!(loaded.get("accessJwt").is_none());
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());

        store.save("bluesky", &bluesky_session()).unwrap();
        store.save("bluesky", &bluesky_session()).unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["bluesky_session.json".to_string()]);
    }

    #[test]
    fn test_saved_document_is_pretty_printed() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        store
            .save("mastodon", &Credential::new().with("host", "example.com"))
            .unwrap();

        let raw = fs::read_to_string(store.path_for("mastodon")).unwrap();
        assert!(raw.contains("\n  \"host\": \"example.com\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        store.save("slack", &Credential::new().with("token", "t")).unwrap();

        let mode = fs::metadata(store.path_for("slack"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());

        match store.load("bluesky") {
            Err(SessionError::NotFound(path)) => {
                assert!(path.ends_with("bluesky_session.json"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        fs::write(store.path_for("bluesky"), "{not json").unwrap();

        assert!(matches!(
            store.load("bluesky"),
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_non_object_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        fs::write(store.path_for("mastodon"), "[1, 2, 3]").unwrap();

        assert!(matches!(
            store.load("mastodon"),
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_as_wrong_shape_is_corrupt() {
        #[derive(Debug, Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            host: String,
        }

        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        store
            .save("mastodon", &Credential::new().with("other", 1))
            .unwrap();

        assert!(matches!(
            store.load_as::<Needs>("mastodon"),
            Err(SessionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        store.save("slack", &Credential::new().with("token", "t")).unwrap();

        assert!(store.exists("slack"));
        store.delete("slack").unwrap();
        assert!(!store.exists("slack"));
        store.delete("slack").unwrap();
    }

    #[test]
    fn test_credential_from_value_requires_object() {
        assert!(Credential::from_value(json!({"a": 1})).is_some());
        assert!(Credential::from_value(json!("string")).is_none());
        assert!(Credential::from_value(json!(null)).is_none());
    }
}
