//! Persisted admin session record (`adminSession`).
//!
//! Writers always replace the whole record, so readers never observe a
//! partially updated session.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::error::SessionStoreError;
use crate::models::RowId;

/// Storage key of the record.
pub const SESSION_KEY: &str = "adminSession";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub authenticated: bool,
    /// Issue time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub admin_id: Option<RowId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    /// SHA-256 of the bearer token handed out at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_hash: Option<String>,
}

impl SessionRecord {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError>;
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Keeps the record as a JSON string, the way browser local storage would.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an arbitrary stored string (possibly not valid JSON).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }
}

fn poisoned() -> SessionStoreError {
    SessionStoreError::Io(std::io::Error::other("session store lock poisoned"))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError> {
        let raw = self.raw.lock().map_err(|_| poisoned())?;
        match raw.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string(record)?;
        *self.raw.lock().map_err(|_| poisoned())? = Some(json);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.raw.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

/// A JSON file holding `{ "adminSession": { ... } }`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, SessionStoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file then rename over the target.
    async fn write_document(&self, doc: &Map<String, Value>) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError> {
        let mut doc = self.read_document().await?;
        match doc.remove(SESSION_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        // An unreadable document is replaced rather than blocking logins.
        let mut doc = self.read_document().await.unwrap_or_default();
        doc.insert(SESSION_KEY.to_string(), serde_json::to_value(record)?);
        self.write_document(&doc).await
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        let mut doc = match self.read_document().await {
            Ok(doc) => doc,
            Err(SessionStoreError::Malformed(_)) => Map::new(),
            Err(e) => return Err(e),
        };
        doc.remove(SESSION_KEY);
        if doc.is_empty() {
            match fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        } else {
            self.write_document(&doc).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SessionRecord {
        SessionRecord {
            authenticated: true,
            timestamp: 1_714_560_000_000,
            admin_id: Some(RowId::from(7_i64)),
            username: Some("admin".to_string()),
            email: Some("admin@example.com".to_string()),
            full_name: Some("Site Admin".to_string()),
            token_hash: None,
        }
    }

    #[test]
    fn test_record_uses_camel_case_keys() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["adminId"], 7);
        assert_eq!(json["fullName"], "Site Admin");
        assert!(json.get("tokenHash").is_none());
    }

    #[tokio::test]
    async fn test_file_store_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/session.json"));

        assert!(store.load().await.unwrap().is_none());
        store.save(&record()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(record()));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        let store = JsonFileStore::new(&path);

        store.save(&record()).await.unwrap();
        store.clear().await.unwrap();
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc, serde_json::json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn test_file_store_reports_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(matches!(store.load().await, Err(SessionStoreError::Malformed(_))));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_keeps_raw_json() {
        let store = MemorySessionStore::new();
        store.save(&record()).await.unwrap();
        assert!(store.raw().unwrap().contains("\"adminId\":7"));

        let broken = MemorySessionStore::with_raw("garbage");
        assert!(broken.load().await.is_err());
    }
}
