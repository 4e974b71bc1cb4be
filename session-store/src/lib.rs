//! Session-scoped cache with read-time expiry.
//!
//! Entries are JSON documents holding the cached value plus `storedAt` and
//! `expiresAt`. Nothing evicts in the background: an entry that is expired or
//! cannot be decoded is removed the next time it is read.

pub mod backend;


pub use backend::{FileBackend, MemoryBackend, StorageBackend};

use castlens_core::{AnalysisResult, CacheError, CoreError};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Slot holding the most recent analysis.
pub const ANALYSIS_KEY: &str = "castAnalysis";
/// Slot holding the session identifier.
pub const SESSION_KEY: &str = "fcSession";
pub const DEFAULT_TTL_HOURS: i64 = 24;

pub fn default_ttl() -> Duration {
    Duration::hours(DEFAULT_TTL_HOURS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry<T> {
    #[serde(flatten)]
    pub value: T,
    /// RFC 3339 instant the entry was written.
    pub stored_at: String,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires_at: i64,
}

impl<T> StoredEntry<T> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[derive(Debug)]
pub struct SessionCache<B> {
    backend: B,
}

impl<B: StorageBackend> SessionCache<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn put<T: Serialize>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<StoredEntry<T>, CoreError> {
        self.put_at(key, value, ttl, Utc::now())
    }

    /// Writes `value` under `key`, replacing whatever was there.
    pub fn put_at<T: Serialize>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<StoredEntry<T>, CoreError> {
        let entry = StoredEntry {
            value,
            stored_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            expires_at: (now + ttl).timestamp_millis(),
        };

        let encoded = serde_json::to_string(&entry).map_err(|e| CacheError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.backend.write(key, &encoded)?;

        debug!("Stored session entry {} (expires at {})", key, entry.expires_at);
        Ok(entry)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        Ok(self
            .get_entry_at(key, Utc::now())?
            .map(StoredEntry::into_value))
    }

    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>, CoreError> {
        Ok(self.get_entry_at(key, now)?.map(StoredEntry::into_value))
    }

    pub fn get_entry_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredEntry<T>>, CoreError> {
        let Some(raw) = self.backend.read(key)? else {
            return Ok(None);
        };

        let entry: StoredEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable session entry {}: {}", key, e);
                self.backend.remove(key)?;
                return Ok(None);
            }
        };

        if entry.is_expired_at(now) {
            debug!("Session entry {} expired at {}", key, entry.expires_at);
            self.backend.remove(key)?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    pub fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.backend.remove(key)?;
        Ok(())
    }
}

/// The `castAnalysis` slot with a 24 hour lifetime.
#[derive(Debug)]
pub struct AnalysisStore<B> {
    cache: SessionCache<B>,
    ttl: Duration,
}

impl<B: StorageBackend> AnalysisStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            cache: SessionCache::new(backend),
            ttl: default_ttl(),
        }
    }

    pub fn cache(&self) -> &SessionCache<B> {
        &self.cache
    }

    pub fn store(&self, result: &AnalysisResult) -> Result<StoredEntry<AnalysisResult>, CoreError> {
        self.store_at(result, Utc::now())
    }

    pub fn store_at(
        &self,
        result: &AnalysisResult,
        now: DateTime<Utc>,
    ) -> Result<StoredEntry<AnalysisResult>, CoreError> {
        let entry = self.cache.put_at(ANALYSIS_KEY, result.clone(), self.ttl, now)?;
        info!(
            "Cached analysis of {} casts until {}",
            result.total_casts, entry.expires_at
        );
        Ok(entry)
    }

    pub fn load(&self) -> Result<Option<StoredEntry<AnalysisResult>>, CoreError> {
        self.load_at(Utc::now())
    }

    pub fn load_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredEntry<AnalysisResult>>, CoreError> {
        self.cache.get_entry_at(ANALYSIS_KEY, now)
    }

    pub fn clear(&self) -> Result<(), CoreError> {
        self.cache.remove(ANALYSIS_KEY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    /// RFC 3339 instant the session was started. Unlike `storedAt` this is
    /// not refreshed when the record is rewritten.
    pub created_at: String,
}

impl SessionRecord {
    /// Returns the live session, creating a fresh one when none exists or
    /// the previous one has expired.
    pub fn get_or_create<B: StorageBackend>(
        cache: &SessionCache<B>,
    ) -> Result<StoredEntry<SessionRecord>, CoreError> {
        Self::get_or_create_at(cache, Utc::now())
    }

    pub fn get_or_create_at<B: StorageBackend>(
        cache: &SessionCache<B>,
        now: DateTime<Utc>,
    ) -> Result<StoredEntry<SessionRecord>, CoreError> {
        if let Some(existing) = cache.get_entry_at(SESSION_KEY, now)? {
            return Ok(existing);
        }

        let record = SessionRecord {
            id: Uuid::new_v4(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        info!("Starting new session {}", record.id);
        cache.put_at(SESSION_KEY, record, default_ttl(), now)
    }
}
