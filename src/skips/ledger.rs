use std::collections::HashSet;
use std::sync::Arc;
use chrono::Utc;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use super::storage::KeyValueStore;

pub const SKIPPED_QUESTIONS_KEY: &str = "skipped_questions";
pub const SKIP_RETENTION_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SkipRecord {
    pub id: String,
    #[serde(rename = "skippedAt")]
    pub skipped_at: i64, // unix millis
}

fn is_active(record: &SkipRecord, now_ms: i64) -> bool {
    now_ms - record.skipped_at < SKIP_RETENTION_MS
}

/// Remembers skipped questions for 24 hours so the feed doesn't
/// serve them straight back.
///
/// Storage problems are logged and otherwise ignored: an unreadable ledger
/// behaves like an empty one and a failed write just forgets the skip.
pub struct SkipLedger {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl SkipLedger {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(storage, SKIPPED_QUESTIONS_KEY)
    }

    pub fn with_key(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { storage, key: key.into() }
    }

    pub async fn skip(&self, question_id: &str) {
        self.skip_at(question_id, Utc::now().timestamp_millis()).await
    }

    pub async fn skip_at(&self, question_id: &str, now_ms: i64) {
        let mut records = self.load().await;
        records.retain(|r| is_active(r, now_ms));

        match records.iter_mut().find(|r| r.id == question_id) {
            Some(existing) => existing.skipped_at = now_ms,
            None => records.push(SkipRecord {
                id: question_id.to_string(),
                skipped_at: now_ms,
            }),
        }

        self.store(&records).await;
        debug!("Question {} skipped ({} active skips)", question_id, records.len());
    }

    pub async fn active_skipped_ids(&self) -> HashSet<String> {
        self.active_skipped_ids_at(Utc::now().timestamp_millis()).await
    }

    /// Ids skipped within the retention window. Expired entries are purged
    /// from storage as a side effect.
    pub async fn active_skipped_ids_at(&self, now_ms: i64) -> HashSet<String> {
        let records = self.load().await;
        let total = records.len();
        let active: Vec<SkipRecord> = records.into_iter().filter(|r| is_active(r, now_ms)).collect();

        if active.len() != total {
            debug!("Purging {} expired skips", total - active.len());
            self.store(&active).await;
        }

        active.into_iter().map(|r| r.id).collect()
    }

    async fn load(&self) -> Vec<SkipRecord> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Error reading skipped questions: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable skip ledger: {}", e);
            Vec::new()
        })
    }

    async fn store(&self, records: &[SkipRecord]) {
        let data = match serde_json::to_string(records) {
            Ok(data) => data,
            Err(e) => {
                error!("Error encoding skipped questions: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, &data).await {
            error!("Error saving skipped questions: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skips::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use std::io;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        }

        async fn set(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        }
    }

    #[tokio::test]
    async fn skips_expire_after_a_day() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let ledger = SkipLedger::new(storage.clone());

        ledger.skip_at("q1", 0).await;
        ledger.skip_at("q2", 12 * HOUR_MS).await;

        let ids = ledger.active_skipped_ids_at(24 * HOUR_MS).await;
        assert_eq!(ids, HashSet::from(["q2".to_string()]));

        // q1 was purged from storage by the read above
        let raw = storage.get(SKIPPED_QUESTIONS_KEY).await.unwrap().unwrap();
        let stored: Vec<SkipRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "q2");
    }

    #[tokio::test]
    async fn reskipping_refreshes_the_timestamp() {
        let ledger = SkipLedger::new(Arc::new(MemoryKeyValueStore::new()));

        ledger.skip_at("q1", 0).await;
        ledger.skip_at("q1", 20 * HOUR_MS).await;

        let ids = ledger.active_skipped_ids_at(30 * HOUR_MS).await;
        assert!(ids.contains("q1"));
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn storage_failures_degrade_to_empty() {
        let ledger = SkipLedger::new(Arc::new(BrokenStore));
        ledger.skip("q1").await;
        assert!(ledger.active_skipped_ids().await.is_empty());
    }

    #[tokio::test]
    async fn garbage_payload_reads_as_empty() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.set(SKIPPED_QUESTIONS_KEY, "{not json").await.unwrap();
        let ledger = SkipLedger::new(storage);
        assert!(ledger.active_skipped_ids_at(0).await.is_empty());
    }
}
