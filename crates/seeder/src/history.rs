//! Run history: which seeders have already been applied.
//!
//! A [`HistoryStore`] is the only persistence the runner touches. The mere
//! existence of a record for a seeder name means "already applied".

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::HistoryError;

/// Default name of the history model (table or collection).
pub const DEFAULT_SEED_RUN_MODEL: &str = "seedRun";

/// A persisted record of a successfully applied seeder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SeedRunRecord {
    pub id: Uuid,
    pub name: String,
    pub environment: Option<String>,
    pub applied_at: OffsetDateTime,
}

/// Fields written when a seeder completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSeedRun {
    pub name: String,
    pub environment: Option<String>,
}

impl NewSeedRun {
    pub fn new(name: impl Into<String>, environment: Option<String>) -> Self {
        Self {
            name: name.into(),
            environment,
        }
    }

    /// Stamps the run with a fresh id and the current time.
    pub fn into_record(self) -> SeedRunRecord {
        SeedRunRecord {
            id: Uuid::new_v4(),
            name: self.name,
            environment: self.environment,
            applied_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Lookup and insert of run history records, keyed by seeder name.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<SeedRunRecord>, HistoryError>;

    async fn insert(&self, run: NewSeedRun) -> Result<(), HistoryError>;
}

/// In-process history store backed by a `HashMap<name, record>`.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<HashMap<String, SeedRunRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already knows about the given records.
    pub fn with_records(records: impl IntoIterator<Item = SeedRunRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of all records, ordered by application time.
    pub fn records(&self) -> Vec<SeedRunRecord> {
        let mut records: Vec<_> = self.lock().values().cloned().collect();
        records.sort_by_key(|r| r.applied_at);
        records
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SeedRunRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<SeedRunRecord>, HistoryError> {
        Ok(self.lock().get(name).cloned())
    }

    async fn insert(&self, run: NewSeedRun) -> Result<(), HistoryError> {
        let mut records = self.lock();
        if records.contains_key(&run.name) {
            return Err(HistoryError::Duplicate(run.name));
        }
        records.insert(run.name.clone(), run.into_record());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemoryHistoryStore::new();
        assert!(store.find_by_name("001_roles").await.unwrap().is_none());

        store
            .insert(NewSeedRun::new("001_roles", Some("development".into())))
            .await
            .unwrap();

        let record = store.find_by_name("001_roles").await.unwrap().unwrap();
        assert_eq!(record.name, "001_roles");
        assert_eq!(record.environment.as_deref(), Some("development"));
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let store = MemoryHistoryStore::new();
        store.insert(NewSeedRun::new("001_roles", None)).await.unwrap();

        let err = store
            .insert(NewSeedRun::new("001_roles", None))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Duplicate(ref name) if name == "001_roles"));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_with_records() {
        let store =
            MemoryHistoryStore::with_records([NewSeedRun::new("001_roles", None).into_record()]);
        assert!(store.contains("001_roles"));
        assert!(!store.contains("002_users"));
    }
}
