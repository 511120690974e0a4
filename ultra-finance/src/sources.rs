//! Collaborator seams: where transactions come from and where state lives.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use ultra_ingest::parsers::lunch_money::{Asset, Category, PlaidAccount, RawTransaction};

/// Read-only access to the transaction aggregator.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Transactions dated within `[start, end]`, in the feed's own sign convention.
    async fn transactions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawTransaction>>;
    async fn plaid_accounts(&self) -> Result<Vec<PlaidAccount>>;
    async fn assets(&self) -> Result<Vec<Asset>>;
    async fn categories(&self) -> Result<Vec<Category>>;
}

/// One persisted app-state row. `data` is the raw, possibly legacy, blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_email: Option<String>,
    pub data: Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Last-write-wins row storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Most recently updated row, optionally restricted to one user.
    async fn latest(&self, user_email: Option<&str>) -> Result<Option<StateRow>>;
    /// Insert, or overwrite the row with the same id.
    async fn upsert(&self, row: &StateRow) -> Result<()>;
}

/// In-process store, used for offline runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StateRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(row: StateRow) -> Self {
        Self {
            rows: Mutex::new(vec![row]),
        }
    }

    pub fn rows(&self) -> Vec<StateRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn latest(&self, user_email: Option<&str>) -> Result<Option<StateRow>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(rows
            .iter()
            .filter(|r| user_email.is_none() || r.user_email.as_deref() == user_email)
            .max_by_key(|r| r.updated_at)
            .cloned())
    }

    async fn upsert(&self, row: &StateRow) -> Result<()> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        let mut row = row.clone();
        let existing = row.id.and_then(|id| rows.iter().position(|r| r.id == Some(id)));
        match existing {
            Some(pos) => rows[pos] = row,
            None => {
                let next = rows.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
                row.id = Some(row.id.unwrap_or(next));
                rows.push(row);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(id: Option<i64>, email: &str, hour: u32) -> StateRow {
        StateRow {
            id,
            user_email: Some(email.to_string()),
            data: json!({"version": 2}),
            updated_at: Some(Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_memory_store_latest_and_upsert() {
        let store = MemoryStore::new();
        assert!(store.latest(None).await.unwrap().is_none());

        store.upsert(&row(None, "a@x.com", 1)).await.unwrap();
        store.upsert(&row(None, "b@x.com", 3)).await.unwrap();
        assert_eq!(store.rows().len(), 2);

        let latest = store.latest(None).await.unwrap().unwrap();
        assert_eq!(latest.user_email.as_deref(), Some("b@x.com"));
        assert_eq!(latest.id, Some(2));

        let a = store.latest(Some("a@x.com")).await.unwrap().unwrap();
        assert_eq!(a.id, Some(1));

        // overwrite by id
        store.upsert(&row(Some(1), "a@x.com", 5)).await.unwrap();
        assert_eq!(store.rows().len(), 2);
        assert_eq!(store.latest(None).await.unwrap().unwrap().id, Some(1));
    }

    #[test]
    fn test_state_row_omits_missing_id() {
        let json = serde_json::to_value(row(None, "a@x.com", 1)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["user_email"], "a@x.com");
    }
}
