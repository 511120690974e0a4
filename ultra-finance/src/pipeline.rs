//! Async workflows over the collaborator traits: fetch, migrate, compute,
//! write back.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use ultra_core::{load_state, AppState, Period, StateError};
use ultra_ingest::{combine_balances, normalize_transactions, AccountBalance, AccountDirectory, Transaction};

use crate::accounts::BusinessAccounts;
use crate::digest::{build_digest, Digest};
use crate::sources::{StateRow, StateStore, TransactionSource};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no budget state found")]
    NoState,
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// A stored row together with its migrated, validated state.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub row: StateRow,
    pub state: AppState,
    pub from_version: u64,
    pub notes: Vec<String>,
}

impl LoadedState {
    fn from_row(row: StateRow) -> Result<Self, PipelineError> {
        let migration = load_state(row.data.clone())?;
        for note in &migration.notes {
            info!(from_version = migration.from_version, "state migration: {note}");
        }
        Ok(Self {
            row,
            state: migration.state,
            from_version: migration.from_version,
            notes: migration.notes,
        })
    }

    /// Row to write back: same id and owner, current schema, new timestamp.
    pub fn into_row(self, now: DateTime<Utc>) -> Result<StateRow, PipelineError> {
        Ok(StateRow {
            id: self.row.id,
            user_email: self.row.user_email,
            data: self.state.to_persisted()?,
            updated_at: Some(now),
        })
    }
}

/// Latest row for `user_email` (or anyone), migrated to the current schema.
pub async fn load_latest(
    store: &dyn StateStore,
    user_email: Option<&str>,
) -> Result<LoadedState, PipelineError> {
    let row = store
        .latest(user_email)
        .await
        .context("fetch app state")?
        .ok_or(PipelineError::NoState)?;
    LoadedState::from_row(row)
}

/// Fetch transactions and account names concurrently, then normalize.
pub async fn fetch_transactions(
    source: &dyn TransactionSource,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Transaction>> {
    let (raw, plaid, assets) = tokio::try_join!(
        source.transactions(start, end),
        source.plaid_accounts(),
        source.assets(),
    )?;
    debug!(count = raw.len(), %start, %end, "fetched transactions");
    Ok(normalize_transactions(&raw, &AccountDirectory::new(&plaid, &assets)))
}

pub async fn fetch_balances(source: &dyn TransactionSource) -> anyhow::Result<Vec<AccountBalance>> {
    let (plaid, assets) = tokio::try_join!(source.plaid_accounts(), source.assets())?;
    Ok(combine_balances(&plaid, &assets))
}

/// First day of the oldest history month through `today`.
pub fn digest_window(today: NaiveDate, history_months: u32) -> (NaiveDate, NaiveDate) {
    let start = Period::containing(today).months_back(history_months).first_day();
    (start, today)
}

#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub today: NaiveDate,
    /// Prior months fetched for the revenue average
    pub history_months: u32,
    pub user_email: Option<String>,
}

/// State, transactions, linked accounts and manual assets are fetched
/// concurrently; the digest is computed once all four resolve.
pub async fn run_digest(
    source: &dyn TransactionSource,
    store: &dyn StateStore,
    business: &BusinessAccounts,
    req: &DigestRequest,
) -> Result<Digest, PipelineError> {
    let (start, end) = digest_window(req.today, req.history_months);
    let (row, raw, plaid, assets) = tokio::try_join!(
        store.latest(req.user_email.as_deref()),
        source.transactions(start, end),
        source.plaid_accounts(),
        source.assets(),
    )?;

    let loaded = LoadedState::from_row(row.ok_or(PipelineError::NoState)?)?;
    let txns = normalize_transactions(&raw, &AccountDirectory::new(&plaid, &assets));
    info!(transactions = txns.len(), %start, %end, "building digest");

    Ok(build_digest(&txns, &loaded.state, business, req.today))
}

/// Add or overwrite one category mapping on the latest row.
pub async fn save_mapping(
    store: &dyn StateStore,
    user_email: Option<&str>,
    category: &str,
    group_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, PipelineError> {
    let mut loaded = load_latest(store, user_email).await?;
    let previous = loaded.state.set_mapping(category, group_id);
    let row = loaded.into_row(now)?;
    store.upsert(&row).await.context("save app state")?;
    info!(category, group_id, "saved mapping");
    Ok(previous)
}

/// Validate a full state blob (any supported version) and store it as the
/// current schema, replacing the latest row when one exists.
pub async fn replace_state(
    store: &dyn StateStore,
    user_email: Option<&str>,
    blob: Value,
    now: DateTime<Utc>,
) -> Result<LoadedState, PipelineError> {
    let migration = load_state(blob)?;
    let existing = store.latest(user_email).await.context("fetch app state")?;
    let row = StateRow {
        id: existing.as_ref().and_then(|r| r.id),
        user_email: existing
            .and_then(|r| r.user_email)
            .or_else(|| user_email.map(str::to_string)),
        data: migration.state.to_persisted()?,
        updated_at: Some(now),
    };
    store.upsert(&row).await.context("save app state")?;
    Ok(LoadedState {
        row,
        state: migration.state,
        from_version: migration.from_version,
        notes: migration.notes,
    })
}
