//! App-state rows in Supabase, through its PostgREST endpoint.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

use crate::sources::{StateRow, StateStore};

pub const DEFAULT_TABLE: &str = "app_state";

#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    rest_url: String,
}

impl SupabaseStore {
    /// `url` is the project URL; the service key goes in both the `apikey`
    /// and bearer headers.
    pub fn new(url: &str, table: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(service_key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {service_key}"))?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
        })
    }
}

#[async_trait]
impl StateStore for SupabaseStore {
    async fn latest(&self, user_email: Option<&str>) -> Result<Option<StateRow>> {
        let mut query = vec![
            ("select", "id,user_email,data,updated_at".to_string()),
            ("order", "updated_at.desc".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(email) = user_email {
            query.push(("user_email", format!("eq.{email}")));
        }

        let resp = self
            .http
            .get(&self.rest_url)
            .query(&query)
            .send()
            .await
            .context("supabase select")?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("supabase error: {status} {txt}");
        }

        let rows: Vec<StateRow> = resp.json().await.context("parse supabase rows")?;
        debug!(found = rows.len(), "supabase latest");
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, row: &StateRow) -> Result<()> {
        let resp = self
            .http
            .post(&self.rest_url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await
            .context("supabase upsert")?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("supabase error: {status} {txt}");
        }
        Ok(())
    }
}
