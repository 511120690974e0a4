//! Lunch Money v1 REST client.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use ultra_ingest::parsers::lunch_money::{
    Asset, AssetsResponse, CategoriesResponse, Category, PlaidAccount, PlaidAccountsResponse,
    RawTransaction, TransactionsResponse,
};

use crate::sources::TransactionSource;

pub const DEFAULT_BASE_URL: &str = "https://dev.lunchmoney.app/v1";

#[derive(Debug, Clone)]
pub struct LunchMoneyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl LunchMoneyClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_retries,
        })
    }

    /// GET with bearer auth. Connect errors, timeouts and 5xx responses are
    /// retried with linear backoff; anything else fails immediately.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            let sent = self
                .http
                .get(&url)
                .bearer_auth(&self.api_key)
                .query(query)
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_server_error() && attempt < self.max_retries => {
                    warn!(path, status = %resp.status(), attempt, "lunch money server error, retrying");
                }
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        let txt = resp.text().await.unwrap_or_default();
                        bail!("lunch money error: {status} {txt}");
                    }
                    debug!(path, attempt, "lunch money ok");
                    return resp
                        .json::<T>()
                        .await
                        .with_context(|| format!("parse lunch money {path} response"));
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries => {
                    warn!(path, error = %e, attempt, "lunch money request failed, retrying");
                }
                Err(e) => return Err(e).with_context(|| format!("lunch money request {path}")),
            }

            attempt += 1;
            tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl TransactionSource for LunchMoneyClient {
    async fn transactions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawTransaction>> {
        let query = [
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
        ];
        let resp: TransactionsResponse = self.get_json("transactions", &query).await?;
        Ok(resp.transactions)
    }

    async fn plaid_accounts(&self) -> Result<Vec<PlaidAccount>> {
        let resp: PlaidAccountsResponse = self.get_json("plaid_accounts", &[]).await?;
        Ok(resp.plaid_accounts)
    }

    async fn assets(&self) -> Result<Vec<Asset>> {
        let resp: AssetsResponse = self.get_json("assets", &[]).await?;
        Ok(resp.assets)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let resp: CategoriesResponse = self.get_json("categories", &[]).await?;
        Ok(resp.categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let c = LunchMoneyClient::new("k", "https://example.test/v1/", Duration::from_secs(5), 2).unwrap();
        assert_eq!(c.base_url, "https://example.test/v1");
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_after_retries() {
        // nothing listens on port 9 locally
        let c = LunchMoneyClient::new("k", "http://127.0.0.1:9", Duration::from_secs(1), 1).unwrap();
        let err = c.categories().await.unwrap_err();
        assert!(err.to_string().contains("lunch money request categories"));
    }
}
