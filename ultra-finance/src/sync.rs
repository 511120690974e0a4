//! Pull facts from the aggregator into the persisted state: one month of
//! business results plus account balances, or the upstream category list.

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ultra_core::{AppState, BusinessMonth, Period};
use ultra_ingest::AccountBalance;

use crate::accounts::BusinessAccounts;
use crate::category_rules::apply_category_sync;
use crate::pipeline::{fetch_balances, fetch_transactions};
use crate::sources::TransactionSource;

/// Account names whose balances mirror into the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAccounts {
    pub business: String,
    pub personal: String,
}

impl Default for BalanceAccounts {
    fn default() -> Self {
        Self {
            business: "Business Checking".to_string(),
            personal: "Personal Checking".to_string(),
        }
    }
}

impl BalanceAccounts {
    fn find(balances: &[AccountBalance], name: &str) -> Option<Decimal> {
        balances
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
            .map(|b| b.balance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSync {
    pub period: Period,
    pub business: BusinessMonth,
    pub transactions: usize,
    pub biz_balance: Option<Decimal>,
    pub personal_balance: Option<Decimal>,
}

impl MonthSync {
    /// Balances only move when their account was found.
    pub fn apply(&self, state: &mut AppState) {
        state.record_business_month(self.period, self.business);
        if let Some(b) = self.biz_balance {
            state.biz_balance = b;
        }
        if let Some(b) = self.personal_balance {
            state.personal_balance = b;
        }
    }
}

pub async fn sync_month(
    source: &dyn TransactionSource,
    business: &BusinessAccounts,
    names: &BalanceAccounts,
    period: Period,
) -> Result<MonthSync> {
    let (txns, balances) = tokio::try_join!(
        fetch_transactions(source, period.first_day(), period.last_day()),
        fetch_balances(source),
    )?;

    let month = business.month_totals(&txns, period);
    let biz_balance = BalanceAccounts::find(&balances, &names.business);
    let personal_balance = BalanceAccounts::find(&balances, &names.personal);
    if biz_balance.is_none() {
        warn!(account = %names.business, "business balance account not found");
    }
    if personal_balance.is_none() {
        warn!(account = %names.personal, "personal balance account not found");
    }
    info!(%period, revenue = %month.revenue, expenses = %month.expenses, "synced month");

    Ok(MonthSync {
        period,
        business: month,
        transactions: txns.len(),
        biz_balance,
        personal_balance,
    })
}

/// Rebuild the group structure from upstream categories. Returns how many
/// new mappings were added.
pub async fn sync_categories(source: &dyn TransactionSource, state: &mut AppState) -> Result<usize> {
    let categories = source.categories().await?;
    let added = apply_category_sync(state, &categories);
    info!(categories = categories.len(), added, "synced categories");
    Ok(added)
}
