//! Lunch Money API payloads (v1) and their normalization.
//!
//! The API reports spending as positive amounts and income as negative,
//! encoded as decimal strings ("12.3400"). Transactions reference their
//! account by `plaid_account_id` (linked) or `asset_id` (manual).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{AccountBalance, AccountKind, SignConvention, Transaction, UNKNOWN_ACCOUNT};

pub const LUNCH_MONEY_SIGNS: SignConvention = SignConvention::OutflowPositive;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawTag {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RawTransaction {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub payee: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub plaid_account_id: Option<i64>,
    #[serde(default)]
    pub asset_id: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<RawTag>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PlaidAccount {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaidAccountsResponse {
    #[serde(default)]
    pub plaid_accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetsResponse {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_income: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Account id -> display name, for both linked accounts and manual assets.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    plaid: HashMap<i64, String>,
    assets: HashMap<i64, String>,
}

impl AccountDirectory {
    pub fn new(plaid_accounts: &[PlaidAccount], assets: &[Asset]) -> Self {
        Self {
            plaid: plaid_accounts.iter().map(|a| (a.id, a.name.clone())).collect(),
            assets: assets.iter().map(|a| (a.id, a.name.clone())).collect(),
        }
    }

    pub fn name_for(&self, txn: &RawTransaction) -> &str {
        txn.plaid_account_id
            .and_then(|id| self.plaid.get(&id))
            .or_else(|| txn.asset_id.and_then(|id| self.assets.get(&id)))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_ACCOUNT)
    }
}

/// Normalize raw API transactions: canonical sign, resolved account name.
pub fn normalize_transactions(raw: &[RawTransaction], accounts: &AccountDirectory) -> Vec<Transaction> {
    raw.iter()
        .map(|t| Transaction {
            id: t.id.to_string(),
            date: t.date,
            payee: t.payee.clone().unwrap_or_default(),
            category_name: t.category_name.clone(),
            amount: LUNCH_MONEY_SIGNS.normalize(t.amount),
            account_name: accounts.name_for(t).to_string(),
            tags: t
                .tags
                .iter()
                .flatten()
                .map(|tag| tag.name.clone())
                .collect(),
        })
        .collect()
}

/// Linked accounts first, then manual assets.
pub fn combine_balances(plaid_accounts: &[PlaidAccount], assets: &[Asset]) -> Vec<AccountBalance> {
    plaid_accounts
        .iter()
        .map(|a| AccountBalance {
            name: a.name.clone(),
            balance: a.balance,
            kind: AccountKind::Plaid,
        })
        .chain(assets.iter().map(|a| AccountBalance {
            name: a.name.clone(),
            balance: a.balance,
            kind: AccountKind::Asset,
        }))
        .collect()
}
