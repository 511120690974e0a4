use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNKNOWN_ACCOUNT: &str = "Unknown";

/// How a feed signs its amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Income positive, spending negative (the canonical form)
    InflowPositive,
    /// Spending positive, income negative (Lunch Money API)
    OutflowPositive,
}

impl SignConvention {
    /// Convert a feed amount to the canonical convention.
    pub fn normalize(self, raw: Decimal) -> Decimal {
        match self {
            SignConvention::InflowPositive => raw,
            SignConvention::OutflowPositive => -raw,
        }
    }
}

/// Normalized transaction (feed-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub payee: String,
    pub category_name: Option<String>,
    /// Positive = inflow (income), negative = outflow (expense)
    pub amount: Decimal,
    pub account_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Transaction {
    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_inflow(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Magnitude of spending, zero for inflows
    pub fn outflow_amount(&self) -> Decimal {
        if self.is_outflow() { -self.amount } else { Decimal::ZERO }
    }

    /// Magnitude of income, zero for outflows
    pub fn inflow_amount(&self) -> Decimal {
        if self.is_inflow() { self.amount } else { Decimal::ZERO }
    }

    /// Category text used for mapping; missing categories read as "Uncategorized"
    pub fn category(&self) -> &str {
        self.category_name
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Bank-linked account
    Plaid,
    /// Manually tracked asset
    Asset,
}

/// A named account and its current balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub name: String,
    pub balance: Decimal,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(amount: i64, category: Option<&str>) -> Transaction {
        Transaction {
            id: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            payee: "Whole Foods".to_string(),
            category_name: category.map(str::to_string),
            amount: Decimal::from(amount),
            account_name: "Personal Checking".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn test_sign_normalization() {
        let raw = Decimal::from(42);
        assert_eq!(SignConvention::InflowPositive.normalize(raw), Decimal::from(42));
        assert_eq!(SignConvention::OutflowPositive.normalize(raw), Decimal::from(-42));
    }

    #[test]
    fn test_outflow_and_inflow_amounts() {
        let spend = txn(-50, Some("Groceries"));
        assert!(spend.is_outflow());
        assert_eq!(spend.outflow_amount(), Decimal::from(50));
        assert_eq!(spend.inflow_amount(), Decimal::ZERO);

        let income = txn(900, Some("Income"));
        assert!(income.is_inflow());
        assert_eq!(income.outflow_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_missing_category_is_uncategorized() {
        assert_eq!(txn(-5, None).category(), UNCATEGORIZED);
        assert_eq!(txn(-5, Some("  ")).category(), UNCATEGORIZED);
        assert_eq!(txn(-5, Some("Dining")).category(), "Dining");
    }

    #[test]
    fn test_balance_kind_serializes_as_type() {
        let b = AccountBalance {
            name: "Business Checking".to_string(),
            balance: Decimal::from(100),
            kind: AccountKind::Plaid,
        };
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["type"], "plaid");
    }
}
