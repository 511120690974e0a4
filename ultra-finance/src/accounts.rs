//! Which accounts belong to the business.
//!
//! One rule for every feed: an account is a business account when its name
//! contains any configured keyword, case-insensitively.

use serde::{Deserialize, Serialize};
use ultra_core::{BusinessMonth, Period};
use ultra_ingest::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessAccounts {
    keywords: Vec<String>,
}

impl Default for BusinessAccounts {
    fn default() -> Self {
        Self::new(["business"])
    }
}

impl BusinessAccounts {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_business(&self, account_name: &str) -> bool {
        let name = account_name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// Business revenue (inflows) and expenses (outflows) within `period`.
    pub fn month_totals(&self, txns: &[Transaction], period: Period) -> BusinessMonth {
        txns.iter()
            .filter(|t| period.contains(t.date) && self.is_business(&t.account_name))
            .fold(BusinessMonth::default(), |mut acc, t| {
                acc.revenue += t.inflow_amount();
                acc.expenses += t.outflow_amount();
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn txn(day: u32, month: u32, amount: i64, account: &str) -> Transaction {
        Transaction {
            id: format!("{month}-{day}"),
            date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            payee: "x".to_string(),
            category_name: None,
            amount: Decimal::from(amount),
            account_name: account.to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn test_default_matches_business_substring() {
        let b = BusinessAccounts::default();
        assert!(b.is_business("Business Checking"));
        assert!(b.is_business("AMEX business platinum"));
        assert!(!b.is_business("Personal Checking"));
        assert!(!b.is_business("Unknown"));
    }

    #[test]
    fn test_custom_keywords() {
        let b = BusinessAccounts::new(["LLC", " ", "studio"]);
        assert!(b.is_business("Acme llc operating"));
        assert!(b.is_business("Studio CC"));
        assert!(!b.is_business("Joint Savings"));
    }

    #[test]
    fn test_month_totals() {
        let b = BusinessAccounts::default();
        let feb = Period::new(2026, 2).unwrap();
        let txns = vec![
            txn(3, 2, 10000, "Business Checking"),
            txn(4, 2, -2498, "Business CC"),
            txn(5, 2, -100, "Personal Checking"),
            txn(6, 1, 5000, "Business Checking"),
        ];
        let m = b.month_totals(&txns, feb);
        assert_eq!(m.revenue, Decimal::from(10000));
        assert_eq!(m.expenses, Decimal::from(2498));
    }
}
