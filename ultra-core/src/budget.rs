//! Budget model: groups of budgeted items, goals, category mappings and the
//! aggregate app state that is persisted as one blob.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::goals::Goal;
use crate::money::saturating_sum;
use crate::time::Period;

/// Raw category text (case-sensitive) -> budget group id.
pub type CategoryMappings = BTreeMap<String, String>;

pub const WEALTH_GROUP: &str = "wealth";
pub const FIXED_GROUP: &str = "fixed";
pub const VARIABLE_GROUP: &str = "variable";

/// A single budgeted line within a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub id: String,
    pub name: String,
    /// Budgeted amount per month
    #[serde(default, deserialize_with = "zero_if_null")]
    pub amount: Decimal,
}

impl BudgetItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
        }
    }
}

/// A budget group (wealth / fixed / variable, or user-defined)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetGroup {
    /// Stable slug referenced by category mappings
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub items: Vec<BudgetItem>,
}

impl BudgetGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            collapsed: false,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: BudgetItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sum of item amounts
    pub fn budgeted(&self) -> Decimal {
        saturating_sum(self.items.iter().map(|i| i.amount))
    }
}

/// Revenue and expenses of the business for one month
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMonth {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub revenue: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub expenses: Decimal,
}

impl BusinessMonth {
    pub fn profit(&self) -> Decimal {
        self.revenue - self.expenses
    }
}

/// Aggregate root: everything the app persists, schema version 2.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub salary: Decimal,
    #[serde(default, rename = "w2Wages", deserialize_with = "zero_if_null")]
    pub w2_wages: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub personal_balance: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub biz_balance: Decimal,
    #[serde(default)]
    pub groups: Vec<BudgetGroup>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub mappings: CategoryMappings,
    #[serde(default)]
    pub monthly_biz: BTreeMap<Period, BusinessMonth>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_check_in: Option<NaiveDate>,
    #[serde(default)]
    pub flagged_ids: Vec<String>,
}

impl AppState {
    /// Starter budget for a fresh install.
    pub fn starter() -> Self {
        let d = |n: i64| Decimal::from(n);
        Self {
            salary: d(4000),
            groups: vec![
                BudgetGroup::new(WEALTH_GROUP, "Wealth Building", "#C8FF00")
                    .with_item(BudgetItem::new("1", "Travel Savings", d(500)))
                    .with_item(BudgetItem::new("2", "Vanguard ETF", d(400)))
                    .with_item(BudgetItem::new("3", "Philanthropy", d(100))),
                BudgetGroup::new(FIXED_GROUP, "Fixed Expenses", "#5B7FFF")
                    .with_item(BudgetItem::new("4", "Mortgage", d(960)))
                    .with_item(BudgetItem::new("5", "Utilities", d(280)))
                    .with_item(BudgetItem::new("6", "Insurance", d(275))),
                BudgetGroup::new(VARIABLE_GROUP, "Variable Spending", "#2DD4BF")
                    .with_item(BudgetItem::new("7", "Groceries", d(500)))
                    .with_item(BudgetItem::new("8", "Dining Out", d(250)))
                    .with_item(BudgetItem::new("9", "Shopping", d(200))),
            ],
            goals: vec![
                Goal::new("1", "Emergency Fund", d(10000), d(2000), Decimal::ZERO),
                Goal::new("2", "New Car", d(35000), d(5000), Decimal::ZERO),
            ],
            ..Self::default()
        }
    }

    pub fn group(&self, id: &str) -> Option<&BudgetGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Sum of every group's budgeted amount
    pub fn total_allocated(&self) -> Decimal {
        saturating_sum(self.groups.iter().map(BudgetGroup::budgeted))
    }

    /// `max(0, salary - w2Wages)`: what the business must transfer each month.
    pub fn transfer_needed(&self) -> Decimal {
        (self.salary - self.w2_wages).max(Decimal::ZERO)
    }

    /// Add or overwrite one mapping. Returns the previous target, if any.
    pub fn set_mapping(
        &mut self,
        category: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Option<String> {
        self.mappings.insert(category.into(), group_id.into())
    }

    /// Replace the whole group structure (category auto-sync).
    pub fn replace_groups(&mut self, groups: Vec<BudgetGroup>) {
        self.groups = groups;
    }

    pub fn record_business_month(&mut self, period: Period, month: BusinessMonth) {
        self.monthly_biz.insert(period, month);
    }

    pub fn business_month(&self, period: Period) -> BusinessMonth {
        self.monthly_biz.get(&period).copied().unwrap_or_default()
    }

    /// Flag or unflag a transaction for review. Returns true if it is now flagged.
    pub fn toggle_flag(&mut self, txn_id: &str) -> bool {
        if let Some(pos) = self.flagged_ids.iter().position(|id| id == txn_id) {
            self.flagged_ids.remove(pos);
            false
        } else {
            self.flagged_ids.push(txn_id.to_string());
            true
        }
    }
}

/// Accept `null` wherever a number is expected and read it as zero.
pub(crate) fn zero_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(Option::<Decimal>::deserialize(d)?.unwrap_or_default())
}
