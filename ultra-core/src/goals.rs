//! Savings goals and their progress.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::budget::zero_if_null;
use crate::money::{ceil_div, percent_of};

/// A savings goal (schema v2): a running contribution scalar on top of a
/// starting balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub target: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub starting_balance: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub current_contribution: Decimal,
}

/// A savings goal as persisted by schema v1: a per-month contribution ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalV1 {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub target: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub starting_balance: Decimal,
    /// Month label ("Jan", "Feb", ...) -> amount contributed that month
    #[serde(default)]
    pub monthly_contributions: BTreeMap<String, Option<Decimal>>,
    /// Present on some late v1 blobs
    #[serde(default)]
    pub current_contribution: Option<Decimal>,
}

impl From<GoalV1> for Goal {
    /// Fold the ledger into the scalar. A v1 goal with an empty ledger keeps
    /// its scalar when it had one.
    fn from(v1: GoalV1) -> Self {
        let ledger: Decimal = v1.monthly_contributions.values().flatten().copied().sum();
        let current_contribution = if v1.monthly_contributions.is_empty() {
            v1.current_contribution.unwrap_or_default()
        } else {
            ledger
        };
        Goal {
            id: v1.id,
            name: v1.name,
            target: v1.target,
            starting_balance: v1.starting_balance,
            current_contribution,
        }
    }
}

/// Derived progress numbers for one goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub name: String,
    pub target: Decimal,
    pub saved: Decimal,
    /// Rounded percentage, 0 when the target is not positive
    pub pct: i64,
    /// Never negative
    pub remaining: Decimal,
    /// Months left at the current contribution; `None` when it would be
    /// undefined or already reached
    pub months_to_goal: Option<i64>,
}

impl Goal {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target: Decimal,
        starting_balance: Decimal,
        current_contribution: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target,
            starting_balance,
            current_contribution,
        }
    }

    pub fn total_saved(&self) -> Decimal {
        self.starting_balance + self.current_contribution
    }

    pub fn progress(&self) -> GoalProgress {
        let saved = self.total_saved();
        let remaining = (self.target - saved).max(Decimal::ZERO);
        GoalProgress {
            name: self.name.clone(),
            target: self.target,
            saved,
            pct: percent_of(saved, self.target).max(0),
            remaining,
            months_to_goal: ceil_div(remaining, self.current_contribution),
        }
    }
}
