//! Flat budget-state summary for assistants and dashboards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use ultra_core::money::percent_of;
use ultra_core::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub total: Decimal,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub name: String,
    pub target: Decimal,
    pub total_saved: Decimal,
    pub progress_pct: i64,
    pub remaining: Decimal,
    pub months_to_goal: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub last_updated: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub salary: Decimal,
    pub personal_balance: Decimal,
    pub biz_balance: Decimal,
    pub total_allocated: Decimal,
    /// May be negative when the budget is over-allocated
    pub remaining_from_salary: Decimal,
    pub allocation_pct: i64,
    pub groups: Vec<GroupSummary>,
    pub goals: Vec<GoalSummary>,
    pub notes: String,
    pub streak: u32,
    pub last_check_in: Option<NaiveDate>,
}

pub fn summarize(
    state: &AppState,
    user_email: Option<String>,
    last_updated: Option<DateTime<Utc>>,
) -> BudgetSummary {
    let total_allocated = state.total_allocated();

    BudgetSummary {
        last_updated,
        user_email,
        salary: state.salary,
        personal_balance: state.personal_balance,
        biz_balance: state.biz_balance,
        total_allocated,
        remaining_from_salary: state.salary - total_allocated,
        allocation_pct: percent_of(total_allocated, state.salary),
        groups: state
            .groups
            .iter()
            .map(|g| GroupSummary {
                name: g.name.clone(),
                total: g.budgeted(),
                items: g
                    .items
                    .iter()
                    .map(|i| ItemSummary {
                        name: i.name.clone(),
                        amount: i.amount,
                    })
                    .collect(),
            })
            .collect(),
        goals: state
            .goals
            .iter()
            .map(|g| {
                let p = g.progress();
                GoalSummary {
                    name: p.name,
                    target: p.target,
                    total_saved: p.saved,
                    progress_pct: p.pct,
                    remaining: p.remaining,
                    months_to_goal: p.months_to_goal,
                }
            })
            .collect(),
        notes: state.notes.clone(),
        streak: state.streak,
        last_check_in: state.last_check_in,
    }
}
