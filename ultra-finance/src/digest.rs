//! Financial digest: one serializable snapshot of the current month.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use ultra_core::money::round_whole;
use ultra_core::{AppState, BusinessHealth, GoalProgress};
use ultra_ingest::Transaction;

use crate::accounts::BusinessAccounts;
use crate::aggregator::{aggregate, Aggregates, PaceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetVsActual {
    /// Group display name
    pub group: String,
    pub budgeted: Decimal,
    /// Rounded to whole units
    pub actual: Decimal,
    /// `budgeted - actual`, using the rounded actual
    pub remaining: Decimal,
    pub pace_status: PaceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    /// e.g. "February 2026"
    pub period: String,
    pub days_passed: u32,
    pub days_remaining: u32,
    pub salary: Decimal,
    pub w2_wages: Decimal,
    pub transfer_needed: Decimal,
    pub biz_balance: Decimal,
    /// Months of transfers covered by the business balance
    pub runway: Option<Decimal>,
    pub biz_revenue_this_month: Decimal,
    pub avg_monthly_revenue: Option<Decimal>,
    pub personal_balance: Decimal,
    pub budget_vs_actual: Vec<BudgetVsActual>,
    pub unmapped_categories: Vec<String>,
    pub unmapped_total: Decimal,
    pub goals: Vec<GoalProgress>,
    pub notes: String,
    pub streak: u32,
    pub business_health: BusinessHealth,
}

/// Assemble a digest from precomputed aggregates plus pass-through state.
pub fn assemble(state: &AppState, agg: &Aggregates) -> Digest {
    let budget_vs_actual = agg
        .groups
        .iter()
        .map(|g| {
            let actual = round_whole(g.actual);
            BudgetVsActual {
                group: g.name.clone(),
                budgeted: g.budgeted,
                actual,
                remaining: g.budgeted - actual,
                pace_status: g.pace(&agg.clock),
            }
        })
        .collect();

    Digest {
        period: agg.clock.period.label(),
        days_passed: agg.clock.days_passed,
        days_remaining: agg.clock.days_remaining(),
        salary: state.salary,
        w2_wages: state.w2_wages,
        transfer_needed: state.transfer_needed(),
        biz_balance: state.biz_balance,
        runway: agg.runway,
        biz_revenue_this_month: round_whole(agg.biz_revenue),
        avg_monthly_revenue: agg.avg_monthly_revenue(),
        personal_balance: state.personal_balance,
        budget_vs_actual,
        unmapped_categories: agg.unmapped_categories(),
        unmapped_total: round_whole(agg.unmapped_total()),
        goals: state.goals.iter().map(|g| g.progress()).collect(),
        notes: state.notes.clone(),
        streak: state.streak,
        business_health: agg.health.clone(),
    }
}

/// Categorize, aggregate and assemble in one step.
pub fn build_digest(
    txns: &[Transaction],
    state: &AppState,
    business: &BusinessAccounts,
    today: NaiveDate,
) -> Digest {
    let agg = aggregate(txns, state, business, today);
    assemble(state, &agg)
}
