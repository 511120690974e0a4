//! Business health: sustainability of the salary draw, month quartile
//! insights and bonus eligibility.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::money::round_whole;

/// Profit at or below this is too early in the month to judge.
pub const EARLY_DATA_PROFIT: i64 = 500;
/// Business balance required before a bonus can be distributed.
pub const BIZ_SAFETY_BASELINE: i64 = 25_000;

/// Quarter of the month: days 1-7, 8-15, 16-22, 23+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quartile {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quartile {
    pub fn of_day(day: u32) -> Self {
        match day {
            0..=7 => Quartile::Q1,
            8..=15 => Quartile::Q2,
            16..=22 => Quartile::Q3,
            _ => Quartile::Q4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Not enough profit yet to compute sustainability
    EarlyData,
    /// Salary exceeds profit
    Overspending,
    /// 80-100% sustainability
    Caution,
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub emoji: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHealth {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    /// Salary as a percentage of profit; `None` while data is early
    pub sustainability_pct: Option<i64>,
    pub status: HealthStatus,
    pub quartile: Quartile,
    pub insight: Insight,
    pub bonus_eligible: bool,
    pub potential_bonus: Decimal,
}

/// Raw `salary / profit * 100`, only defined once profit is past the
/// early-data threshold.
pub fn sustainability(salary: Decimal, profit: Decimal) -> Option<Decimal> {
    if profit > Decimal::from(EARLY_DATA_PROFIT) {
        Some(salary / profit * Decimal::ONE_HUNDRED)
    } else {
        None
    }
}

pub fn insight(profit: Decimal, sustainability: Decimal, quartile: Quartile, salary: Decimal) -> Insight {
    let hundred = Decimal::ONE_HUNDRED;
    let (emoji, text) = match quartile {
        Quartile::Q1 if profit < Decimal::from(EARLY_DATA_PROFIT) => {
            ("📊", "Early month. Data is just starting to come in.")
        }
        Quartile::Q1 => ("🚀", "Strong start! Keep this momentum going."),
        Quartile::Q2 if sustainability > hundred => {
            ("💪", "Behind pace, but plenty of time. Focus on closing deals.")
        }
        Quartile::Q2 => ("✨", "On track! Pacing well for a solid month."),
        Quartile::Q3 if sustainability > Decimal::from(120) => {
            ("🔥", "Time to hustle! Push for those last invoices.")
        }
        Quartile::Q3 if sustainability > hundred => {
            ("⚡", "Almost there. One good day can flip this.")
        }
        Quartile::Q3 => ("🎯", "Great pace. Stay consistent through the home stretch."),
        Quartile::Q4 if sustainability > hundred => ("💥", "Final push! Every dollar counts."),
        Quartile::Q4 if profit > salary * Decimal::new(15, 1) => {
            ("🏆", "Crushing it! Surplus ready for wealth distribution.")
        }
        Quartile::Q4 => ("✓", "Healthy close. Salary is covered by profit."),
    };
    Insight { emoji, text }
}

/// Assess the month so far. `day` is the day of month of the reference date.
pub fn assess(
    revenue: Decimal,
    expenses: Decimal,
    salary: Decimal,
    biz_balance: Decimal,
    day: u32,
) -> BusinessHealth {
    let profit = revenue - expenses;
    let quartile = Quartile::of_day(day);
    let raw = sustainability(salary, profit);

    let status = match raw {
        None => HealthStatus::EarlyData,
        Some(s) if s > Decimal::ONE_HUNDRED => HealthStatus::Overspending,
        Some(s) if s >= Decimal::from(80) => HealthStatus::Caution,
        Some(_) => HealthStatus::Healthy,
    };

    let bonus_eligible = biz_balance >= Decimal::from(BIZ_SAFETY_BASELINE)
        && profit > salary * Decimal::new(15, 1);
    let potential_bonus = if bonus_eligible {
        ((profit - salary) * Decimal::new(5, 1)).floor()
    } else {
        Decimal::ZERO
    };

    BusinessHealth {
        revenue,
        expenses,
        profit,
        sustainability_pct: raw.and_then(|s| round_whole(s).to_i64()),
        status,
        quartile,
        insight: insight(profit, raw.unwrap_or_default(), quartile, salary),
        bonus_eligible,
        potential_bonus,
    }
}
