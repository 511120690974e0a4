//! Month-to-date aggregation over categorized transactions.
//!
//! Everything here is a pure function of (transactions, state, business
//! accounts, today). Nothing reads the clock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ultra_core::money::{round_to, round_whole};
use ultra_core::{health, AppState, BusinessHealth, Period, PeriodClock};
use ultra_ingest::Transaction;

use crate::accounts::BusinessAccounts;
use crate::category_rules::{categorize_transaction, Assignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceStatus {
    AheadOfBudget,
    OnTrack,
    NoBudget,
}

/// `no_budget` iff nothing is budgeted, else compare the spent fraction of the
/// budget with the elapsed fraction of the month.
pub fn pace_status(actual: Decimal, budgeted: Decimal, clock: &PeriodClock) -> PaceStatus {
    if budgeted.is_zero() {
        return PaceStatus::NoBudget;
    }
    let elapsed = Decimal::from(clock.days_passed) / Decimal::from(clock.days_in_month);
    // an overflowing ratio is far past any elapsed fraction
    let ahead = actual.checked_div(budgeted).is_none_or(|spent| spent > elapsed);
    if ahead {
        PaceStatus::AheadOfBudget
    } else {
        PaceStatus::OnTrack
    }
}

/// `bizBalance / max(1, salary - w2Wages)` to one decimal, only when a
/// transfer is needed at all.
pub fn runway(biz_balance: Decimal, salary: Decimal, w2_wages: Decimal) -> Option<Decimal> {
    if salary <= w2_wages {
        return None;
    }
    let monthly = (salary - w2_wages).max(Decimal::ONE);
    Some(round_to(biz_balance / monthly, 1))
}

/// Rounded mean of the given monthly totals, `None` when there are none.
pub fn average_revenue(monthly: &[Decimal]) -> Option<Decimal> {
    if monthly.is_empty() {
        return None;
    }
    let total: Decimal = monthly.iter().copied().sum();
    Some(round_whole(total / Decimal::from(monthly.len())))
}

/// One budget group's month-to-date numbers. `actual` is unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotals {
    pub group_id: String,
    pub name: String,
    pub budgeted: Decimal,
    pub actual: Decimal,
}

impl GroupTotals {
    pub fn pace(&self, clock: &PeriodClock) -> PaceStatus {
        pace_status(self.actual, self.budgeted, clock)
    }
}

/// A personal outflow nothing could place
#[derive(Debug, Clone, PartialEq)]
pub struct UnmappedSpend {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub clock: PeriodClock,
    /// In state group order
    pub groups: Vec<GroupTotals>,
    /// In transaction order
    pub unmapped: Vec<UnmappedSpend>,
    pub biz_revenue: Decimal,
    pub biz_expenses: Decimal,
    /// Business inflows per period before the current one
    pub prior_revenue: BTreeMap<Period, Decimal>,
    pub runway: Option<Decimal>,
    pub health: BusinessHealth,
}

impl Aggregates {
    /// Distinct unmapped category names, first-seen order
    pub fn unmapped_categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for u in &self.unmapped {
            if !seen.contains(&u.category) {
                seen.push(u.category.clone());
            }
        }
        seen
    }

    pub fn unmapped_total(&self) -> Decimal {
        self.unmapped.iter().map(|u| u.amount).sum()
    }

    pub fn avg_monthly_revenue(&self) -> Option<Decimal> {
        let totals: Vec<Decimal> = self.prior_revenue.values().copied().collect();
        average_revenue(&totals)
    }
}

/// Aggregate the month containing `today`.
///
/// Transactions outside that month only feed the trailing revenue average.
pub fn aggregate(
    txns: &[Transaction],
    state: &AppState,
    business: &BusinessAccounts,
    today: NaiveDate,
) -> Aggregates {
    let clock = PeriodClock::at(today);
    let period = clock.period;

    let mut actual_by_group: HashMap<&str, Decimal> = HashMap::new();
    let mut unmapped = Vec::new();
    let mut prior_revenue: BTreeMap<Period, Decimal> = BTreeMap::new();

    for t in txns {
        let is_business = business.is_business(&t.account_name);
        if !period.contains(t.date) {
            if is_business && t.is_inflow() && t.date < period.first_day() {
                *prior_revenue.entry(Period::containing(t.date)).or_default() += t.amount;
            }
            continue;
        }
        if is_business || !t.is_outflow() {
            continue;
        }

        match categorize_transaction(t, &state.mappings) {
            Assignment::Group { group_id, .. } => match state.group(&group_id) {
                Some(group) => *actual_by_group.entry(group.id.as_str()).or_default() += t.outflow_amount(),
                None => unmapped.push(UnmappedSpend {
                    category: t.category().to_string(),
                    amount: t.outflow_amount(),
                }),
            },
            Assignment::Unmapped => unmapped.push(UnmappedSpend {
                category: t.category().to_string(),
                amount: t.outflow_amount(),
            }),
        }
    }

    let groups = state
        .groups
        .iter()
        .map(|g| GroupTotals {
            group_id: g.id.clone(),
            name: g.name.clone(),
            budgeted: g.budgeted(),
            actual: actual_by_group.get(g.id.as_str()).copied().unwrap_or_default(),
        })
        .collect();

    let month = business.month_totals(txns, period);
    let health = health::assess(
        month.revenue,
        month.expenses,
        state.salary,
        state.biz_balance,
        clock.days_passed,
    );

    Aggregates {
        clock,
        groups,
        unmapped,
        biz_revenue: month.revenue,
        biz_expenses: month.expenses,
        prior_revenue,
        runway: runway(state.biz_balance, state.salary, state.w2_wages),
        health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultra_core::{BudgetGroup, BudgetItem, FIXED_GROUP, VARIABLE_GROUP};

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn date(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn txn(id: &str, day: NaiveDate, amount: &str, category: Option<&str>, account: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: day,
            payee: String::new(),
            category_name: category.map(str::to_string),
            amount: amount.parse().unwrap(),
            account_name: account.to_string(),
            tags: vec![],
        }
    }

    fn state() -> AppState {
        let mut s = AppState::default();
        s.groups = vec![
            BudgetGroup::new(VARIABLE_GROUP, "Variable Spending", "#2DD4BF")
                .with_item(BudgetItem::new("1", "Groceries", d(500))),
            BudgetGroup::new(FIXED_GROUP, "Fixed Expenses", "#5B7FFF")
                .with_item(BudgetItem::new("2", "Mortgage", d(960))),
            BudgetGroup::new("fun", "Fun", "#fff"),
        ];
        s.set_mapping("Groceries", VARIABLE_GROUP);
        s.set_mapping("Mortgage", FIXED_GROUP);
        s
    }

    #[test]
    fn test_pace_status() {
        let clock = PeriodClock::at(date(2, 14)); // 14/28 = 0.5
        assert_eq!(pace_status(d(300), d(500), &clock), PaceStatus::AheadOfBudget);
        assert_eq!(pace_status(d(250), d(500), &clock), PaceStatus::OnTrack);
        assert_eq!(pace_status(d(10), Decimal::ZERO, &clock), PaceStatus::NoBudget);
        assert_eq!(pace_status(Decimal::ZERO, Decimal::ZERO, &clock), PaceStatus::NoBudget);
    }

    #[test]
    fn test_pace_status_with_tiny_budget() {
        let clock = PeriodClock::at(date(2, 14));
        let tiny: Decimal = "0.0000000001".parse().unwrap();
        assert_eq!(pace_status(Decimal::MAX, tiny, &clock), PaceStatus::AheadOfBudget);
    }

    #[test]
    fn test_runway() {
        assert_eq!(runway(d(28500), d(4000), d(2100)), Some("15.0".parse().unwrap()));
        assert_eq!(runway(d(28500), d(4000), d(4000)), None);
        assert_eq!(runway(d(28500), d(2000), d(4000)), None);
        // a sub-unit transfer is floored at one
        assert_eq!(
            runway(d(100), "4000.5".parse().unwrap(), d(4000)),
            Some(d(100))
        );
    }

    #[test]
    fn test_average_revenue() {
        assert_eq!(average_revenue(&[]), None);
        assert_eq!(average_revenue(&[d(1000), d(2001)]), Some(d(1501)));
    }

    #[test]
    fn test_aggregate_groups_and_unmapped() {
        let today = date(2, 14);
        let txns = vec![
            txn("1", date(2, 2), "-50", Some("Groceries"), "Personal Checking"),
            txn("2", date(2, 3), "-900", Some("Mortgage"), "Personal Checking"),
            txn("3", date(2, 4), "-12.5", Some("Pet Supplies"), "Personal Checking"),
            txn("4", date(2, 5), "-7.5", Some("Pet Supplies"), "Personal Checking"),
            txn("5", date(2, 6), "2000", Some("Paycheck"), "Personal Checking"),
            txn("6", date(2, 7), "-300", Some("Groceries"), "Business CC"),
            txn("7", date(1, 20), "-80", Some("Groceries"), "Personal Checking"),
        ];
        let agg = aggregate(&txns, &state(), &BusinessAccounts::default(), today);

        assert_eq!(agg.groups.len(), 3);
        assert_eq!(agg.groups[0].actual, d(50));
        assert_eq!(agg.groups[1].actual, d(900));
        assert_eq!(agg.groups[2].actual, Decimal::ZERO);
        assert_eq!(agg.groups[2].pace(&agg.clock), PaceStatus::NoBudget);

        assert_eq!(agg.unmapped_categories(), vec!["Pet Supplies".to_string()]);
        assert_eq!(agg.unmapped_total(), d(20));
        assert_eq!(agg.biz_expenses, d(300));
    }

    #[test]
    fn test_dangling_mapping_is_unmapped() {
        let mut s = state();
        s.set_mapping("Coffee", "gone");
        let txns = vec![txn("1", date(2, 2), "-4", Some("Coffee"), "Personal Checking")];
        let agg = aggregate(&txns, &s, &BusinessAccounts::default(), date(2, 10));
        // no keyword fallback for an explicit mapping
        assert_eq!(agg.unmapped_categories(), vec!["Coffee".to_string()]);
        assert!(agg.groups.iter().all(|g| g.actual.is_zero()));
    }

    #[test]
    fn test_revenue_pulse() {
        let business = BusinessAccounts::default();
        let dec = NaiveDate::from_ymd_opt(2025, 12, 10).unwrap();
        let txns = vec![
            txn("1", date(2, 3), "10000", None, "Business Checking"),
            txn("2", date(1, 3), "8000", None, "Business Checking"),
            txn("3", date(1, 20), "1001", None, "Business Checking"),
            txn("4", date(1, 25), "-50", None, "Business Checking"),
            txn("5", date(1, 5), "5000", None, "Personal Checking"),
            txn("6", dec, "7000", None, "Business Checking"),
        ];

        let agg = aggregate(&txns, &AppState::default(), &business, date(2, 14));
        assert_eq!(agg.biz_revenue, d(10000));
        assert_eq!(agg.prior_revenue.len(), 2);
        // (9001 + 7000) / 2 = 8000.5 rounds away from zero
        assert_eq!(agg.avg_monthly_revenue(), Some(d(8001)));

        let only_current = aggregate(&txns[..1], &AppState::default(), &business, date(2, 14));
        assert_eq!(only_current.avg_monthly_revenue(), None);
    }

    #[test]
    fn test_empty_inputs() {
        let agg = aggregate(&[], &AppState::default(), &BusinessAccounts::default(), date(2, 1));
        assert!(agg.groups.is_empty());
        assert_eq!(agg.unmapped_total(), Decimal::ZERO);
        assert_eq!(agg.biz_revenue, Decimal::ZERO);
        assert_eq!(agg.runway, None);
        assert_eq!(agg.health.sustainability_pct, None);
    }
}
