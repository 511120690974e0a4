use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use ultra_core::{load_state, AppState, BudgetGroup, BudgetItem, FIXED_GROUP, VARIABLE_GROUP, WEALTH_GROUP};
use ultra_finance::pipeline::{run_digest, DigestRequest, PipelineError};
use ultra_finance::sources::{MemoryStore, StateRow, TransactionSource};
use ultra_finance::{build_digest, BusinessAccounts, PaceStatus};
use ultra_ingest::parsers::lunch_money::{
    Asset, Category, PlaidAccount, PlaidAccountsResponse, RawTransaction, TransactionsResponse,
};
use ultra_ingest::{parse_transactions_csv, SignConvention, Transaction};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("fixtures")
        .join("transactions-2026-02.csv")
}

fn d(n: i64) -> Decimal {
    Decimal::from(n)
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn feb(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

fn personal(id: &str, amount: i64, category: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        date: feb(3),
        payee: String::new(),
        category_name: Some(category.to_string()),
        amount: d(amount),
        account_name: "Personal Checking".to_string(),
        tags: vec![],
    }
}

fn household_state() -> AppState {
    let mut state = AppState::default();
    state.salary = d(4000);
    state.w2_wages = d(2100);
    state.biz_balance = d(28500);
    state.groups = vec![
        BudgetGroup::new(WEALTH_GROUP, "Wealth Building", "#C8FF00")
            .with_item(BudgetItem::new("1", "Vanguard ETF", d(1000))),
        BudgetGroup::new(FIXED_GROUP, "Fixed Expenses", "#5B7FFF")
            .with_item(BudgetItem::new("2", "Mortgage", d(960))),
        BudgetGroup::new(VARIABLE_GROUP, "Variable Spending", "#2DD4BF")
            .with_item(BudgetItem::new("3", "Groceries", d(500))),
    ];
    state.set_mapping("Groceries", VARIABLE_GROUP);
    state.set_mapping("Mortgage", FIXED_GROUP);
    state
}

/// Scenario A: two mapped outflows land in their groups.
#[test]
fn test_scenario_a_budget_vs_actual() {
    let mut state = AppState::default();
    state.groups = vec![
        BudgetGroup::new(VARIABLE_GROUP, "Variable Spending", "#2DD4BF")
            .with_item(BudgetItem::new("1", "Groceries", d(500))),
        BudgetGroup::new(FIXED_GROUP, "Fixed Expenses", "#5B7FFF")
            .with_item(BudgetItem::new("2", "Mortgage", d(960))),
    ];
    state.set_mapping("Groceries", VARIABLE_GROUP);
    state.set_mapping("Mortgage", FIXED_GROUP);

    let txns = vec![personal("1", -50, "Groceries"), personal("2", -900, "Mortgage")];
    let digest = build_digest(&txns, &state, &BusinessAccounts::default(), feb(14));

    let rows = &digest.budget_vs_actual;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].group, "Variable Spending");
    assert_eq!((rows[0].budgeted, rows[0].actual, rows[0].remaining), (d(500), d(50), d(450)));
    assert_eq!(rows[0].pace_status, PaceStatus::OnTrack);
    assert_eq!(rows[1].group, "Fixed Expenses");
    assert_eq!((rows[1].budgeted, rows[1].actual, rows[1].remaining), (d(960), d(900), d(60)));
    // 900/960 of the budget spent halfway through February
    assert_eq!(rows[1].pace_status, PaceStatus::AheadOfBudget);
    assert!(digest.unmapped_categories.is_empty());
}

/// Scenario B: a legacy goal ledger is folded into the contribution on load.
#[test]
fn test_scenario_b_legacy_goal() {
    let blob = json!({
        "salary": 4000,
        "goals": [{
            "id": "1", "name": "Emergency Fund", "target": 10000,
            "startingBalance": 2000, "monthlyContributions": {"Jan": 500}
        }]
    });
    let migration = load_state(blob).unwrap();
    assert_eq!(migration.from_version, 1);

    let digest = build_digest(&[], &migration.state, &BusinessAccounts::default(), feb(14));
    let goal = &digest.goals[0];
    assert_eq!(goal.saved, d(2500));
    assert_eq!(goal.pct, 25);
    assert_eq!(goal.remaining, d(7500));
    assert_eq!(goal.months_to_goal, Some(15));
}

/// Scenario C: transfer and runway.
#[test]
fn test_scenario_c_transfer_and_runway() {
    let digest = build_digest(&[], &household_state(), &BusinessAccounts::default(), feb(14));
    assert_eq!(digest.transfer_needed, d(1900));
    assert_eq!(digest.runway, Some(dec("15.0")));

    let json = serde_json::to_value(&digest).unwrap();
    assert_eq!(json["runway"].as_f64(), Some(15.0));
}

/// Scenario D: one unmapped category, reported once, summed over every occurrence.
#[test]
fn test_scenario_d_unmapped_dedup() {
    let txns = vec![
        personal("1", -20, "Pet Supplies"),
        personal("2", -15, "Pet Supplies"),
        personal("3", -7, "Pet Supplies"),
    ];
    let digest = build_digest(&txns, &household_state(), &BusinessAccounts::default(), feb(14));
    assert_eq!(digest.unmapped_categories, vec!["Pet Supplies".to_string()]);
    assert_eq!(digest.unmapped_total, d(42));
}

#[test]
fn test_fixture_digest() {
    let txns = parse_transactions_csv(fixture_path(), SignConvention::InflowPositive).unwrap();
    assert_eq!(txns.len(), 16);

    let digest = build_digest(&txns, &household_state(), &BusinessAccounts::default(), feb(14));

    assert_eq!(digest.period, "February 2026");
    assert_eq!(digest.days_passed, 14);
    assert_eq!(digest.days_remaining, 14);

    let actuals: Vec<Decimal> = digest.budget_vs_actual.iter().map(|r| r.actual).collect();
    // wealth (Vanguard via payee keyword), fixed, variable (groceries + coffee keyword)
    assert_eq!(actuals, vec![d(400), d(900), d(57)]);
    assert_eq!(digest.budget_vs_actual[2].remaining, d(443));

    assert_eq!(
        digest.unmapped_categories,
        vec!["Pet Supplies".to_string(), "Returns".to_string()]
    );
    assert_eq!(digest.unmapped_total, d(91));

    // business inflows only; Dec 7000 and Jan 9001 average to 8000.5
    assert_eq!(digest.biz_revenue_this_month, d(10000));
    assert_eq!(digest.avg_monthly_revenue, Some(d(8001)));

    let health = &digest.business_health;
    assert_eq!(health.profit, d(7502));
    assert_eq!(health.sustainability_pct, Some(53));
    assert!(health.bonus_eligible);
    assert_eq!(health.potential_bonus, d(1751));
}

#[test]
fn test_actuals_plus_unmapped_equal_personal_outflows() {
    let txns = parse_transactions_csv(fixture_path(), SignConvention::InflowPositive).unwrap();
    let business = BusinessAccounts::default();
    let today = feb(14);
    let agg = ultra_finance::aggregate(&txns, &household_state(), &business, today);

    let mapped: Decimal = agg.groups.iter().map(|g| g.actual).sum();
    let expected: Decimal = txns
        .iter()
        .filter(|t| agg.clock.period.contains(t.date) && !business.is_business(&t.account_name))
        .map(Transaction::outflow_amount)
        .sum();
    assert_eq!(mapped + agg.unmapped_total(), expected);
    assert_eq!(expected, d(1447));
}

#[test]
fn test_digest_is_idempotent() {
    let txns = parse_transactions_csv(fixture_path(), SignConvention::InflowPositive).unwrap();
    let state = household_state();
    let business = BusinessAccounts::default();
    let a = serde_json::to_string(&build_digest(&txns, &state, &business, feb(14))).unwrap();
    let b = serde_json::to_string(&build_digest(&txns, &state, &business, feb(14))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_zero_budget_group_reports_no_budget() {
    let mut state = household_state();
    state.groups.push(BudgetGroup::new("fun", "Fun Money", "#fff"));
    state.set_mapping("Concerts", "fun");
    let txns = vec![personal("1", -60, "Concerts")];
    let digest = build_digest(&txns, &state, &BusinessAccounts::default(), feb(14));
    let fun = digest.budget_vs_actual.last().unwrap();
    assert_eq!(fun.pace_status, PaceStatus::NoBudget);
    assert_eq!(fun.actual, d(60));
    assert_eq!(fun.remaining, d(-60));
}

// Lunch Money reports spending as positive amounts.
struct FakeLunchMoney;

#[async_trait]
impl TransactionSource for FakeLunchMoney {
    async fn transactions(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<RawTransaction>> {
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, feb(14));
        let resp: TransactionsResponse = serde_json::from_value(json!({"transactions": [
            {"id": 1, "date": "2026-02-02", "payee": "Whole Foods", "amount": "50.00",
             "category_name": "Groceries", "plaid_account_id": 10},
            {"id": 2, "date": "2026-02-03", "payee": "Client A", "amount": "-10000.00",
             "category_name": "Income", "plaid_account_id": 20},
            {"id": 3, "date": "2026-02-04", "payee": "Refund", "amount": "-25.00",
             "category_name": "Groceries", "plaid_account_id": 10}
        ]}))?;
        Ok(resp.transactions)
    }

    async fn plaid_accounts(&self) -> anyhow::Result<Vec<PlaidAccount>> {
        let resp: PlaidAccountsResponse = serde_json::from_value(json!({"plaid_accounts": [
            {"id": 10, "name": "Personal Checking", "balance": "5200.00"},
            {"id": 20, "name": "Business Checking", "balance": "28500.00"}
        ]}))?;
        Ok(resp.plaid_accounts)
    }

    async fn assets(&self) -> anyhow::Result<Vec<Asset>> {
        Ok(vec![])
    }

    async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_run_digest_end_to_end() {
    let store = MemoryStore::with_row(StateRow {
        id: Some(1),
        user_email: Some("me@example.com".to_string()),
        data: household_state().to_persisted().unwrap(),
        updated_at: None,
    });
    let req = DigestRequest {
        today: feb(14),
        history_months: 2,
        user_email: None,
    };

    let digest = run_digest(&FakeLunchMoney, &store, &BusinessAccounts::default(), &req)
        .await
        .unwrap();

    // the refund is an inflow and never reduces spending
    assert_eq!(digest.budget_vs_actual[2].actual, d(50));
    assert_eq!(digest.biz_revenue_this_month, d(10000));
    assert!(digest.unmapped_categories.is_empty());
}

#[tokio::test]
async fn test_run_digest_without_state() {
    let req = DigestRequest {
        today: feb(14),
        history_months: 2,
        user_email: None,
    };
    let err = run_digest(&FakeLunchMoney, &MemoryStore::new(), &BusinessAccounts::default(), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoState));
}
