//! Versioned persistence schema for [`AppState`].
//!
//! Blobs without a `version` field (or with `version: 1`) are the legacy
//! layout: goals carry a per-month contribution ledger and `monthlyBiz` is
//! keyed by `"<year>-<Mon>"`. Version 2 is [`AppState`] as serialized by
//! this crate. Loading always migrates to the current version and validates.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::budget::{AppState, BudgetGroup, BusinessMonth, CategoryMappings};
use crate::goals::{Goal, GoalV1};
use crate::time::Period;

pub const CURRENT_VERSION: u64 = 2;

/// Largest magnitude accepted for any stored amount. Keeps every sum,
/// ratio and percentage derived from the state inside `Decimal` range.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

static LEGACY_MONTH_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>[A-Za-z]{3}|\d{1,2})$").expect("valid legacy month key pattern")
});

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state blob is not a JSON object")]
    NotAnObject,
    #[error("unsupported state version {0}")]
    UnsupportedVersion(u64),
    #[error("malformed v{version} state: {source}")]
    Malformed {
        version: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate group id '{0}'")]
    DuplicateGroup(String),
    #[error("duplicate item id '{item}' in group '{group}'")]
    DuplicateItem { group: String, item: String },
    #[error("{field} is out of range: {amount}")]
    AmountOutOfRange { field: String, amount: Decimal },
    #[error("could not serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The legacy (v1) state layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateV1 {
    #[serde(default)]
    pub salary: Option<Decimal>,
    #[serde(default, rename = "w2Wages")]
    pub w2_wages: Option<Decimal>,
    #[serde(default)]
    pub personal_balance: Option<Decimal>,
    #[serde(default)]
    pub biz_balance: Option<Decimal>,
    #[serde(default)]
    pub groups: Vec<BudgetGroup>,
    #[serde(default)]
    pub goals: Vec<GoalV1>,
    #[serde(default)]
    pub mappings: CategoryMappings,
    #[serde(default)]
    pub monthly_biz: BTreeMap<String, BusinessMonth>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub streak: Option<u32>,
    #[serde(default)]
    pub last_check_in: Option<String>,
    #[serde(default)]
    pub flagged_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum VersionedState {
    V1(StateV1),
    V2(AppState),
}

/// Outcome of loading a blob: the current-version state plus anything the
/// migration could not carry over.
#[derive(Debug, Clone)]
pub struct Migration {
    pub state: AppState,
    pub from_version: u64,
    pub notes: Vec<String>,
}

impl VersionedState {
    pub fn from_value(value: Value) -> Result<Self, StateError> {
        let version = match value.as_object() {
            None => return Err(StateError::NotAnObject),
            Some(obj) => match obj.get("version") {
                None | Some(Value::Null) => 1,
                Some(v) => v.as_u64().ok_or(StateError::UnsupportedVersion(0))?,
            },
        };

        match version {
            1 => serde_json::from_value(value)
                .map(VersionedState::V1)
                .map_err(|source| StateError::Malformed { version, source }),
            2 => serde_json::from_value(value)
                .map(VersionedState::V2)
                .map_err(|source| StateError::Malformed { version, source }),
            other => Err(StateError::UnsupportedVersion(other)),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            VersionedState::V1(_) => 1,
            VersionedState::V2(_) => 2,
        }
    }

    pub fn migrate(self) -> Result<Migration, StateError> {
        let from_version = self.version();
        let (state, notes) = match self {
            VersionedState::V2(state) => (state, Vec::new()),
            VersionedState::V1(v1) => migrate_v1(v1)?,
        };
        Ok(Migration {
            state,
            from_version,
            notes,
        })
    }
}

fn migrate_v1(v1: StateV1) -> Result<(AppState, Vec<String>), StateError> {
    let mut notes = Vec::new();

    let mut monthly_biz = BTreeMap::new();
    for (key, month) in v1.monthly_biz {
        match parse_legacy_month_key(&key) {
            Some(period) => {
                monthly_biz.insert(period, month);
            }
            None => notes.push(format!("dropped monthlyBiz entry '{key}' (no year)")),
        }
    }

    let last_check_in = match v1.last_check_in.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                notes.push(format!("dropped unparseable lastCheckIn '{s}'"));
                None
            }
        },
    };

    let state = AppState {
        salary: v1.salary.unwrap_or_default(),
        w2_wages: v1.w2_wages.unwrap_or_default(),
        personal_balance: v1.personal_balance.unwrap_or_default(),
        biz_balance: v1.biz_balance.unwrap_or_default(),
        groups: v1.groups,
        goals: v1.goals.into_iter().map(Goal::from).collect(),
        mappings: v1.mappings,
        monthly_biz,
        notes: v1.notes.unwrap_or_default(),
        streak: v1.streak.unwrap_or_default(),
        last_check_in,
        flagged_ids: v1.flagged_ids,
    };
    Ok((state, notes))
}

/// "2026-Feb" or "2026-02" -> Period. Keys without a year yield `None`.
fn parse_legacy_month_key(key: &str) -> Option<Period> {
    let caps = LEGACY_MONTH_KEY.captures(key.trim())?;
    let year = caps["year"].parse::<i32>().ok()?;
    let raw = caps["month"].to_lowercase();
    let month = match raw.parse::<u32>() {
        Ok(m) => Some(m),
        Err(_) => MONTH_ABBREVIATIONS
            .iter()
            .position(|m| *m == raw)
            .map(|i| i as u32 + 1),
    };
    month.and_then(|m| Period::new(year, m))
}

fn check_amount(field: &str, amount: Decimal) -> Result<(), StateError> {
    if amount.abs() > Decimal::from(MAX_AMOUNT) {
        return Err(StateError::AmountOutOfRange {
            field: field.to_string(),
            amount,
        });
    }
    Ok(())
}

/// Parse, migrate and validate a persisted blob.
pub fn load_state(value: Value) -> Result<Migration, StateError> {
    let migration = VersionedState::from_value(value)?.migrate()?;
    migration.state.validate()?;
    Ok(migration)
}

impl AppState {
    /// Group ids unique in the state; item ids unique within their group;
    /// every amount within `MAX_AMOUNT`.
    pub fn validate(&self) -> Result<(), StateError> {
        check_amount("salary", self.salary)?;
        check_amount("w2Wages", self.w2_wages)?;
        check_amount("personalBalance", self.personal_balance)?;
        check_amount("bizBalance", self.biz_balance)?;
        for goal in &self.goals {
            check_amount(&format!("goal '{}' target", goal.id), goal.target)?;
            check_amount(&format!("goal '{}' startingBalance", goal.id), goal.starting_balance)?;
            check_amount(
                &format!("goal '{}' currentContribution", goal.id),
                goal.current_contribution,
            )?;
        }
        for (period, month) in &self.monthly_biz {
            check_amount(&format!("monthlyBiz {period} revenue"), month.revenue)?;
            check_amount(&format!("monthlyBiz {period} expenses"), month.expenses)?;
        }

        let mut group_ids = HashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(StateError::DuplicateGroup(group.id.clone()));
            }
            let mut item_ids = HashSet::new();
            for item in &group.items {
                check_amount(&format!("item '{}' in group '{}'", item.id, group.id), item.amount)?;
                if !item_ids.insert(item.id.as_str()) {
                    return Err(StateError::DuplicateItem {
                        group: group.id.clone(),
                        item: item.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize with the current schema version stamped in.
    pub fn to_persisted(&self) -> Result<Value, StateError> {
        let mut value = serde_json::to_value(self).map_err(StateError::Serialize)?;
        if let Value::Object(obj) = &mut value {
            obj.insert("version".to_string(), Value::from(CURRENT_VERSION));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetItem;
    use serde_json::json;

    fn legacy_blob() -> Value {
        json!({
            "salary": 4000,
            "personalBalance": 5200,
            "bizBalance": 28500,
            "selectedMonth": "Feb",
            "selectedYear": 2026,
            "streak": 3,
            "lastCheckIn": "2026-02-18",
            "groups": [
                {"id": "fixed", "name": "Fixed Expenses", "color": "#5B7FFF", "collapsed": false,
                 "items": [{"id": "4", "name": "Mortgage", "amount": 960}]}
            ],
            "monthlyBiz": {
                "2026-Feb": {"revenue": 10000, "expenses": 2498},
                "Mar": {"revenue": 0, "expenses": 0}
            },
            "goals": [
                {"id": "1", "name": "Emergency Fund", "target": 10000, "startingBalance": 2000,
                 "monthlyContributions": {"Jan": 500}}
            ],
            "mappings": {"Groceries": "variable"}
        })
    }

    #[test]
    fn test_unversioned_blob_is_v1() {
        let state = VersionedState::from_value(legacy_blob()).unwrap();
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_migrate_v1() {
        let m = load_state(legacy_blob()).unwrap();
        assert_eq!(m.from_version, 1);
        let s = &m.state;
        assert_eq!(s.salary, Decimal::from(4000));
        assert_eq!(s.w2_wages, Decimal::ZERO);
        assert_eq!(s.streak, 3);
        assert_eq!(s.last_check_in, NaiveDate::from_ymd_opt(2026, 2, 18));
        assert_eq!(s.goals[0].current_contribution, Decimal::from(500));
        assert_eq!(s.notes, "");

        let feb = Period::new(2026, 2).unwrap();
        assert_eq!(s.business_month(feb).revenue, Decimal::from(10000));
        assert_eq!(s.monthly_biz.len(), 1);
        assert_eq!(m.notes.len(), 1);
        assert!(m.notes[0].contains("Mar"));
    }

    #[test]
    fn test_v2_round_trips_through_persisted_form() {
        let mut state = AppState::starter();
        state.set_mapping("Groceries", "variable");
        let value = state.to_persisted().unwrap();
        assert_eq!(value["version"], json!(2));

        let m = load_state(value).unwrap();
        assert_eq!(m.from_version, 2);
        assert!(m.notes.is_empty());
        assert_eq!(m.state, state);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = VersionedState::from_value(json!({"version": 7})).unwrap_err();
        assert!(matches!(err, StateError::UnsupportedVersion(7)));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = VersionedState::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StateError::NotAnObject));
    }

    #[test]
    fn test_validate_duplicate_group() {
        let mut state = AppState::starter();
        state.groups.push(BudgetGroup::new("fixed", "Fixed again", "#000000"));
        let err = load_state(state.to_persisted().unwrap()).unwrap_err();
        assert!(matches!(err, StateError::DuplicateGroup(id) if id == "fixed"));
    }

    #[test]
    fn test_validate_duplicate_item() {
        let mut state = AppState::starter();
        state.groups[0]
            .items
            .push(BudgetItem::new("1", "Dup", Decimal::from(5)));
        assert!(matches!(
            state.validate(),
            Err(StateError::DuplicateItem { .. })
        ));
    }

    #[test]
    fn test_legacy_month_keys() {
        assert_eq!(parse_legacy_month_key("2026-Feb"), Period::new(2026, 2));
        assert_eq!(parse_legacy_month_key("2025-12"), Period::new(2025, 12));
        assert_eq!(parse_legacy_month_key("Feb"), None);
        assert_eq!(parse_legacy_month_key("2026-Foo"), None);
    }

    #[test]
    fn test_rejects_out_of_range_goal() {
        let blob = json!({"version": 2, "goals": [
            {"id": "1", "name": "x", "target": 1e-10, "startingBalance": 1e20, "currentContribution": 1e-10}
        ]});
        let err = load_state(blob).unwrap_err();
        assert!(matches!(err, StateError::AmountOutOfRange { ref field, .. } if field.contains("startingBalance")));
    }

    #[test]
    fn test_rejects_out_of_range_item() {
        let mut state = AppState::starter();
        state.groups[1].items[0].amount = Decimal::from(MAX_AMOUNT) + Decimal::ONE;
        assert!(matches!(
            state.validate(),
            Err(StateError::AmountOutOfRange { .. })
        ));

        state.groups[1].items[0].amount = -Decimal::from(MAX_AMOUNT);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_v2_null_amounts_read_as_zero() {
        let m = load_state(json!({"version": 2, "salary": null, "w2Wages": null, "bizBalance": 100})).unwrap();
        assert_eq!(m.state.salary, Decimal::ZERO);
        assert_eq!(m.state.w2_wages, Decimal::ZERO);
        assert_eq!(m.state.biz_balance, Decimal::from(100));
    }
}
