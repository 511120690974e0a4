//! Deterministic category rules: raw transaction categories to budget groups.
//!
//! Priority: explicit user mapping > keyword fallback (outflows only) > unmapped.

use ultra_core::{
    AppState, BudgetGroup, BudgetItem, CategoryMappings, FIXED_GROUP, VARIABLE_GROUP, WEALTH_GROUP,
};
use ultra_ingest::parsers::lunch_money::Category;
use ultra_ingest::Transaction;
use rust_decimal::Decimal;

/// How a transaction ended up in its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// User-defined mapping entry
    Explicit,
    /// Keyword fallback on category or payee
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Group { group_id: String, source: MatchSource },
    Unmapped,
}

impl Assignment {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Assignment::Group { group_id, .. } => Some(group_id),
            Assignment::Unmapped => None,
        }
    }
}

// Bucket order matters: the first bucket with a hit wins.
const FALLBACK_BUCKETS: [(&str, &[&str]); 3] = [
    (
        VARIABLE_GROUP,
        &["food", "dining", "grocery", "restaurants", "coffee", "alcohol", "shop"],
    ),
    (
        FIXED_GROUP,
        &["mortgage", "rent", "bill", "utility", "insurance", "internet", "phone"],
    ),
    (WEALTH_GROUP, &["invest", "save", "vanguard", "transfer"]),
];

/// Keyword fallback on lower-cased category or payee text.
pub fn keyword_group(category: &str, payee: &str) -> Option<&'static str> {
    let category = category.to_lowercase();
    let payee = payee.to_lowercase();
    FALLBACK_BUCKETS
        .iter()
        .find(|(_, words)| {
            words
                .iter()
                .any(|w| category.contains(w) || payee.contains(w))
        })
        .map(|(group, _)| *group)
}

/// Assign one transaction to a group.
///
/// An exact mapping always wins, even when it points at a group that no
/// longer exists (the aggregator then reports it as unmapped). Inflows are
/// never auto-classified.
pub fn categorize(
    category: &str,
    payee: &str,
    amount: Decimal,
    mappings: &CategoryMappings,
) -> Assignment {
    if let Some(group_id) = mappings.get(category) {
        return Assignment::Group {
            group_id: group_id.clone(),
            source: MatchSource::Explicit,
        };
    }
    if amount >= Decimal::ZERO {
        return Assignment::Unmapped;
    }
    match keyword_group(category, payee) {
        Some(group) => Assignment::Group {
            group_id: group.to_string(),
            source: MatchSource::Keyword,
        },
        None => Assignment::Unmapped,
    }
}

pub fn categorize_transaction(txn: &Transaction, mappings: &CategoryMappings) -> Assignment {
    categorize(txn.category(), &txn.payee, txn.amount, mappings)
}

/// Which starter group an upstream category belongs to, by its name.
pub fn sync_group_for(category_name: &str) -> &'static str {
    let name = category_name.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["saving", "invest", "retirement", "401k", "ira", "stock"]) {
        WEALTH_GROUP
    } else if has(&["rent", "mortgage", "utilit", "insurance", "loan", "subscript"]) {
        FIXED_GROUP
    } else {
        VARIABLE_GROUP
    }
}

/// Fresh wealth/fixed/variable structure with one zero-amount item per
/// upstream category, in upstream order.
pub fn groups_from_categories(categories: &[Category]) -> Vec<BudgetGroup> {
    let mut wealth = BudgetGroup::new(WEALTH_GROUP, "Wealth Building", "#C8FF00");
    let mut fixed = BudgetGroup::new(FIXED_GROUP, "Fixed Expenses", "#5B7FFF");
    let mut variable = BudgetGroup::new(VARIABLE_GROUP, "Variable Spending", "#2DD4BF");

    for c in categories {
        let item = BudgetItem::new(c.id.to_string(), c.name.clone(), Decimal::ZERO);
        match sync_group_for(&c.name) {
            WEALTH_GROUP => wealth.items.push(item),
            FIXED_GROUP => fixed.items.push(item),
            _ => variable.items.push(item),
        }
    }

    vec![wealth, fixed, variable]
}

/// Replace the state's groups with the synced structure and map every
/// category name to the group it landed in. Existing mappings are kept.
/// Returns how many mappings were added.
pub fn apply_category_sync(state: &mut AppState, categories: &[Category]) -> usize {
    state.replace_groups(groups_from_categories(categories));
    let mut added = 0;
    for c in categories {
        if !state.mappings.contains_key(&c.name) {
            state.set_mapping(c.name.clone(), sync_group_for(&c.name));
            added += 1;
        }
    }
    added
}
