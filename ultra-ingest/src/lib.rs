//! ultra-ingest: transaction feeds (Lunch Money API, CSV export) normalized
//! to one canonical, inflow-positive transaction type.

pub mod parsers;
pub mod types;

pub use parsers::csv_export::{parse_transactions_csv, parse_transactions_reader};
pub use parsers::lunch_money::{combine_balances, normalize_transactions, AccountDirectory};
pub use types::{AccountBalance, AccountKind, SignConvention, Transaction};
