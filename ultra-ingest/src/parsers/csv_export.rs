//! Transaction CSV export (offline digests).
//!
//! Header row required; column order is free:
//!   date,payee,amount,category,account,tags[,id]
//! `date` is YYYY-MM-DD, `tags` is a comma-separated list inside one field.
//! Rows with an unparseable date or amount are skipped.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::types::{SignConvention, Transaction, UNKNOWN_ACCOUNT};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: Option<String>,
    date: String,
    #[serde(default)]
    payee: String,
    amount: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.parse().ok()
}

/// Parse a CSV export from a file.
pub fn parse_transactions_csv(path: impl AsRef<Path>, signs: SignConvention) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    parse_transactions_reader(file, signs)
}

/// Parse a CSV export from any reader.
pub fn parse_transactions_reader<R: Read>(reader: R, signs: SignConvention) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut txns = Vec::new();
    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("reading CSV row {}", i + 1))?;

        let date = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => continue,
        };
        let Some(amount) = parse_amount(&row.amount) else {
            continue;
        };

        txns.push(Transaction {
            id: row
                .id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("csv-{:04}", i)),
            date,
            payee: row.payee,
            category_name: row.category.filter(|s| !s.is_empty()),
            amount: signs.normalize(amount),
            account_name: row
                .account
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string()),
            tags: row
                .tags
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        });
    }

    Ok(txns)
}
