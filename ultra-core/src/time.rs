//! Time utilities: timezone-aware "today" and calendar-month budgeting periods.

use anyhow::Result;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolve the calendar day of `now` in an IANA tz like "America/Chicago".
pub fn local_today(now: DateTime<Utc>, tz: &str) -> Result<NaiveDate> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(now.with_timezone(&tz).date_naive())
}

/// A budgeting period: one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated in every constructor
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The period `n` months before this one.
    pub fn months_back(&self, n: u32) -> Self {
        let shifted = self
            .first_day()
            .checked_sub_months(Months::new(n))
            .unwrap_or(NaiveDate::MIN);
        Self::containing(shifted)
    }

    /// Human label, e.g. "February 2026".
    pub fn label(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }

    /// Storage key, e.g. "2026-02".
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("invalid period '{s}' (expected YYYY-MM)"))?;
        let year: i32 = y.parse().map_err(|_| anyhow::anyhow!("invalid year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| anyhow::anyhow!("invalid month in '{s}'"))?;
        Self::new(year, month).ok_or_else(|| anyhow::anyhow!("invalid period '{s}'"))
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where `today` sits inside its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodClock {
    pub period: Period,
    pub days_passed: u32,
    pub days_in_month: u32,
}

impl PeriodClock {
    pub fn at(today: NaiveDate) -> Self {
        let period = Period::containing(today);
        Self {
            period,
            days_passed: today.day(),
            days_in_month: period.days_in_month(),
        }
    }

    pub fn days_remaining(&self) -> u32 {
        self.days_in_month - self.days_passed
    }
}
