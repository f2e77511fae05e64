//! Canonical (year, month) identity and calendar arithmetic.
//!
//! Months are zero-indexed throughout: January is `0`, December is `11`.
use crate::core::clock::Clock;
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthId {
    pub year: i32,
    /// Zero-indexed month, `0..=11`.
    pub month: u32,
}

impl MonthId {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if month > 11 {
            return Err(anyhow!("Month index out of range (0-11): {month}"));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    /// Months since year zero, used for distance comparisons.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month)
    }

    pub fn succ(&self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year + 1,
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year - 1,
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is kept in 0..=11 by every constructor, so day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of this month.
    pub fn last_day(&self) -> NaiveDate {
        self.succ().first_day() - Duration::days(1)
    }

    /// Canonical rate key, `YYYY-MM-01`.
    pub fn date_key(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month + 1)
    }
}

impl Display for MonthId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month + 1)
    }
}

impl FromStr for MonthId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_month_id(s)
    }
}

/// Which neighbour of a new month its opening balances are copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// The new month follows existing data: copy from the closest earlier month.
    Next,
    /// The new month precedes existing data: copy from the closest later month.
    Previous,
}

/// Builds the canonical `YYYY-MM` identifier for a zero-indexed month.
pub fn create_month_id(year: i32, month: u32) -> String {
    MonthId { year, month }.to_string()
}

/// Parses a `YYYY-MM` identifier (or a `YYYY-MM-01` rate key) back into a zero-indexed month.
pub fn parse_month_id(id: &str) -> Result<MonthId> {
    let mut parts = id.splitn(3, '-');
    let year: i32 = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("Missing year in month id: {id}"))?
        .parse()
        .with_context(|| format!("Invalid year in month id: {id}"))?;
    let month: u32 = parts
        .next()
        .ok_or_else(|| anyhow!("Missing month in month id: {id}"))?
        .parse()
        .with_context(|| format!("Invalid month in month id: {id}"))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("Month out of range in month id: {id}"));
    }
    MonthId::new(year, month - 1)
}

/// Successor of the latest month in `months`, or the current month when there are none.
pub fn get_next_month<'a>(
    months: impl IntoIterator<Item = &'a MonthId>,
    clock: &dyn Clock,
) -> MonthId {
    months
        .into_iter()
        .max()
        .map(MonthId::succ)
        .unwrap_or_else(|| MonthId::from_date(clock.today()))
}

/// Predecessor of the earliest month in `months`, or the current month when there are none.
pub fn get_previous_month<'a>(
    months: impl IntoIterator<Item = &'a MonthId>,
    clock: &dyn Clock,
) -> MonthId {
    months
        .into_iter()
        .min()
        .map(MonthId::pred)
        .unwrap_or_else(|| MonthId::from_date(clock.today()))
}

/// Finds the existing month to seed a new month's opening balances from.
///
/// For [`CopyDirection::Next`] only months strictly before the target qualify,
/// for [`CopyDirection::Previous`] only months strictly after it. The closest by
/// month distance wins.
pub fn find_closest_month_for_copy<'a>(
    months: impl IntoIterator<Item = &'a MonthId>,
    year: i32,
    month: u32,
    direction: CopyDirection,
) -> Option<MonthId> {
    let target = MonthId { year, month }.ordinal();
    months
        .into_iter()
        .filter(|m| match direction {
            CopyDirection::Next => m.ordinal() < target,
            CopyDirection::Previous => m.ordinal() > target,
        })
        .min_by_key(|m| (m.ordinal() - target).abs())
        .copied()
}
