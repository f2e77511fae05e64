//! Raw ledger records: months and the entries they own.
use crate::core::month::{CopyDirection, MonthId, find_closest_month_for_copy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single ledger line. Balances carry no date; expenses may be flagged optional.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    Balance {
        description: String,
        amount: f64,
        currency: String,
    },
    Income {
        description: String,
        amount: f64,
        currency: String,
        date: NaiveDate,
    },
    Expense {
        description: String,
        amount: f64,
        currency: String,
        date: NaiveDate,
        #[serde(default)]
        optional: bool,
    },
}

impl Entry {
    pub fn amount(&self) -> f64 {
        match self {
            Entry::Balance { amount, .. }
            | Entry::Income { amount, .. }
            | Entry::Expense { amount, .. } => *amount,
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            Entry::Balance { currency, .. }
            | Entry::Income { currency, .. }
            | Entry::Expense { currency, .. } => currency,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Entry::Balance { description, .. }
            | Entry::Income { description, .. }
            | Entry::Expense { description, .. } => description,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Entry::Balance { .. } => None,
            Entry::Income { date, .. } | Entry::Expense { date, .. } => Some(*date),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Entry::Expense { optional: true, .. })
    }
}

/// One owner's ledger bucket for a calendar month.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Month {
    pub year: i32,
    /// Zero-indexed month, `0..=11`.
    pub month: u32,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn id(&self) -> MonthId {
        MonthId {
            year: self.year,
            month: self.month,
        }
    }

    pub fn balances(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Balance { .. }))
    }

    pub fn incomes(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Income { .. }))
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Expense { .. }))
    }

    /// Opening balances to seed a newly created month from this one.
    pub fn carry_over_balances(&self) -> Vec<Entry> {
        self.balances().cloned().collect()
    }
}

/// Creates an empty month whose opening balances are copied from the closest
/// existing month in `direction`, if any.
pub fn seed_month(months: &[Month], target: MonthId, direction: CopyDirection) -> Month {
    let ids: Vec<MonthId> = months.iter().map(Month::id).collect();
    let source = find_closest_month_for_copy(&ids, target.year, target.month, direction)
        .and_then(|id| months.iter().find(|m| m.id() == id));

    let seeded = Month::new(target.year, target.month);
    match source {
        Some(source) => {
            debug!("Seeding {} with balances from {}", target, source.id());
            seeded.with_entries(source.carry_over_balances())
        }
        None => seeded,
    }
}
