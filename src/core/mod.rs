//! Core budget engine: month arithmetic, rate resolution and aggregation.

pub mod analytics;
pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod ledger;
pub mod log;
pub mod month;
pub mod rates;
pub mod resolver;
pub mod scheduler;
pub mod year;

// Re-export main types for cleaner imports
pub use analytics::{ComputedMonth, RatedMonth, compute_month_data};
pub use clock::{Clock, FixedClock, SystemClock};
pub use currency::{RateMap, RateProvider, convert, sum_in_currency};
pub use ledger::{Entry, Month};
pub use month::{CopyDirection, MonthId};
pub use rates::{RateSet, RateStore, RatesError, ResolvedRates};
pub use resolver::ExchangeRateResolver;
pub use scheduler::{RateUpdater, should_update_rates_now};
pub use year::{YearSummary, compute_year_summary};
