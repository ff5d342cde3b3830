//! Derived metrics and region records for COVID-19 time series.
//!
//! Raw cumulative tables come from `covid-source`; this crate turns them
//! into per-region records with smoothed daily series, per-capita rates and
//! case fatality, and lines records up for comparison.

pub mod compare;
pub mod error;
pub mod metrics;
pub mod outcomes;
pub mod region;
pub mod summary;

pub use compare::{compare, CompareOptions, Comparison, MetricKind, MissingMetricPolicy};
pub use error::{Error, Result};
pub use metrics::{CaseFatality, Metric, DEFAULT_WINDOW, PER_MILLION};
pub use region::{CountyTables, GlobalTables, RegionKind, RegionRecord, StateTables};
pub use outcomes::{recent_outcomes, OutcomeRow};
pub use summary::DailySummary;
