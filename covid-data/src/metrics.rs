//! Series arithmetic for cumulative counts.
//!
//! Positional operations (differences, rolling windows) follow the order of
//! the series index. A missing input anywhere in a window makes the output
//! missing; nothing is ever filled with zero.

use chrono::NaiveDate;
use covid_source::TimeSeries;
use std::collections::BTreeSet;
use thiserror::Error;

/// Default smoothing window in days.
pub const DEFAULT_WINDOW: usize = 7;

/// Per-capita scale: counts per million residents.
pub const PER_MILLION: f64 = 1_000_000.0;

/// Population absent or zero.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("population is missing or zero")]
pub struct PopulationError;

/// Day-over-day change; the first entry is missing.
pub fn first_difference(series: &TimeSeries) -> TimeSeries {
    let mut previous: Option<Option<f64>> = None;
    series
        .iter()
        .map(|(date, value)| {
            let diff = match (previous, value) {
                (Some(Some(before)), Some(now)) => Some(now - before),
                _ => None,
            };
            previous = Some(value);
            (date, diff)
        })
        .collect()
}

/// Trailing mean over `window` entries; defined only for full windows with
/// no missing value.
pub fn rolling_mean(series: &TimeSeries, window: usize) -> TimeSeries {
    let values: Vec<Option<f64>> = series.values().collect();
    series
        .dates()
        .enumerate()
        .map(|(i, date)| {
            let mean = if window == 0 || i + 1 < window {
                None
            } else {
                values[i + 1 - window..=i]
                    .iter()
                    .copied()
                    .sum::<Option<f64>>()
                    .map(|total| total / window as f64)
            };
            (date, mean)
        })
        .collect()
}

/// Rolling mean of the daily change of a cumulative series. Same index as
/// the input with the first `window` entries missing. Negative changes from
/// source corrections are kept as they are.
pub fn daily_delta_smoothed(series: &TimeSeries, window: usize) -> TimeSeries {
    rolling_mean(&first_difference(series), window)
}

/// `value * per / population`.
pub fn normalize_per_capita(
    series: &TimeSeries,
    population: Option<u64>,
    per: f64,
) -> Result<TimeSeries, PopulationError> {
    match population {
        Some(population) if population > 0 => {
            let population = population as f64;
            Ok(series.map(|value| value * per / population))
        }
        _ => Err(PopulationError),
    }
}

/// Pointwise `numerator / denominator` over the union of both indexes.
/// Missing on dates only one side has, where either value is missing, or
/// where the denominator is zero.
pub fn ratio(numerator: &TimeSeries, denominator: &TimeSeries) -> TimeSeries {
    let dates: BTreeSet<NaiveDate> = numerator.dates().chain(denominator.dates()).collect();
    dates
        .into_iter()
        .map(|date| {
            let value = match (numerator.value(&date), denominator.value(&date)) {
                (Some(n), Some(d)) if d != 0.0 => Some(n / d),
                _ => None,
            };
            (date, value)
        })
        .collect()
}

/// Inclusive date slice; an omitted bound is open. `start > end` gives an
/// empty series.
pub fn restrict_to_window(
    series: &TimeSeries,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> TimeSeries {
    series.range(start, end)
}

/// A raw cumulative series with its derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    series: TimeSeries,
    total: Option<f64>,
    per_day: TimeSeries,
}

impl Metric {
    pub fn derive(series: TimeSeries, window: usize) -> Self {
        let total = series.last_value();
        let per_day = daily_delta_smoothed(&series, window);
        Metric {
            series,
            total,
            per_day,
        }
    }

    /// The cumulative series as loaded.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Last recorded cumulative value.
    pub fn total(&self) -> Option<f64> {
        self.total
    }

    /// Smoothed daily change.
    pub fn per_day(&self) -> &TimeSeries {
        &self.per_day
    }

    /// Unsmoothed daily change.
    pub fn daily(&self) -> TimeSeries {
        first_difference(&self.series)
    }
}

/// Fatalities over cases, pointwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFatality {
    series: TimeSeries,
    last: Option<f64>,
}

impl CaseFatality {
    pub fn derive(fatalities: &TimeSeries, cases: &TimeSeries) -> Self {
        let series = ratio(fatalities, cases);
        let last = series.last_value();
        CaseFatality { series, last }
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}
