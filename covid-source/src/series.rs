use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;
use std::collections::BTreeMap;

/// A daily time series: unique, ordered dates mapped to a value that may be
/// missing for unobserved or undefined days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    points: BTreeMap<NaiveDate, Option<f64>>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series over consecutive days starting at `start`.
    pub fn daily<I>(start: NaiveDate, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(offset, value)| (start + TimeDelta::days(offset as i64), value))
            .collect()
    }

    /// Insert or overwrite the value for `date`.
    pub fn insert(&mut self, date: NaiveDate, value: Option<f64>) {
        self.points.insert(date, value);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether `date` is part of the index (its value may still be missing).
    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.points.contains_key(date)
    }

    /// Value at `date`; `None` when the date is absent or the value missing.
    pub fn value(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.points.iter().map(|(date, value)| (*date, *value))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.values().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// Value at the final date of the index.
    pub fn last_value(&self) -> Option<f64> {
        self.points.values().next_back().copied().flatten()
    }

    /// Number of non-missing values.
    pub fn observed(&self) -> usize {
        self.points.values().filter(|v| v.is_some()).count()
    }

    /// Apply `f` to every present value, keeping missing ones missing.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        self.iter()
            .map(|(date, value)| (date, value.map(&f)))
            .collect()
    }

    /// Inclusive slice between optional bounds.
    pub fn range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Self::new();
            }
        }
        self.iter()
            .filter(|(date, _)| start.map_or(true, |s| *date >= s))
            .filter(|(date, _)| end.map_or(true, |e| *date <= e))
            .collect()
    }
}

impl FromIterator<(NaiveDate, Option<f64>)> for TimeSeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, Option<f64>)>>(iter: T) -> Self {
        TimeSeries {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TimeSeries;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    #[test]
    fn test_daily_builds_consecutive_index() {
        let series = TimeSeries::daily(day(1), vec![Some(1.0), None, Some(3.0)]);
        let dates: Vec<NaiveDate> = series.dates().collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(series.value(&day(2)), None);
        assert!(series.contains(&day(2)));
        assert_eq!(series.observed(), 2);
        assert_eq!(series.last_value(), Some(3.0));
    }

    #[test]
    fn test_last_value_missing() {
        let series = TimeSeries::daily(day(1), vec![Some(1.0), None]);
        assert_eq!(series.last_value(), None);
        assert_eq!(series.last_date(), Some(day(2)));
    }

    #[test]
    fn test_range_bounds() {
        let series = TimeSeries::daily(day(1), (1..=5).map(|v| Some(v as f64)));
        assert_eq!(series.range(Some(day(2)), Some(day(4))).len(), 3);
        assert_eq!(series.range(None, Some(day(2))).len(), 2);
        assert_eq!(series.range(Some(day(4)), None).len(), 2);
        assert_eq!(series.range(None, None), series);
        assert!(series.range(Some(day(4)), Some(day(2))).is_empty());
    }
}
