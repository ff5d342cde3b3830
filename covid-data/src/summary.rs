//! Daily bars plus rolling average for one record and one metric.

use crate::compare::MetricKind;
use crate::error::{Error, Result};
use crate::metrics::Metric;
use crate::region::RegionRecord;
use covid_source::TimeSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub region: String,
    pub kind: MetricKind,
    pub ylabel: String,
    /// Unsmoothed day-over-day change.
    pub daily: TimeSeries,
    /// Rolling mean of `daily` over the record's window.
    pub rolling_average: TimeSeries,
}

impl RegionRecord {
    fn metric(&self, kind: MetricKind) -> Result<&Metric> {
        match kind {
            MetricKind::Cases => Ok(self.cases()),
            MetricKind::Fatalities => Ok(self.fatalities()),
            MetricKind::Hospitalizations => {
                self.hospitalizations().ok_or_else(|| Error::MissingMetric {
                    region: self.name().to_string(),
                    metric: kind,
                })
            }
            MetricKind::CaseFatality => Err(Error::UnsupportedMetricKind(kind.to_string())),
        }
    }

    /// Daily change of a cumulative metric with its smoothed trend,
    /// optionally per million residents.
    pub fn daily_summary(&self, kind: MetricKind, per_capita: bool) -> Result<DailySummary> {
        let metric = self.metric(kind)?;
        let noun = match kind {
            MetricKind::Cases => "Cases",
            MetricKind::Fatalities => "Fatalities",
            _ => "Hospitalizations",
        };
        let (daily, rolling_average, ylabel) = if per_capita {
            (
                self.per_capita(&metric.daily())?,
                self.per_capita(metric.per_day())?,
                format!("{} per Day per Million Residents", noun),
            )
        } else {
            (
                metric.daily(),
                metric.per_day().clone(),
                format!("{} per Day", noun),
            )
        };
        Ok(DailySummary {
            region: self.name().to_string(),
            kind,
            ylabel,
            daily,
            rolling_average,
        })
    }
}
