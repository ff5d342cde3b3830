//! How states fared over a recent stretch relative to vaccination.

use crate::metrics::Metric;
use crate::region::{RegionKind, RegionRecord};
use chrono::{Duration, NaiveDate};
use log::warn;

pub const DEFAULT_WEEKS: u32 = 8;

/// One state's outcomes over `since..=until`. Counts are fractions of the
/// population.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRow {
    pub region: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub fully_vaccinated: f64,
    pub cases: f64,
    pub fatalities: f64,
    pub hospitalizations: f64,
    /// Deaths over cases for the period; `None` when no new cases.
    pub case_fatality: Option<f64>,
}

fn change(metric: &Metric, since: &NaiveDate, until: &NaiveDate) -> Option<f64> {
    let series = metric.series();
    Some(series.value(until)? - series.value(since)?)
}

fn outcome(record: &RegionRecord, weeks: u32) -> Option<OutcomeRow> {
    let population = record.population()? as f64;
    let until = record.last_record();
    let since = until - Duration::weeks(weeks as i64);
    let hospitalizations = change(record.hospitalizations()?, &since, &until)?;
    let fully_vaccinated = record.fully_vaccinated()?.series().value(&until)?;
    let cases = change(record.cases(), &since, &until)?;
    let fatalities = change(record.fatalities(), &since, &until)?;
    let case_fatality = if cases != 0.0 {
        Some(fatalities / cases)
    } else {
        None
    };
    Some(OutcomeRow {
        region: record.name().to_string(),
        since,
        until,
        fully_vaccinated: fully_vaccinated / population,
        cases: cases / population,
        fatalities: fatalities / population,
        hospitalizations: hospitalizations / population,
        case_fatality,
    })
}

/// Outcomes over the last `weeks` weeks of each state record. Records
/// without the needed series, dates or population are left out.
pub fn recent_outcomes(records: &[RegionRecord], weeks: u32) -> Vec<OutcomeRow> {
    records
        .iter()
        .filter(|record| record.kind() == RegionKind::State)
        .filter_map(|record| {
            let row = outcome(record, weeks);
            if row.is_none() {
                warn!(
                    "skipping {}: no data covering the last {} weeks",
                    record.name(),
                    weeks
                );
            }
            row
        })
        .collect()
}
