//! Parsing of the Socrata JSON feeds: HealthData.gov hospital capacity
//! (`g62h-syeh`) and CDC vaccinations (`unsk-b7fc`).
//!
//! Socrata returns every numeric field as a string, so counts are read
//! leniently from either strings or numbers.

use crate::error::Result;
use crate::wide_table::WideTable;
use chrono::NaiveDate;
use covid_utils::{dates::parse_socrata_date, regions::state_name};
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct HospitalRecord {
    state: Option<String>,
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    previous_day_admission_adult_covid_confirmed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    previous_day_admission_pediatric_covid_confirmed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    adult_icu_bed_covid_utilization_numerator: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    adult_icu_bed_covid_utilization_denominator: Option<f64>,
}

impl HospitalRecord {
    /// Share of staffed adult ICU beds holding COVID patients. Undefined
    /// without both counts or with no beds.
    fn icu_utilization(&self) -> Option<f64> {
        let covid = self.adult_icu_bed_covid_utilization_numerator?;
        let beds = self.adult_icu_bed_covid_utilization_denominator?;
        (beds != 0.0).then(|| covid / beds)
    }
}

#[derive(Debug, Deserialize)]
struct VaccinationRecord {
    location: Option<String>,
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    series_complete_yes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    administered_dose1_recip: Option<f64>,
}

/// Resolve a record's postal code and timestamp into (state name, day).
fn locate(code: Option<&str>, date: Option<&str>) -> Option<(&'static str, NaiveDate)> {
    let state = state_name(code?)?;
    let date = parse_socrata_date(date?)?;
    Some((state, date))
}

/// Hospital capacity tables per state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalTables {
    /// Cumulative confirmed COVID admissions, adult plus pediatric.
    pub admissions: WideTable,
    /// Daily adult ICU bed utilization by COVID patients, as a fraction.
    pub icu_utilization: WideTable,
}

/// Parse the hospital capacity feed.
///
/// Adult and pediatric admissions are summed into a daily count (a missing
/// column counts as zero), then accumulated per state in date order.
pub fn parse_hospitalizations(body: &str) -> Result<HospitalTables> {
    let records: Vec<HospitalRecord> = serde_json::from_str(body)?;
    let total = records.len();
    let mut daily: BTreeMap<&'static str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    let mut icu = Vec::new();
    for record in &records {
        let Some((state, date)) = locate(record.state.as_deref(), record.date.as_deref()) else {
            debug!("skipping hospital record {:?}/{:?}", record.state, record.date);
            continue;
        };
        let admissions = record.previous_day_admission_adult_covid_confirmed.unwrap_or(0.0)
            + record
                .previous_day_admission_pediatric_covid_confirmed
                .unwrap_or(0.0);
        *daily.entry(state).or_default().entry(date).or_insert(0.0) += admissions;
        icu.push((state.to_string(), date, record.icu_utilization()));
    }
    info!(
        "hospitalizations: {} records across {} states",
        total,
        daily.len()
    );

    let long = daily.into_iter().flat_map(|(state, by_date)| {
        let mut running = 0.0;
        by_date.into_iter().map(move |(date, admissions)| {
            running += admissions;
            (state.to_string(), date, Some(running))
        })
    });
    Ok(HospitalTables {
        admissions: WideTable::from_long(long),
        icu_utilization: WideTable::from_long(icu),
    })
}

/// Vaccination counts per state, one table per measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaccinationTables {
    /// People with a completed primary series (`series_complete_yes`).
    pub fully_vaccinated: WideTable,
    /// People with at least one dose (`administered_dose1_recip`).
    pub first_dose: WideTable,
}

pub fn parse_vaccinations(body: &str) -> Result<VaccinationTables> {
    let records: Vec<VaccinationRecord> = serde_json::from_str(body)?;
    let mut fully = Vec::new();
    let mut first = Vec::new();
    for record in &records {
        let Some((state, date)) = locate(record.location.as_deref(), record.date.as_deref())
        else {
            debug!(
                "skipping vaccination record {:?}/{:?}",
                record.location, record.date
            );
            continue;
        };
        fully.push((state.to_string(), date, record.series_complete_yes));
        first.push((state.to_string(), date, record.administered_dose1_recip));
    }
    info!("vaccinations: {} records", records.len());
    Ok(VaccinationTables {
        fully_vaccinated: WideTable::from_long(fully),
        first_dose: WideTable::from_long(first),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 2, d).unwrap()
    }

    const HOSPITAL: &str = r#"[
  {"state": "TX", "date": "2021-02-02T00:00:00.000", "previous_day_admission_adult_covid_confirmed": "100", "previous_day_admission_pediatric_covid_confirmed": "5", "adult_icu_bed_covid_utilization_numerator": "300", "adult_icu_bed_covid_utilization_denominator": "1200"},
  {"state": "TX", "date": "2021-02-01T00:00:00.000", "previous_day_admission_adult_covid_confirmed": "90", "previous_day_admission_pediatric_covid_confirmed": "3", "adult_icu_bed_covid_utilization_numerator": "10", "adult_icu_bed_covid_utilization_denominator": "0"},
  {"state": "TX", "date": "2021-02-03T00:00:00.000", "previous_day_admission_adult_covid_confirmed": 80},
  {"state": "OH", "date": "2021-02-01T00:00:00.000", "previous_day_admission_adult_covid_confirmed": "10", "previous_day_admission_pediatric_covid_confirmed": null},
  {"state": "XX", "date": "2021-02-01T00:00:00.000", "previous_day_admission_adult_covid_confirmed": "10"},
  {"state": "OH", "date": "not a date"}
]"#;

    const VACCINE: &str = r#"[
  {"location": "TX", "date": "2021-02-01T00:00:00.000", "series_complete_yes": "1000", "administered_dose1_recip": "5000"},
  {"location": "TX", "date": "2021-02-02T00:00:00.000", "series_complete_yes": "1500"},
  {"location": "US", "date": "2021-02-02T00:00:00.000", "series_complete_yes": "99999"}
]"#;

    #[test]
    fn test_hospitalizations_are_cumulative_per_state() {
        let table = parse_hospitalizations(HOSPITAL).unwrap().admissions;
        assert_eq!(table.len(), 2);
        let texas = table.series("Texas").unwrap();
        assert_eq!(texas.value(&day(1)), Some(93.0));
        assert_eq!(texas.value(&day(2)), Some(198.0));
        assert_eq!(texas.value(&day(3)), Some(278.0));
        let ohio = table.series("Ohio").unwrap();
        assert_eq!(ohio.value(&day(1)), Some(10.0));
        assert_eq!(ohio.value(&day(2)), None);
    }

    #[test]
    fn test_icu_utilization_ratio() {
        let icu = parse_hospitalizations(HOSPITAL).unwrap().icu_utilization;
        let texas = icu.series("Texas").unwrap();
        // no beds reported
        assert_eq!(texas.value(&day(1)), None);
        assert_eq!(texas.value(&day(2)), Some(0.25));
        assert_eq!(texas.value(&day(3)), None);
        assert_eq!(icu.series("Ohio").unwrap().observed(), 0);
    }

    #[test]
    fn test_ragged_states_keep_their_own_dates() {
        let admissions = parse_hospitalizations(HOSPITAL).unwrap().admissions;
        let ohio = admissions.series("Ohio").unwrap();
        assert_eq!(ohio.len(), 1);
        assert_eq!(ohio.last_value(), Some(10.0));
    }

    #[test]
    fn test_vaccinations_split_into_measures() {
        let tables = parse_vaccinations(VACCINE).unwrap();
        assert_eq!(tables.fully_vaccinated.len(), 1);
        let fully = tables.fully_vaccinated.series("Texas").unwrap();
        assert_eq!(fully.value(&day(2)), Some(1500.0));
        let first = tables.first_dose.series("Texas").unwrap();
        assert_eq!(first.value(&day(1)), Some(5000.0));
        assert_eq!(first.value(&day(2)), None);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_hospitalizations("{\"state\": ").is_err());
    }
}
