//! Cross-region comparison of one metric.

use crate::error::{Error, Result};
use crate::metrics;
use crate::region::RegionRecord;
use chrono::NaiveDate;
use covid_source::TimeSeries;
use log::{debug, warn};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cases,
    Fatalities,
    Hospitalizations,
    CaseFatality,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cases,
        MetricKind::Fatalities,
        MetricKind::Hospitalizations,
        MetricKind::CaseFatality,
    ];

    /// Axis label for a comparison of this metric.
    pub fn ylabel(&self) -> &'static str {
        match self {
            MetricKind::Cases => "Daily Cases per Million Residents",
            MetricKind::Fatalities => "Daily Deaths per Million Residents",
            MetricKind::Hospitalizations => "Daily Hospitalizations per Million Residents",
            MetricKind::CaseFatality => "Case Fatality",
        }
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "cases" => Ok(MetricKind::Cases),
            "fatalities" | "deaths" => Ok(MetricKind::Fatalities),
            "hospitalizations" => Ok(MetricKind::Hospitalizations),
            "case fatality" | "cfr" => Ok(MetricKind::CaseFatality),
            _ => Err(Error::UnsupportedMetricKind(s.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Cases => "cases",
            MetricKind::Fatalities => "fatalities",
            MetricKind::Hospitalizations => "hospitalizations",
            MetricKind::CaseFatality => "case fatality",
        };
        write!(f, "{}", name)
    }
}

/// What to do with a record that lacks the requested metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMetricPolicy {
    /// Fail the whole comparison.
    Error,
    /// Leave the record out and log it.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub missing: MissingMetricPolicy,
    /// Cut every series to the dates all of them cover.
    pub shared_range: bool,
}

impl CompareOptions {
    pub fn new(missing: MissingMetricPolicy) -> Self {
        CompareOptions {
            start: None,
            end: None,
            missing,
            shared_range: false,
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn shared_range(mut self, shared_range: bool) -> Self {
        self.shared_range = shared_range;
        self
    }
}

/// One labeled series per compared region, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub kind: MetricKind,
    pub ylabel: String,
    pub series: Vec<(String, TimeSeries)>,
}

impl Comparison {
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.iter().map(|(label, _)| label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// The series a comparison plots for one record: smoothed daily change per
/// million residents, or the case fatality ratio. `None` when the record
/// has no such metric.
fn comparison_series(record: &RegionRecord, kind: MetricKind) -> Option<Result<TimeSeries>> {
    let metric = match kind {
        MetricKind::Cases => record.cases(),
        MetricKind::Fatalities => record.fatalities(),
        MetricKind::Hospitalizations => record.hospitalizations()?,
        MetricKind::CaseFatality => return Some(Ok(record.case_fatality().series().clone())),
    };
    Some(record.per_capita(metric.per_day()))
}

/// Line up `kind` across records over an optional date window.
///
/// Per-capita metrics need every record to have a population; a record
/// without one fails the comparison.
pub fn compare(
    records: &[RegionRecord],
    kind: MetricKind,
    options: &CompareOptions,
) -> Result<Comparison> {
    let mut series = Vec::with_capacity(records.len());
    for record in records {
        match comparison_series(record, kind) {
            Some(values) => {
                let values = metrics::restrict_to_window(&values?, options.start, options.end);
                series.push((record.name().to_string(), values));
            }
            None => match options.missing {
                MissingMetricPolicy::Error => {
                    return Err(Error::MissingMetric {
                        region: record.name().to_string(),
                        metric: kind,
                    })
                }
                MissingMetricPolicy::Skip => {
                    warn!("{} has no {} series; leaving it out", record.name(), kind)
                }
            },
        }
    }

    if options.shared_range {
        let start = series.iter().filter_map(|(_, s)| s.first_date()).max();
        let end = series.iter().filter_map(|(_, s)| s.last_date()).min();
        debug!("shared comparison range {:?} to {:?}", start, end);
        for (_, values) in series.iter_mut() {
            *values = match (start, end) {
                (Some(start), Some(end)) => values.range(Some(start), Some(end)),
                _ => TimeSeries::new(),
            };
        }
    }

    Ok(Comparison {
        kind,
        ylabel: kind.ylabel().to_string(),
        series,
    })
}

/// [`compare`] with the metric named as a string.
pub fn compare_named(
    records: &[RegionRecord],
    kind: &str,
    options: &CompareOptions,
) -> Result<Comparison> {
    compare(records, kind.parse()?, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{GlobalTables, RegionRecord, StateTables};
    use covid_source::fetch::SourceConfig;
    use covid_source::loader::SourceLoader;
    use covid_source::population::CountryPopulations;

    fn loader() -> SourceLoader {
        let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures");
        SourceLoader::new(SourceConfig::offline(fixtures)).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn countries(names: &[&str]) -> Vec<RegionRecord> {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        names
            .iter()
            .map(|name| RegionRecord::country(name, 3, &tables, &populations).unwrap())
            .collect()
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("cases".parse::<MetricKind>().unwrap(), MetricKind::Cases);
        assert_eq!("Deaths".parse::<MetricKind>().unwrap(), MetricKind::Fatalities);
        assert_eq!(
            "case_fatality".parse::<MetricKind>().unwrap(),
            MetricKind::CaseFatality
        );
        for kind in MetricKind::ALL {
            assert_eq!(kind.to_string().parse::<MetricKind>().unwrap(), kind);
        }
        assert!(matches!(
            "unknown".parse::<MetricKind>(),
            Err(Error::UnsupportedMetricKind(s)) if s == "unknown"
        ));
    }

    #[tokio::test]
    async fn test_compare_cases_per_million() {
        let records = countries(&["Japan", "Italy", "Norway"]).await;
        let options = CompareOptions::new(MissingMetricPolicy::Error);
        let comparison = compare(&records, MetricKind::Cases, &options).unwrap();
        assert_eq!(comparison.labels().collect::<Vec<_>>(), ["Japan", "Italy", "Norway"]);
        assert_eq!(comparison.ylabel, "Daily Cases per Million Residents");

        let japan = &records[0];
        let expected = japan.per_capita(japan.cases().per_day()).unwrap();
        assert_eq!(comparison.series[0].1, expected);
    }

    #[tokio::test]
    async fn test_compare_window() {
        let records = countries(&["Japan", "Italy"]).await;
        let options = CompareOptions::new(MissingMetricPolicy::Error)
            .between(Some(date(2020, 3, 5)), Some(date(2020, 3, 10)));
        let comparison = compare(&records, MetricKind::Fatalities, &options).unwrap();
        for (_, series) in &comparison.series {
            assert_eq!(series.first_date(), Some(date(2020, 3, 5)));
            assert_eq!(series.last_date(), Some(date(2020, 3, 10)));
        }
    }

    #[tokio::test]
    async fn test_compare_case_fatality_is_not_normalized() {
        let records = countries(&["Italy"]).await;
        let options = CompareOptions::new(MissingMetricPolicy::Error);
        let comparison = compare(&records, MetricKind::CaseFatality, &options).unwrap();
        assert_eq!(comparison.ylabel, "Case Fatality");
        assert_eq!(&comparison.series[0].1, records[0].case_fatality().series());
    }

    #[tokio::test]
    async fn test_compare_missing_population_fails() {
        let records = countries(&["Japan", "MS Zaandam"]).await;
        let options = CompareOptions::new(MissingMetricPolicy::Skip);
        let result = compare(&records, MetricKind::Cases, &options);
        assert!(matches!(result, Err(Error::MissingPopulation { region }) if region == "MS Zaandam"));
    }

    #[tokio::test]
    async fn test_compare_missing_metric_policy() {
        let mut records = countries(&["Japan"]).await;
        let states = StateTables::load_combined(&loader()).await.unwrap();
        records.push(RegionRecord::state("Texas", 3, &states).unwrap());

        let strict = CompareOptions::new(MissingMetricPolicy::Error);
        let result = compare(&records, MetricKind::Hospitalizations, &strict);
        assert!(matches!(
            result,
            Err(Error::MissingMetric { region, metric: MetricKind::Hospitalizations }) if region == "Japan"
        ));

        let lenient = CompareOptions::new(MissingMetricPolicy::Skip);
        let comparison = compare(&records, MetricKind::Hospitalizations, &lenient).unwrap();
        assert_eq!(comparison.labels().collect::<Vec<_>>(), ["Texas"]);
    }

    #[tokio::test]
    async fn test_compare_shared_range() {
        let mut records = countries(&["Japan"]).await;
        let states = StateTables::load_combined(&loader()).await.unwrap();
        records.push(RegionRecord::state("Alabama", 3, &states).unwrap());

        // 2020 and 2021 data do not overlap
        let options = CompareOptions::new(MissingMetricPolicy::Error).shared_range(true);
        let comparison = compare(&records, MetricKind::Cases, &options).unwrap();
        assert_eq!(comparison.series.len(), 2);
        assert!(comparison.series.iter().all(|(_, s)| s.is_empty()));

        let records = countries(&["Japan", "Norway"]).await;
        let comparison = compare(&records, MetricKind::Cases, &options).unwrap();
        assert!(comparison.series.iter().all(|(_, s)| s.len() == 14));
    }

    #[tokio::test]
    async fn test_compare_named_unknown_kind() {
        let records = countries(&["Japan"]).await;
        let options = CompareOptions::new(MissingMetricPolicy::Error);
        assert!(matches!(
            compare_named(&records, "unknown", &options),
            Err(Error::UnsupportedMetricKind(_))
        ));
    }
}
