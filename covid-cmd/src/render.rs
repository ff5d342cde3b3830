//! CSV rendering of series and outcome tables.
//!
//! Missing values are written as empty cells.

use chrono::NaiveDate;
use covid_data::outcomes::OutcomeRow;
use covid_data::summary::DailySummary;
use covid_data::Comparison;
use covid_source::TimeSeries;
use covid_utils::dates::ISO_FORMAT;
use csv::{Writer, WriterBuilder};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub const DEFAULT_PRECISION: usize = 3;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub precision: usize,
    pub date_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            precision: DEFAULT_PRECISION,
            date_format: ISO_FORMAT.to_string(),
        }
    }
}

impl RenderOptions {
    pub fn with_precision(precision: usize) -> Self {
        RenderOptions {
            precision,
            ..RenderOptions::default()
        }
    }

    fn date(&self, date: &NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    fn value(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.*}", self.precision, v),
            None => String::new(),
        }
    }
}

/// Stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    })
}

fn writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new().has_headers(false).from_writer(out)
}

/// One date column followed by one column per labeled series, over the
/// union of their dates.
pub fn write_series<W: Write>(
    out: W,
    series: &[(String, TimeSeries)],
    options: &RenderOptions,
) -> anyhow::Result<()> {
    let mut wtr = writer(out);
    let mut header = vec!["date".to_string()];
    header.extend(series.iter().map(|(label, _)| label.clone()));
    wtr.write_record(&header)?;

    let dates: BTreeSet<NaiveDate> = series.iter().flat_map(|(_, s)| s.dates()).collect();
    for date in dates {
        let mut record = vec![options.date(&date)];
        record.extend(series.iter().map(|(_, s)| options.value(s.value(&date))));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_comparison<W: Write>(
    out: W,
    comparison: &Comparison,
    options: &RenderOptions,
) -> anyhow::Result<()> {
    write_series(out, &comparison.series, options)
}

pub fn write_summary<W: Write>(
    out: W,
    summary: &DailySummary,
    options: &RenderOptions,
) -> anyhow::Result<()> {
    let columns = [
        ("daily".to_string(), summary.daily.clone()),
        ("rolling_average".to_string(), summary.rolling_average.clone()),
    ];
    write_series(out, &columns, options)
}

pub fn write_outcomes<W: Write>(
    out: W,
    rows: &[OutcomeRow],
    options: &RenderOptions,
) -> anyhow::Result<()> {
    let mut wtr = writer(out);
    wtr.write_record([
        "state",
        "since",
        "until",
        "fully_vaccinated",
        "cases",
        "fatalities",
        "hospitalizations",
        "case_fatality",
    ])?;
    for row in rows {
        wtr.write_record([
            row.region.clone(),
            options.date(&row.since),
            options.date(&row.until),
            options.value(Some(row.fully_vaccinated)),
            options.value(Some(row.cases)),
            options.value(Some(row.fatalities)),
            options.value(Some(row.hospitalizations)),
            options.value(row.case_fatality),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
