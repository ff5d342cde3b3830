//! Daily change and rolling average for a single region.

use crate::render;
use crate::OutputArgs;
use covid_data::{MetricKind, RegionKind, RegionRecord};
use covid_source::fetch::SourceConfig;
use covid_source::loader::SourceLoader;
use covid_source::population::CountryPopulations;
use covid_utils::dates::format_date;
use covid_utils::regions::state_abbreviation;
use log::{debug, info};

pub async fn run_summary(
    config: SourceConfig,
    kind: RegionKind,
    name: &str,
    metric: MetricKind,
    window: usize,
    per_capita: bool,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let loader = SourceLoader::new(config)?;
    let populations = CountryPopulations::embedded()?;
    let record = RegionRecord::load(kind, name, window, &loader, &populations).await?;

    let label = match state_abbreviation(record.name()) {
        Some(abbreviation) if kind == RegionKind::State => {
            format!("{} ({})", record.name(), abbreviation)
        }
        _ => record.name().to_string(),
    };
    let population = record
        .population()
        .map_or_else(|| "unknown".to_string(), |p| p.to_string());
    let figure =
        |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v));

    // headline figures on stderr, CSV on stdout
    eprintln!("{} {}", kind, label);
    eprintln!(
        "  records:       {} to {}",
        format_date(&record.first_record()),
        format_date(&record.last_record())
    );
    eprintln!("  population:    {}", population);
    eprintln!("  cases:         {}", figure(record.cases().total()));
    eprintln!("  fatalities:    {}", figure(record.fatalities().total()));
    if let Some(hospitalizations) = record.hospitalizations() {
        eprintln!("  hospitalized:  {}", figure(hospitalizations.total()));
    }
    if let Some(icu) = record.icu_utilization().and_then(|s| s.last_value()) {
        eprintln!("  ICU beds used: {:.1}%", icu * 100.0);
    }
    if let Some(fully) = record.fully_vaccinated() {
        eprintln!("  vaccinated:    {}", figure(fully.total()));
    }
    match record.case_fatality().last() {
        Some(cfr) => eprintln!("  case fatality: {:.2}%", cfr * 100.0),
        None => eprintln!("  case fatality: -"),
    }
    for (key, value) in record.attributes() {
        debug!("{} = {}", key, value);
    }

    let summary = record.daily_summary(metric, per_capita)?;
    info!("writing {} for {}", summary.ylabel, summary.region);
    render::write_summary(output.open()?, &summary, &output.render_options())
}
