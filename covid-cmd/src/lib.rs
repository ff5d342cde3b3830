//! Command implementations for the COVID-19 trends CLI.
//!
//! Subcommands load source tables (remote first, cache directory as
//! fallback), build region records and write CSV tables.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use covid_data::{MetricKind, RegionKind, DEFAULT_WINDOW};
use covid_source::fetch::SourceConfig;
use covid_utils::dates::parse_date;
use covid_utils::regions::{county_key, split_county_key, state_name};
use std::path::PathBuf;

pub mod combine;
pub mod compare;
pub mod outcomes;
pub mod render;
pub mod summary;

/// Options shared by every subcommand for locating source data.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON file with source URLs, cache directory and timeout
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory read when a remote fetch fails
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Read only from the cache directory
    #[arg(long, global = true)]
    pub offline: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl SourceArgs {
    /// Config file values, overridden by any flags given.
    pub fn source_config(&self) -> anyhow::Result<SourceConfig> {
        let mut config = match &self.config {
            Some(path) => SourceConfig::from_json_file(path)?,
            None => SourceConfig::default(),
        };
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if self.offline {
            config.offline = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        Ok(config)
    }
}

/// Formatting flags for CSV output
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write CSV here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Decimal places for values
    #[arg(long, default_value_t = render::DEFAULT_PRECISION)]
    pub precision: usize,
}

impl OutputArgs {
    pub fn render_options(&self) -> render::RenderOptions {
        render::RenderOptions::with_precision(self.precision)
    }

    pub fn open(&self) -> anyhow::Result<Box<dyn std::io::Write>> {
        render::open_output(self.output.as_deref())
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Daily change and rolling average for one region
    Summary {
        /// country, state or county
        #[arg(short, long, default_value = "country")]
        kind: RegionKind,

        /// Region name; counties as "County, State"
        name: String,

        /// cases, fatalities or hospitalizations
        #[arg(short, long, default_value = "cases")]
        metric: MetricKind,

        /// Rolling average window in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        /// Scale to counts per million residents
        #[arg(long)]
        per_capita: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// One metric across several regions
    Compare {
        /// country, state or county
        #[arg(short, long, default_value = "country")]
        kind: RegionKind,

        /// cases, fatalities, hospitalizations or "case fatality"
        #[arg(short, long, default_value = "cases")]
        metric: MetricKind,

        /// First date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Add a named country group: g7, g20 or eu
        #[arg(short, long)]
        group: Option<String>,

        /// Leave out regions without the metric instead of failing
        #[arg(long)]
        skip_missing: bool,

        /// Cut all series to the dates every region covers
        #[arg(long)]
        shared_range: bool,

        /// Rolling average window in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        #[command(flatten)]
        output: OutputArgs,

        /// Region names
        names: Vec<String>,
    },

    /// Build the combined state table from the live sources and save it
    Combine {
        /// Output path for the combined CSV
        #[arg(short, long, default_value = "us_combined_covid_data.csv")]
        output: PathBuf,
    },

    /// Recent outcomes against vaccination for every state
    Outcomes {
        /// Length of the period in weeks
        #[arg(long, default_value_t = covid_data::outcomes::DEFAULT_WEEKS)]
        weeks: u32,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Canonical region name for `kind`. States may be given by postal
/// abbreviation, also inside a county key ("Harris, TX").
pub fn region_name(kind: RegionKind, name: &str) -> anyhow::Result<String> {
    let name = name.trim();
    match kind {
        RegionKind::Country => Ok(name.to_string()),
        RegionKind::State => Ok(state_name(name).unwrap_or(name).to_string()),
        RegionKind::County => {
            let (county, state) = split_county_key(name).ok_or_else(|| {
                anyhow::anyhow!("county {:?} should be given as \"County, State\"", name)
            })?;
            Ok(county_key(county, state_name(state).unwrap_or(state)))
        }
    }
}

pub async fn run(command: Command, source: &SourceArgs) -> anyhow::Result<()> {
    let config = source.source_config()?;
    match command {
        Command::Summary {
            kind,
            name,
            metric,
            window,
            per_capita,
            output,
        } => {
            let name = region_name(kind, &name)?;
            summary::run_summary(config, kind, &name, metric, window, per_capita, &output).await
        }
        Command::Compare {
            kind,
            metric,
            start,
            end,
            group,
            skip_missing,
            shared_range,
            window,
            output,
            names,
        } => {
            let request = compare::CompareRequest {
                kind,
                metric,
                start,
                end,
                group,
                skip_missing,
                shared_range,
                window,
                names: names
                    .iter()
                    .map(|name| region_name(kind, name))
                    .collect::<anyhow::Result<_>>()?,
            };
            compare::run_compare(config, request, &output).await
        }
        Command::Combine { output } => combine::run_combine(config, &output).await,
        Command::Outcomes { weeks, output } => outcomes::run_outcomes(config, weeks, &output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_names() {
        assert_eq!(region_name(RegionKind::State, "tx").unwrap(), "Texas");
        assert_eq!(region_name(RegionKind::State, "Ohio").unwrap(), "Ohio");
        assert_eq!(
            region_name(RegionKind::County, "Harris, TX").unwrap(),
            "Harris, Texas"
        );
        assert_eq!(
            region_name(RegionKind::County, " Autauga, Alabama ").unwrap(),
            "Autauga, Alabama"
        );
        assert!(region_name(RegionKind::County, "Harris").is_err());
        assert_eq!(region_name(RegionKind::Country, "Korea, South").unwrap(), "Korea, South");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = std::env::temp_dir().join("covid-cmd-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"cache_dir": "/srv/covid", "timeout_secs": 10}"#).unwrap();

        let args = SourceArgs {
            config: Some(path.clone()),
            timeout: Some(3),
            ..SourceArgs::default()
        };
        let config = args.source_config().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/srv/covid"));
        assert_eq!(config.timeout_secs, 3);
        assert!(!config.offline);

        let args = SourceArgs {
            config: Some(path),
            cache_dir: Some(PathBuf::from("data")),
            offline: true,
            ..SourceArgs::default()
        };
        let config = args.source_config().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("data"));
        assert!(config.offline);
    }
}
