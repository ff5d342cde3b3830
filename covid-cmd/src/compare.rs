//! Compare one metric across several regions.

use crate::render;
use crate::OutputArgs;
use chrono::NaiveDate;
use covid_data::{
    compare, CompareOptions, CountyTables, GlobalTables, MetricKind, MissingMetricPolicy,
    RegionKind, RegionRecord, StateTables,
};
use covid_source::fetch::SourceConfig;
use covid_source::loader::SourceLoader;
use covid_source::population::CountryPopulations;
use covid_utils::groups;
use log::info;

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub kind: RegionKind,
    pub metric: MetricKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub group: Option<String>,
    pub skip_missing: bool,
    pub shared_range: bool,
    pub window: usize,
    pub names: Vec<String>,
}

impl CompareRequest {
    /// Group members first, then the explicit names, without repeats.
    pub fn region_names(&self) -> anyhow::Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        if let Some(group) = &self.group {
            if self.kind != RegionKind::Country {
                anyhow::bail!("country groups only apply to --kind country");
            }
            let members = groups::by_name(group)
                .ok_or_else(|| anyhow::anyhow!("unknown group {:?}; use g7, g20 or eu", group))?;
            names.extend(members.iter().map(|m| m.to_string()));
        }
        for name in &self.names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        if names.is_empty() {
            anyhow::bail!("no regions to compare");
        }
        Ok(names)
    }

    pub fn options(&self) -> CompareOptions {
        let policy = if self.skip_missing {
            MissingMetricPolicy::Skip
        } else {
            MissingMetricPolicy::Error
        };
        CompareOptions::new(policy)
            .between(self.start, self.end)
            .shared_range(self.shared_range)
    }
}

/// Load the tables for `kind` once and build a record per name.
pub async fn load_records(
    loader: &SourceLoader,
    kind: RegionKind,
    names: &[String],
    window: usize,
) -> anyhow::Result<Vec<RegionRecord>> {
    let records = match kind {
        RegionKind::Country => {
            let tables = GlobalTables::load(loader).await?;
            let populations = CountryPopulations::embedded()?;
            names
                .iter()
                .map(|name| RegionRecord::country(name, window, &tables, &populations))
                .collect::<Result<Vec<_>, _>>()?
        }
        RegionKind::State => {
            let tables = StateTables::load_combined(loader).await?;
            names
                .iter()
                .map(|name| RegionRecord::state(name, window, &tables))
                .collect::<Result<Vec<_>, _>>()?
        }
        RegionKind::County => {
            let tables = CountyTables::load(loader).await?;
            names
                .iter()
                .map(|name| RegionRecord::county(name, window, &tables))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(records)
}

pub async fn run_compare(
    config: SourceConfig,
    request: CompareRequest,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let names = request.region_names()?;
    let loader = SourceLoader::new(config)?;
    let records = load_records(&loader, request.kind, &names, request.window).await?;
    let comparison = compare(&records, request.metric, &request.options())?;
    info!(
        "{} across {} {} regions",
        comparison.ylabel,
        comparison.series.len(),
        request.kind
    );
    render::write_comparison(output.open()?, &comparison, &output.render_options())
}
