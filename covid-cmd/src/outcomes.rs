//! Recent outcomes for every state in the combined table.

use crate::render;
use crate::OutputArgs;
use covid_data::outcomes::recent_outcomes;
use covid_data::{RegionRecord, StateTables};
use covid_source::fetch::SourceConfig;
use covid_source::loader::SourceLoader;
use log::{info, warn};

pub async fn run_outcomes(
    config: SourceConfig,
    weeks: u32,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let loader = SourceLoader::new(config)?;
    let tables = StateTables::load_combined(&loader).await?;

    let mut records = Vec::new();
    for state in tables.cases.keys() {
        match RegionRecord::state(state, covid_data::DEFAULT_WINDOW, &tables) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping {}: {}", state, e),
        }
    }
    let rows = recent_outcomes(&records, weeks);
    info!("{} of {} states have outcomes", rows.len(), records.len());
    render::write_outcomes(output.open()?, &rows, &output.render_options())
}
