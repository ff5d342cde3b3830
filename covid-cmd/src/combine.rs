//! Build and persist the combined state table.

use covid_source::fetch::SourceConfig;
use covid_source::loader::SourceLoader;
use log::info;
use std::path::Path;

/// Join the JHU, HealthData.gov and CDC tables and write the result as CSV.
/// Any source that cannot be loaded fails the command.
pub async fn run_combine(config: SourceConfig, output: &Path) -> anyhow::Result<()> {
    let loader = SourceLoader::new(config)?;
    let combined = loader.build_combined().await?;
    if combined.is_empty() {
        anyhow::bail!("combined table is empty; the sources share no state-days");
    }
    combined.write_path(output)?;
    info!(
        "wrote {} rows for {} states to {}",
        combined.len(),
        combined.states().len(),
        output.display()
    );
    Ok(())
}
