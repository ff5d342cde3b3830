use crate::combined::CombinedTable;
use crate::error::Result;
use crate::fetch::{Fetched, Fetcher, Origin, Resource, SourceConfig};
use crate::healthdata::{self, HospitalTables, VaccinationTables};
use crate::jhu::{self, GroupBy};
use crate::wide_table::WideTable;
use log::{info, warn};
use std::collections::BTreeMap;

/// Loads source tables and reshapes them into region × date form.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    fetcher: Fetcher,
}

impl SourceLoader {
    pub fn new(config: SourceConfig) -> Result<Self> {
        Ok(SourceLoader {
            fetcher: Fetcher::new(config)?,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        self.fetcher.config()
    }

    async fn body(&self, resource: Resource) -> Result<String> {
        let Fetched { body, origin } = self.fetcher.fetch(resource).await?;
        if let Origin::Fallback { reason } = origin {
            if !self.config().offline {
                warn!("{} loaded from cache after: {}", resource, reason);
            }
        }
        Ok(body)
    }

    pub async fn global_cases(&self) -> Result<WideTable> {
        jhu::parse_global(&self.body(Resource::GlobalCases).await?)
    }

    pub async fn global_fatalities(&self) -> Result<WideTable> {
        jhu::parse_global(&self.body(Resource::GlobalDeaths).await?)
    }

    pub async fn us_cases(&self, groupby: GroupBy) -> Result<WideTable> {
        jhu::parse_us(&self.body(Resource::UsCases).await?, groupby)
    }

    pub async fn us_fatalities(&self, groupby: GroupBy) -> Result<WideTable> {
        jhu::parse_us(&self.body(Resource::UsDeaths).await?, groupby)
    }

    /// Population per region from the US deaths table. Empty if the table
    /// carries no population column.
    pub async fn us_population(&self, groupby: GroupBy) -> Result<BTreeMap<String, u64>> {
        let table = self.us_fatalities(groupby).await?;
        if !table.has_metadata_column(jhu::POPULATION_COLUMN) {
            info!("US deaths table has no population column");
        }
        Ok(jhu::population(&table))
    }

    pub async fn hospitalizations(&self) -> Result<HospitalTables> {
        healthdata::parse_hospitalizations(&self.body(Resource::Hospitalizations).await?)
    }

    pub async fn vaccinations(&self) -> Result<VaccinationTables> {
        healthdata::parse_vaccinations(&self.body(Resource::Vaccinations).await?)
    }

    /// The persisted combined state table.
    pub async fn combined(&self) -> Result<CombinedTable> {
        CombinedTable::parse(&self.body(Resource::Combined).await?)
    }

    /// Build the combined state table from the live sources.
    pub async fn build_combined(&self) -> Result<CombinedTable> {
        let hospitalizations = self.hospitalizations().await?;
        let vaccinations = self.vaccinations().await?;
        let cases = self.us_cases(GroupBy::State).await?;
        let deaths = self.us_fatalities(GroupBy::State).await?;
        Ok(CombinedTable::combine(
            &hospitalizations,
            &vaccinations,
            &cases,
            &deaths,
        ))
    }
}
