//! Per-region records at country, state and county resolution.
//!
//! A record is built once from loaded tables and is read-only afterwards.
//! Tables are loaded through [`SourceLoader`] into bundles so that many
//! records can share one download.

use crate::error::{Error, Result};
use crate::metrics::{self, CaseFatality, Metric, PER_MILLION};
use chrono::NaiveDate;
use covid_source::combined::{CombinedColumn, CombinedTable};
use covid_source::healthdata::VaccinationTables;
use covid_source::jhu::{self, GroupBy};
use covid_source::loader::SourceLoader;
use covid_source::population::PopulationLookup;
use covid_source::{TimeSeries, WideTable};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Country,
    State,
    County,
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(RegionKind::Country),
            "state" => Ok(RegionKind::State),
            "county" => Ok(RegionKind::County),
            other => Err(format!("unknown region kind: {}", other)),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionKind::Country => "country",
            RegionKind::State => "state",
            RegionKind::County => "county",
        };
        write!(f, "{}", name)
    }
}

/// Global JHU tables, one row per country.
#[derive(Debug, Clone, Default)]
pub struct GlobalTables {
    pub cases: WideTable,
    pub fatalities: WideTable,
}

impl GlobalTables {
    pub async fn load(loader: &SourceLoader) -> Result<Self> {
        Ok(GlobalTables {
            cases: loader.global_cases().await?,
            fatalities: loader.global_fatalities().await?,
        })
    }
}

/// US JHU tables at county resolution. The fatalities table carries the
/// county population.
#[derive(Debug, Clone, Default)]
pub struct CountyTables {
    pub cases: WideTable,
    pub fatalities: WideTable,
}

impl CountyTables {
    pub async fn load(loader: &SourceLoader) -> Result<Self> {
        Ok(CountyTables {
            cases: loader.us_cases(GroupBy::County).await?,
            fatalities: loader.us_fatalities(GroupBy::County).await?,
        })
    }
}

/// US tables at state resolution. Hospital and vaccine tables are optional;
/// a record built without them simply has no such metric.
#[derive(Debug, Clone, Default)]
pub struct StateTables {
    pub cases: WideTable,
    pub fatalities: WideTable,
    pub population: BTreeMap<String, u64>,
    pub hospitalizations: Option<WideTable>,
    pub icu_utilization: Option<WideTable>,
    pub vaccinations: Option<VaccinationTables>,
}

impl StateTables {
    /// JHU cases and deaths only.
    pub async fn load_jhu(loader: &SourceLoader) -> Result<Self> {
        let cases = loader.us_cases(GroupBy::State).await?;
        let fatalities = loader.us_fatalities(GroupBy::State).await?;
        let population = jhu::population(&fatalities);
        Ok(StateTables {
            cases,
            fatalities,
            population,
            hospitalizations: None,
            icu_utilization: None,
            vaccinations: None,
        })
    }

    /// JHU tables plus the live hospital and vaccine feeds.
    pub async fn load_live(loader: &SourceLoader) -> Result<Self> {
        let mut tables = StateTables::load_jhu(loader).await?;
        let hospitals = loader.hospitalizations().await?;
        tables.hospitalizations = Some(hospitals.admissions);
        tables.icu_utilization = Some(hospitals.icu_utilization);
        tables.vaccinations = Some(loader.vaccinations().await?);
        Ok(tables)
    }

    /// The persisted combined table. Population still comes from the JHU
    /// deaths table; if that cannot be loaded the records have none.
    pub async fn load_combined(loader: &SourceLoader) -> Result<Self> {
        let combined = loader.combined().await?;
        let population = match loader.us_population(GroupBy::State).await {
            Ok(population) => population,
            Err(e) => {
                warn!("no state population available: {}", e);
                BTreeMap::new()
            }
        };
        Ok(StateTables::from_combined(&combined, population))
    }

    pub fn from_combined(combined: &CombinedTable, population: BTreeMap<String, u64>) -> Self {
        StateTables {
            cases: combined.table(CombinedColumn::Cases),
            fatalities: combined.table(CombinedColumn::Deaths),
            population,
            hospitalizations: Some(combined.table(CombinedColumn::Hospitalizations)),
            icu_utilization: Some(combined.table(CombinedColumn::IcuUtilization)),
            vaccinations: Some(combined.vaccinations()),
        }
    }
}

/// Series pulled out of the tables for one region.
struct RawSeries {
    cases: TimeSeries,
    fatalities: TimeSeries,
    hospitalizations: Option<TimeSeries>,
    icu_utilization: Option<TimeSeries>,
    fully_vaccinated: Option<TimeSeries>,
    first_dose: Option<TimeSeries>,
}

fn required(table: &WideTable, name: &str, label: &str) -> Result<TimeSeries> {
    let series = table.series(name).ok_or_else(|| Error::UnknownRegion {
        name: name.to_string(),
        table: label.to_string(),
    })?;
    if series.is_empty() {
        return Err(Error::EmptySeries {
            name: name.to_string(),
            table: label.to_string(),
        });
    }
    Ok(series)
}

fn optional(table: Option<&WideTable>, name: &str) -> Option<TimeSeries> {
    table
        .and_then(|table| table.series(name))
        .filter(|series| !series.is_empty())
}

/// One region's loaded series and derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    name: String,
    kind: RegionKind,
    window: usize,
    population: Option<u64>,
    cases: Metric,
    fatalities: Metric,
    hospitalizations: Option<Metric>,
    icu_utilization: Option<TimeSeries>,
    fully_vaccinated: Option<Metric>,
    first_dose: Option<Metric>,
    case_fatality: CaseFatality,
    first_record: NaiveDate,
    last_record: NaiveDate,
    attributes: BTreeMap<String, String>,
}

impl RegionRecord {
    fn build(
        kind: RegionKind,
        name: &str,
        window: usize,
        population: Option<u64>,
        raw: RawSeries,
        attributes: BTreeMap<String, String>,
    ) -> Result<Self> {
        let (Some(first_record), Some(last_record)) =
            (raw.cases.first_date(), raw.cases.last_date())
        else {
            return Err(Error::EmptySeries {
                name: name.to_string(),
                table: "cases".to_string(),
            });
        };
        if population.is_none() {
            debug!("{} {} has no population", kind, name);
        }
        let case_fatality = CaseFatality::derive(&raw.fatalities, &raw.cases);
        Ok(RegionRecord {
            name: name.to_string(),
            kind,
            window,
            population,
            cases: Metric::derive(raw.cases, window),
            fatalities: Metric::derive(raw.fatalities, window),
            hospitalizations: raw.hospitalizations.map(|s| Metric::derive(s, window)),
            icu_utilization: raw.icu_utilization,
            fully_vaccinated: raw.fully_vaccinated.map(|s| Metric::derive(s, window)),
            first_dose: raw.first_dose.map(|s| Metric::derive(s, window)),
            case_fatality,
            first_record,
            last_record,
            attributes,
        })
    }

    fn check_window(window: usize) -> Result<()> {
        if window == 0 {
            return Err(Error::InvalidWindow(window));
        }
        Ok(())
    }

    /// A country from the global tables. Population comes from `lookup`;
    /// an unknown country gets none.
    pub fn country(
        name: &str,
        window: usize,
        tables: &GlobalTables,
        lookup: &dyn PopulationLookup,
    ) -> Result<Self> {
        RegionRecord::check_window(window)?;
        let raw = RawSeries {
            cases: required(&tables.cases, name, "global cases")?,
            fatalities: required(&tables.fatalities, name, "global deaths")?,
            hospitalizations: None,
            icu_utilization: None,
            fully_vaccinated: None,
            first_dose: None,
        };
        RegionRecord::build(
            RegionKind::Country,
            name,
            window,
            lookup.population(name),
            raw,
            BTreeMap::new(),
        )
    }

    /// A US state by full name.
    pub fn state(name: &str, window: usize, tables: &StateTables) -> Result<Self> {
        RegionRecord::check_window(window)?;
        let vaccinations = tables.vaccinations.as_ref();
        let raw = RawSeries {
            cases: required(&tables.cases, name, "state cases")?,
            fatalities: required(&tables.fatalities, name, "state deaths")?,
            hospitalizations: optional(tables.hospitalizations.as_ref(), name),
            icu_utilization: optional(tables.icu_utilization.as_ref(), name),
            fully_vaccinated: optional(vaccinations.map(|v| &v.fully_vaccinated), name),
            first_dose: optional(vaccinations.map(|v| &v.first_dose), name),
        };
        RegionRecord::build(
            RegionKind::State,
            name,
            window,
            tables.population.population(name),
            raw,
            BTreeMap::new(),
        )
    }

    /// A US county keyed "County, State". The row's metadata other than
    /// population becomes the record's attributes.
    pub fn county(name: &str, window: usize, tables: &CountyTables) -> Result<Self> {
        RegionRecord::check_window(window)?;
        let raw = RawSeries {
            cases: required(&tables.cases, name, "county cases")?,
            fatalities: required(&tables.fatalities, name, "county deaths")?,
            hospitalizations: None,
            icu_utilization: None,
            fully_vaccinated: None,
            first_dose: None,
        };
        let mut attributes = BTreeMap::new();
        for table in [&tables.cases, &tables.fatalities] {
            if let Some(metadata) = table.metadata(name) {
                attributes.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        let population = attributes
            .remove(jhu::POPULATION_COLUMN)
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 1.0)
            .map(|value| value.round() as u64);
        RegionRecord::build(
            RegionKind::County,
            name,
            window,
            population,
            raw,
            attributes,
        )
    }

    /// Load the tables a single record needs and build it. State records
    /// come from the combined table.
    pub async fn load(
        kind: RegionKind,
        name: &str,
        window: usize,
        loader: &SourceLoader,
        lookup: &dyn PopulationLookup,
    ) -> Result<Self> {
        RegionRecord::check_window(window)?;
        info!("loading {} {}", kind, name);
        match kind {
            RegionKind::Country => {
                let tables = GlobalTables::load(loader).await?;
                RegionRecord::country(name, window, &tables, lookup)
            }
            RegionKind::State => {
                let tables = StateTables::load_combined(loader).await?;
                RegionRecord::state(name, window, &tables)
            }
            RegionKind::County => {
                let tables = CountyTables::load(loader).await?;
                RegionRecord::county(name, window, &tables)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn population(&self) -> Option<u64> {
        self.population
    }

    pub fn cases(&self) -> &Metric {
        &self.cases
    }

    pub fn fatalities(&self) -> &Metric {
        &self.fatalities
    }

    pub fn hospitalizations(&self) -> Option<&Metric> {
        self.hospitalizations.as_ref()
    }

    /// Daily share of adult ICU beds held by COVID patients.
    pub fn icu_utilization(&self) -> Option<&TimeSeries> {
        self.icu_utilization.as_ref()
    }

    pub fn fully_vaccinated(&self) -> Option<&Metric> {
        self.fully_vaccinated.as_ref()
    }

    pub fn first_dose(&self) -> Option<&Metric> {
        self.first_dose.as_ref()
    }

    pub fn case_fatality(&self) -> &CaseFatality {
        &self.case_fatality
    }

    /// Earliest date in the cases series.
    pub fn first_record(&self) -> NaiveDate {
        self.first_record
    }

    /// Latest date in the cases series.
    pub fn last_record(&self) -> NaiveDate {
        self.last_record
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// `series` per million residents of this region.
    pub fn per_capita(&self, series: &TimeSeries) -> Result<TimeSeries> {
        metrics::normalize_per_capita(series, self.population, PER_MILLION).map_err(|_| {
            Error::MissingPopulation {
                region: self.name.clone(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DEFAULT_WINDOW;
    use covid_source::combined::CombinedRow;
    use covid_source::fetch::SourceConfig;
    use covid_source::population::CountryPopulations;

    fn loader() -> SourceLoader {
        let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures");
        SourceLoader::new(SourceConfig::offline(fixtures)).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_country_record() {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let japan = RegionRecord::country("Japan", 7, &tables, &populations).unwrap();
        assert_eq!(japan.kind(), RegionKind::Country);
        assert_eq!(japan.first_record(), date(2020, 3, 1));
        assert_eq!(japan.last_record(), date(2020, 3, 14));
        assert_eq!(japan.cases().total(), Some(585.0));
        assert!(japan.population().is_some());
        assert!(japan.hospitalizations().is_none());
        assert_eq!(japan.cases().per_day().len(), japan.cases().series().len());
        assert_eq!(
            japan
                .cases()
                .per_day()
                .values()
                .take_while(|v| v.is_none())
                .count(),
            7
        );
    }

    #[tokio::test]
    async fn test_country_provinces_are_summed() {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let canada = RegionRecord::country("Canada", 7, &tables, &populations).unwrap();
        assert_eq!(canada.cases().total(), Some(116.0 + 148.0));
    }

    #[tokio::test]
    async fn test_unknown_country() {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let result = RegionRecord::country("Atlantis", 7, &tables, &populations);
        assert!(matches!(result, Err(Error::UnknownRegion { .. })));
    }

    #[tokio::test]
    async fn test_country_without_population() {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let ship = RegionRecord::country("MS Zaandam", 7, &tables, &populations).unwrap();
        assert_eq!(ship.population(), None);
        let result = ship.per_capita(ship.cases().series());
        assert!(matches!(result, Err(Error::MissingPopulation { region }) if region == "MS Zaandam"));
        // zero cases throughout: case fatality is undefined, not zero
        assert_eq!(ship.case_fatality().series().observed(), 0);
    }

    #[tokio::test]
    async fn test_zero_window_rejected() {
        let tables = GlobalTables::load(&loader()).await.unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let result = RegionRecord::country("Japan", 0, &tables, &populations);
        assert!(matches!(result, Err(Error::InvalidWindow(0))));
    }

    #[tokio::test]
    async fn test_state_record_from_combined() {
        let tables = StateTables::load_combined(&loader()).await.unwrap();
        let texas = RegionRecord::state("Texas", 3, &tables).unwrap();
        assert_eq!(texas.kind(), RegionKind::State);
        assert_eq!(texas.first_record(), date(2021, 2, 1));
        assert_eq!(texas.last_record(), date(2021, 2, 7));
        assert_eq!(texas.cases().total(), Some(353856.0));
        assert_eq!(texas.population(), Some(57735 + 4713325));
        assert!(texas.hospitalizations().is_some());
        assert_eq!(texas.fully_vaccinated().and_then(Metric::total), Some(1360000.0));
        assert_eq!(texas.first_dose().and_then(Metric::total), Some(3220000.0));
        assert_eq!(texas.window(), 3);
    }

    #[tokio::test]
    async fn test_state_record_from_jhu_has_no_hospital_data() {
        let tables = StateTables::load_jhu(&loader()).await.unwrap();
        let ohio = RegionRecord::state("Ohio", 7, &tables).unwrap();
        assert!(ohio.hospitalizations().is_none());
        assert!(ohio.fully_vaccinated().is_none());
        assert_eq!(ohio.population(), Some(1316756));
        assert_eq!(ohio.first_record(), date(2021, 1, 25));
    }

    #[tokio::test]
    async fn test_state_record_from_live_feeds() {
        let tables = StateTables::load_live(&loader()).await.unwrap();
        let ohio = RegionRecord::state("Ohio", 7, &tables).unwrap();
        assert!(ohio.hospitalizations().is_some());
        // the vaccine feed has no Ohio rows
        assert!(ohio.fully_vaccinated().is_none());
    }

    #[tokio::test]
    async fn test_combined_round_trip_matches_live_records() {
        let loader = loader();
        let combined = loader.build_combined().await.unwrap();
        let mut buffer = Vec::new();
        combined.write(&mut buffer).unwrap();
        let reread = CombinedTable::read(buffer.as_slice()).unwrap();
        assert_eq!(reread, combined);

        let population = loader.us_population(GroupBy::State).await.unwrap();
        let cached = StateTables::from_combined(&reread, population);
        let live = StateTables::load_live(&loader).await.unwrap();
        for state in reread.states() {
            let from_cache = RegionRecord::state(state, 3, &cached).unwrap();
            let from_live = RegionRecord::state(state, 3, &live).unwrap();
            let start = Some(from_cache.first_record());
            let end = Some(from_cache.last_record());
            let clip = |metric: Option<&Metric>| metric.map(|m| m.series().range(start, end));

            assert_eq!(
                from_cache.cases().series(),
                &from_live.cases().series().range(start, end)
            );
            assert_eq!(
                from_cache.fatalities().series(),
                &from_live.fatalities().series().range(start, end)
            );
            assert_eq!(
                clip(from_cache.hospitalizations()),
                clip(from_live.hospitalizations())
            );
            assert_eq!(
                clip(from_cache.fully_vaccinated()),
                clip(from_live.fully_vaccinated())
            );
            assert_eq!(clip(from_cache.first_dose()), clip(from_live.first_dose()));
            assert_eq!(from_cache.population(), from_live.population());
        }
    }

    #[test]
    fn test_ragged_states_survive_combined_round_trip() {
        let row = |state: &str, d: u32, cases: f64| CombinedRow {
            state: state.to_string(),
            date: date(2021, 2, d),
            total_cases: Some(cases),
            total_deaths: Some(cases / 10.0),
            total_hospitalizations: Some(cases / 5.0),
            icu_bed_utilization: Some(0.2),
            series_complete_yes: Some(1000.0 * d as f64),
            administered_dose1_recip: None,
        };
        let mut rows: Vec<CombinedRow> = (1..=5).map(|d| row("Texas", d, 100.0 * d as f64)).collect();
        rows.extend((2..=4).map(|d| row("Ohio", d, 10.0 * d as f64)));
        let combined = CombinedTable::from_rows(rows);

        let mut buffer = Vec::new();
        combined.write(&mut buffer).unwrap();
        let reread = CombinedTable::read(buffer.as_slice()).unwrap();
        let tables = StateTables::from_combined(&reread, BTreeMap::new());

        let ohio = RegionRecord::state("Ohio", 1, &tables).unwrap();
        assert_eq!(ohio.first_record(), date(2021, 2, 2));
        assert_eq!(ohio.last_record(), date(2021, 2, 4));
        assert_eq!(ohio.cases().series().len(), 3);
        assert_eq!(ohio.cases().total(), Some(40.0));
        assert_eq!(ohio.fatalities().total(), Some(4.0));
        assert_eq!(ohio.hospitalizations().and_then(Metric::total), Some(8.0));
        assert_eq!(ohio.fully_vaccinated().and_then(Metric::total), Some(4000.0));
        assert_eq!(ohio.case_fatality().last(), Some(0.1));
        assert_eq!(ohio.icu_utilization().map(TimeSeries::len), Some(3));

        let texas = RegionRecord::state("Texas", 1, &tables).unwrap();
        assert_eq!(texas.first_record(), date(2021, 2, 1));
        assert_eq!(texas.last_record(), date(2021, 2, 5));
        assert_eq!(texas.cases().total(), Some(500.0));
    }

    #[tokio::test]
    async fn test_county_record() {
        let tables = CountyTables::load(&loader()).await.unwrap();
        let harris = RegionRecord::county("Harris, Texas", 7, &tables).unwrap();
        assert_eq!(harris.kind(), RegionKind::County);
        assert_eq!(harris.population(), Some(4713325));
        assert_eq!(harris.cases().total(), Some(349500.0));
        assert_eq!(harris.attribute("FIPS"), Some("48201.0"));
        assert_eq!(harris.attribute("Province_State"), Some("Texas"));
        assert_eq!(harris.attribute(jhu::POPULATION_COLUMN), None);

        let missing = RegionRecord::county("Nowhere, Texas", 7, &tables);
        assert!(matches!(missing, Err(Error::UnknownRegion { .. })));
    }

    #[tokio::test]
    async fn test_load_convenience() {
        let populations = CountryPopulations::embedded().unwrap();
        let record = RegionRecord::load(
            RegionKind::County,
            "Autauga, Alabama",
            DEFAULT_WINDOW,
            &loader(),
            &populations,
        )
        .await
        .unwrap();
        assert_eq!(record.population(), Some(55869));
    }

    #[tokio::test]
    async fn test_load_surfaces_unavailable_source() {
        let loader =
            SourceLoader::new(SourceConfig::offline("/nonexistent/covid-cache")).unwrap();
        let populations = CountryPopulations::embedded().unwrap();
        let error = RegionRecord::load(RegionKind::Country, "Japan", 7, &loader, &populations)
            .await
            .unwrap_err();
        assert!(error.is_source_unavailable());
    }

    #[test]
    fn test_state_record_per_capita() {
        let dates: Vec<NaiveDate> = (1..=3).map(|d| date(2021, 3, d)).collect();
        let series = |values: [f64; 3]| {
            let mut table = WideTable::new(dates.clone());
            table.add_row(
                "Utopia".to_string(),
                covid_source::Row::new(values.iter().map(|v| Some(*v)).collect()),
            );
            table
        };
        let tables = StateTables {
            cases: series([100.0, 200.0, 400.0]),
            fatalities: series([1.0, 2.0, 4.0]),
            population: BTreeMap::from([("Utopia".to_string(), 2_000_000)]),
            hospitalizations: None,
            icu_utilization: None,
            vaccinations: None,
        };
        let record = RegionRecord::state("Utopia", 1, &tables).unwrap();
        let per_capita = record.per_capita(record.cases().series()).unwrap();
        assert_eq!(per_capita.value(&date(2021, 3, 1)), Some(50.0));
        assert_eq!(record.case_fatality().last(), Some(0.01));
    }

    #[test]
    fn test_region_kind_parse() {
        assert_eq!("County".parse::<RegionKind>().unwrap(), RegionKind::County);
        assert!("planet".parse::<RegionKind>().is_err());
        assert_eq!(RegionKind::State.to_string(), "state");
    }
}
