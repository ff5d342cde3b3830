use crate::error::Result;
use csv::ReaderBuilder;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Embedded country populations keyed by JHU country name.
pub static COUNTRY_POPULATION_CSV: &str = include_str!("../../fixtures/country_population.csv");

/// Region metadata collaborator: population for a region name, or `None`
/// when the region is unknown.
pub trait PopulationLookup {
    fn population(&self, region: &str) -> Option<u64>;
}

impl PopulationLookup for BTreeMap<String, u64> {
    fn population(&self, region: &str) -> Option<u64> {
        self.get(region).copied()
    }
}

impl PopulationLookup for HashMap<String, u64> {
    fn population(&self, region: &str) -> Option<u64> {
        self.get(region).copied()
    }
}

/// Country populations read from a `COUNTRY,POPULATION` CSV.
#[derive(Debug, Clone, Default)]
pub struct CountryPopulations {
    by_country: HashMap<String, u64>,
}

impl CountryPopulations {
    /// The table shipped with the crate.
    pub fn embedded() -> Result<Self> {
        CountryPopulations::parse_csv(COUNTRY_POPULATION_CSV)
    }

    /// Parse a `COUNTRY,POPULATION` CSV. Rows with an unreadable population
    /// are skipped.
    pub fn parse_csv(csv_object: &str) -> Result<Self> {
        let mut by_country = HashMap::new();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_object.as_bytes());
        for row in rdr.records() {
            let record = row?;
            let country = record.get(0).unwrap_or("").trim();
            match record.get(1).and_then(|p| p.trim().parse::<u64>().ok()) {
                Some(population) if !country.is_empty() && population > 0 => {
                    by_country.insert(country.to_string(), population);
                }
                _ => debug!("skipping population row {:?}", record),
            }
        }
        Ok(CountryPopulations { by_country })
    }

    pub fn len(&self) -> usize {
        self.by_country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }
}

impl PopulationLookup for CountryPopulations {
    fn population(&self, region: &str) -> Option<u64> {
        self.by_country.get(region.trim()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{CountryPopulations, PopulationLookup};
    use covid_utils::groups::{G20_COUNTRIES, G7_COUNTRIES};

    #[test]
    fn test_embedded_covers_groups() {
        let populations = CountryPopulations::embedded().unwrap();
        for country in G7_COUNTRIES.iter().chain(G20_COUNTRIES) {
            assert!(
                populations.population(country).is_some(),
                "no population for {}",
                country
            );
        }
        assert_eq!(populations.population("Atlantis"), None);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let populations =
            CountryPopulations::parse_csv("COUNTRY,POPULATION\nJapan,126476461\nNowhere,n/a\n,5\n")
                .unwrap();
        assert_eq!(populations.len(), 1);
        assert_eq!(populations.population("Japan"), Some(126476461));
    }
}
