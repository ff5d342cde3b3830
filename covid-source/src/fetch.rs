//! Fetching raw source bodies: the remote source first, then a local cache
//! directory holding files with the same names.

use crate::error::{Result, SourceError};
use chrono::{Local, NaiveDate};
use covid_utils::{dates::days_of_pandemic, regions::US_STATE_ABBREVIATIONS};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const JHU_TIME_SERIES_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";
pub const HOSPITALIZATIONS_URL: &str = "https://healthdata.gov/resource/g62h-syeh.json";
pub const VACCINATIONS_URL: &str = "https://data.cdc.gov/resource/unsk-b7fc.json";
pub const COMBINED_URL: &str =
    "https://raw.githubusercontent.com/lucascarter0/covid19-analytics/master/us_combined_covid_data.csv";

/// Where and how to fetch source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding the JHU `time_series_covid19_*.csv` files.
    pub jhu_base_url: String,
    pub hospitalizations_url: String,
    pub vaccinations_url: String,
    pub combined_url: String,
    /// Fallback directory, read when the remote fetch fails.
    pub cache_dir: PathBuf,
    /// Hard timeout for a single HTTP request.
    pub timeout_secs: u64,
    /// Skip the remote source entirely and read from `cache_dir`.
    pub offline: bool,
    /// Socrata `$limit`; derived from the pandemic length when unset.
    pub row_limit: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            jhu_base_url: JHU_TIME_SERIES_URL.to_string(),
            hospitalizations_url: HOSPITALIZATIONS_URL.to_string(),
            vaccinations_url: VACCINATIONS_URL.to_string(),
            combined_url: COMBINED_URL.to_string(),
            cache_dir: PathBuf::from("data"),
            timeout_secs: 60,
            offline: false,
            row_limit: None,
        }
    }
}

impl SourceConfig {
    /// Offline configuration reading everything from `cache_dir`.
    pub fn offline<P: Into<PathBuf>>(cache_dir: P) -> Self {
        SourceConfig {
            cache_dir: cache_dir.into(),
            offline: true,
            ..SourceConfig::default()
        }
    }

    /// Read a JSON config file; absent keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let body = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Socrata row limit: one row per state and day since 2020-01-01.
    pub fn socrata_limit(&self, today: &NaiveDate) -> u64 {
        self.row_limit.unwrap_or_else(|| {
            US_STATE_ABBREVIATIONS.len() as u64 * days_of_pandemic(today) as u64
        })
    }
}

/// A fetchable source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    GlobalCases,
    GlobalDeaths,
    UsCases,
    UsDeaths,
    Hospitalizations,
    Vaccinations,
    Combined,
}

impl Resource {
    /// File name used both remotely (JHU) and in the cache directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Resource::GlobalCases => "time_series_covid19_confirmed_global.csv",
            Resource::GlobalDeaths => "time_series_covid19_deaths_global.csv",
            Resource::UsCases => "time_series_covid19_confirmed_US.csv",
            Resource::UsDeaths => "time_series_covid19_deaths_US.csv",
            Resource::Hospitalizations => "hospitalizations.json",
            Resource::Vaccinations => "vaccinations.json",
            Resource::Combined => "us_combined_covid_data.csv",
        }
    }

    pub fn url(&self, config: &SourceConfig, today: &NaiveDate) -> String {
        match self {
            Resource::GlobalCases
            | Resource::GlobalDeaths
            | Resource::UsCases
            | Resource::UsDeaths => format!(
                "{}/{}",
                config.jhu_base_url.trim_end_matches('/'),
                self.file_name()
            ),
            Resource::Hospitalizations => format!(
                "{}?$limit={}",
                config.hospitalizations_url,
                config.socrata_limit(today)
            ),
            Resource::Vaccinations => format!(
                "{}?$limit={}",
                config.vaccinations_url,
                config.socrata_limit(today)
            ),
            Resource::Combined => config.combined_url.clone(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::GlobalCases => "global cases",
            Resource::GlobalDeaths => "global deaths",
            Resource::UsCases => "US cases",
            Resource::UsDeaths => "US deaths",
            Resource::Hospitalizations => "hospitalizations",
            Resource::Vaccinations => "vaccinations",
            Resource::Combined => "combined US table",
        };
        write!(f, "{}", name)
    }
}

/// Which source produced a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Primary,
    /// The remote fetch failed (or was skipped) and the cache answered.
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,
    pub origin: Origin,
}

/// Fetches resource bodies with remote-then-cache fallback.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: SourceConfig,
    #[cfg(feature = "api")]
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(config: SourceConfig) -> Result<Self> {
        #[cfg(feature = "api")]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Fetcher {
            config,
            #[cfg(feature = "api")]
            client,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Fetch a resource. A failed remote fetch falls back to the cache
    /// directory; when both fail the error names both causes.
    pub async fn fetch(&self, resource: Resource) -> Result<Fetched> {
        let primary = if self.config.offline {
            "offline mode".to_string()
        } else {
            match self.fetch_remote(resource).await {
                Ok(body) => {
                    info!("fetched {} from remote ({} bytes)", resource, body.len());
                    return Ok(Fetched {
                        body,
                        origin: Origin::Primary,
                    });
                }
                Err(e) => {
                    warn!("remote fetch of {} failed: {}", resource, e);
                    e.to_string()
                }
            }
        };

        let path = self.config.cache_dir.join(resource.file_name());
        match std::fs::read_to_string(&path) {
            Ok(body) => {
                info!("read {} from {}", resource, path.display());
                Ok(Fetched {
                    body,
                    origin: Origin::Fallback { reason: primary },
                })
            }
            Err(e) => Err(SourceError::Unavailable {
                resource: resource.to_string(),
                primary,
                fallback: format!("{}: {}", path.display(), e),
            }),
        }
    }

    #[cfg(feature = "api")]
    async fn fetch_remote(&self, resource: Resource) -> Result<String> {
        let today = Local::now().date_naive();
        let url = resource.url(&self.config, &today);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        if body.len() <= 2 {
            return Err(SourceError::EmptyResponse(url));
        }
        Ok(body)
    }

    #[cfg(not(feature = "api"))]
    async fn fetch_remote(&self, resource: Resource) -> Result<String> {
        let today = Local::now().date_naive();
        log::debug!(
            "not fetching {}: built without the api feature",
            resource.url(&self.config, &today)
        );
        Err(SourceError::RemoteDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures"))
    }

    #[test]
    fn test_urls() {
        let config = SourceConfig {
            row_limit: Some(10),
            ..SourceConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2021, 8, 1).unwrap();
        assert!(Resource::UsDeaths
            .url(&config, &today)
            .ends_with("csse_covid_19_time_series/time_series_covid19_deaths_US.csv"));
        assert_eq!(
            Resource::Vaccinations.url(&config, &today),
            "https://data.cdc.gov/resource/unsk-b7fc.json?$limit=10"
        );
    }

    #[test]
    fn test_socrata_limit_from_pandemic_length() {
        let config = SourceConfig::default();
        let today = NaiveDate::from_ymd_opt(2020, 1, 11).unwrap();
        assert_eq!(config.socrata_limit(&today), 56 * 10);
    }

    #[test]
    fn test_config_defaults_fill_missing_keys() {
        let config: SourceConfig =
            serde_json::from_str(r#"{"cache_dir": "/tmp/covid", "timeout_secs": 5}"#).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/covid"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.jhu_base_url, JHU_TIME_SERIES_URL);
        assert!(!config.offline);
    }

    #[tokio::test]
    async fn test_offline_reads_cache() {
        let fetcher = Fetcher::new(SourceConfig::offline(fixtures())).unwrap();
        let fetched = fetcher.fetch(Resource::GlobalCases).await.unwrap();
        assert!(fetched.body.starts_with("Province/State"));
        assert!(matches!(fetched.origin, Origin::Fallback { .. }));
    }

    #[tokio::test]
    async fn test_both_sources_failing_is_unavailable() {
        let fetcher = Fetcher::new(SourceConfig::offline("/nonexistent/covid-cache")).unwrap();
        let result = fetcher.fetch(Resource::Combined).await;
        match result {
            Err(SourceError::Unavailable {
                resource, primary, ..
            }) => {
                assert_eq!(resource, "combined US table");
                assert_eq!(primary, "offline mode");
            }
            other => panic!("expected Unavailable, got {:?}", other.map(|f| f.origin)),
        }
    }

    /// Remote sources on a local port nothing listens on.
    fn unreachable(cache_dir: PathBuf) -> SourceConfig {
        SourceConfig {
            jhu_base_url: "http://127.0.0.1:9/jhu".to_string(),
            hospitalizations_url: "http://127.0.0.1:9/hospitals.json".to_string(),
            vaccinations_url: "http://127.0.0.1:9/vaccines.json".to_string(),
            combined_url: "http://127.0.0.1:9/combined.csv".to_string(),
            cache_dir,
            timeout_secs: 2,
            offline: false,
            row_limit: Some(1),
        }
    }

    #[tokio::test]
    async fn test_failed_remote_falls_back_to_cache() {
        let fetcher = Fetcher::new(unreachable(fixtures())).unwrap();
        let fetched = fetcher.fetch(Resource::UsDeaths).await.unwrap();
        assert!(fetched.body.starts_with("UID"));
        match fetched.origin {
            Origin::Fallback { reason } => {
                assert!(!reason.is_empty());
                assert_ne!(reason, "offline mode");
            }
            Origin::Primary => panic!("nothing should answer on port 9"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_carries_remote_error() {
        let cache = PathBuf::from("/nonexistent/covid-cache");
        let fetcher = Fetcher::new(unreachable(cache)).unwrap();
        match fetcher.fetch(Resource::Hospitalizations).await {
            Err(SourceError::Unavailable {
                resource,
                primary,
                fallback,
            }) => {
                assert_eq!(resource, "hospitalizations");
                assert!(!primary.is_empty());
                assert_ne!(primary, "offline mode");
                assert!(fallback.contains("/nonexistent/covid-cache/hospitalizations.json"));
            }
            other => panic!("expected Unavailable, got {:?}", other.map(|f| f.origin)),
        }
    }
}
