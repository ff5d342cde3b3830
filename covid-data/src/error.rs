/// Error types for building and comparing region records
use crate::compare::MetricKind;
use covid_source::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Loading a source table failed (including both fetch paths failing)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The region name is not present in a required table
    #[error("Region {name:?} not found in {table}")]
    UnknownRegion { name: String, table: String },

    /// The region row exists but carries no dates
    #[error("Region {name:?} has no dated values in {table}")]
    EmptySeries { name: String, table: String },

    /// Smoothing window of zero days
    #[error("Smoothing window must be at least one day, got {0}")]
    InvalidWindow(usize),

    /// Per-capita normalization without a usable population
    #[error("Population value not defined for {region}; cannot normalize per capita")]
    MissingPopulation { region: String },

    /// Comparator asked for a metric it does not know
    #[error("Metric kind {0:?} not supported for comparison")]
    UnsupportedMetricKind(String),

    /// A record lacks the requested metric
    #[error("{region} has no {metric} series")]
    MissingMetric { region: String, metric: MetricKind },
}

impl Error {
    /// Whether both the remote source and its fallback failed.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Error::Source(SourceError::Unavailable { .. }))
    }
}

/// Type alias for Results using Error
pub type Result<T> = std::result::Result<T, Error>;
