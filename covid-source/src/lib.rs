pub mod combined;
pub mod error;
pub mod fetch;
pub mod healthdata;
pub mod jhu;
pub mod loader;
pub mod population;
pub mod series;
pub mod wide_table;

pub use error::{Result, SourceError};
pub use series::TimeSeries;
pub use wide_table::{Row, WideTable};
