//! Parsing of the JHU CSSE time series CSVs.
//!
//! Global tables have one row per country or province with columns
//! `Province/State,Country/Region,Lat,Long,1/22/20,...`. US tables have one
//! row per county with columns
//! `UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key[,Population],1/22/20,...`.
//! Every header that does not read as a date is kept as row metadata.

use crate::error::{Result, SourceError};
use crate::wide_table::{Row, WideTable};
use chrono::NaiveDate;
use covid_utils::{dates::parse_header_date, regions::county_key};
use csv::ReaderBuilder;
use log::debug;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const GLOBAL_COUNTRY_COLUMN: &str = "Country/Region";
pub const US_COUNTY_COLUMN: &str = "Admin2";
pub const US_STATE_COLUMN: &str = "Province_State";
pub const POPULATION_COLUMN: &str = "Population";

/// Region resolution for the US tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    County,
    State,
}

impl FromStr for GroupBy {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "county" => Ok(GroupBy::County),
            "state" => Ok(GroupBy::State),
            other => Err(SourceError::InvalidGroupBy(other.to_string())),
        }
    }
}

/// A parsed CSV before any keying: ascending date columns and one row per line.
struct RawTable {
    dates: Vec<NaiveDate>,
    rows: Vec<Row>,
}

fn parse_raw(body: &str) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = rdr.headers()?.clone();

    let mut date_columns: Vec<(usize, NaiveDate)> = Vec::new();
    let mut metadata_columns: Vec<(usize, String)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        match parse_header_date(header) {
            Some(date) => date_columns.push((idx, date)),
            None => metadata_columns.push((idx, header.trim().to_string())),
        }
    }
    date_columns.sort_by_key(|(_, date)| *date);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let values = date_columns
            .iter()
            .map(|(idx, _)| record.get(*idx).and_then(|cell| cell.trim().parse::<f64>().ok()))
            .collect();
        let metadata: BTreeMap<String, String> = metadata_columns
            .iter()
            .filter_map(|(idx, name)| {
                record
                    .get(*idx)
                    .map(|cell| (name.clone(), cell.trim().to_string()))
            })
            .collect();
        rows.push(Row {
            values,
            metadata,
            reported: None,
        });
    }
    debug!(
        "parsed {} rows with {} date columns and {} metadata columns",
        rows.len(),
        date_columns.len(),
        metadata_columns.len()
    );
    Ok(RawTable {
        dates: date_columns.into_iter().map(|(_, date)| date).collect(),
        rows,
    })
}

fn require_column(raw: &RawTable, table: &str, column: &str) -> Result<()> {
    if raw.rows.iter().all(|row| row.metadata.contains_key(column)) {
        Ok(())
    } else {
        Err(SourceError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// Parse a global time series CSV, summing province rows into their country.
pub fn parse_global(body: &str) -> Result<WideTable> {
    let raw = parse_raw(body)?;
    require_column(&raw, "global time series", GLOBAL_COUNTRY_COLUMN)?;
    let rows = raw.rows.into_iter().filter_map(|row| {
        let country = row.metadata.get(GLOBAL_COUNTRY_COLUMN)?.clone();
        Some((country, Row::new(row.values)))
    });
    Ok(WideTable::from_rows(raw.dates, rows))
}

/// Parse a US time series CSV at county or state resolution.
///
/// County rows are keyed "Admin2, Province_State" and keep all metadata;
/// rows without a county name are dropped. State rows are summed across
/// counties and keep only the summed population.
pub fn parse_us(body: &str, groupby: GroupBy) -> Result<WideTable> {
    let raw = parse_raw(body)?;
    require_column(&raw, "US time series", US_STATE_COLUMN)?;
    let rows: Vec<(String, Row)> = match groupby {
        GroupBy::County => {
            require_column(&raw, "US time series", US_COUNTY_COLUMN)?;
            raw.rows
                .into_iter()
                .filter_map(|row| {
                    let county = row.metadata.get(US_COUNTY_COLUMN)?;
                    let state = row.metadata.get(US_STATE_COLUMN)?;
                    if county.is_empty() {
                        debug!("skipping {} row without county", state);
                        return None;
                    }
                    Some((county_key(county, state), row))
                })
                .collect()
        }
        GroupBy::State => raw
            .rows
            .into_iter()
            .filter_map(|mut row| {
                let state = row.metadata.remove(US_STATE_COLUMN)?;
                let population = row.metadata.remove(POPULATION_COLUMN);
                row.metadata.clear();
                if let Some(population) = population {
                    row.metadata.insert(POPULATION_COLUMN.to_string(), population);
                }
                Some((state, row))
            })
            .collect(),
    };
    Ok(WideTable::from_rows(raw.dates, rows))
}

/// Population per region from a table's `Population` metadata column.
///
/// A table without the column yields an empty map. Values that are not
/// positive whole numbers are left out.
pub fn population(table: &WideTable) -> BTreeMap<String, u64> {
    table
        .keys()
        .filter_map(|key| {
            let raw = table.metadata_value(key, POPULATION_COLUMN)?;
            let value = raw.parse::<f64>().ok()?;
            if value.is_finite() && value >= 1.0 {
                Some((key.to_string(), value.round() as u64))
            } else {
                debug!("ignoring population {:?} for {}", raw, key);
                None
            }
        })
        .collect()
}
