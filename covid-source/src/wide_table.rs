use crate::series::TimeSeries;
use chrono::NaiveDate;
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

/// One region's row: a value per date column plus every non-date column
/// kept verbatim as metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<Option<f64>>,
    pub metadata: BTreeMap<String, String>,
    /// Dates this row was reported on. `None` means every date column.
    pub reported: Option<BTreeSet<NaiveDate>>,
}

impl Row {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Row {
            values,
            metadata: BTreeMap::new(),
            reported: None,
        }
    }

    fn covers(&self, date: &NaiveDate) -> bool {
        self.reported.as_ref().map_or(true, |dates| dates.contains(date))
    }

    /// Fold `other` into this row. Values are summed cell by cell, a missing
    /// cell contributing nothing. Metadata present and numeric on both sides
    /// is summed too; everything else keeps this row's value.
    fn accumulate(&mut self, other: Row) {
        for (mine, theirs) in self.values.iter_mut().zip(other.values) {
            *mine = match (*mine, theirs) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        }
        self.reported = match (self.reported.take(), other.reported) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend(theirs);
                Some(mine)
            }
            _ => None,
        };
        for (column, value) in other.metadata {
            match self.metadata.entry(column) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    let mine = slot.get().trim().parse::<f64>();
                    let theirs = value.trim().parse::<f64>();
                    if let (Ok(a), Ok(b)) = (mine, theirs) {
                        slot.insert((a + b).to_string());
                    }
                }
            }
        }
    }
}

/// Region × date matrix of cumulative counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    dates: Vec<NaiveDate>,
    rows: BTreeMap<String, Row>,
}

impl WideTable {
    /// Empty table over the given date columns (sorted and deduplicated).
    pub fn new(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        dates.dedup();
        WideTable {
            dates,
            rows: BTreeMap::new(),
        }
    }

    /// Build a table from keyed rows; rows sharing a key are summed.
    /// `dates` must be ascending so the row values line up with them.
    pub fn from_rows<I>(dates: Vec<NaiveDate>, rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Row)>,
    {
        let mut table = WideTable::new(dates);
        for (key, row) in rows {
            table.add_row(key, row);
        }
        table
    }

    /// Pivot (region, date, value) records into a table. The date columns are
    /// the union of all record dates, but each row only covers the dates it
    /// had records for. A later record for the same cell wins.
    pub fn from_long<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, NaiveDate, Option<f64>)>,
    {
        let mut cells: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
        let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
        for (key, date, value) in records {
            dates.insert(date);
            cells.entry(key).or_default().insert(date, value);
        }
        let dates: Vec<NaiveDate> = dates.into_iter().collect();
        let rows = cells.into_iter().map(|(key, by_date)| {
            let values = dates
                .iter()
                .map(|date| by_date.get(date).copied().flatten())
                .collect();
            let row = Row {
                values,
                metadata: BTreeMap::new(),
                reported: Some(by_date.into_keys().collect()),
            };
            (key, row)
        });
        WideTable::from_rows(dates.clone(), rows)
    }

    /// Add a row, summing into an existing row with the same key. Rows that
    /// are shorter than the date index are padded with missing cells.
    pub fn add_row(&mut self, key: String, mut row: Row) {
        row.values.resize(self.dates.len(), None);
        match self.rows.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => slot.get_mut().accumulate(row),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.keys().map(String::as_str)
    }

    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    /// The date-indexed series for `key`, over the dates its row covers.
    pub fn series(&self, key: &str) -> Option<TimeSeries> {
        let row = self.rows.get(key)?;
        Some(
            self.dates
                .iter()
                .copied()
                .zip(row.values.iter().copied())
                .filter(|(date, _)| row.covers(date))
                .collect(),
        )
    }

    pub fn metadata(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.rows.get(key).map(|row| &row.metadata)
    }

    pub fn metadata_value(&self, key: &str, column: &str) -> Option<&str> {
        self.metadata(key)?.get(column).map(String::as_str)
    }

    /// Whether any row carries the metadata column.
    pub fn has_metadata_column(&self, column: &str) -> bool {
        self.rows.values().any(|row| row.metadata.contains_key(column))
    }

    /// Unpivot into (region, date, value), skipping missing cells.
    pub fn to_long(&self) -> impl Iterator<Item = (&str, NaiveDate, f64)> + '_ {
        self.rows.iter().flat_map(move |(key, row)| {
            self.dates
                .iter()
                .zip(row.values.iter())
                .filter_map(move |(date, value)| value.map(|v| (key.as_str(), *date, v)))
        })
    }
}
