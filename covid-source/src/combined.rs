//! The persisted state × date table joining JHU, HealthData.gov and CDC data.
//!
//! # CSV Format
//!
//! ```text
//! state,date,total_cases,total_deaths,total_hospitalizations,icu_bed_utilization,series_complete_yes,administered_dose1_recip
//! Texas,2021-02-01,2400000,38000,150000,0.3,1000,5000
//! ```
//!
//! Missing cells are left empty. Extra columns in a file written by other
//! tools are ignored on read, and a file without `icu_bed_utilization`
//! reads as having none.

use crate::error::Result;
use crate::healthdata::{HospitalTables, VaccinationTables};
use crate::wide_table::WideTable;
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub state: String,
    pub date: NaiveDate,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub total_hospitalizations: Option<f64>,
    #[serde(default)]
    pub icu_bed_utilization: Option<f64>,
    pub series_complete_yes: Option<f64>,
    pub administered_dose1_recip: Option<f64>,
}

/// A column of the combined table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinedColumn {
    Cases,
    Deaths,
    Hospitalizations,
    IcuUtilization,
    FullyVaccinated,
    FirstDose,
}

impl CombinedColumn {
    fn get(&self, row: &CombinedRow) -> Option<f64> {
        match self {
            CombinedColumn::Cases => row.total_cases,
            CombinedColumn::Deaths => row.total_deaths,
            CombinedColumn::Hospitalizations => row.total_hospitalizations,
            CombinedColumn::IcuUtilization => row.icu_bed_utilization,
            CombinedColumn::FullyVaccinated => row.series_complete_yes,
            CombinedColumn::FirstDose => row.administered_dose1_recip,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    rows: Vec<CombinedRow>,
}

impl CombinedTable {
    /// Inner join of the four sources on (state, date).
    ///
    /// A key is kept when cases, deaths and hospitalizations all have a value
    /// for it and the vaccination feed reported at least one measure. ICU
    /// utilization is carried along when reported.
    pub fn combine(
        hospitals: &HospitalTables,
        vaccinations: &VaccinationTables,
        cases: &WideTable,
        deaths: &WideTable,
    ) -> Self {
        let lookup = |table: &WideTable| -> BTreeMap<(String, NaiveDate), f64> {
            table
                .to_long()
                .map(|(state, date, value)| ((state.to_string(), date), value))
                .collect()
        };
        let hospital = lookup(&hospitals.admissions);
        let icu = lookup(&hospitals.icu_utilization);
        let fully = lookup(&vaccinations.fully_vaccinated);
        let first = lookup(&vaccinations.first_dose);
        let deaths = lookup(deaths);

        let mut rows = Vec::new();
        for (state, date, total_cases) in cases.to_long() {
            let key = (state.to_string(), date);
            let (Some(total_deaths), Some(total_hospitalizations)) =
                (deaths.get(&key), hospital.get(&key))
            else {
                continue;
            };
            let series_complete_yes = fully.get(&key).copied();
            let administered_dose1_recip = first.get(&key).copied();
            if series_complete_yes.is_none() && administered_dose1_recip.is_none() {
                continue;
            }
            rows.push(CombinedRow {
                state: key.0.clone(),
                date,
                total_cases: Some(total_cases),
                total_deaths: Some(*total_deaths),
                total_hospitalizations: Some(*total_hospitalizations),
                icu_bed_utilization: icu.get(&key).copied(),
                series_complete_yes,
                administered_dose1_recip,
            });
        }
        info!("combined table: {} state-days", rows.len());
        CombinedTable::from_rows(rows)
    }

    /// Rows ordered by state, then date.
    pub fn from_rows(mut rows: Vec<CombinedRow>) -> Self {
        rows.sort_by(|a, b| a.state.cmp(&b.state).then(a.date.cmp(&b.date)));
        CombinedTable { rows }
    }

    pub fn rows(&self) -> &[CombinedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn states(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.state.as_str()).collect()
    }

    /// Pivot one column back into a state × date table. Each state keeps
    /// only the dates it has rows for.
    pub fn table(&self, column: CombinedColumn) -> WideTable {
        WideTable::from_long(
            self.rows
                .iter()
                .map(|row| (row.state.clone(), row.date, column.get(row))),
        )
    }

    pub fn vaccinations(&self) -> VaccinationTables {
        VaccinationTables {
            fully_vaccinated: self.table(CombinedColumn::FullyVaccinated),
            first_dose: self.table(CombinedColumn::FirstDose),
        }
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write(file)?;
        info!(
            "wrote {} rows to {}",
            self.rows.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let rows = rdr
            .deserialize::<CombinedRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(CombinedTable::from_rows(rows))
    }

    pub fn parse(body: &str) -> Result<Self> {
        CombinedTable::read(body.as_bytes())
    }
}
