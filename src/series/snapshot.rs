//! Per-year textual snapshots for reporting and debugging

use std::fmt;

use serde::Serialize;

use super::YearRecord;
use crate::simulation::Amount;

/// Field-name to amount mapping of one entity for one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub kind: &'static str,
    pub name: String,
    pub year: i32,
    pub fields: Vec<(&'static str, Amount)>,
}

impl Snapshot {
    pub fn from_record<R: YearRecord>(name: &str, year: i32, record: &R) -> Self {
        Self {
            kind: R::KIND,
            name: name.to_string(),
            year,
            fields: record.fields(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Amount> {
        self.fields.iter().find(|(field, _)| *field == name).map(|(_, amount)| *amount)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} name=\"{}\" year=\"{}\"", self.kind, self.name, self.year)?;
        for (field, amount) in &self.fields {
            write!(f, " {field}=\"${amount}\"")?;
        }
        Ok(())
    }
}
