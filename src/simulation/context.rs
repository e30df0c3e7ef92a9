//! Simulation window

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed year range of one simulation run
///
/// Years are used to compute storage indices, so every year handed to an
/// entity is validated against this window first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationContext {
    first_year: i32,
    num_years: usize,
}

impl SimulationContext {
    pub fn new(first_year: i32, num_years: usize) -> Self {
        Self { first_year, num_years }
    }

    pub fn first_year(&self) -> i32 {
        self.first_year
    }

    /// Last simulated year (`first_year + num_years - 1`)
    pub fn last_year(&self) -> i32 {
        self.first_year + self.num_years as i32 - 1
    }

    pub fn num_years(&self) -> usize {
        self.num_years
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.first_year && year <= self.last_year()
    }

    /// Map a year to its storage index
    ///
    /// # Errors
    /// `OutOfRange` if the year is outside `[first_year, last_year]`
    pub fn index_of(&self, year: i32) -> Result<usize> {
        if self.contains(year) {
            Ok((year - self.first_year) as usize)
        } else {
            Err(Error::OutOfRange {
                year,
                first: self.first_year,
                last: self.last_year(),
            })
        }
    }

    /// All simulated years in ascending order
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.first_year..=self.last_year()
    }
}
