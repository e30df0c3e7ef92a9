//! Shaping functions applied to rates or amounts
//!
//! Envisioned uses: costs proportional to some external factor (groceries
//! scaling with household size) and incomes that only exist for certain
//! years (salary ending at retirement, social security starting at 67).

use std::fmt;

use crate::error::{Error, Result};

/// Year to scale-factor function (typically, but not necessarily, 0..=1)
pub trait Envelope: fmt::Debug {
    fn scale_for_year(&self, year: i32) -> f64;
}

/// Scale for `year`, treating an absent envelope as 1.0 for every year
pub fn scale_for(envelope: Option<&dyn Envelope>, year: i32) -> f64 {
    envelope.map_or(1.0, |e| e.scale_for_year(year))
}

/// Envelope that is 1.0 inside `[start, end]` and 0.0 everywhere else
///
/// Individual years inside the window can be overridden. The window is
/// independent of the simulation's own window.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedEnvelope {
    start: i32,
    end: i32,
    /// Allocated on the first override, one entry per year of the window
    values: Option<Vec<f64>>,
}

impl BoundedEnvelope {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end, values: None }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Override the default 1.0 for one year of the window
    ///
    /// # Errors
    /// `EnvelopeOutOfRange` if `year` is outside `[start, end]`
    pub fn set_scale_for_year(&mut self, year: i32, value: f64) -> Result<()> {
        if year < self.start || year > self.end {
            return Err(Error::EnvelopeOutOfRange {
                year,
                start: self.start,
                end: self.end,
            });
        }
        let len = (self.end - self.start + 1) as usize;
        let values = self.values.get_or_insert_with(|| vec![1.0; len]);
        values[(year - self.start) as usize] = value;
        Ok(())
    }
}

impl Envelope for BoundedEnvelope {
    fn scale_for_year(&self, year: i32) -> f64 {
        if year < self.start || year > self.end {
            return 0.0;
        }
        match &self.values {
            Some(values) => values[(year - self.start) as usize],
            None => 1.0,
        }
    }
}
