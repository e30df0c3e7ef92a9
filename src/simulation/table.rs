//! Per-year storage with a computed-through watermark

use super::SimulationContext;
use crate::error::Result;

/// One row per simulated year plus the highest year whose row is known correct
///
/// The watermark may sit one year before the simulation window (nothing known
/// yet) but never after its last year.
#[derive(Debug, Clone)]
pub struct YearTable<R> {
    ctx: SimulationContext,
    rows: Vec<R>,
    computed_through: i32,
}

impl<R: Copy + Default> YearTable<R> {
    /// Create a zeroed table whose watermark is `computed_through`
    pub fn new(ctx: SimulationContext, computed_through: i32) -> Self {
        Self {
            ctx,
            rows: vec![R::default(); ctx.num_years()],
            computed_through,
        }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn computed_through(&self) -> i32 {
        self.computed_through
    }

    /// True when the row for `year` has to be (re)computed before it is read
    pub fn is_stale(&self, year: i32) -> bool {
        year > self.computed_through
    }

    pub fn mark_computed(&mut self, year: i32) {
        self.computed_through = year;
    }

    /// Move the watermark back so rows after `year` get recomputed.
    /// Returns true if the watermark moved.
    pub fn roll_back_to(&mut self, year: i32) -> bool {
        if year < self.computed_through {
            self.computed_through = year;
            true
        } else {
            false
        }
    }

    pub fn row(&self, year: i32) -> Result<R> {
        let idx = self.ctx.index_of(year)?;
        Ok(self.rows[idx])
    }

    pub fn row_mut(&mut self, year: i32) -> Result<&mut R> {
        let idx = self.ctx.index_of(year)?;
        Ok(&mut self.rows[idx])
    }

    pub fn set_row(&mut self, year: i32, row: R) -> Result<()> {
        *self.row_mut(year)? = row;
        Ok(())
    }

    /// Store a known-correct row for `year` and move the watermark to it.
    /// Later rows become stale; earlier rows are untouched.
    pub fn seed(&mut self, year: i32, row: R) -> Result<()> {
        self.set_row(year, row)?;
        self.computed_through = year;
        Ok(())
    }
}
