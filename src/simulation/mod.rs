//! Simulation window and the year-indexed storage every entity builds on

mod context;
mod table;

pub use context::SimulationContext;
pub use table::YearTable;

/// Amount in minor currency units
pub type Amount = i64;

/// Convert a fractional result back to an amount, truncating toward zero
#[inline]
pub fn truncate(value: f64) -> Amount {
    value as Amount
}
