//! Graduated tax schedules and the income tax engine

mod income_tax;
mod schedule;

pub use income_tax::{IncomeTax, IncomeTaxBuilder, TaxAssessment, TaxableAmounts};
pub use schedule::{Bracket, Ceiling, TaxRates};
