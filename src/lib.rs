//! Multi-year personal finance projection engine
//!
//! Income sources, expenses, investment assets and real property grow year
//! over year under configurable rates and shaping envelopes. Values are
//! computed lazily, one year at a time, and memoized per entity. A
//! progressive income tax engine with inflation-indexed brackets and capital
//! loss carryforward consumes the projected amounts.

pub mod config;
pub mod error;
pub mod rates;
pub mod series;
pub mod simulation;
pub mod tax;

pub use config::SimulationOptions;
pub use error::{Error, Result};
pub use rates::{BoundedEnvelope, ConstantRate, Envelope, PiecewiseRate, Rate, YearlyRate};
pub use series::{
    shared, Asset, AssetRates, AssetSeries, Assets, Expense, ExpenseSeries, Expenses, Income, IncomeSeries, Incomes,
    Properties, Property, PropertySeries, Shared, Snapshot, TimeSeries,
};
pub use simulation::{Amount, SimulationContext};
pub use tax::{Bracket, IncomeTax, TaxAssessment, TaxRates, TaxableAmounts};
