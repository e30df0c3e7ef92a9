//! Error taxonomy for scenario construction and projection
//!
//! Every variant is a precondition violation raised to the immediate caller.
//! None of them is expected in a correctly constructed scenario.

use thiserror::Error;

use crate::tax::Ceiling;

/// Errors raised by the projection and tax engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Year outside the simulation window
    #[error("year {year} is outside of simulation ({first}-{last})")]
    OutOfRange { year: i32, first: i32, last: i32 },

    /// Write to a bounded envelope outside its own window
    #[error("cannot set scale for {year} in envelope ({start}-{end})")]
    EnvelopeOutOfRange { year: i32, start: i32, end: i32 },

    /// Fixed-size collection is full
    #[error("too many {what} (capacity {capacity})")]
    CapacityExceeded { what: &'static str, capacity: usize },

    #[error("too many tax brackets (capacity {capacity})")]
    TooManyBrackets { capacity: usize },

    /// Brackets in one schedule must share the base year of the first bracket
    #[error("bracket base year {found} differs from schedule base year {expected}")]
    InconsistentBaseYear { expected: i32, found: i32 },

    /// Thresholds must strictly increase, and nothing may follow the unlimited bracket
    #[error("bracket threshold {threshold} does not follow the previous bracket")]
    BracketOutOfOrder { threshold: Ceiling },

    #[error("no matching bracket found in schedule '{schedule}'")]
    NoMatchingBracket { schedule: String },

    #[error("income tax requires a base rate schedule")]
    MissingBaseSchedule,
}

pub type Result<T> = std::result::Result<T, Error>;
