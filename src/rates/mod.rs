//! Rate and shaping functions that drive year-over-year change

mod envelope;
mod rate;

pub use envelope::{scale_for, BoundedEnvelope, Envelope};
pub use rate::{compounded_for, rate_for, ConstantRate, PiecewiseRate, Rate, YearlyRate};
