//! Growth rate functions
//!
//! A rate maps a year to a fractional growth rate (typically -0.20 to +0.20).
//! Incomes, expenses, asset yields, property appreciation and tax-table
//! inflation are all driven through this one abstraction. A rate may be
//! constant, shaped, or replayed from a sampled series, but it must always
//! return the same value for the same year.

use std::collections::BTreeMap;
use std::fmt;

/// Year to growth-rate function
pub trait Rate: fmt::Debug {
    /// Growth rate in effect for `year`
    fn rate_for_year(&self, year: i32) -> f64;

    /// Product of `(1 + rate)` over `start..=end`; 1.0 for an empty range
    fn compounded(&self, start: i32, end: i32) -> f64 {
        (start..=end).fold(1.0, |factor, year| factor * (1.0 + self.rate_for_year(year)))
    }
}

/// Rate for `year`, treating an absent rate function as zero growth
pub fn rate_for(rate: Option<&dyn Rate>, year: i32) -> f64 {
    rate.map_or(0.0, |r| r.rate_for_year(year))
}

/// Compounded factor, treating an absent rate function as no growth
pub fn compounded_for(rate: Option<&dyn Rate>, start: i32, end: i32) -> f64 {
    rate.map_or(1.0, |r| r.compounded(start, end))
}

/// Flat rate for every year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRate(pub f64);

impl Rate for ConstantRate {
    fn rate_for_year(&self, _year: i32) -> f64 {
        self.0
    }
}

/// Piecewise-constant rate
///
/// Starts at `initial` and switches to a new rate at each pivot year.
/// The switch takes effect in the pivot year itself, so the rate for a year
/// belongs to the segment whose pivot is the smallest pivot after that year.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseRate {
    initial: f64,
    /// (pivot year, rate from that year on), ascending by pivot
    changes: Vec<(i32, f64)>,
}

impl PiecewiseRate {
    pub fn new(initial: f64, mut changes: Vec<(i32, f64)>) -> Self {
        changes.sort_by_key(|(pivot, _)| *pivot);
        Self { initial, changes }
    }

    /// `rate_1` before `year_2`, `rate_2` from then on (e.g. rising, then flat)
    pub fn two(rate_1: f64, year_2: i32, rate_2: f64) -> Self {
        Self::new(rate_1, vec![(year_2, rate_2)])
    }

    /// Three segments (e.g. rising, flat, falling)
    pub fn three(rate_1: f64, year_2: i32, rate_2: f64, year_3: i32, rate_3: f64) -> Self {
        Self::new(rate_1, vec![(year_2, rate_2), (year_3, rate_3)])
    }
}

impl Rate for PiecewiseRate {
    fn rate_for_year(&self, year: i32) -> f64 {
        self.changes
            .iter()
            .rev()
            .find(|(pivot, _)| year >= *pivot)
            .map_or(self.initial, |(_, rate)| *rate)
    }
}

/// Explicit per-year rates, zero for any year not listed
///
/// Useful for replaying a historical or pre-sampled series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearlyRate {
    rates: BTreeMap<i32, f64>,
}

impl YearlyRate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, year: i32, rate: f64) {
        self.rates.insert(year, rate);
    }
}

impl FromIterator<(i32, f64)> for YearlyRate {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        Self { rates: iter.into_iter().collect() }
    }
}

impl Rate for YearlyRate {
    fn rate_for_year(&self, year: i32) -> f64 {
        self.rates.get(&year).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn test_constant_rate() {
        let rate = ConstantRate(0.03);
        assert_eq!(rate.rate_for_year(1999), 0.03);
        assert_relative_eq!(rate.compounded(2020, 2021), 1.03 * 1.03);
    }

    #[test]
    fn test_empty_range_compounds_to_one() {
        let rate = ConstantRate(0.5);
        assert_eq!(rate.compounded(2022, 2021), 1.0);
        assert_eq!(compounded_for(None, 2020, 2030), 1.0);
        assert_eq!(rate_for(None, 2020), 0.0);
    }

    #[test]
    fn test_piecewise_switches_at_pivot() {
        let rate = PiecewiseRate::three(0.05, 2025, 0.03, 2030, -0.01);
        assert_eq!(rate.rate_for_year(2024), 0.05);
        assert_eq!(rate.rate_for_year(2025), 0.03);
        assert_eq!(rate.rate_for_year(2029), 0.03);
        assert_eq!(rate.rate_for_year(2030), -0.01);
        assert_eq!(rate.rate_for_year(2090), -0.01);
    }

    #[test]
    fn test_piecewise_sorts_changes() {
        let rate = PiecewiseRate::new(0.0, vec![(2030, 0.2), (2025, 0.1)]);
        assert_eq!(rate.rate_for_year(2027), 0.1);
        assert_eq!(rate.rate_for_year(2031), 0.2);
    }

    #[test]
    fn test_yearly_rate_defaults_to_zero() {
        let rate: YearlyRate = [(2020, 0.1), (2022, -0.05)].into_iter().collect();
        assert_eq!(rate.rate_for_year(2020), 0.1);
        assert_eq!(rate.rate_for_year(2021), 0.0);
        assert_relative_eq!(rate.compounded(2020, 2022), 1.1 * 0.95);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_compounded_single_year_is_one_plus_rate(
            initial in -0.2f64..0.2,
            later in -0.2f64..0.2,
            pivot in 2000i32..2050,
            year in 1990i32..2060
        ) {
            let rate = PiecewiseRate::two(initial, pivot, later);
            let expected = 1.0 + rate.rate_for_year(year);
            prop_assert!((rate.compounded(year, year) - expected).abs() < 1e-12);
        }

        #[test]
        fn prop_compounded_splits_at_any_year(
            initial in -0.2f64..0.2,
            later in -0.2f64..0.2,
            pivot in 2000i32..2050,
            y1 in 1990i32..2040,
            span_a in 0i32..15,
            span_b in 1i32..15
        ) {
            let rate = PiecewiseRate::two(initial, pivot, later);
            let y2 = y1 + span_a;
            let y3 = y2 + span_b;
            let whole = rate.compounded(y1, y3);
            let split = rate.compounded(y1, y2) * rate.compounded(y2 + 1, y3);
            prop_assert!((whole - split).abs() <= 1e-9 * whole.abs().max(1.0));
        }
    }
}
