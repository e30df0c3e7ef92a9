//! Graduated tax schedules with bracket inflation and rate creep
//!
//! A schedule is an optional minimum tax plus an ascending list of brackets.
//! Three independent inflation functions, compounded from the schedule's base
//! year, adjust the minimum tax, the bracket thresholds and the marginal rates.
//! Besides income tax, schedules also price property tax and insurance
//! (a base premium plus a rate on the insured value).

use std::fmt;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SimulationOptions;
use crate::error::{Error, Result};
use crate::rates::{compounded_for, Rate};
use crate::simulation::{truncate, Amount};

/// Upper end of a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ceiling {
    /// Highest amount (in base-year terms) taxed at this bracket's rate
    Limit(Amount),
    /// Final bracket, no upper bound
    Unlimited,
}

impl fmt::Display for Ceiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ceiling::Limit(amount) => write!(f, "{amount}"),
            Ceiling::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// A `(threshold, marginal rate)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub ceiling: Ceiling,
    pub rate: f64,
}

impl Bracket {
    pub fn new(top_income: Amount, marginal_rate: f64) -> Self {
        Self { ceiling: Ceiling::Limit(top_income), rate: marginal_rate }
    }

    pub fn unlimited(marginal_rate: f64) -> Self {
        Self { ceiling: Ceiling::Unlimited, rate: marginal_rate }
    }
}

/// Inflation factors for one year of a schedule
#[derive(Debug, Clone, Copy, PartialEq)]
struct Creep {
    base: f64,
    bracket: f64,
    rate: f64,
}

/// Minimum tax plus graduated brackets
#[derive(Debug, Clone)]
pub struct TaxRates {
    name: String,
    brackets: Vec<Bracket>,
    max_brackets: usize,
    /// Year of the first bracket added
    base_year: Option<i32>,
    base_creep: Option<Rc<dyn Rate>>,
    bracket_creep: Option<Rc<dyn Rate>>,
    rate_creep: Option<Rc<dyn Rate>>,
    min_tax: Amount,
}

impl TaxRates {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, &SimulationOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: &SimulationOptions) -> Self {
        Self {
            name: name.into(),
            brackets: Vec::new(),
            max_brackets: options.max_brackets,
            base_year: None,
            base_creep: None,
            bracket_creep: None,
            rate_creep: None,
            min_tax: 0,
        }
    }

    /// Inflation applied to the minimum tax
    pub fn with_base_creep(mut self, rate: Rc<dyn Rate>) -> Self {
        self.base_creep = Some(rate);
        self
    }

    /// Inflation applied to bracket thresholds
    pub fn with_bracket_creep(mut self, rate: Rc<dyn Rate>) -> Self {
        self.bracket_creep = Some(rate);
        self
    }

    /// Inflation applied to marginal rates
    pub fn with_rate_creep(mut self, rate: Rc<dyn Rate>) -> Self {
        self.rate_creep = Some(rate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn base_year(&self) -> Option<i32> {
        self.base_year
    }

    /// Append a bracket whose thresholds are stated in `base_year` terms
    ///
    /// # Errors
    /// * `TooManyBrackets` past the configured capacity
    /// * `InconsistentBaseYear` if `base_year` differs from the first bracket's
    /// * `BracketOutOfOrder` if the threshold does not exceed the previous one,
    ///   or the schedule already ends with an unlimited bracket
    pub fn add_bracket(&mut self, base_year: i32, bracket: Bracket) -> Result<()> {
        if self.brackets.len() >= self.max_brackets {
            return Err(Error::TooManyBrackets { capacity: self.max_brackets });
        }
        if let Some(expected) = self.base_year {
            if expected != base_year {
                return Err(Error::InconsistentBaseYear { expected, found: base_year });
            }
        }
        if let Some(last) = self.brackets.last() {
            let ordered = match (last.ceiling, bracket.ceiling) {
                (Ceiling::Unlimited, _) => false,
                (Ceiling::Limit(_), Ceiling::Unlimited) => true,
                (Ceiling::Limit(prev), Ceiling::Limit(next)) => next > prev,
            };
            if !ordered {
                return Err(Error::BracketOutOfOrder { threshold: bracket.ceiling });
            }
        }

        self.base_year = Some(base_year);
        self.brackets.push(bracket);
        Ok(())
    }

    /// Base-year minimum tax, charged even on a zero amount
    /// (e.g. the fixed part of a property insurance premium)
    pub fn set_minimum_tax(&mut self, amount: Amount) {
        self.min_tax = amount;
    }

    /// Inflation factors compounded from the base year through `year - 1`
    fn creep(&self, year: i32) -> Creep {
        let base_year = self.base_year.unwrap_or(year);
        Creep {
            base: compounded_for(self.base_creep.as_deref(), base_year, year - 1),
            bracket: compounded_for(self.bracket_creep.as_deref(), base_year, year - 1),
            rate: compounded_for(self.rate_creep.as_deref(), base_year, year - 1),
        }
    }

    /// Marginal rate that applies to `total` in `year`
    ///
    /// Returns the rate of the first bracket whose inflated threshold is at
    /// least `total`. An amount above every threshold takes the final
    /// bracket's rate.
    ///
    /// # Errors
    /// `NoMatchingBracket` if the schedule has no brackets
    pub fn marginal_rate(&self, year: i32, total: Amount) -> Result<f64> {
        let last = self.brackets.last().ok_or_else(|| Error::NoMatchingBracket {
            schedule: self.name.clone(),
        })?;
        let creep = self.creep(year);

        for bracket in &self.brackets {
            match bracket.ceiling {
                Ceiling::Unlimited => return Ok(creep.rate * bracket.rate),
                Ceiling::Limit(top) => {
                    if top as f64 * creep.bracket >= total as f64 {
                        return Ok(creep.rate * bracket.rate);
                    }
                }
            }
        }
        Ok(creep.rate * last.rate)
    }

    /// Tax on `amount` in `year`
    ///
    /// Each bracket taxes the slice of `amount` between the previous bracket's
    /// inflated ceiling and its own; each slice's tax is truncated before it
    /// is added to the total.
    pub fn tax_on(&self, year: i32, amount: Amount) -> Amount {
        let creep = self.creep(year);
        debug!(
            "tax={} year={} amount={} base={:.6} bracket={:.6} rate={:.6}",
            self.name, year, amount, creep.base, creep.bracket, creep.rate
        );

        let mut tax = if self.min_tax > 0 {
            truncate(self.min_tax as f64 * creep.base)
        } else {
            0
        };

        let mut taxed_so_far: Amount = 0;
        for bracket in &self.brackets {
            if taxed_so_far >= amount {
                break;
            }

            // how much of the amount falls at or below this bracket's ceiling
            let subject = match bracket.ceiling {
                Ceiling::Unlimited => amount,
                Ceiling::Limit(top) => {
                    let max = top as f64 * creep.bracket;
                    if max < amount as f64 { truncate(max) } else { amount }
                }
            };

            let rate = bracket.rate * creep.rate;
            let slice_tax = truncate(rate * (subject - taxed_so_far) as f64);
            debug!("    subject={} rate={:.6} tax={}", subject - taxed_so_far, rate, slice_tax);
            tax += slice_tax;
            taxed_so_far = subject;
        }

        debug!("    total_tax={}", tax);
        tax
    }
}
