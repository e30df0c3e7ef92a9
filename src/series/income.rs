//! Income stream with its own growth rate, shape and retirement contribution

use std::rc::Rc;

use log::trace;

use super::{IncomeYear, Snapshot, TimeSeries};
use crate::error::Result;
use crate::rates::{rate_for, scale_for, Envelope, Rate};
use crate::simulation::{truncate, Amount, SimulationContext, YearTable};

/// A single income source (salary, pension, social security, ...)
///
/// The first simulated year counts as computed from the start: it is zero
/// until seeded, and later years grow from it.
#[derive(Debug, Clone)]
pub struct Income {
    name: String,
    earner: String,
    envelope: Option<Rc<dyn Envelope>>,
    rate: Option<Rc<dyn Rate>>,
    /// Annual pre-tax retirement contribution
    annual_contribution: Amount,
    table: YearTable<IncomeYear>,
}

impl Income {
    pub fn new(name: impl Into<String>, earner: impl Into<String>, ctx: SimulationContext) -> Self {
        Self {
            name: name.into(),
            earner: earner.into(),
            envelope: None,
            rate: None,
            annual_contribution: 0,
            table: YearTable::new(ctx, ctx.first_year()),
        }
    }

    pub fn with_rate(mut self, rate: Rc<dyn Rate>) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_envelope(mut self, envelope: Rc<dyn Envelope>) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_contribution(mut self, annual: Amount) -> Self {
        self.annual_contribution = annual;
        self
    }

    pub fn earner(&self) -> &str {
        &self.earner
    }

    /// Seed one year's taxable income, SSI-eligible income and contribution
    pub fn set_income(&mut self, year: i32, taxable: Amount, ssi: Amount, contribution: Amount) -> Result<()> {
        self.set_seed(year, IncomeYear { taxable, ssi, contribution })
    }

    /// Seed a fully SSI-eligible income with the configured contribution
    pub fn set_income_simple(&mut self, year: i32, amount: Amount) -> Result<()> {
        self.set_income(year, amount, amount, self.annual_contribution)
    }
}

impl TimeSeries for Income {
    type Record = IncomeYear;

    fn name(&self) -> &str {
        &self.name
    }

    fn context(&self) -> &SimulationContext {
        self.table.context()
    }

    fn computed_through(&self) -> i32 {
        self.table.computed_through()
    }

    fn compute(&mut self, year: i32) -> Result<()> {
        self.table.context().index_of(year)?;

        while self.table.is_stale(year) {
            let prev_year = self.table.computed_through();
            let this_year = prev_year + 1;
            let prev = self.table.row(prev_year)?;

            let rate = rate_for(self.rate.as_deref(), this_year);
            let scale = scale_for(self.envelope.as_deref(), this_year);

            let taxable = truncate((1.0 + rate) * prev.taxable as f64 * scale);
            let contribution = if self.annual_contribution > 0 {
                truncate(self.annual_contribution as f64 * scale)
            } else {
                0
            };
            // SSI-eligible income tracks taxable income unless seeded apart from it
            let ssi = if prev.ssi == prev.taxable {
                taxable
            } else {
                truncate((1.0 + rate) * prev.ssi as f64 * scale)
            };

            trace!("income {} {}: taxable={} ssi={} contribution={}", self.name, this_year, taxable, ssi, contribution);
            self.table.set_row(this_year, IncomeYear { taxable, ssi, contribution })?;
            self.table.mark_computed(this_year);
        }
        Ok(())
    }

    fn record(&mut self, year: i32) -> Result<IncomeYear> {
        self.compute(year)?;
        self.table.row(year)
    }

    fn set_seed(&mut self, year: i32, record: IncomeYear) -> Result<()> {
        self.table.seed(year, record)
    }

    fn snapshot(&mut self, year: i32) -> Result<Option<Snapshot>> {
        self.table.context().index_of(year)?;
        if scale_for(self.envelope.as_deref(), year) == 0.0 {
            return Ok(None);
        }
        let record = self.record(year)?;
        Ok(Some(Snapshot::from_record(&self.name, year, &record)))
    }
}
