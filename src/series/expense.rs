//! Expense with separate budget and actual growth

use std::rc::Rc;

use log::trace;

use super::{ExpenseYear, Snapshot, TimeSeries};
use crate::error::Result;
use crate::rates::{rate_for, scale_for, Envelope, Rate};
use crate::simulation::{truncate, Amount, SimulationContext, YearTable};

/// A distinct expense with its own value, growth rates and shape
///
/// The envelope can model expenses that only exist for some years or that
/// scale with some external load. Actual spending grows at its own rate when
/// one is given, otherwise at the budget rate.
#[derive(Debug, Clone)]
pub struct Expense {
    name: String,
    /// General category (e.g. discretionary / non-discretionary)
    category: String,
    envelope: Option<Rc<dyn Envelope>>,
    budget_rate: Option<Rc<dyn Rate>>,
    actual_rate: Option<Rc<dyn Rate>>,
    table: YearTable<ExpenseYear>,
}

impl Expense {
    pub fn new(name: impl Into<String>, category: impl Into<String>, ctx: SimulationContext) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            envelope: None,
            budget_rate: None,
            actual_rate: None,
            table: YearTable::new(ctx, ctx.first_year()),
        }
    }

    pub fn with_envelope(mut self, envelope: Rc<dyn Envelope>) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn with_budget_rate(mut self, rate: Rc<dyn Rate>) -> Self {
        self.budget_rate = Some(rate);
        self
    }

    pub fn with_actual_rate(mut self, rate: Rc<dyn Rate>) -> Self {
        self.actual_rate = Some(rate);
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn set_expense(&mut self, year: i32, actual: Amount, budget: Amount) -> Result<()> {
        self.set_seed(year, ExpenseYear { actual, budget })
    }

    /// Seed an expense whose actual spending matches its budget
    pub fn set_expense_simple(&mut self, year: i32, amount: Amount) -> Result<()> {
        self.set_expense(year, amount, amount)
    }
}

impl TimeSeries for Expense {
    type Record = ExpenseYear;

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

            let scale = scale_for(self.envelope.as_deref(), this_year);
            let budget_growth = rate_for(self.budget_rate.as_deref(), this_year);
            let actual_growth = match &self.actual_rate {
                Some(rate) => rate.rate_for_year(this_year),
                None => budget_growth,
            };

            let row = ExpenseYear {
                budget: truncate((1.0 + budget_growth) * scale * prev.budget as f64),
                actual: truncate((1.0 + actual_growth) * scale * prev.actual as f64),
            };
            trace!("expense {} {}: actual={} budget={}", self.name, this_year, row.actual, row.budget);
            self.table.set_row(this_year, row)?;
            self.table.mark_computed(this_year);
        }
        Ok(())
    }

    fn record(&mut self, year: i32) -> Result<ExpenseYear> {
        self.compute(year)?;
        self.table.row(year)
    }

    fn set_seed(&mut self, year: i32, record: ExpenseYear) -> Result<()> {
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
