//! Investment with its own yield and growth profile
//!
//! Yields (interest, dividends, short-term gains) and appreciation are earned
//! on the year's mean balance: the 1 January value plus half of the year's
//! net purchases. The next 1 January value adds appreciation and net
//! purchases, plus the yields when they are reinvested.

use std::rc::Rc;

use log::{trace, warn};

use super::{AssetYear, Snapshot, TimeSeries};
use crate::error::Result;
use crate::rates::{rate_for, Rate};
use crate::simulation::{truncate, Amount, SimulationContext, YearTable};

/// Yield and growth functions of an asset; absent functions mean zero
#[derive(Debug, Clone, Default)]
pub struct AssetRates {
    pub interest: Option<Rc<dyn Rate>>,
    pub dividends: Option<Rc<dyn Rate>>,
    pub short_gains: Option<Rc<dyn Rate>>,
    pub appreciation: Option<Rc<dyn Rate>>,
}

/// Simulated investment account or holding
///
/// The watermark is the last year whose flows are known, so a fresh asset
/// starts one year before the simulation. Knowing a year's flows also fixes
/// the following year's opening value and basis.
#[derive(Debug, Clone)]
pub struct Asset {
    name: String,
    rates: AssetRates,
    reinvest: bool,
    table: YearTable<AssetYear>,
    /// Years whose flows were set explicitly and must not be re-derived
    pinned: Vec<bool>,
}

impl Asset {
    pub fn new(name: impl Into<String>, ctx: SimulationContext) -> Self {
        Self {
            name: name.into(),
            rates: AssetRates::default(),
            reinvest: false,
            table: YearTable::new(ctx, ctx.first_year() - 1),
            pinned: vec![false; ctx.num_years()],
        }
    }

    pub fn with_rates(mut self, rates: AssetRates) -> Self {
        self.rates = rates;
        self
    }

    /// Reinvest interest, dividends and short-term gains
    pub fn with_reinvest(mut self, reinvest: bool) -> Self {
        self.reinvest = reinvest;
        self
    }

    /// A bond pays interest on its face value each year and repays the
    /// principal (as a sale) in its due year.
    ///
    /// A bond bought before the simulation is held from its first year. A
    /// bond that matures before the simulation or is bought after it holds
    /// nothing.
    pub fn bond(
        name: impl Into<String>,
        face: Amount,
        basis: Amount,
        interest: Option<Rc<dyn Rate>>,
        purchase_year: i32,
        due_year: i32,
        ctx: SimulationContext,
    ) -> Result<Self> {
        let mut bond = Self::new(name, ctx).with_rates(AssetRates {
            interest: interest.clone(),
            ..Default::default()
        });

        if due_year < ctx.first_year() || purchase_year > ctx.last_year() {
            return Ok(bond);
        }

        let held_from = purchase_year.max(ctx.first_year());
        bond.set_value(held_from, face, basis)?;
        if ctx.contains(due_year) {
            bond.sell(due_year, face, basis)?;
        }
        for year in held_from..=due_year.min(ctx.last_year()) {
            let coupon = truncate(face as f64 * rate_for(interest.as_deref(), year));
            bond.set_returns(year, coupon, 0, 0, 0)?;
        }
        Ok(bond)
    }

    /// Invalidate flows from `year` on after a retroactive change
    fn invalidate_from(&mut self, year: i32) {
        if self.table.roll_back_to(year - 1) {
            warn!("asset {}: recomputing from {} after retroactive change", self.name, year);
        }
    }

    /// Set the 1 January value and basis of `year`
    ///
    /// That year's flows, and everything after it, are recomputed from the
    /// new balance.
    pub fn set_value(&mut self, year: i32, value: Amount, basis: Amount) -> Result<()> {
        let row = self.table.row_mut(year)?;
        row.value = value;
        row.basis = basis;
        self.table.mark_computed(year - 1);
        Ok(())
    }

    /// Add purchases made during `year`
    pub fn buy(&mut self, year: i32, amount: Amount) -> Result<()> {
        self.table.row_mut(year)?.purchases += amount;
        self.invalidate_from(year);
        Ok(())
    }

    /// Set the sales made during `year` and their cost basis
    pub fn sell(&mut self, year: i32, amount: Amount, basis: Amount) -> Result<()> {
        let row = self.table.row_mut(year)?;
        row.sales = amount;
        row.sales_basis = basis;
        self.invalidate_from(year);
        Ok(())
    }

    /// Add sales made during `year`, with a cost basis pro-rated from the
    /// year's opening basis-to-value ratio
    pub fn sell_at_average_basis(&mut self, year: i32, amount: Amount) -> Result<()> {
        if year > self.context().first_year() {
            self.compute(year - 1)?;
        }
        let row = self.table.row_mut(year)?;
        let basis_fraction = if row.value > 0 {
            row.basis as f64 / row.value as f64
        } else {
            1.0
        };
        row.sales += amount;
        row.sales_basis += truncate(basis_fraction * amount as f64);
        self.invalidate_from(year);
        Ok(())
    }

    /// Pin `year`'s flows to explicit values instead of deriving them
    pub fn set_returns(
        &mut self,
        year: i32,
        interest: Amount,
        dividends: Amount,
        short_gains: Amount,
        appreciation: Amount,
    ) -> Result<()> {
        let idx = self.context().index_of(year)?;
        let row = self.table.row_mut(year)?;
        row.interest = interest;
        row.dividends = dividends;
        row.short_gains = short_gains;
        row.appreciation = appreciation;
        self.pinned[idx] = true;
        self.invalidate_from(year);
        Ok(())
    }
}

impl TimeSeries for Asset {
    type Record = AssetYear;

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
        let ctx = *self.table.context();
        ctx.index_of(year)?;

        while self.table.is_stale(year) {
            let this_year = self.table.computed_through() + 1;
            let idx = ctx.index_of(this_year)?;
            let mut row = self.table.row(this_year)?;

            if !self.pinned[idx] {
                let mean = row.value + (row.purchases - row.sales) / 2;
                let earned = |rate: &Option<Rc<dyn Rate>>| truncate(mean as f64 * rate_for(rate.as_deref(), this_year));
                row.interest = earned(&self.rates.interest);
                row.dividends = earned(&self.rates.dividends);
                row.short_gains = earned(&self.rates.short_gains);
                row.appreciation = earned(&self.rates.appreciation);
                self.table.set_row(this_year, row)?;
            }

            if this_year < ctx.last_year() {
                let mut value = row.value + row.appreciation + row.purchases - row.sales;
                let mut basis = row.basis + row.purchases - row.sales_basis;
                if self.reinvest {
                    let yields = row.interest + row.dividends + row.short_gains;
                    value += yields;
                    basis += yields;
                }
                let next = self.table.row_mut(this_year + 1)?;
                next.value = value;
                next.basis = basis;
            }

            trace!(
                "asset {} {}: value={} int={} div={} stg={} growth={}",
                self.name, this_year, row.value, row.interest, row.dividends, row.short_gains, row.appreciation
            );
            self.table.mark_computed(this_year);
        }
        Ok(())
    }

    fn record(&mut self, year: i32) -> Result<AssetYear> {
        self.compute(year)?;
        self.table.row(year)
    }

    /// Seed opening balances, transactions and pinned flows for `year`
    fn set_seed(&mut self, year: i32, record: AssetYear) -> Result<()> {
        let idx = self.context().index_of(year)?;
        self.table.set_row(year, record)?;
        self.pinned[idx] = true;
        self.table.mark_computed(year - 1);
        Ok(())
    }

    fn snapshot(&mut self, year: i32) -> Result<Option<Snapshot>> {
        let record = self.record(year)?;
        if record.value <= 0 {
            return Ok(None);
        }
        Ok(Some(Snapshot::from_record(&self.name, year, &record)))
    }
}
