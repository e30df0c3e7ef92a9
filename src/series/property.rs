//! Real property: market and assessed value, tax basis, property tax and insurance

use std::rc::Rc;

use log::{trace, warn};

use super::{PropertyYear, TimeSeries};
use crate::error::Result;
use crate::rates::{rate_for, Rate};
use crate::simulation::{truncate, Amount, SimulationContext, YearTable};
use crate::tax::TaxRates;

/// Value added by improvements made during a year, visible from the next year on
#[derive(Debug, Clone, Copy, Default)]
struct ValueDelta {
    market: Amount,
    assessed: Amount,
}

#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    appreciation: Option<Rc<dyn Rate>>,
    assessment: Option<Rc<dyn Rate>>,
    /// Property tax schedule, applied to the assessed value
    tax_rates: Option<Rc<TaxRates>>,
    /// Insurance premium schedule, applied to the market value
    insurance_rates: Option<Rc<TaxRates>>,
    table: YearTable<PropertyYear>,
    deltas: Vec<ValueDelta>,
}

impl Property {
    pub fn new(name: impl Into<String>, ctx: SimulationContext) -> Self {
        Self {
            name: name.into(),
            appreciation: None,
            assessment: None,
            tax_rates: None,
            insurance_rates: None,
            table: YearTable::new(ctx, ctx.first_year()),
            deltas: vec![ValueDelta::default(); ctx.num_years()],
        }
    }

    pub fn with_appreciation(mut self, rate: Rc<dyn Rate>) -> Self {
        self.appreciation = Some(rate);
        self
    }

    pub fn with_assessment_rate(mut self, rate: Rc<dyn Rate>) -> Self {
        self.assessment = Some(rate);
        self
    }

    pub fn with_tax_rates(mut self, rates: Rc<TaxRates>) -> Self {
        self.tax_rates = Some(rates);
        self
    }

    pub fn with_insurance_rates(mut self, rates: Rc<TaxRates>) -> Self {
        self.insurance_rates = Some(rates);
        self
    }

    fn levy(schedule: Option<&TaxRates>, year: i32, amount: Amount) -> Amount {
        schedule.map_or(0, |rates| rates.tax_on(year, amount))
    }

    /// Fill in the tax and insurance that follow from a row's values
    fn with_levies(&self, year: i32, mut row: PropertyYear) -> PropertyYear {
        row.tax = Self::levy(self.tax_rates.as_deref(), year, row.assessed);
        row.insurance = Self::levy(self.insurance_rates.as_deref(), year, row.market);
        row
    }

    /// Set the 1 January values of `year`
    ///
    /// Years before `year` are computed first so the seed never leaves a gap.
    pub fn set_value(&mut self, year: i32, market: Amount, assessed: Amount, basis: Amount) -> Result<()> {
        if year > self.context().first_year() {
            self.compute(year - 1)?;
        }
        let mut row = self.table.row(year)?;
        row.market = market;
        row.assessed = assessed;
        row.basis = basis;
        let row = self.with_levies(year, row);
        self.table.seed(year, row)
    }

    /// Record an improvement made during `year`
    ///
    /// The cost adds to the tax basis, and the value deltas to the market and
    /// assessed values, from the following year on.
    pub fn improve(&mut self, year: i32, cost: Amount, market: Amount, assessed: Amount) -> Result<()> {
        let idx = self.context().index_of(year)?;
        self.table.row_mut(year)?.improvements += cost;
        self.deltas[idx].market += market;
        self.deltas[idx].assessed += assessed;
        if self.table.roll_back_to(year) {
            warn!("property {}: recomputing after {} for retroactive improvement", self.name, year);
        }
        Ok(())
    }
}

impl TimeSeries for Property {
    type Record = PropertyYear;

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
            let prev_year = self.table.computed_through();
            let this_year = prev_year + 1;
            let prev = self.table.row(prev_year)?;
            let delta = self.deltas[ctx.index_of(prev_year)?];

            let mut row = self.table.row(this_year)?;
            row.basis = prev.basis + prev.improvements;
            row.market = truncate(prev.market as f64 * (1.0 + rate_for(self.appreciation.as_deref(), this_year))) + delta.market;
            row.assessed = truncate(prev.assessed as f64 * (1.0 + rate_for(self.assessment.as_deref(), this_year))) + delta.assessed;
            let row = self.with_levies(this_year, row);

            trace!(
                "property {} {}: market={} assessed={} tax={} insurance={}",
                self.name, this_year, row.market, row.assessed, row.tax, row.insurance
            );
            self.table.set_row(this_year, row)?;
            self.table.mark_computed(this_year);
        }
        Ok(())
    }

    fn record(&mut self, year: i32) -> Result<PropertyYear> {
        self.compute(year)?;
        self.table.row(year)
    }

    fn set_seed(&mut self, year: i32, record: PropertyYear) -> Result<()> {
        self.table.seed(year, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::ConstantRate;
    use crate::series::PropertySeries;
    use crate::tax::Bracket;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert_eq, proptest};

    fn ctx() -> SimulationContext {
        SimulationContext::new(2020, 5)
    }

    fn flat(name: &str, rate: f64) -> Rc<TaxRates> {
        let mut rates = TaxRates::new(name);
        rates.add_bracket(2020, Bracket::unlimited(rate)).unwrap();
        Rc::new(rates)
    }

    #[test]
    fn test_market_and_assessed_grow_separately() {
        let mut house = Property::new("house", ctx())
            .with_appreciation(Rc::new(ConstantRate(0.05)))
            .with_assessment_rate(Rc::new(ConstantRate(0.02)));
        house.set_value(2020, 300_000, 250_000, 200_000).unwrap();

        assert_eq!(house.market_value(2021).unwrap(), 315_000);
        assert_eq!(house.assessed_value(2021).unwrap(), 255_000);
        assert_eq!(house.tax_basis(2024).unwrap(), 200_000);
    }

    #[test]
    fn test_improvement_shows_up_the_following_year() {
        let mut house = Property::new("house", ctx());
        house.set_value(2020, 300_000, 250_000, 200_000).unwrap();
        house.improve(2021, 50_000, 40_000, 30_000).unwrap();

        assert_eq!(house.improvements(2021).unwrap(), 50_000);
        assert_eq!(house.market_value(2021).unwrap(), 300_000);
        assert_eq!(house.market_value(2022).unwrap(), 340_000);
        assert_eq!(house.assessed_value(2022).unwrap(), 280_000);
        assert_eq!(house.tax_basis(2022).unwrap(), 250_000);
    }

    #[test]
    fn test_retroactive_improvement_recomputes() {
        let mut house = Property::new("house", ctx());
        house.set_value(2020, 100_000, 100_000, 100_000).unwrap();
        assert_eq!(house.market_value(2024).unwrap(), 100_000);

        house.improve(2022, 10_000, 10_000, 0).unwrap();
        assert_eq!(house.computed_through(), 2022);
        assert_eq!(house.market_value(2024).unwrap(), 110_000);
        assert_eq!(house.tax_basis(2024).unwrap(), 110_000);
    }

    #[test]
    fn test_tax_and_insurance() {
        let mut house = Property::new("house", ctx())
            .with_tax_rates(flat("property tax", 0.01))
            .with_insurance_rates(flat("insurance", 0.004));
        house.set_value(2020, 300_000, 250_000, 200_000).unwrap();

        assert_eq!(house.property_tax(2020).unwrap(), 2_500);
        assert_eq!(house.insurance(2020).unwrap(), 1_200);
        assert_eq!(house.property_tax(2023).unwrap(), 2_500);
    }

    #[test]
    fn test_late_seed_fills_earlier_years() {
        let mut house = Property::new("cabin", ctx()).with_appreciation(Rc::new(ConstantRate(0.10)));
        house.set_value(2020, 1_000, 1_000, 1_000).unwrap();
        house.set_value(2022, 5_000, 5_000, 5_000).unwrap();
        assert_eq!(house.market_value(2021).unwrap(), 1_100);
        assert_eq!(house.market_value(2023).unwrap(), 5_500);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_later_reads_do_not_change_earlier_years(
            market in 0i64..2_000_000,
            growth in -0.1f64..0.15,
            improvements in vec((2020i32..2025, 0i64..100_000), 0..4),
            y1 in 2020i32..2024,
            gap in 1i32..5
        ) {
            let y2 = (y1 + gap).min(2024);
            let mut house = Property::new("house", ctx())
                .with_appreciation(Rc::new(ConstantRate(growth)))
                .with_assessment_rate(Rc::new(ConstantRate(growth / 2.0)))
                .with_tax_rates(flat("property tax", 0.01));
            house.set_value(2020, market, market / 2, market).unwrap();
            for (year, cost) in improvements {
                house.improve(year, cost, cost / 2, cost / 4).unwrap();
            }

            let before: Vec<_> = (2020..=y1).map(|y| house.record(y).unwrap()).collect();
            house.record(y2).unwrap();
            let after: Vec<_> = (2020..=y1).map(|y| house.record(y).unwrap()).collect();
            prop_assert_eq!(before, after);
        }
    }
}
