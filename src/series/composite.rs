//! Aggregates that sum the records of their children year by year

use log::{debug, warn};

use super::{AssetYear, ExpenseYear, IncomeYear, PropertyYear, Shared, TimeSeries, YearRecord};
use crate::config::SimulationOptions;
use crate::error::{Error, Result};
use crate::simulation::{SimulationContext, YearTable};

/// Child of a composite: a leaf or another composite of the same kind
pub type Child<R> = Shared<dyn TimeSeries<Record = R>>;

/// A collection of entities that behaves like a single entity of their kind
///
/// Each year's record is the field-wise sum of the children's records for
/// that year. The composite keeps its own watermark; children are only read.
/// When a child is edited retroactively, call [`Composite::invalidate`] so
/// the affected totals are aggregated again.
#[derive(Debug)]
pub struct Composite<R: YearRecord> {
    name: String,
    children: Vec<Child<R>>,
    capacity: usize,
    table: YearTable<R>,
}

pub type Incomes = Composite<IncomeYear>;
pub type Expenses = Composite<ExpenseYear>;
pub type Assets = Composite<AssetYear>;
pub type Properties = Composite<PropertyYear>;

impl<R: YearRecord> Composite<R> {
    pub fn new(name: impl Into<String>, ctx: SimulationContext) -> Self {
        Self::with_options(name, ctx, &SimulationOptions::default())
    }

    pub fn with_options(name: impl Into<String>, ctx: SimulationContext, options: &SimulationOptions) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            capacity: options.max_children,
            table: YearTable::new(ctx, ctx.first_year() - 1),
        }
    }

    /// Append a child; children are reported in insertion order
    ///
    /// # Errors
    /// `CapacityExceeded` once the composite holds `max_children` children
    pub fn add_child(&mut self, child: Child<R>) -> Result<()> {
        if self.children.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                what: R::COLLECTION,
                capacity: self.capacity,
            });
        }
        self.children.push(child);
        self.table.roll_back_to(self.table.context().first_year() - 1);
        Ok(())
    }

    pub fn children(&self) -> impl Iterator<Item = &Child<R>> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Aggregate `year` and later again on the next read
    pub fn invalidate(&mut self, year: i32) {
        if self.table.roll_back_to(year - 1) {
            warn!("{} {}: totals from {} invalidated", R::KIND, self.name, year);
        }
    }
}

impl<R: YearRecord> TimeSeries for Composite<R> {
    type Record = R;

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
            let this_year = self.table.computed_through() + 1;
            let mut total = R::default();
            for child in &self.children {
                total = total + child.borrow_mut().record(this_year)?;
            }
            debug!("{} {} {}: {:?}", R::KIND, self.name, this_year, total);
            self.set_seed(this_year, total)?;
        }
        Ok(())
    }

    fn record(&mut self, year: i32) -> Result<R> {
        self.compute(year)?;
        self.table.row(year)
    }

    /// Store an aggregated total; children are left untouched
    fn set_seed(&mut self, year: i32, record: R) -> Result<()> {
        self.table.seed(year, record)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::rates::ConstantRate;
    use crate::series::{shared, Asset, AssetRates, AssetSeries, Expense, ExpenseSeries, Income, IncomeSeries};
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert_eq, proptest};

    fn ctx() -> SimulationContext {
        SimulationContext::new(2020, 5)
    }

    #[test]
    fn test_assets_sum_children() {
        let a = shared(Asset::new("a", ctx()).with_rates(AssetRates {
            appreciation: Some(Rc::new(ConstantRate(0.0))),
            ..Default::default()
        }));
        let b = shared(Asset::new("b", ctx()));
        a.borrow_mut().set_value(2020, 100, 100).unwrap();
        b.borrow_mut().set_value(2020, 200, 200).unwrap();

        let mut assets = Assets::new("portfolio", ctx());
        assets.add_child(a.clone()).unwrap();
        assets.add_child(b.clone()).unwrap();

        assert_eq!(assets.value(2020).unwrap(), 300);
        assert_eq!(assets.value(2022).unwrap(), 300);
        for year in ctx().years() {
            let expected = a.borrow_mut().value(year).unwrap() + b.borrow_mut().value(year).unwrap();
            assert_eq!(assets.value(year).unwrap(), expected);
        }
    }

    #[test]
    fn test_capacity() {
        let options = SimulationOptions { max_children: 2, ..Default::default() };
        let mut expenses = Expenses::with_options("household", ctx(), &options);
        for name in ["rent", "food"] {
            expenses.add_child(shared(Expense::new(name, "living", ctx()))).unwrap();
        }
        let err = expenses.add_child(shared(Expense::new("travel", "fun", ctx()))).unwrap_err();
        assert_eq!(err, Error::CapacityExceeded { what: "expenses", capacity: 2 });
        assert_eq!(expenses.len(), 2);
        let names: Vec<String> = expenses.children().map(|c| c.borrow().name().to_string()).collect();
        assert_eq!(names, ["rent", "food"]);
    }

    #[test]
    fn test_composites_nest() {
        let salary = shared(Income::new("salary", "pat", ctx()).with_rate(Rc::new(ConstantRate(0.10))));
        let pension = shared(Income::new("pension", "sam", ctx()));
        salary.borrow_mut().set_income_simple(2020, 1_000).unwrap();
        pension.borrow_mut().set_income_simple(2020, 500).unwrap();

        let mut pat = Incomes::new("pat", ctx());
        pat.add_child(salary).unwrap();
        let mut household = Incomes::new("household", ctx());
        household.add_child(shared(pat)).unwrap();
        household.add_child(pension).unwrap();

        assert_eq!(household.taxable(2021).unwrap(), 1_600);
        assert_eq!(household.ssi(2021).unwrap(), 1_600);
    }

    #[test]
    fn test_invalidate_after_child_edit() {
        let rent = shared(Expense::new("rent", "living", ctx()));
        rent.borrow_mut().set_expense_simple(2020, 1_000).unwrap();
        let mut expenses = Expenses::new("household", ctx());
        expenses.add_child(rent.clone()).unwrap();
        assert_eq!(expenses.actual(2024).unwrap(), 1_000);

        rent.borrow_mut().set_expense_simple(2022, 2_000).unwrap();
        assert_eq!(expenses.actual(2024).unwrap(), 1_000);
        expenses.invalidate(2022);
        assert_eq!(expenses.actual(2021).unwrap(), 1_000);
        assert_eq!(expenses.actual(2024).unwrap(), 2_000);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_total_is_sum_of_children(
            seeds in vec((0i64..1_000_000, -0.05f64..0.1), 1..6)
        ) {
            let children: Vec<_> = seeds
                .iter()
                .enumerate()
                .map(|(i, &(seed, rate))| {
                    let mut income = Income::new(format!("income {i}"), "pat", ctx()).with_rate(Rc::new(ConstantRate(rate)));
                    income.set_income_simple(2020, seed).unwrap();
                    shared(income)
                })
                .collect();

            let mut incomes = Incomes::new("all", ctx());
            for child in &children {
                incomes.add_child(child.clone()).unwrap();
            }
            for year in ctx().years() {
                let expected: i64 = children.iter().map(|c| c.borrow_mut().taxable(year).unwrap()).sum();
                prop_assert_eq!(incomes.taxable(year).unwrap(), expected);
            }
        }

        #[test]
        fn prop_later_reads_do_not_change_earlier_totals(
            holdings in vec((0i64..500_000, -0.1f64..0.15, 0i64..20_000), 1..4),
            y1 in 2020i32..2024,
            gap in 1i32..5
        ) {
            let y2 = (y1 + gap).min(2024);
            let mut assets = Assets::new("portfolio", ctx());
            for (i, &(opening, growth, yearly_buy)) in holdings.iter().enumerate() {
                let mut asset = Asset::new(format!("asset {i}"), ctx()).with_rates(AssetRates {
                    appreciation: Some(Rc::new(ConstantRate(growth))),
                    ..Default::default()
                });
                asset.set_value(2020, opening, opening).unwrap();
                for year in ctx().years() {
                    asset.buy(year, yearly_buy).unwrap();
                }
                assets.add_child(shared(asset)).unwrap();
            }

            let before: Vec<_> = (2020..=y1).map(|y| assets.record(y).unwrap()).collect();
            assets.record(y2).unwrap();
            let after: Vec<_> = (2020..=y1).map(|y| assets.record(y).unwrap()).collect();
            prop_assert_eq!(before, after);
        }
    }
}
