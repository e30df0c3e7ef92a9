//! Time-series entities: incomes, expenses, assets and real property
//!
//! Every entity keeps one record per simulated year and a watermark, the last
//! year whose stored values are known correct. Reading a year past the
//! watermark first extends the computation forward one year at a time from
//! the watermark, so values are computed lazily and memoized. Seeds and
//! retroactive edits move the watermark back so only later years are redone.
//!
//! Leaves own their storage and are owned by whoever built the scenario.
//! Composites share their children (`Shared`) and only ever read them.

mod asset;
mod composite;
mod expense;
mod income;
mod property;
mod record;
mod snapshot;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use asset::{Asset, AssetRates};
pub use composite::{Assets, Child, Composite, Expenses, Incomes, Properties};
pub use expense::Expense;
pub use income::Income;
pub use property::Property;
pub use record::{AssetYear, ExpenseYear, IncomeYear, PropertyYear, YearRecord};
pub use snapshot::Snapshot;

use crate::error::Result;
use crate::simulation::{Amount, SimulationContext};

/// Entity shared between its creator and the composites that aggregate it
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(entity: T) -> Shared<T> {
    Rc::new(RefCell::new(entity))
}

/// Capability shared by leaf entities and composites
pub trait TimeSeries: fmt::Debug {
    type Record: YearRecord;

    fn name(&self) -> &str;

    fn context(&self) -> &SimulationContext;

    /// Last year whose stored values are known correct
    fn computed_through(&self) -> i32;

    /// Extend the computation forward until values through `year` are known
    ///
    /// # Errors
    /// `OutOfRange` if `year` is outside the simulation
    fn compute(&mut self, year: i32) -> Result<()>;

    /// All fields for `year`, computing forward first if needed
    fn record(&mut self, year: i32) -> Result<Self::Record>;

    /// Assign the stored fields for `year` directly
    ///
    /// Years after `year` are invalidated and will be recomputed.
    fn set_seed(&mut self, year: i32, record: Self::Record) -> Result<()>;

    /// Snapshot of `year`, or `None` if the entity does not exist that year
    fn snapshot(&mut self, year: i32) -> Result<Option<Snapshot>> {
        let record = self.record(year)?;
        Ok(Some(Snapshot::from_record(self.name(), year, &record)))
    }
}

/// Named accessors for anything producing income records
pub trait IncomeSeries: TimeSeries<Record = IncomeYear> {
    fn taxable(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.taxable)
    }

    fn ssi(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.ssi)
    }

    fn contribution(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.contribution)
    }
}

impl<T: TimeSeries<Record = IncomeYear> + ?Sized> IncomeSeries for T {}

/// Named accessors for anything producing expense records
pub trait ExpenseSeries: TimeSeries<Record = ExpenseYear> {
    fn actual(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.actual)
    }

    fn budget(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.budget)
    }
}

impl<T: TimeSeries<Record = ExpenseYear> + ?Sized> ExpenseSeries for T {}

/// Named accessors for anything producing asset records
pub trait AssetSeries: TimeSeries<Record = AssetYear> {
    /// Value on 1 January
    fn value(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.value)
    }

    fn basis(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.basis)
    }

    fn interest(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.interest)
    }

    fn dividends(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.dividends)
    }

    fn short_gains(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.short_gains)
    }

    fn appreciation(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.appreciation)
    }

    fn purchases(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.purchases)
    }

    fn sales(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.sales)
    }

    fn tax_profit(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.tax_profit())
    }
}

impl<T: TimeSeries<Record = AssetYear> + ?Sized> AssetSeries for T {}

/// Named accessors for anything producing property records
pub trait PropertySeries: TimeSeries<Record = PropertyYear> {
    fn market_value(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.market)
    }

    fn assessed_value(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.assessed)
    }

    fn tax_basis(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.basis)
    }

    fn improvements(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.improvements)
    }

    fn property_tax(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.tax)
    }

    fn insurance(&mut self, year: i32) -> Result<Amount> {
        Ok(self.record(year)?.insurance)
    }
}

impl<T: TimeSeries<Record = PropertyYear> + ?Sized> PropertySeries for T {}
