//! Per-year field records of each entity kind
//!
//! A record holds every reportable field of one entity for one year. Leaves
//! produce records, composites add their children's records together.

use std::fmt;
use std::ops::Add;

use serde::Serialize;

use crate::simulation::Amount;

/// All reportable fields of one entity kind for one year
pub trait YearRecord: Copy + Default + Add<Output = Self> + PartialEq + fmt::Debug + 'static {
    /// Entity kind, used in snapshots
    const KIND: &'static str;
    /// What a collection of this kind holds, used in capacity errors
    const COLLECTION: &'static str;

    /// Field names and amounts in reporting order
    fn fields(&self) -> Vec<(&'static str, Amount)>;
}

macro_rules! year_record {
    ($record:ident, $kind:literal, $collection:literal, { $($field:ident),+ $(,)? }) => {
        impl Add for $record {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                Self { $($field: self.$field + other.$field),+ }
            }
        }

        impl YearRecord for $record {
            const KIND: &'static str = $kind;
            const COLLECTION: &'static str = $collection;

            fn fields(&self) -> Vec<(&'static str, Amount)> {
                vec![$((stringify!($field), self.$field)),+]
            }
        }
    };
}

/// Income source fields for one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncomeYear {
    /// Total taxable income
    pub taxable: Amount,
    /// Portion subject to social security withholding
    pub ssi: Amount,
    /// Pre-tax retirement contribution
    pub contribution: Amount,
}

year_record!(IncomeYear, "income", "income sources", { taxable, ssi, contribution });

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseYear {
    pub actual: Amount,
    pub budget: Amount,
}

year_record!(ExpenseYear, "expense", "expenses", { actual, budget });

/// Investment fields for one year
///
/// `value` and `basis` are opening balances on 1 January, everything else
/// is a flow during the year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetYear {
    pub value: Amount,
    pub basis: Amount,
    pub interest: Amount,
    pub dividends: Amount,
    /// Short-term gains distributions
    pub short_gains: Amount,
    /// Unrealized appreciation
    pub appreciation: Amount,
    pub purchases: Amount,
    pub sales: Amount,
    /// Cost basis of the year's sales
    pub sales_basis: Amount,
}

year_record!(AssetYear, "asset", "assets", {
    value,
    basis,
    interest,
    dividends,
    short_gains,
    appreciation,
    purchases,
    sales,
    sales_basis,
});

impl AssetYear {
    /// Taxable profit on the year's sales
    pub fn tax_profit(&self) -> Amount {
        self.sales - self.sales_basis
    }
}

/// Real property fields for one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropertyYear {
    /// Market value on 1 January
    pub market: Amount,
    /// Assessed value on 1 January
    pub assessed: Amount,
    pub basis: Amount,
    /// Cost of improvements made during the year
    pub improvements: Amount,
    pub tax: Amount,
    pub insurance: Amount,
}

year_record!(PropertyYear, "property", "properties", {
    market,
    assessed,
    basis,
    improvements,
    tax,
    insurance,
});
