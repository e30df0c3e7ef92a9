//! General purpose income tax engine
//!
//! Driven by rate schedules and pre/post tax deduction parameters, general
//! enough to approximate most income taxes:
//!  1. subtract built-in pre-tax deductions
//!  2. subtract the year's itemized deductions (or the standard deduction)
//!  3. compute the tax from the base schedule
//!  4. subtract built-in post-tax credits and the year's credits
//!
//! Complications: an allowance of tax-free interest, capital loss
//! carryforward, and preferential rates for qualified dividends and long-term
//! gains. The preferential schedules are never used to compute an absolute
//! tax, only to look up the marginal rate at the year's taxable income.
//!
//! The carried-loss ledger is state carried across years, so one engine must
//! be assessed for strictly increasing years within one simulation pass.

use std::rc::Rc;

use log::{debug, warn};
use serde::Serialize;

use super::TaxRates;
use crate::config::SimulationOptions;
use crate::error::{Error, Result};
use crate::rates::{compounded_for, Rate};
use crate::simulation::{truncate, Amount, SimulationContext};

/// One taxpayer's amounts for one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaxableAmounts {
    /// All income not eligible for preferential treatment
    pub ordinary_income: Amount,
    pub interest: Amount,
    pub qualified_dividends: Amount,
    pub long_term_gains: Amount,
    /// Itemized deductions, used when they beat the standard deduction
    pub itemized_deductions: Amount,
    /// Credits beyond the built-in post-tax credit
    pub credits: Amount,
}

/// Breakdown of one year's income tax
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxAssessment {
    pub year: i32,
    /// Adjusted gross income: ordinary income plus everything folded into it
    pub agi: Amount,
    /// Standard (or itemized) plus pre-tax deduction
    pub deduction: Amount,
    pub taxable_income: Amount,
    pub base_tax: Amount,
    pub dividend_tax: f64,
    pub gains_tax: f64,
    /// Built-in post-tax credit plus the year's credits
    pub credits: Amount,
    pub total: Amount,
}

/// Builder for [`IncomeTax`]; the base schedule is mandatory
#[derive(Debug, Clone)]
pub struct IncomeTaxBuilder {
    ctx: SimulationContext,
    schedule: Option<TaxRates>,
    dividend_rates: Option<TaxRates>,
    gains_rates: Option<TaxRates>,
    standard_deduction: Amount,
    inflation: Option<Rc<dyn Rate>>,
    options: SimulationOptions,
}

impl IncomeTaxBuilder {
    pub fn schedule(mut self, schedule: TaxRates) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Preferential schedule for qualified dividends
    pub fn dividend_rates(mut self, rates: TaxRates) -> Self {
        self.dividend_rates = Some(rates);
        self
    }

    /// Preferential schedule for long-term gains
    pub fn gains_rates(mut self, rates: TaxRates) -> Self {
        self.gains_rates = Some(rates);
        self
    }

    pub fn standard_deduction(mut self, amount: Amount) -> Self {
        self.standard_deduction = amount;
        self
    }

    /// Inflation for the standard deduction, pre-tax deduction and post-tax
    /// credit (but not for tax-free interest or the deductible loss cap)
    pub fn inflation(mut self, rate: Rc<dyn Rate>) -> Self {
        self.inflation = Some(rate);
        self
    }

    pub fn options(mut self, options: &SimulationOptions) -> Self {
        self.options = options.clone();
        self
    }

    /// # Errors
    /// `MissingBaseSchedule` if no base schedule was supplied
    pub fn build(self) -> Result<IncomeTax> {
        let schedule = self.schedule.ok_or(Error::MissingBaseSchedule)?;
        Ok(IncomeTax {
            ctx: self.ctx,
            schedule,
            dividend_rates: self.dividend_rates,
            gains_rates: self.gains_rates,
            pre_tax_deduction: 0,
            post_tax_credit: 0,
            free_interest: 0,
            standard_deduction: self.standard_deduction,
            max_deductible_loss: 0,
            inflation: self.inflation,
            losses: vec![0; self.ctx.num_years() + 1],
            tax_preferential_gains: self.options.tax_preferential_gains,
            last_assessed: None,
        })
    }
}

/// Income tax engine for one taxpayer
#[derive(Debug, Clone)]
pub struct IncomeTax {
    ctx: SimulationContext,
    schedule: TaxRates,
    dividend_rates: Option<TaxRates>,
    gains_rates: Option<TaxRates>,
    pre_tax_deduction: Amount,
    post_tax_credit: Amount,
    free_interest: Amount,
    standard_deduction: Amount,
    max_deductible_loss: Amount,
    inflation: Option<Rc<dyn Rate>>,
    /// Loss carried forward out of each year, starting the year before the
    /// simulation so a pre-existing loss can be carried in
    losses: Vec<Amount>,
    tax_preferential_gains: bool,
    last_assessed: Option<i32>,
}

impl IncomeTax {
    pub fn builder(ctx: SimulationContext) -> IncomeTaxBuilder {
        IncomeTaxBuilder {
            ctx,
            schedule: None,
            dividend_rates: None,
            gains_rates: None,
            standard_deduction: 0,
            inflation: None,
            options: SimulationOptions::default(),
        }
    }

    /// Tax-free interest allowance
    pub fn set_free_interest(&mut self, amount: Amount) {
        self.free_interest = amount;
    }

    /// Amount subtracted from income in addition to the standard or
    /// itemized deduction
    pub fn set_pre_tax_deduction(&mut self, amount: Amount) {
        self.pre_tax_deduction = amount;
    }

    /// Amount subtracted from the computed tax (e.g. personal exemption
    /// credits), independently of the year's credits
    pub fn set_post_tax_credit(&mut self, amount: Amount) {
        self.post_tax_credit = amount;
    }

    /// Maximum net long-term loss deductible from one year's income
    pub fn set_max_deductible_loss(&mut self, amount: Amount) {
        self.max_deductible_loss = amount;
    }

    pub fn set_standard_deduction(&mut self, amount: Amount) {
        self.standard_deduction = amount;
    }

    fn loss_index(&self, year: i32) -> Result<usize> {
        let carry_in_year = self.ctx.first_year() - 1;
        if year == carry_in_year {
            Ok(0)
        } else {
            Ok(self.ctx.index_of(year)? + 1)
        }
    }

    /// Record the loss carried forward out of `year`
    ///
    /// `year` may be the year before the simulation starts, for a loss
    /// carried into the first simulated year.
    pub fn set_loss(&mut self, year: i32, amount: Amount) -> Result<()> {
        let idx = self.loss_index(year)?;
        self.losses[idx] = amount;
        Ok(())
    }

    /// Loss carried forward out of `year`
    pub fn carried_loss(&self, year: i32) -> Result<Amount> {
        Ok(self.losses[self.loss_index(year)?])
    }

    /// Tax owed for `year`
    pub fn tax_on(&mut self, year: i32, amounts: &TaxableAmounts) -> Result<Amount> {
        Ok(self.assess(year, amounts)?.total)
    }

    /// Compute `year`'s tax and record the loss carried out of it
    ///
    /// # Errors
    /// * `OutOfRange` if `year` is outside the simulation
    /// * `NoMatchingBracket` if a preferential schedule is empty
    pub fn assess(&mut self, year: i32, amounts: &TaxableAmounts) -> Result<TaxAssessment> {
        self.ctx.index_of(year)?;
        let loss_slot = self.loss_index(year)?;
        if let Some(prev) = self.last_assessed {
            if year <= prev {
                warn!("income tax assessed for {year} after {prev}; loss carryforward may be stale");
            }
        }

        let inflate = compounded_for(self.inflation.as_deref(), self.ctx.first_year(), year);

        // without preferential dividend treatment, dividends are ordinary income
        let mut dividends = amounts.qualified_dividends;
        let mut folded_dividends = 0;
        if self.dividend_rates.is_none() {
            folded_dividends = dividends;
            dividends = 0;
        }

        // net long-term gains against the loss carried in
        let mut gains = amounts.long_term_gains - self.carried_loss(year - 1)?;
        let folded_gains;
        let carried_out;
        if gains >= 0 {
            carried_out = 0;
            if self.gains_rates.is_none() {
                folded_gains = gains;
                gains = 0;
            } else {
                folded_gains = 0;
            }
        } else {
            let net_loss = -gains;
            if net_loss < self.max_deductible_loss {
                folded_gains = gains;
                carried_out = 0;
            } else {
                folded_gains = -self.max_deductible_loss;
                carried_out = net_loss - self.max_deductible_loss;
            }
            gains = 0;
        }

        let taxable_interest = (amounts.interest - self.free_interest).max(0);
        let agi = amounts.ordinary_income + folded_dividends + folded_gains + taxable_interest;

        let pre_tax = self.pre_tax_deduction as f64 * inflate;
        let mut deduction = self.standard_deduction as f64 * inflate;
        if amounts.itemized_deductions as f64 > deduction {
            deduction = amounts.itemized_deductions as f64;
        }
        let taxable_income = truncate(agi as f64 - (pre_tax + deduction)).max(0);

        let base_tax = self.schedule.tax_on(year, taxable_income);

        let dividend_tax = match &self.dividend_rates {
            Some(rates) if dividends > 0 => {
                dividends as f64 * rates.marginal_rate(year, taxable_income)?
            }
            _ => 0.0,
        };

        // preferential gains are only taxed when explicitly enabled
        if !self.tax_preferential_gains {
            gains = 0;
        }
        let gains_tax = match &self.gains_rates {
            Some(rates) if gains > 0 => gains as f64 * rates.marginal_rate(year, taxable_income)?,
            _ => 0.0,
        };

        // every fallible lookup is done; record the loss carried out of this year
        self.losses[loss_slot] = carried_out;
        self.last_assessed = Some(year);

        let credits = truncate(self.post_tax_credit as f64 * inflate) + amounts.credits;
        let total = truncate(base_tax as f64 + dividend_tax + gains_tax - credits as f64);

        debug!(
            "income tax {year}: agi={agi} deduction={:.0} taxable={taxable_income} base={base_tax} div={dividend_tax:.2} ltg={gains_tax:.2} credits={credits} total={total}",
            pre_tax + deduction
        );

        Ok(TaxAssessment {
            year,
            agi,
            deduction: truncate(pre_tax + deduction),
            taxable_income,
            base_tax,
            dividend_tax,
            gains_tax,
            credits,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::ConstantRate;
    use crate::tax::Bracket;
    use approx::assert_relative_eq;

    fn flat(name: &str, rate: f64) -> TaxRates {
        let mut rates = TaxRates::new(name);
        rates.add_bracket(2020, Bracket::unlimited(rate)).unwrap();
        rates
    }

    fn ctx() -> SimulationContext {
        SimulationContext::new(2020, 5)
    }

    #[test]
    fn test_requires_base_schedule() {
        let result = IncomeTax::builder(ctx()).standard_deduction(1_000).build();
        assert!(matches!(result, Err(Error::MissingBaseSchedule)));
    }

    #[test]
    fn test_loss_carryforward() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.1)).build().unwrap();
        tax.set_loss(2019, 10_000).unwrap();
        tax.set_max_deductible_loss(3_000);

        let assessment = tax.assess(2020, &TaxableAmounts::default()).unwrap();
        assert_eq!(assessment.agi, -3_000);
        assert_eq!(assessment.taxable_income, 0);
        assert_eq!(assessment.total, 0);
        assert_eq!(tax.carried_loss(2020).unwrap(), 7_000);

        // next year's gain absorbs the rest of the loss
        let amounts = TaxableAmounts { ordinary_income: 50_000, long_term_gains: 9_000, ..Default::default() };
        let assessment = tax.assess(2021, &amounts).unwrap();
        assert_eq!(assessment.agi, 52_000);
        assert_eq!(tax.carried_loss(2021).unwrap(), 0);
    }

    #[test]
    fn test_small_loss_fully_deducted() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.1)).build().unwrap();
        tax.set_max_deductible_loss(3_000);
        let amounts = TaxableAmounts { ordinary_income: 10_000, long_term_gains: -2_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_eq!(assessment.agi, 8_000);
        assert_eq!(tax.carried_loss(2020).unwrap(), 0);
    }

    #[test]
    fn test_loss_ledger_bounds() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.1)).build().unwrap();
        assert!(tax.set_loss(2019, 1).is_ok());
        assert!(tax.set_loss(2024, 1).is_ok());
        assert!(matches!(tax.set_loss(2018, 1), Err(Error::OutOfRange { .. })));
        assert!(matches!(tax.set_loss(2025, 1), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_deductions_and_credits() {
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.1))
            .standard_deduction(12_000)
            .build()
            .unwrap();
        tax.set_pre_tax_deduction(3_000);
        tax.set_post_tax_credit(200);
        tax.set_free_interest(1_000);

        let amounts = TaxableAmounts {
            ordinary_income: 60_000,
            interest: 1_500,
            itemized_deductions: 5_000,
            credits: 100,
            ..Default::default()
        };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_eq!(assessment.agi, 60_500);
        assert_eq!(assessment.deduction, 15_000);
        assert_eq!(assessment.taxable_income, 45_500);
        assert_eq!(assessment.base_tax, 4_550);
        assert_eq!(assessment.total, 4_550 - 300);

        // itemized deductions win when larger
        let amounts = TaxableAmounts { ordinary_income: 60_000, itemized_deductions: 20_000, ..Default::default() };
        let assessment = tax.assess(2021, &amounts).unwrap();
        assert_eq!(assessment.taxable_income, 37_000);
    }

    #[test]
    fn test_deduction_inflation_includes_assessed_year() {
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.0))
            .standard_deduction(10_000)
            .inflation(Rc::new(ConstantRate(0.10)))
            .build()
            .unwrap();
        let amounts = TaxableAmounts { ordinary_income: 100_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_eq!(assessment.deduction, truncate(10_000.0 * 1.1));
    }

    #[test]
    fn test_preferential_dividends() {
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.2))
            .dividend_rates(flat("dividends", 0.15))
            .build()
            .unwrap();
        let amounts = TaxableAmounts { ordinary_income: 10_000, qualified_dividends: 4_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_eq!(assessment.agi, 10_000);
        assert_eq!(assessment.base_tax, 2_000);
        assert_relative_eq!(assessment.dividend_tax, 600.0);
        assert_eq!(assessment.total, 2_600);
    }

    #[test]
    fn test_dividends_folded_without_schedule() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.2)).build().unwrap();
        let amounts = TaxableAmounts { ordinary_income: 10_000, qualified_dividends: 4_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_eq!(assessment.agi, 14_000);
        assert_eq!(assessment.dividend_tax, 0.0);
        assert_eq!(assessment.total, 2_800);
    }

    #[test]
    fn test_preferential_gains_term_is_zero_by_default() {
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.2))
            .gains_rates(flat("gains", 0.15))
            .build()
            .unwrap();
        let amounts = TaxableAmounts { ordinary_income: 10_000, long_term_gains: 8_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        // gains are neither folded into income nor taxed preferentially
        assert_eq!(assessment.agi, 10_000);
        assert_eq!(assessment.gains_tax, 0.0);
        assert_eq!(assessment.total, 2_000);
    }

    #[test]
    fn test_preferential_gains_when_enabled() {
        let options = SimulationOptions { tax_preferential_gains: true, ..Default::default() };
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.2))
            .gains_rates(flat("gains", 0.15))
            .options(&options)
            .build()
            .unwrap();
        let amounts = TaxableAmounts { ordinary_income: 10_000, long_term_gains: 8_000, ..Default::default() };
        let assessment = tax.assess(2020, &amounts).unwrap();
        assert_relative_eq!(assessment.gains_tax, 1_200.0);
        assert_eq!(assessment.total, 3_200);
    }

    #[test]
    fn test_gains_folded_without_schedule() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.2)).build().unwrap();
        let amounts = TaxableAmounts { ordinary_income: 10_000, long_term_gains: 5_000, ..Default::default() };
        assert_eq!(tax.tax_on(2020, &amounts).unwrap(), 3_000);
    }

    #[test]
    fn test_failed_assessment_leaves_ledger_untouched() {
        let mut tax = IncomeTax::builder(ctx())
            .schedule(flat("base", 0.1))
            .dividend_rates(TaxRates::new("empty dividends"))
            .build()
            .unwrap();
        tax.set_loss(2019, 10_000).unwrap();
        tax.set_loss(2020, 123).unwrap();
        tax.set_max_deductible_loss(3_000);

        let amounts = TaxableAmounts { qualified_dividends: 100, ..Default::default() };
        assert!(matches!(tax.assess(2020, &amounts), Err(Error::NoMatchingBracket { .. })));
        assert_eq!(tax.carried_loss(2020).unwrap(), 123);
        assert_eq!(tax.carried_loss(2019).unwrap(), 10_000);

        // the year can still be assessed once the amounts avoid the empty schedule
        tax.assess(2020, &TaxableAmounts::default()).unwrap();
        assert_eq!(tax.carried_loss(2020).unwrap(), 7_000);
    }

    #[test]
    fn test_year_outside_simulation() {
        let mut tax = IncomeTax::builder(ctx()).schedule(flat("base", 0.2)).build().unwrap();
        assert!(matches!(
            tax.tax_on(2030, &TaxableAmounts::default()),
            Err(Error::OutOfRange { .. })
        ));
    }
}
