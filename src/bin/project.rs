//! Project a demonstration household over a range of years
//!
//! Builds a two-earner household in code (salary, social security, living
//! expenses, a brokerage account, a bond, a house and a federal-style income
//! tax), projects it year by year and writes one row per year.
//!
//! Usage:
//!   cargo run --bin project -- --years 30 --format csv --output household.csv

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;

use finsim::{
    shared, Asset, AssetRates, Assets, BoundedEnvelope, Bracket, ConstantRate, Expense, Expenses, Income, IncomeTax,
    Incomes, PiecewiseRate, Properties, Property, Rate, SimulationContext, SimulationOptions, Snapshot, TaxAssessment,
    TaxRates, TaxableAmounts, TimeSeries,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "project")]
#[command(about = "Multi-year projection of a demonstration household")]
struct Args {
    /// First simulated year (default: current year)
    #[arg(long)]
    first_year: Option<i32>,

    /// Number of simulated years
    #[arg(long, default_value = "30")]
    years: usize,

    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file with simulation options
    #[arg(long)]
    options: Option<PathBuf>,
}

/// Household totals for one year
#[derive(Debug, Serialize)]
struct YearRow {
    year: i32,
    income: i64,
    contributions: i64,
    expenses: i64,
    asset_value: i64,
    interest: i64,
    dividends: i64,
    realized_gains: i64,
    property_value: i64,
    property_tax: i64,
    agi: i64,
    taxable_income: i64,
    income_tax: i64,
}

/// Every entity snapshot plus the tax assessment of one year
#[derive(Debug, Serialize)]
struct YearReport {
    year: i32,
    snapshots: Vec<Snapshot>,
    tax: TaxAssessment,
}

struct Household {
    incomes: Incomes,
    expenses: Expenses,
    assets: Assets,
    properties: Properties,
    income_tax: IncomeTax,
}

fn flat_schedule(name: &str, base_year: i32, rate: f64, options: &SimulationOptions) -> Result<TaxRates> {
    let mut schedule = TaxRates::with_options(name, options);
    schedule.add_bracket(base_year, Bracket::unlimited(rate))?;
    Ok(schedule)
}

fn build_household(ctx: SimulationContext, options: &SimulationOptions) -> Result<Household> {
    let first = ctx.first_year();
    let retirement = first + 20;
    let inflation: Rc<dyn Rate> = Rc::new(ConstantRate(0.025));

    // Incomes
    let salary = shared(
        Income::new("salary", "alex", ctx)
            .with_rate(Rc::new(PiecewiseRate::two(0.04, first + 10, 0.025)))
            .with_envelope(Rc::new(BoundedEnvelope::new(first, retirement - 1)))
            .with_contribution(19_500),
    );
    salary.borrow_mut().set_income_simple(first, 95_000)?;

    let consulting = shared(
        Income::new("consulting", "sam", ctx)
            .with_rate(inflation.clone())
            .with_envelope(Rc::new(BoundedEnvelope::new(first, first + 14))),
    );
    consulting.borrow_mut().set_income_simple(first, 40_000)?;

    let social_security = shared(
        Income::new("social security", "alex", ctx)
            .with_rate(inflation.clone())
            .with_envelope(Rc::new(BoundedEnvelope::new(retirement, ctx.last_year().max(retirement)))),
    );
    if ctx.contains(retirement) {
        social_security.borrow_mut().set_income(retirement, 31_000, 0, 0)?;
    }

    let mut incomes = Incomes::with_options("household income", ctx, options);
    incomes.add_child(salary)?;
    incomes.add_child(consulting)?;
    incomes.add_child(social_security)?;

    // Expenses
    let mut expenses = Expenses::with_options("household expenses", ctx, options);
    let living = shared(Expense::new("living", "non-discretionary", ctx).with_budget_rate(inflation.clone()));
    living.borrow_mut().set_expense_simple(first, 48_000)?;
    let medical = shared(
        Expense::new("medical", "non-discretionary", ctx)
            .with_budget_rate(inflation.clone())
            .with_actual_rate(Rc::new(ConstantRate(0.055))),
    );
    medical.borrow_mut().set_expense_simple(first, 6_000)?;
    let mut college_years = BoundedEnvelope::new(first + 8, first + 11);
    college_years.set_scale_for_year(first + 11, 0.5)?;
    let tuition = shared(
        Expense::new("tuition", "education", ctx)
            .with_budget_rate(Rc::new(ConstantRate(0.05)))
            .with_envelope(Rc::new(college_years)),
    );
    if ctx.contains(first + 8) {
        tuition.borrow_mut().set_expense_simple(first + 8, 30_000)?;
    }
    expenses.add_child(living)?;
    expenses.add_child(medical)?;
    expenses.add_child(tuition)?;

    // Assets
    let brokerage = shared(
        Asset::new("brokerage", ctx)
            .with_rates(AssetRates {
                dividends: Some(Rc::new(ConstantRate(0.018))),
                short_gains: Some(Rc::new(ConstantRate(0.004))),
                appreciation: Some(Rc::new(ConstantRate(0.05))),
                ..Default::default()
            })
            .with_reinvest(true),
    );
    {
        let mut brokerage = brokerage.borrow_mut();
        brokerage.set_value(first, 250_000, 180_000)?;
        for year in first..retirement.min(ctx.last_year() + 1) {
            brokerage.buy(year, 12_000)?;
        }
        for year in retirement..=ctx.last_year() {
            brokerage.sell_at_average_basis(year, 30_000)?;
        }
    }
    let savings = shared(Asset::new("savings", ctx).with_rates(AssetRates {
        interest: Some(Rc::new(ConstantRate(0.015))),
        ..Default::default()
    }));
    savings.borrow_mut().set_value(first, 20_000, 20_000)?;
    let bond = Asset::bond(
        "treasury note",
        50_000,
        49_200,
        Some(Rc::new(ConstantRate(0.04))),
        first - 2,
        first + 5,
        ctx,
    )?;

    let mut assets = Assets::with_options("portfolio", ctx, options);
    assets.add_child(brokerage)?;
    assets.add_child(savings)?;
    assets.add_child(shared(bond))?;

    // Real property
    let house = shared(
        Property::new("house", ctx)
            .with_appreciation(Rc::new(ConstantRate(0.035)))
            .with_assessment_rate(Rc::new(ConstantRate(0.02)))
            .with_tax_rates(Rc::new(flat_schedule("property tax", first, 0.011, options)?))
            .with_insurance_rates(Rc::new(flat_schedule("homeowners insurance", first, 0.0035, options)?)),
    );
    {
        let mut house = house.borrow_mut();
        house.set_value(first, 420_000, 310_000, 350_000)?;
        if ctx.contains(first + 3) {
            house.improve(first + 3, 45_000, 60_000, 30_000)?;
        }
    }
    let mut properties = Properties::with_options("real estate", ctx, options);
    properties.add_child(house)?;

    // Income tax
    let mut federal = TaxRates::with_options("federal", options).with_bracket_creep(inflation.clone());
    for (top, rate) in [(22_000, 0.10), (89_450, 0.12), (190_750, 0.22), (364_200, 0.24), (462_500, 0.32)] {
        federal.add_bracket(first, Bracket::new(top, rate))?;
    }
    federal.add_bracket(first, Bracket::unlimited(0.35))?;

    let mut dividends = TaxRates::with_options("qualified dividends", options).with_bracket_creep(inflation.clone());
    dividends.add_bracket(first, Bracket::new(89_250, 0.0))?;
    dividends.add_bracket(first, Bracket::new(553_850, 0.15))?;
    dividends.add_bracket(first, Bracket::unlimited(0.20))?;

    let mut income_tax = IncomeTax::builder(ctx)
        .schedule(federal)
        .dividend_rates(dividends)
        .standard_deduction(27_700)
        .inflation(inflation)
        .options(options)
        .build()?;
    income_tax.set_max_deductible_loss(3_000);
    income_tax.set_free_interest(500);

    Ok(Household {
        incomes,
        expenses,
        assets,
        properties,
        income_tax,
    })
}

/// Snapshots of every entity that exists in `year`
fn snapshots(household: &mut Household, year: i32) -> Result<Vec<Snapshot>> {
    let mut all = Vec::new();
    for child in household.incomes.children() {
        all.extend(child.borrow_mut().snapshot(year)?);
    }
    for child in household.expenses.children() {
        all.extend(child.borrow_mut().snapshot(year)?);
    }
    for child in household.assets.children() {
        all.extend(child.borrow_mut().snapshot(year)?);
    }
    for child in household.properties.children() {
        all.extend(child.borrow_mut().snapshot(year)?);
    }
    Ok(all)
}

fn project_year(household: &mut Household, year: i32) -> Result<(YearRow, TaxAssessment)> {
    let income = household.incomes.record(year)?;
    let expenses = household.expenses.record(year)?;
    let assets = household.assets.record(year)?;
    let property = household.properties.record(year)?;

    let amounts = TaxableAmounts {
        ordinary_income: income.taxable - income.contribution,
        interest: assets.interest,
        qualified_dividends: assets.dividends,
        long_term_gains: assets.tax_profit(),
        itemized_deductions: property.tax,
        credits: 0,
    };
    let tax = household.income_tax.assess(year, &amounts)?;

    let row = YearRow {
        year,
        income: income.taxable,
        contributions: income.contribution,
        expenses: expenses.actual,
        asset_value: assets.value,
        interest: assets.interest,
        dividends: assets.dividends,
        realized_gains: assets.tax_profit(),
        property_value: property.market,
        property_tax: property.tax,
        agi: tax.agi,
        taxable_income: tax.taxable_income,
        income_tax: tax.total,
    };
    Ok((row, tax))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = match &args.options {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            SimulationOptions::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationOptions::default(),
    };
    let first_year = args.first_year.unwrap_or_else(|| Local::now().year());
    let ctx = SimulationContext::new(first_year, args.years);
    info!("projecting {}-{} with {:?}", ctx.first_year(), ctx.last_year(), options);

    let mut household = build_household(ctx, &options)?;

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };

    match args.format {
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(output);
            for year in ctx.years() {
                let (row, _) = project_year(&mut household, year)?;
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        Format::Json => {
            let mut reports = Vec::with_capacity(ctx.num_years());
            for year in ctx.years() {
                let (_, tax) = project_year(&mut household, year)?;
                let snapshots = snapshots(&mut household, year)?;
                reports.push(YearReport { year, snapshots, tax });
            }
            serde_json::to_writer_pretty(output, &reports)?;
        }
    }

    if let Some(path) = &args.output {
        info!("output written to {}", path.display());
    }
    Ok(())
}
