use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rust_decimal::Decimal;

use repayment_plan::config::{Config, LoanOverrides};
use repayment_plan::money::to_major;
use repayment_plan::{
    PaymentRounding, PlanResult, RepaymentPlan, compute_repayment_plan, init_tracing, render,
};

/// Repayment schedule for an interest-only / equal-installment loan
#[derive(Parser)]
#[command(name = "repayment-plan", version)]
struct Cli {
    /// YAML loan config; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Loan amount in yuan
    #[arg(long)]
    amount: Option<Decimal>,

    /// Annual interest rate in percent, e.g. 9.0
    #[arg(long)]
    rate: Option<Decimal>,

    /// Repayment method, e.g. "24期等额本息" or "前3后21"
    #[arg(long)]
    method: Option<String>,

    /// Start date as YYYY-MM-DD or YYYYMMDD (default: today)
    #[arg(long)]
    start_date: Option<String>,

    /// Rounding of the level payment
    #[arg(long, value_enum)]
    rounding: Option<PaymentRounding>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> PlanResult<()> {
    let config = resolve_config(cli)?;
    let terms = config.to_terms(Local::now().date_naive())?;
    let plan = compute_repayment_plan(&terms)?;

    match cli.output {
        OutputFormat::Table => {
            print_summary(&config, &plan);
            println!("{}", render::plan_table(&plan, &config.currency_symbol));
        }
        OutputFormat::Json => println!("{}", render::plan_json(&plan)?),
        OutputFormat::Csv => print!("{}", render::plan_csv(&plan)?),
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> PlanResult<Config> {
    let overrides = LoanOverrides {
        amount: cli.amount,
        annual_rate_percent: cli.rate,
        method: cli.method.clone(),
        start_date: cli.start_date.clone(),
        payment_rounding: cli.rounding,
    };
    match &cli.config {
        Some(path) => Ok(Config::load(path)?.with_overrides(&overrides)),
        None => Config::from_overrides(&overrides),
    }
}

fn print_summary(config: &Config, plan: &RepaymentPlan) {
    let symbol = &config.currency_symbol;
    println!("{}", "-".repeat(60));
    println!("Loan amount:    {symbol}{:.2}", config.loan.amount);
    println!("Annual rate:    {}%", config.loan.annual_rate_percent);
    println!("Method:         {}", config.loan.method.trim());
    if let Some(payment) = plan.level_payment {
        println!("Level payment:  {symbol}{:.2}", to_major(payment));
    }
    println!(
        "Total interest: {symbol}{:.2}",
        to_major(plan.total_interest())
    );
    println!("{}", "-".repeat(60));
}
