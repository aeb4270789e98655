use crate::infra::{parse_date, IncomeFixture, IncomePipeline};
use crate::server;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use income_insight::config::{AppConfig, TelemetryConfig};
use income_insight::error::AppError;
use income_insight::telemetry;
use income_insight::workflows::income::{AccrualPeriodCalculator, CalendarKind, SubjectId};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Income Insight",
    about = "Serve and inspect income reports for a benchmark date",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the accrual period for a benchmark date
    Accrual(AccrualArgs),
    /// Assemble a report in-process against a fixture of income facts
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct AccrualArgs {
    /// Benchmark date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub(crate) benchmark_date: Option<NaiveDate>,
    /// Working-day calendar (norwegian or weekday)
    #[arg(long)]
    pub(crate) calendar: Option<CalendarKind>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Subject the report is assembled for
    #[arg(long)]
    pub(crate) subject: String,
    /// Benchmark date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub(crate) benchmark_date: Option<NaiveDate>,
    /// JSON file mapping subject ids to income facts
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
    /// Emit the earlier report form without employment periods
    #[arg(long)]
    pub(crate) legacy: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Accrual(args) => run_accrual(args),
        Command::Report(args) => run_report(args).await,
    }
}

fn run_accrual(args: AccrualArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let calendar = args.calendar.unwrap_or(config.income.calendar);
    let benchmark_date = args
        .benchmark_date
        .unwrap_or_else(|| Local::now().date_naive());

    let rules = calendar.build();
    let calculator = AccrualPeriodCalculator::default();
    let window = calculator.compute(benchmark_date, rules.as_ref())?;
    let payload = serde_json::json!({
        "benchmark_date": benchmark_date,
        "calendar": calendar.label(),
        "first_month": window.first_month,
        "last_closed_month": window.last_closed_month,
    });
    print_json(&payload)
}

async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    telemetry::init(&TelemetryConfig {
        log_level: "warn".to_string(),
        ..config.telemetry.clone()
    })?;

    if args.fixture.is_some() {
        config.income.fixture_path = args.fixture;
    }
    let fixture = IncomeFixture::load(config.income.fixture_path.as_deref())?;
    let pipeline = IncomePipeline::start(&config.income, fixture);

    let benchmark_date = args
        .benchmark_date
        .unwrap_or_else(|| Local::now().date_naive());
    let outcome = pipeline
        .assembler
        .handle(SubjectId(args.subject), benchmark_date)
        .await;
    pipeline.shutdown();

    let report = outcome?;
    if args.legacy {
        print_json(&report.to_legacy_view())
    } else {
        print_json(&report.to_view())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => {
            println!("{rendered}");
            Ok(())
        }
        Err(err) => Err(AppError::Render(err)),
    }
}
