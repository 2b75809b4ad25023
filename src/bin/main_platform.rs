//! Command line entry point for the BI platform

use anyhow::{bail, Context};
use bi_analytics::{DataLoader, Dataset};
use bi_platform::{ChartSpec, DataAnalystPlatform, KpiKind, KpiSpec, ModelParams, PlatformConfig};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Excel,
    Pivot,
    Dashboard,
    Kpi,
    Trend,
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelType {
    Arima,
    Sarima,
    Linear,
}

impl ModelType {
    fn as_str(self) -> &'static str {
        match self {
            ModelType::Arima => "arima",
            ModelType::Sarima => "sarima",
            ModelType::Linear => "linear",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "main_platform")]
#[command(about = "Data analyst platform", long_about = None)]
struct Cli {
    /// Mode to run
    #[arg(long, value_enum)]
    mode: Mode,

    /// Input file path (.csv or .xlsx)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Column to use as pivot index
    #[arg(long)]
    index: Option<String>,

    /// Column whose values become pivot columns
    #[arg(long)]
    columns: Option<String>,

    /// Comma-separated columns to aggregate
    #[arg(long)]
    values: Option<String>,

    /// Aggregation function (sum, mean, count, min, max, median)
    #[arg(long)]
    aggfunc: Option<String>,

    /// Dashboard title
    #[arg(long)]
    title: Option<String>,

    /// Serve the dashboard interactively
    #[arg(long)]
    run: bool,

    /// Column name for dates
    #[arg(long)]
    date_col: Option<String>,

    /// Column name for values
    #[arg(long)]
    value_col: Option<String>,

    /// Number of steps to forecast
    #[arg(long)]
    steps: Option<usize>,

    /// Type of model to use
    #[arg(long, value_enum)]
    model_type: Option<ModelType>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = PlatformConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let platform = DataAnalystPlatform::new(config);
    debug!("Running in {:?} mode", cli.mode);

    match cli.mode {
        Mode::Excel => {
            let file = required_file(cli)?;
            let report = platform.analyze_excel(file)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Mode::Pivot => {
            let data = load(cli)?;
            let (Some(index), Some(values)) = (&cli.index, &cli.values) else {
                bail!("Index and values are required for pivot table");
            };
            let values: Vec<&str> = values.split(',').map(str::trim).collect();
            let pivot = platform.create_pivot(
                &data,
                index,
                cli.columns.as_deref(),
                &values,
                cli.aggfunc.as_deref().unwrap_or("sum"),
            )?;
            println!("{}", pivot);

            if let Some(output) = &cli.output {
                let written = platform.export_pivot(&pivot, output)?;
                println!("Pivot table exported to: {}", written.display());
            }
        }
        Mode::Dashboard => {
            if cli.run {
                bail!("Serving an interactive dashboard is not supported; use --output to write HTML");
            }
            let data = load(cli)?;
            let names = data.column_names();
            if names.len() < 2 {
                bail!("Dashboard needs at least two columns, found {}", names.len());
            }
            let charts = [
                ChartSpec::xy("bar", "Bar Chart", &names[0], &names[1]),
                ChartSpec::xy("line", "Line Chart", &names[0], &names[1]),
            ];
            let dashboard = platform.create_dashboard(&data, &charts, cli.title.as_deref())?;
            println!(
                "Dashboard {:?} with {} charts",
                dashboard.title,
                dashboard.panels.len()
            );

            if let Some(output) = &cli.output {
                let written = platform.export_dashboard(&dashboard, output)?;
                println!("Dashboard exported to: {}", written.display());
            }
        }
        Mode::Kpi => {
            let data = load(cli)?;
            let names = data.column_names();
            if names.len() < 2 {
                bail!("KPI mode needs a period and a revenue column");
            }
            let kpis = [KpiSpec::new(
                "revenue_growth",
                KpiKind::RevenueGrowth {
                    period_col: names[0].clone(),
                    revenue_col: names[1].clone(),
                    periods: None,
                },
            )];
            for (name, table) in platform.calculate_kpis(&data, &kpis)? {
                println!("{}:\n{}", name, table);
            }
        }
        Mode::Trend => {
            let data = load(cli)?;
            let (date_col, value_col) = date_and_value(cli, "trend analysis")?;
            let report = platform.analyze_trends(&data, date_col, value_col, None)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Mode::Forecast => {
            let data = load(cli)?;
            let (date_col, value_col) = date_and_value(cli, "forecasting")?;
            let steps = cli
                .steps
                .unwrap_or(platform.config().analysis.forecast_steps);
            let model_type = cli.model_type.unwrap_or(ModelType::Arima);
            let forecast = platform.forecast(
                &data,
                date_col,
                value_col,
                steps,
                model_type.as_str(),
                &ModelParams::default(),
            )?;
            println!("Forecast ({}):\n{}", forecast.model, forecast.to_frame()?);
        }
    }

    Ok(())
}

fn required_file(cli: &Cli) -> anyhow::Result<&Path> {
    match &cli.file {
        Some(file) => Ok(file.as_path()),
        None => bail!("Data file path is required"),
    }
}

fn load(cli: &Cli) -> anyhow::Result<Dataset> {
    let file = required_file(cli)?;
    DataLoader::load(file, None, None).with_context(|| format!("loading {}", file.display()))
}

fn date_and_value<'a>(cli: &'a Cli, purpose: &str) -> anyhow::Result<(&'a str, &'a str)> {
    match (&cli.date_col, &cli.value_col) {
        (Some(date_col), Some(value_col)) => Ok((date_col.as_str(), value_col.as_str())),
        _ => bail!("Date and value columns are required for {}", purpose),
    }
}
