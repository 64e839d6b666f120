//! # unrate-dashboard
//!
//! Command-line front end for the unemployment-rate forecast dashboard.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use unrate_forecast::{
    AppState, Dashboard, DashboardConfig, DashboardView, HorizonRequest, HorizonUnit,
};

#[derive(Parser)]
#[command(name = "unrate-dashboard")]
#[command(about = "US unemployment rate forecasts from pre-trained Prophet and ARIMA models", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Historical data CSV, overrides the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Prophet artifact, overrides the configuration
    #[arg(long, global = true)]
    prophet: Option<PathBuf>,

    /// ARIMA artifact, overrides the configuration
    #[arg(long, global = true)]
    arima: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single forecast and print it
    Run {
        /// Number of units to forecast
        #[arg(short, long, default_value_t = 12)]
        count: u32,

        /// Horizon unit
        #[arg(short, long, value_enum, default_value_t = UnitArg::Month)]
        unit: UnitArg,

        /// Print the table as CSV
        #[arg(long)]
        csv: bool,

        /// Write the chart layers as JSON for an external viewer
        #[arg(long)]
        chart_json: Option<PathBuf>,
    },

    /// Prompt for horizons on stdin until `quit`
    Interactive,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Month,
    Year,
}

impl From<UnitArg> for HorizonUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Month => HorizonUnit::Month,
            UnitArg::Year => HorizonUnit::Year,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let state = match AppState::load(config) {
        Ok(state) => state,
        Err(err) => {
            error!(%err, "startup failed");
            return Err(err).context("cannot start the dashboard");
        }
    };

    match cli.command {
        Commands::Run {
            count,
            unit,
            csv,
            chart_json,
        } => {
            let view = state.run(HorizonRequest::new(count, unit.into()))?;
            render(&view, csv)?;
            if let Some(path) = chart_json {
                write_chart(&view, &path)?;
            }
        }
        Commands::Interactive => interactive(&state)?,
    }

    Ok(())
}

/// Defaults, then the config file, then command-line overrides
fn build_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    if let Some(data) = &cli.data {
        config.data_file = data.clone();
    }
    if let Some(prophet) = &cli.prophet {
        config.prophet_artifact = prophet.clone();
    }
    if let Some(arima) = &cli.arima {
        config.arima_artifact = arima.clone();
    }

    Ok(config)
}

fn interactive(state: &AppState) -> Result<()> {
    let mut dashboard = Dashboard::new(state);
    let config = state.config();
    let stdin = io::stdin();

    println!(
        "Forecast horizon as '<count> <month|year>' ({}..={}), 'quit' to exit.",
        config.min_count, config.max_count
    );
    prompt()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        match input {
            "" => {}
            "quit" | "exit" => break,
            _ => match HorizonRequest::parse(input).and_then(|req| dashboard.submit(req).map(|_| ())) {
                Ok(()) => {
                    if let Some(view) = dashboard.current() {
                        render(view, false)?;
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!(%err, "session aborted");
                    return Err(err).context("forecast run failed");
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    if let Some(view) = dashboard.current() {
                        eprintln!("Still showing the forecast for {}.", view.request);
                    }
                }
            },
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn render(view: &DashboardView, as_csv: bool) -> Result<()> {
    println!("Forecast table ({}, {} periods)", view.request, view.periods);
    if as_csv {
        print!("{}", view.table.to_csv()?);
    } else {
        print!("{}", view.table);
    }
    println!();
    print!("{}", view.chart);
    Ok(())
}

fn write_chart(view: &DashboardView, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&view.chart)?;
    fs::write(path, json).with_context(|| format!("writing chart to {}", path.display()))?;
    info!(path = %path.display(), "chart written");
    Ok(())
}
