//! CLI entry point for lecs_daq
//!
//! Provides command-line access to:
//! - Parsing a raw log into timed data and status tables
//! - Hourly spectral flux between two data channels
//! - Printing the default configuration
//!
//! # Usage
//!
//! ```bash
//! lecs_daq process raw_log.txt --output-dir out --report
//! lecs_daq flux raw_log.txt --x w --y temperature
//! lecs_daq default-config > config/lecs_daq.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lecs_daq::config::{LecsConfig, DEFAULT_CONFIG_PATH};
use lecs_daq::data::flux::{spectral_flux, DataChannel, FluxParams};
use lecs_daq::data::storage::write_outputs;
use lecs_daq::logging::{self, OutputFormat, TracingConfig};
use lecs_daq::{acquisition, Pipeline, PipelineOutput};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lecs_daq")]
#[command(about = "Parse and time-align raw LECS lander logs", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Compact)]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw log and write data.csv and status.csv
    Process {
        /// Raw log file
        input: PathBuf,

        /// Input is the logger's HTML page
        #[arg(long)]
        html: bool,

        /// Directory for the output tables
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write report.json
        #[arg(long)]
        report: bool,
    },

    /// Print hourly spectral flux between two channels as CSV
    Flux {
        /// Raw log file
        input: PathBuf,

        /// Input is the logger's HTML page
        #[arg(long)]
        html: bool,

        /// First channel (usually a velocity component)
        #[arg(long, default_value = "w")]
        x: DataChannel,

        /// Second channel (the scalar being transported)
        #[arg(long, default_value = "temperature")]
        y: DataChannel,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::DefaultConfig = cli.command {
        print!("{}", LecsConfig::default().to_toml_string()?);
        return Ok(());
    }

    let config = LecsConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from '{}'", cli.config.display()))?;
    logging::init(TracingConfig::from_config(&config)?.with_format(cli.log_format))?;

    match cli.command {
        Commands::Process {
            input,
            html,
            output_dir,
            report,
        } => {
            let output = run(config, &input, html)?;
            let files = write_outputs(&output_dir, &output, report)?;
            println!(
                "{} data rows -> {}",
                output.report.data_rows,
                files.data.display()
            );
            println!(
                "{} status rows -> {}",
                output.report.status_rows,
                files.status.display()
            );
            Ok(())
        }
        Commands::Flux { input, html, x, y } => {
            let params = FluxParams::from_config(&config.flux, config.timing.sampling_frequency_hz);
            let output = run(config, &input, html)?;
            let estimates = spectral_flux(&output.data, x, y, &params)?;
            println!("time,flux_{x}_{y},samples");
            for estimate in estimates {
                println!(
                    "{},{},{}",
                    estimate.time.format("%Y-%m-%dT%H:%M:%S%.f"),
                    estimate.flux,
                    estimate.samples
                );
            }
            Ok(())
        }
        Commands::DefaultConfig => Ok(()),
    }
}

fn run(mut config: LecsConfig, input: &Path, html: bool) -> Result<PipelineOutput> {
    config.acquisition.html_table |= html;
    let lines = acquisition::load_file(input, &config.acquisition)
        .with_context(|| format!("reading '{}'", input.display()))?;
    let output = Pipeline::new(config)?.run(&lines)?;
    Ok(output)
}
