//! reverso CLI binary.
//!
//! Provides the command-line interface for reversal signal research.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "reverso")]
#[command(about = "Short-term reversal signal research", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available signals
    Signals {
        /// Show a single signal
        name: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compute alphas and write the optimizer checkpoint
    Alphas {
        /// Asset panel (parquet)
        #[arg(long)]
        panel: PathBuf,

        /// Experiment configuration (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Checkpoint to write (parquet)
        #[arg(long, default_value = "temp/alphas.parquet")]
        output: PathBuf,
    },

    /// Test the signal with equal-weight quantile portfolios
    Quantile {
        /// Asset panel (parquet)
        #[arg(long)]
        panel: PathBuf,

        /// Experiment configuration (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for returns and summaries
        #[arg(long, default_value = "results/quantile")]
        output_dir: PathBuf,
    },

    /// Optimize every date of one year of the checkpoint
    Mvo {
        /// Alpha checkpoint (parquet)
        #[arg(long = "data_path")]
        data_path: PathBuf,

        /// Risk aversion
        #[arg(long)]
        gamma: f64,

        /// Calendar year to optimize
        #[arg(long)]
        year: i32,

        /// Directory receiving `{year}.parquet`
        #[arg(long = "output_dir")]
        output_dir: PathBuf,

        /// Worker threads
        #[arg(long = "n_cpus", default_value = "8")]
        n_cpus: usize,

        /// Experiment configuration supplying the constraint set
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write the checkpoint and submit one optimizer task per year
    Submit {
        /// Alphas to checkpoint (parquet)
        #[arg(long)]
        alphas: PathBuf,

        /// Experiment configuration passed on to every array task
        #[arg(long)]
        config: Option<PathBuf>,

        /// Signal name keying the output directories
        #[arg(long)]
        signal: String,

        /// Risk aversion
        #[arg(long)]
        gamma: f64,

        /// Render the job script without submitting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize optimized weights against realized returns
    Report {
        /// Directory of per-year weight files
        #[arg(long)]
        weights: PathBuf,

        /// Asset panel (parquet) with returns
        #[arg(long)]
        panel: PathBuf,

        /// Factor returns (CSV) for the regression
        #[arg(long)]
        factors: Option<PathBuf>,

        /// Benchmark weights (parquet) for the active-weight report
        #[arg(long)]
        benchmark: Option<PathBuf>,

        /// Portfolio label
        #[arg(long, default_value = "mvo")]
        name: String,

        /// Directory for returns, summaries and regressions
        #[arg(long, default_value = "results/report")]
        output_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Signals {
            name: Some(name), ..
        } => {
            cmd::signals::show_signal(&name)?;
        }
        Commands::Signals {
            name: None,
            category,
            verbose,
        } => {
            cmd::signals::list_signals(category, verbose)?;
        }
        Commands::Alphas {
            panel,
            config,
            output,
        } => {
            cmd::alphas::compute_alphas(&panel, config.as_deref(), &output)?;
        }
        Commands::Quantile {
            panel,
            config,
            output_dir,
        } => {
            cmd::quantile::run_quantile(&panel, config.as_deref(), &output_dir)?;
        }
        Commands::Mvo {
            data_path,
            gamma,
            year,
            output_dir,
            n_cpus,
            config,
        } => {
            cmd::mvo::run_mvo(&data_path, gamma, year, &output_dir, n_cpus, config.as_deref())?;
        }
        Commands::Submit {
            alphas,
            config,
            signal,
            gamma,
            dry_run,
        } => {
            cmd::submit::submit(&alphas, config.as_deref(), &signal, gamma, dry_run)?;
        }
        Commands::Report {
            weights,
            panel,
            factors,
            benchmark,
            name,
            output_dir,
        } => {
            cmd::report::run_report(
                &weights,
                &panel,
                factors.as_deref(),
                benchmark.as_deref(),
                &name,
                &output_dir,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mvo_flags_match_job_script() {
        let cli = Cli::try_parse_from([
            "reverso",
            "mvo",
            "--data_path",
            "/tmp/alphas.parquet",
            "--gamma",
            "50",
            "--year",
            "2020",
            "--output_dir",
            "/tmp/weights",
            "--n_cpus",
            "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Mvo {
                gamma, year, n_cpus, config, ..
            } => {
                assert_eq!(gamma, 50.0);
                assert_eq!(year, 2020);
                assert_eq!(n_cpus, 4);
                assert!(config.is_none());
            }
            _ => panic!("expected mvo"),
        }
    }

    #[test]
    fn test_submit_dry_run_flag() {
        let cli = Cli::try_parse_from([
            "reverso", "submit", "--alphas", "a.parquet", "--signal", "reversal", "--gamma", "10",
            "--dry-run",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Submit { dry_run: true, .. }));
    }

    #[test]
    fn test_submit_config_flag() {
        let cli = Cli::try_parse_from([
            "reverso", "submit", "--alphas", "a.parquet", "--config", "exp.json", "--signal",
            "reversal", "--gamma", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit { config, dry_run, .. } => {
                assert_eq!(config, Some(PathBuf::from("exp.json")));
                assert!(!dry_run);
            }
            _ => panic!("expected submit"),
        }
    }
}
