//! Cluster submission command implementation.

use super::{banner, load_config};
use anyhow::Result;
use reverso::io::read_parquet;
use reverso::{ClusterConfig, Sbatch, Scheduler, SubmissionOutcome, submit_backtest};
use std::path::Path;

/// Checkpoints `alphas` and submits the per-year job array.
///
/// `signal` and `gamma` override the name and risk aversion of the
/// experiment configuration, which the array tasks read back for their
/// constraint set and CPU count.
pub(crate) fn submit(
    alphas: &Path,
    config: Option<&Path>,
    signal: &str,
    gamma: f64,
    dry_run: bool,
) -> Result<()> {
    banner("Backtest Submission");

    let cluster = ClusterConfig::from_env()?;
    submit_with(alphas, config, signal, gamma, dry_run, &cluster, &Sbatch::default())
}

/// Runs a submission against an explicit cluster and scheduler.
///
/// A rejected submission is reported on the console and is not an error.
pub(crate) fn submit_with(
    alphas: &Path,
    config: Option<&Path>,
    signal: &str,
    gamma: f64,
    dry_run: bool,
    cluster: &ClusterConfig,
    scheduler: &dyn Scheduler,
) -> Result<()> {
    let mut experiment = load_config(config)?;
    experiment.name = signal.to_string();
    experiment.gamma = gamma;
    let mut alphas = read_parquet(alphas)?;

    println!("Signal:   {}", signal);
    println!("Gamma:    {}", gamma);
    println!("CPUs:     {}", experiment.n_cpus);
    println!("Root:     {}", cluster.project_root.display());
    println!();

    match submit_backtest(&mut alphas, &experiment, cluster, scheduler, dry_run)? {
        SubmissionOutcome::Submitted { job_id, stdout } => match job_id {
            Some(id) => println!("Submitted job {}", id),
            None => println!("{}", stdout.trim()),
        },
        SubmissionOutcome::DryRun { script } => {
            println!("Dry run, script not submitted:\n");
            println!("{}", script);
        }
        SubmissionOutcome::Failed {
            reason,
            stdout,
            stderr,
        } => {
            println!("Submission failed: {reason}");
            if !stdout.is_empty() {
                println!("{}", stdout.trim());
            }
            if !stderr.is_empty() {
                eprintln!("{}", stderr.trim());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use reverso::io::write_parquet;
    use reverso::{ReversoError, SchedulerResponse};
    use tempfile::tempdir;

    struct Rejecting;

    impl Scheduler for Rejecting {
        fn submit(&self, _script: &Path) -> reverso::Result<SchedulerResponse> {
            Ok(SchedulerResponse {
                success: false,
                stdout: String::new(),
                stderr: "sbatch: error: invalid partition".into(),
            })
        }
    }

    struct Missing;

    impl Scheduler for Missing {
        fn submit(&self, _script: &Path) -> reverso::Result<SchedulerResponse> {
            Err(ReversoError::JobSubmission("could not run sbatch".into()))
        }
    }

    fn alphas_file(dir: &Path) -> std::path::PathBuf {
        let mut df = df! {
            "date" => &["2024-05-02"],
            "barrid" => &["A"],
            "alpha" => &[0.01],
        }
        .unwrap();
        let path = dir.join("alphas.parquet");
        write_parquet(&mut df, &path).unwrap();
        path
    }

    #[test]
    fn test_rejected_submission_is_not_an_error() {
        let dir = tempdir().unwrap();
        let alphas = alphas_file(dir.path());
        let cluster = ClusterConfig::new("me@example.edu", dir.path().join("root"));

        let result = submit_with(&alphas, None, "reversal", 50.0, false, &cluster, &Rejecting);
        assert!(result.is_ok());
        // checkpoint is written before the scheduler is called
        assert!(cluster.data_path().exists());
        assert!(cluster.experiment_path().exists());
    }

    #[test]
    fn test_unavailable_scheduler_is_not_an_error() {
        let dir = tempdir().unwrap();
        let alphas = alphas_file(dir.path());
        let cluster = ClusterConfig::new("me@example.edu", dir.path().join("root"));

        assert!(submit_with(&alphas, None, "reversal", 50.0, false, &cluster, &Missing).is_ok());
    }
}
