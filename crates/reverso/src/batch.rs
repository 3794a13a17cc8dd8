//! Cluster job-array submission for the per-year optimizer runs.
//!
//! Each year of the alpha checkpoint becomes one task of a SLURM job
//! array; the tasks share nothing but the read-only checkpoint and
//! experiment configuration, and write disjoint
//! `weights/{signal}/{gamma}/{year}.parquet` files. Submission is
//! a single synchronous `sbatch` call whose failure is logged and returned
//! as [`SubmissionOutcome::Failed`], never retried.

use crate::config::ExperimentConfig;
use crate::io;
use crate::optimize;
use polars::prelude::DataFrame;
use reverso_traits::{ReversoError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable holding the notification email.
pub const EMAIL_VAR: &str = "RESEARCH_EMAIL";

/// Environment variable holding the project root.
pub const PROJECT_ROOT_VAR: &str = "PROJECT_ROOT";

/// Cluster settings for job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Address notified on job begin, end and failure
    pub email: String,
    /// Root of the checkpoint, weights and logs directories
    pub project_root: PathBuf,
    /// Scheduler job name (default: `reversal_backtest`)
    pub job_name: String,
    /// Memory per task (default: `32G`)
    pub memory: String,
    /// Wall-clock limit per task (default: `06:00:00`)
    pub time_limit: String,
    /// Array tasks allowed to run at once (default: 31)
    pub max_concurrent: usize,
    /// Executable invoked by each task (default: `reverso`)
    pub program: String,
}

impl ClusterConfig {
    /// Creates a configuration with default resource limits.
    pub fn new(email: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            email: email.into(),
            project_root: project_root.into(),
            job_name: "reversal_backtest".to_string(),
            memory: "32G".to_string(),
            time_limit: "06:00:00".to_string(),
            max_concurrent: 31,
            program: "reverso".to_string(),
        }
    }

    /// Reads `RESEARCH_EMAIL` and `PROJECT_ROOT`, loading a `.env` file
    /// first if one exists.
    ///
    /// # Errors
    ///
    /// Returns a config error if either variable is missing or empty.
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ReversoError::Config(format!("{key} is not set")))
        };
        let config = Self::new(required(EMAIL_VAR)?, required(PROJECT_ROOT_VAR)?);
        config.validate()?;
        Ok(config)
    }

    /// Checks resource settings and the values pasted into the batch script.
    ///
    /// # Errors
    ///
    /// Returns a config error for a zero concurrency limit, an empty
    /// project root, or a setting containing whitespace, quotes, `$`,
    /// backticks or backslashes.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(ReversoError::Config("max_concurrent must be positive".into()));
        }
        if self.project_root.as_os_str().is_empty() {
            return Err(ReversoError::Config("project root is empty".into()));
        }
        let root = self.project_root.to_str().ok_or_else(|| {
            ReversoError::Config(format!(
                "project root {} is not valid UTF-8",
                self.project_root.display()
            ))
        })?;
        for (key, value) in [
            (PROJECT_ROOT_VAR, root),
            (EMAIL_VAR, self.email.as_str()),
            ("job_name", self.job_name.as_str()),
            ("memory", self.memory.as_str()),
            ("time_limit", self.time_limit.as_str()),
            ("program", self.program.as_str()),
        ] {
            check_script_value(key, value)?;
        }
        Ok(())
    }

    /// Alpha checkpoint read by every task.
    pub fn data_path(&self) -> PathBuf {
        io::alphas_path(&self.project_root)
    }

    /// Experiment configuration read by every task.
    pub fn experiment_path(&self) -> PathBuf {
        io::experiment_path(&self.project_root)
    }

    /// Log directory of one (signal, gamma).
    pub fn logs_dir(&self, signal: &str, gamma: f64) -> PathBuf {
        self.project_root
            .join("logs")
            .join(signal)
            .join(gamma.to_string())
    }
}

/// Rejects characters the shell would expand or split inside the script.
fn check_script_value(key: &str, value: &str) -> Result<()> {
    match value
        .chars()
        .find(|c| c.is_whitespace() || matches!(*c, '"' | '\'' | '$' | '`' | '\\'))
    {
        Some(c) => Err(ReversoError::Config(format!(
            "{key} contains {c:?}, which cannot be used in a batch script"
        ))),
        None => Ok(()),
    }
}

/// One job array: a year per task.
#[derive(Debug, Clone)]
pub struct JobArray {
    /// Signal name keying the output paths
    pub signal: String,
    /// Risk aversion
    pub gamma: f64,
    /// CPUs per task
    pub n_cpus: usize,
    /// Years to optimize, one task each
    pub years: Vec<i32>,
}

impl JobArray {
    /// One task per year of `years`, sized by the experiment.
    pub fn from_experiment(experiment: &ExperimentConfig, years: Vec<i32>) -> Self {
        Self {
            signal: experiment.name.clone(),
            gamma: experiment.gamma,
            n_cpus: experiment.n_cpus,
            years,
        }
    }

    /// Renders the batch script.
    pub fn render_script(&self, cluster: &ClusterConfig) -> Result<String> {
        if self.years.is_empty() {
            return Err(ReversoError::InsufficientData("no years to submit".into()));
        }
        if self.n_cpus == 0 {
            return Err(ReversoError::Config("n_cpus must be positive".into()));
        }
        check_script_value("signal", &self.signal)?;
        let logs = cluster.logs_dir(&self.signal, self.gamma);
        let output_dir = io::weights_dir(&cluster.project_root, &self.signal, self.gamma);
        let years = self
            .years
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        let mut script = String::new();
        let mut line = |s: String| {
            script.push_str(&s);
            script.push('\n');
        };
        line("#!/bin/bash".into());
        line(format!("#SBATCH --job-name={}", cluster.job_name));
        line(format!("#SBATCH --output={}/backtest_%A_%a.out", logs.display()));
        line(format!("#SBATCH --error={}/backtest_%A_%a.err", logs.display()));
        line(format!(
            "#SBATCH --array=0-{}%{}",
            self.years.len() - 1,
            cluster.max_concurrent
        ));
        line(format!("#SBATCH --cpus-per-task={}", self.n_cpus));
        line(format!("#SBATCH --mem={}", cluster.memory));
        line(format!("#SBATCH --time={}", cluster.time_limit));
        line(format!("#SBATCH --mail-user={}", cluster.email));
        line("#SBATCH --mail-type=BEGIN,END,FAIL".into());
        line(String::new());
        line(format!("DATA_PATH=\"{}\"", cluster.data_path().display()));
        line(format!("OUTPUT_DIR=\"{}\"", output_dir.display()));
        line(format!("CONFIG_PATH=\"{}\"", cluster.experiment_path().display()));
        line(format!("GAMMA=\"{}\"", self.gamma));
        line(format!("N_CPUS=\"{}\"", self.n_cpus));
        line(String::new());
        line(format!("years=({years})"));
        line("num_years=${#years[@]}".into());
        line(String::new());
        line("if [ \"$SLURM_ARRAY_TASK_ID\" -ge \"$num_years\" ]; then".into());
        line("  echo \"Task ID $SLURM_ARRAY_TASK_ID is out of range (max $((num_years-1))).\"".into());
        line("  exit 1".into());
        line("fi".into());
        line(String::new());
        line("year=${years[$SLURM_ARRAY_TASK_ID]}".into());
        line("echo \"Running year=$year\"".into());

        line(format!(
            "srun {} mvo --data_path \"$DATA_PATH\" --gamma \"$GAMMA\" --year \"$year\" \
             --output_dir \"$OUTPUT_DIR\" --n_cpus \"$N_CPUS\" --config \"$CONFIG_PATH\"",
            cluster.program
        ));
        Ok(script)
    }
}

/// Raw result of a scheduler call.
#[derive(Debug, Clone)]
pub struct SchedulerResponse {
    /// Whether the scheduler accepted the job
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// A batch scheduler that accepts a script file.
pub trait Scheduler {
    /// Submits the script at `script`.
    ///
    /// # Errors
    ///
    /// Returns an error when the scheduler cannot be invoked at all.
    fn submit(&self, script: &Path) -> Result<SchedulerResponse>;
}

/// SLURM `sbatch`.
#[derive(Debug, Clone)]
pub struct Sbatch {
    program: String,
}

impl Default for Sbatch {
    fn default() -> Self {
        Self {
            program: "sbatch".to_string(),
        }
    }
}

impl Scheduler for Sbatch {
    fn submit(&self, script: &Path) -> Result<SchedulerResponse> {
        let output = Command::new(&self.program)
            .arg(script)
            .output()
            .map_err(|e| {
                ReversoError::JobSubmission(format!(
                    "could not run {}: {e}. Is this a SLURM host?",
                    self.program
                ))
            })?;
        Ok(SchedulerResponse {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The scheduler accepted the array.
    Submitted {
        /// Job id parsed from `Submitted batch job <id>`
        job_id: Option<String>,
        /// Scheduler output
        stdout: String,
    },
    /// The scheduler rejected the array or could not be run.
    Failed {
        /// Failure description
        reason: String,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },
    /// Nothing was submitted; the rendered script is returned.
    DryRun {
        /// Batch script
        script: String,
    },
}

fn parse_job_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix("Submitted batch job "))
        .map(|id| id.trim().to_string())
}

/// Writes the alpha checkpoint and experiment configuration, then submits
/// one optimizer task per year.
///
/// The array is keyed by the experiment's name and gamma; each task reads
/// the constraint set back from the written configuration. Checkpoint,
/// weights and log directories are created first. Scheduler failures do
/// not produce an `Err`: they are logged with the captured output and
/// reported as [`SubmissionOutcome::Failed`].
pub fn submit_backtest(
    alphas: &mut DataFrame,
    experiment: &ExperimentConfig,
    cluster: &ClusterConfig,
    scheduler: &dyn Scheduler,
    dry_run: bool,
) -> Result<SubmissionOutcome> {
    cluster.validate()?;
    experiment.validate()?;
    let job = JobArray::from_experiment(experiment, optimize::years(alphas)?);
    let script = job.render_script(cluster)?;
    let (signal, gamma) = (job.signal.as_str(), job.gamma);

    std::fs::create_dir_all(io::weights_dir(&cluster.project_root, signal, gamma))?;
    std::fs::create_dir_all(cluster.logs_dir(signal, gamma))?;
    io::write_parquet(alphas, cluster.data_path())?;
    io::write_experiment(experiment, cluster.experiment_path())?;

    if dry_run {
        tracing::info!(signal, gamma, years = job.years.len(), "dry run, job not submitted");
        return Ok(SubmissionOutcome::DryRun { script });
    }

    let mut file = tempfile::Builder::new().suffix(".sh").tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;

    let outcome = match scheduler.submit(file.path()) {
        Ok(response) if response.success => {
            let job_id = parse_job_id(&response.stdout);
            tracing::info!(?job_id, signal, gamma, tasks = job.years.len(), "job submitted");
            if !response.stderr.is_empty() {
                tracing::warn!(stderr = %response.stderr, "scheduler wrote to stderr");
            }
            SubmissionOutcome::Submitted {
                job_id,
                stdout: response.stdout,
            }
        }
        Ok(response) => {
            tracing::error!(
                stdout = %response.stdout,
                stderr = %response.stderr,
                "error submitting job"
            );
            SubmissionOutcome::Failed {
                reason: "scheduler rejected the job".to_string(),
                stdout: response.stdout,
                stderr: response.stderr,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "error submitting job");
            SubmissionOutcome::Failed {
                reason: e.to_string(),
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    };
    Ok(outcome)
}
