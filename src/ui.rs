//! Terminal output: a spinner while jobs run, colored status lines after.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::jobs::{Job, JobStatus};

/// Spinner shown while jobs run, plus the colored result lines printed after.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl JobProgress {
    /// Start the spinner with an initial message.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Show how many of the submitted jobs are in each state.
    pub fn update(&self, jobs: &[Job]) {
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        self.pb.set_message(format!(
            "{} pending, {} running, {} done",
            count(JobStatus::Pending),
            count(JobStatus::Running),
            count(JobStatus::Completed) + count(JobStatus::Failed),
        ));
    }

    /// Remove the spinner from the terminal.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    /// One colored line with the outcome of `job`.
    pub fn print_job(&self, label: &str, job: &Job) {
        match job.status {
            JobStatus::Completed => println!(
                "  {} {label}: {}",
                self.green.apply_to("✓"),
                job.result
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            JobStatus::Failed => println!(
                "  {} {label}: {}",
                self.red.apply_to("✗"),
                job.error.as_deref().unwrap_or_default()
            ),
            status => println!("  {} {label}: {status}", self.dim.apply_to("…")),
        }
        println!("    {}", self.dim.apply_to(format!("job {}", job.id)));
    }

    /// Dump the final job records as a JSON array on stdout.
    pub fn print_json(&self, jobs: &[Job]) {
        println!("{}", serde_json::to_string_pretty(jobs).unwrap_or_default());
    }
}
