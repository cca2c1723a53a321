//! Run Record - one execution of an experiment by the analysis runner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format of run file suffixes.
pub const FILE_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is created but not yet started.
    Pending,
    /// Run is currently executing.
    Running,
    /// Runner exited with status 0.
    Success,
    /// Runner exited with a non-zero status, or could not be started.
    Failed,
    /// Run was cancelled by user or system.
    Cancelled,
}

impl RunStatus {
    /// True once the run can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

/// Run Record represents a single execution of an experiment.
///
/// Log, error log and results names carry the UTC start time as a suffix,
/// so repeated runs in one experiment directory do not collide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    run_id: String,
    experiment_id: String,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    run_result: Option<i32>,
}

impl RunRecord {
    /// Create a new run record in Pending status.
    ///
    /// # Arguments
    ///
    /// * `run_id` - Unique identifier for the run
    /// * `experiment_id` - ID of the parent experiment
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            experiment_id: experiment_id.into(),
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            run_result: None,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has completed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Exit status reported by the runner.
    #[must_use]
    pub const fn run_result(&self) -> Option<i32> {
        self.run_result
    }

    /// Start the run, transitioning from Pending to Running.
    ///
    /// Sets the `started_at` timestamp to now.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Complete the run with the given final status.
    ///
    /// Sets the `ended_at` timestamp to now.
    pub fn complete(&mut self, status: RunStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }

    /// Record the runner's exit status and complete as Success (0) or Failed.
    pub fn finish(&mut self, exit_code: i32) {
        self.run_result = Some(exit_code);
        self.complete(if exit_code == 0 {
            RunStatus::Success
        } else {
            RunStatus::Failed
        });
    }

    /// `YYYYmmddHHMMSS` of the start time (now if not started).
    #[must_use]
    pub fn file_suffix(&self) -> String {
        self.started_at
            .unwrap_or_else(Utc::now)
            .format(FILE_SUFFIX_FORMAT)
            .to_string()
    }

    /// Runner stdout file name.
    #[must_use]
    pub fn log_file(&self) -> String {
        format!("log.{}", self.file_suffix())
    }

    /// Runner stderr file name.
    #[must_use]
    pub fn error_log_file(&self) -> String {
        format!("error_log.{}", self.file_suffix())
    }

    /// Prediction results directory name.
    #[must_use]
    pub fn results_dir(&self) -> String {
        format!("results.{}", self.file_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_default() {
        let run = RunRecord::new("run-1", "exp-1");
        assert_eq!(run.status(), RunStatus::Pending);
        assert!(!run.status().is_terminal());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = RunRecord::new("run-1", "exp-1");
        run.start();
        assert_eq!(run.status(), RunStatus::Running);
        run.finish(0);
        assert_eq!(run.status(), RunStatus::Success);
        assert_eq!(run.run_result(), Some(0));
        assert!(run.ended_at().is_some());
    }

    #[test]
    fn test_nonzero_exit_fails() {
        let mut run = RunRecord::new("run-1", "exp-1");
        run.start();
        run.finish(2);
        assert_eq!(run.status(), RunStatus::Failed);
    }

    #[test]
    fn test_file_names_share_suffix() {
        let mut run = RunRecord::new("run-1", "exp-1");
        run.start();
        let suffix = run.file_suffix();
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(run.log_file(), format!("log.{suffix}"));
        assert_eq!(run.error_log_file(), format!("error_log.{suffix}"));
        assert_eq!(run.results_dir(), format!("results.{suffix}"));
    }
}
