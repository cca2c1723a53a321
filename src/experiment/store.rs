//! Experiment Store - in-memory storage for experiment tracking data

use std::collections::HashMap;

use super::{ExperimentRecord, RocRecord, RunRecord};

/// In-memory store for experiment tracking data.
///
/// ## Design
///
/// Experiments and runs live in hash maps keyed by ID. ROC records are
/// keyed by `(experiment, column)`: recording a column twice replaces the
/// earlier value, so re-running an experiment does not double count.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    experiments: HashMap<String, ExperimentRecord>,
    runs: HashMap<String, RunRecord>,
    rocs: Vec<RocRecord>,
}

impl ExperimentStore {
    /// Create a new empty experiment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty (no experiments, runs, or ROCs).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.runs.is_empty() && self.rocs.is_empty()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Get the number of runs in the store.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the number of ROC records in the store.
    #[must_use]
    pub fn roc_count(&self) -> usize {
        self.rocs.len()
    }

    /// Add an experiment to the store.
    pub fn add_experiment(&mut self, experiment: ExperimentRecord) {
        self.experiments
            .insert(experiment.experiment_id().to_string(), experiment);
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<&ExperimentRecord> {
        self.experiments.get(experiment_id)
    }

    /// Add or replace a run.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Get all runs for an experiment, oldest first.
    #[must_use]
    pub fn get_runs_for_experiment(&self, experiment_id: &str) -> Vec<&RunRecord> {
        let mut runs: Vec<&RunRecord> = self
            .runs
            .values()
            .filter(|run| run.experiment_id() == experiment_id)
            .collect();
        runs.sort_by_key(|run| (run.started_at(), run.run_id().to_string()));
        runs
    }

    /// Record a ROC, replacing any earlier one for the same column.
    pub fn add_roc(&mut self, roc: RocRecord) {
        match self
            .rocs
            .iter_mut()
            .find(|r| r.experiment_id() == roc.experiment_id() && r.column() == roc.column())
        {
            Some(existing) => *existing = roc,
            None => self.rocs.push(roc),
        }
    }

    /// ROCs of an experiment, ordered by column.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use phenomatrix::experiment::{ExperimentStore, RocRecord};
    ///
    /// let mut store = ExperimentStore::new();
    /// store.add_roc(RocRecord::new("exp-1", 9, 0.7, 0.2));
    /// store.add_roc(RocRecord::new("exp-1", 3, 0.9, 0.4));
    ///
    /// let rocs = store.get_rocs_for_experiment("exp-1");
    /// assert_eq!(rocs[0].column(), 3);
    /// assert!((store.mean_auroc("exp-1").unwrap() - 0.8).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn get_rocs_for_experiment(&self, experiment_id: &str) -> Vec<RocRecord> {
        let mut rocs: Vec<RocRecord> = self
            .rocs
            .iter()
            .filter(|r| r.experiment_id() == experiment_id)
            .cloned()
            .collect();

        rocs.sort_by_key(RocRecord::column);

        rocs
    }

    /// Mean AUROC over all columns, `None` without ROCs.
    #[must_use]
    pub fn mean_auroc(&self, experiment_id: &str) -> Option<f64> {
        self.mean_of(experiment_id, RocRecord::auroc)
    }

    /// Mean AUPRC over all columns, `None` without ROCs.
    #[must_use]
    pub fn mean_auprc(&self, experiment_id: &str) -> Option<f64> {
        self.mean_of(experiment_id, RocRecord::auprc)
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean_of(&self, experiment_id: &str, value: fn(&RocRecord) -> f64) -> Option<f64> {
        let values: Vec<f64> = self
            .rocs
            .iter()
            .filter(|r| r.experiment_id() == experiment_id)
            .map(value)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}
