//! Experiment execution against an external analysis runner
//!
//! ```text
//! {work_root}/matrix_{predict}/                  prepared by the exporter
//! {work_root}/matrix_{predict}/experiment_{id}/  test sets copied here,
//!                                                runner logs and results
//! ```
//!
//! The prediction math lives outside this crate behind [`AnalysisRunner`],
//! and ROC statistics behind [`RocCalculator`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::{ExperimentRecord, ExperimentStore, OptionRegistry, RocRecord, RunRecord, RunStatus};
use crate::export::Exporter;
use crate::matrix::NodeId;
use crate::store::MatrixStore;
use crate::{Error, Result};

/// Files and directories of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Experiment directory (working directory of the runner)
    pub dir: PathBuf,
    /// Runner stdout
    pub log_file: PathBuf,
    /// Runner stderr
    pub error_log_file: PathBuf,
    /// Where the runner writes predictions
    pub results_dir: PathBuf,
    /// Test-set file names inside `dir`
    pub test_sets: Vec<String>,
}

/// Runs the prediction binary for an experiment.
pub trait AnalysisRunner {
    /// Run and return the exit status (0 is success).
    ///
    /// # Errors
    /// Returns error if the runner could not be started at all.
    fn run(&self, experiment: &ExperimentRecord, context: &RunContext) -> Result<i32>;
}

/// Turns prediction results into ROC records.
pub trait RocCalculator {
    /// Compute one record per predicted column.
    ///
    /// # Errors
    /// Returns error if the results cannot be read.
    fn calculate(
        &self,
        experiment: &ExperimentRecord,
        results_dir: &Path,
    ) -> Result<Vec<RocRecord>>;
}

/// Experiment directory below the predict matrix's directory.
#[must_use]
pub fn experiment_dir<S: MatrixStore + ?Sized>(
    exporter: &Exporter<'_, S>,
    experiment: &ExperimentRecord,
) -> PathBuf {
    exporter
        .node_dir(experiment.predict_matrix())
        .join(format!("experiment_{}", experiment.experiment_id()))
}

/// Create the experiment directory and copy the predict matrix's test sets
/// into it. An existing directory is left as is. Returns the test-set names.
///
/// # Errors
/// Export errors from preparing the predict matrix or copying files.
pub fn prepare_experiment<S: MatrixStore + ?Sized>(
    exporter: &Exporter<'_, S>,
    experiment: &ExperimentRecord,
) -> Result<Vec<String>> {
    let predict = experiment.predict_matrix();
    let prepared = exporter.prepare_inputs(predict)?;
    let source_dir = prepared.dir().to_path_buf();

    let test_sets: Vec<String> = exporter
        .children_filenames(predict)?
        .into_iter()
        .filter(|name| source_dir.join(name).is_file())
        .collect();

    let dir = experiment_dir(exporter, experiment);
    if dir.exists() {
        return Ok(test_sets);
    }

    info!(
        experiment = experiment.experiment_id(),
        dir = %dir.display(),
        "Preparing new inputs for experiment"
    );
    fs::create_dir_all(&dir).map_err(|source| export_error(predict, &dir, source))?;
    for name in &test_sets {
        let target = dir.join(name);
        fs::copy(source_dir.join(name), &target)
            .map_err(|source| export_error(predict, &target, source))?;
    }
    Ok(test_sets)
}

fn export_error(node: NodeId, path: &Path, source: std::io::Error) -> Error {
    Error::Export {
        node,
        path: path.to_path_buf(),
        source,
    }
}

/// Validate, prepare and run an experiment, recording the run and (on exit
/// status 0) its ROCs in `tracking`.
///
/// # Errors
/// `InvalidInput` for an unknown or invalid experiment, export errors, or
/// errors from the runner or calculator. The run is recorded as Failed if
/// the runner could not start.
pub fn run_experiment<S, A, C>(
    exporter: &Exporter<'_, S>,
    tracking: &mut ExperimentStore,
    registry: &OptionRegistry,
    experiment_id: &str,
    run_id: &str,
    runner: &A,
    calculator: &C,
) -> Result<RunRecord>
where
    S: MatrixStore + ?Sized,
    A: AnalysisRunner + ?Sized,
    C: RocCalculator + ?Sized,
{
    let experiment = tracking
        .get_experiment(experiment_id)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("unknown experiment '{experiment_id}'")))?;
    experiment.validate(registry)?;

    let test_sets = prepare_experiment(exporter, &experiment)?;
    let dir = experiment_dir(exporter, &experiment);

    let mut run = RunRecord::new(run_id, experiment_id);
    run.start();
    tracking.add_run(run.clone());

    let context = RunContext {
        log_file: dir.join(run.log_file()),
        error_log_file: dir.join(run.error_log_file()),
        results_dir: dir.join(run.results_dir()),
        test_sets,
        dir,
    };

    let exit_code = match runner.run(&experiment, &context) {
        Ok(code) => code,
        Err(e) => {
            run.complete(RunStatus::Failed);
            tracking.add_run(run);
            return Err(e);
        }
    };
    run.finish(exit_code);
    tracking.add_run(run.clone());

    if exit_code != 0 {
        error!(experiment = experiment_id, exit_code, "Execution error for analysis runner");
        return Ok(run);
    }

    for roc in calculator.calculate(&experiment, &context.results_dir)? {
        tracking.add_roc(roc);
    }
    info!(
        experiment = experiment_id,
        rocs = tracking.get_rocs_for_experiment(experiment_id).len(),
        mean_auroc = tracking.mean_auroc(experiment_id),
        "Experiment completed"
    );
    Ok(run)
}
