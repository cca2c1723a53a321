//! Experiment Tracking
//!
//! Records of classifier experiments over a fractalized predict matrix, the
//! runs that executed them and the ROC statistics they produced.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!        │
//!        └──< RocRecord (N) [one per predicted column]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use phenomatrix::experiment::{
//!     DistanceMeasure, ExperimentKind, ExperimentRecord, OptionRegistry, RunRecord, RunStatus,
//! };
//! use phenomatrix::matrix::NodeId;
//!
//! // Configure an experiment
//! let experiment = ExperimentRecord::builder("exp-001", NodeId(1), ExperimentKind::Knn)
//!     .distance_measure(DistanceMeasure::Cosine)
//!     .k(5)
//!     .build();
//! experiment.validate(&OptionRegistry::standard())?;
//!
//! // Start a run
//! let mut run = RunRecord::new("run-001", experiment.experiment_id());
//! run.start();
//!
//! // Complete the run with the runner's exit status
//! run.finish(0);
//! assert_eq!(run.status(), RunStatus::Success);
//! # Ok::<(), phenomatrix::Error>(())
//! ```

mod experiment_record;
mod registry;
mod roc_record;
mod run_record;
mod runner;
mod store;

pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder};
pub use registry::{ClassifierMethod, DistanceMeasure, ExperimentKind, OptionRegistry};
pub use roc_record::RocRecord;
pub use run_record::{RunRecord, RunStatus, FILE_SUFFIX_FORMAT};
pub use runner::{
    experiment_dir, prepare_experiment, run_experiment, AnalysisRunner, RocCalculator, RunContext,
};
pub use store::ExperimentStore;
