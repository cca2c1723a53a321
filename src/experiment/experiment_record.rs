//! Experiment Record - classifier configuration for one predict matrix

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClassifierMethod, DistanceMeasure, ExperimentKind, OptionRegistry};
use crate::matrix::NodeId;
use crate::{Error, Result};

const fn default_min_genes() -> u32 {
    2
}
const fn default_distance_exponent() -> f64 {
    1.0
}
const fn default_max_distance() -> f64 {
    1.0
}

/// Experiment Record represents a configured cross-validation experiment.
///
/// The predict matrix is the (fractalized) matrix whose held-out test sets
/// are predicted; source matrices supply the evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    experiment_id: String,
    predict_matrix: NodeId,
    kind: ExperimentKind,
    method: ClassifierMethod,
    distance_measure: DistanceMeasure,
    k: u32,
    #[serde(default = "default_min_genes")]
    min_genes: u32,
    #[serde(default)]
    min_idf: f64,
    #[serde(default = "default_distance_exponent")]
    distance_exponent: f64,
    #[serde(default = "default_max_distance")]
    max_distance: f64,
    #[serde(default)]
    source_matrices: Vec<NodeId>,
    created_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Create a builder with the required fields.
    ///
    /// # Arguments
    ///
    /// * `experiment_id` - Unique identifier for the experiment
    /// * `predict_matrix` - Matrix whose test sets are predicted
    /// * `kind` - Predictor kind
    #[must_use]
    pub fn builder(
        experiment_id: impl Into<String>,
        predict_matrix: NodeId,
        kind: ExperimentKind,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(experiment_id, predict_matrix, kind)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the predict matrix.
    #[must_use]
    pub const fn predict_matrix(&self) -> NodeId {
        self.predict_matrix
    }

    /// Get the predictor kind.
    #[must_use]
    pub const fn kind(&self) -> ExperimentKind {
        self.kind
    }

    /// Get the classifier method.
    #[must_use]
    pub const fn method(&self) -> ClassifierMethod {
        self.method
    }

    /// Get the distance measure.
    #[must_use]
    pub const fn distance_measure(&self) -> DistanceMeasure {
        self.distance_measure
    }

    /// Get the neighbor count.
    #[must_use]
    pub const fn k(&self) -> u32 {
        self.k
    }

    /// Minimum rows a column needs to be predicted.
    #[must_use]
    pub const fn min_genes(&self) -> u32 {
        self.min_genes
    }

    /// Minimum inverse document frequency.
    #[must_use]
    pub const fn min_idf(&self) -> f64 {
        self.min_idf
    }

    /// Exponent applied to distances.
    #[must_use]
    pub const fn distance_exponent(&self) -> f64 {
        self.distance_exponent
    }

    /// Neighbors further than this are ignored.
    #[must_use]
    pub const fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Get the source matrices.
    #[must_use]
    pub fn source_matrices(&self) -> &[NodeId] {
        &self.source_matrices
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `"{method} {distance} k={k} [predicting {matrix}]"`.
    #[must_use]
    pub fn title(&self) -> String {
        format!(
            "{} {} k={} [predicting {}]",
            self.method, self.distance_measure, self.k, self.predict_matrix
        )
    }

    /// Check options against `registry` and numeric ranges.
    ///
    /// # Errors
    /// `InvalidInput` describing the first violation.
    pub fn validate(&self, registry: &OptionRegistry) -> Result<()> {
        if !registry.allows_method(self.kind, self.method) {
            return Err(Error::InvalidInput(format!(
                "method '{}' is not available for {:?} experiments",
                self.method, self.kind
            )));
        }
        if !registry.allows_distance_measure(self.kind, self.distance_measure) {
            return Err(Error::InvalidInput(format!(
                "distance function '{}' is not available for {:?} experiments",
                self.distance_measure, self.kind
            )));
        }
        if self.k == 0 {
            return Err(Error::InvalidInput("k should be greater than 0".to_string()));
        }
        if self.max_distance.is_nan() || self.max_distance <= 0.0 || self.max_distance > 1.0 {
            return Err(Error::InvalidInput(format!(
                "max_distance should be positive and at most 1.0, got {}",
                self.max_distance
            )));
        }
        if self.min_idf.is_nan() || self.min_idf < 0.0 {
            return Err(Error::InvalidInput(format!(
                "min_idf should be non-negative, got {}",
                self.min_idf
            )));
        }
        Ok(())
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    record: ExperimentRecord,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields. Defaults to naive Bayes
    /// with the hypergeometric distance and `k = 10`.
    #[must_use]
    pub fn new(
        experiment_id: impl Into<String>,
        predict_matrix: NodeId,
        kind: ExperimentKind,
    ) -> Self {
        Self {
            record: ExperimentRecord {
                experiment_id: experiment_id.into(),
                predict_matrix,
                kind,
                method: ClassifierMethod::NaiveBayes,
                distance_measure: DistanceMeasure::Hypergeometric,
                k: 10,
                min_genes: default_min_genes(),
                min_idf: 0.0,
                distance_exponent: default_distance_exponent(),
                max_distance: default_max_distance(),
                source_matrices: Vec::new(),
                created_at: Utc::now(),
            },
        }
    }

    /// Set the classifier method.
    #[must_use]
    pub const fn method(mut self, method: ClassifierMethod) -> Self {
        self.record.method = method;
        self
    }

    /// Set the distance measure.
    #[must_use]
    pub const fn distance_measure(mut self, measure: DistanceMeasure) -> Self {
        self.record.distance_measure = measure;
        self
    }

    /// Set the neighbor count.
    #[must_use]
    pub const fn k(mut self, k: u32) -> Self {
        self.record.k = k;
        self
    }

    /// Set the minimum rows per column.
    #[must_use]
    pub const fn min_genes(mut self, min_genes: u32) -> Self {
        self.record.min_genes = min_genes;
        self
    }

    /// Set the minimum inverse document frequency.
    #[must_use]
    pub const fn min_idf(mut self, min_idf: f64) -> Self {
        self.record.min_idf = min_idf;
        self
    }

    /// Set the distance exponent.
    #[must_use]
    pub const fn distance_exponent(mut self, exponent: f64) -> Self {
        self.record.distance_exponent = exponent;
        self
    }

    /// Set the maximum distance.
    #[must_use]
    pub const fn max_distance(mut self, max_distance: f64) -> Self {
        self.record.max_distance = max_distance;
        self
    }

    /// Add a source matrix.
    #[must_use]
    pub fn source(mut self, matrix: NodeId) -> Self {
        self.record.source_matrices.push(matrix);
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        self.record
    }
}
