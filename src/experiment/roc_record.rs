//! ROC Record - per-column prediction quality of an experiment

use serde::{Deserialize, Serialize};

use crate::matrix::ColumnId;

/// Area under the ROC and precision-recall curves for one predicted column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RocRecord {
    experiment_id: String,
    column: ColumnId,
    auroc: f64,
    auprc: f64,
    threshold: Option<f64>,
}

impl RocRecord {
    /// Create a ROC record.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, column: ColumnId, auroc: f64, auprc: f64) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            column,
            auroc,
            auprc,
            threshold: None,
        }
    }

    /// Attach the score threshold the calculator chose.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the predicted column.
    #[must_use]
    pub const fn column(&self) -> ColumnId {
        self.column
    }

    /// Area under the ROC curve.
    #[must_use]
    pub const fn auroc(&self) -> f64 {
        self.auroc
    }

    /// Area under the precision-recall curve.
    #[must_use]
    pub const fn auprc(&self) -> f64 {
        self.auprc
    }

    /// Score threshold, if reported.
    #[must_use]
    pub const fn threshold(&self) -> Option<f64> {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_record_new() {
        let roc = RocRecord::new("exp-1", 42, 0.8, 0.3).with_threshold(0.5);
        assert_eq!(roc.experiment_id(), "exp-1");
        assert_eq!(roc.column(), 42);
        assert_eq!(roc.threshold(), Some(0.5));
    }
}
