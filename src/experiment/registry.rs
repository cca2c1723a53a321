//! Option registry - which classifier options each experiment kind accepts

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of predictor an experiment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    /// k-nearest-neighbor cross-validation
    Knn,
    /// Distribution-based predictor
    John,
}

/// Classifier method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMethod {
    /// Naive Bayes over neighbors
    NaiveBayes,
    /// Partial Bayes
    PartialBayes,
    /// Neighbor average
    Average,
    /// Simple vote
    Simple,
}

/// Distance measure between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMeasure {
    /// Hypergeometric
    Hypergeometric,
    /// Manhattan
    Manhattan,
    /// Euclidean
    Euclidean,
    /// Jaccard
    Jaccard,
    /// Sorensen
    Sorensen,
    /// Cosine similarity
    Cosine,
    /// Tanimoto coefficient
    Tanimoto,
    /// Pearson correlation
    Pearson,
}

impl ClassifierMethod {
    /// Name passed to the analysis runner.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NaiveBayes => "naivebayes",
            Self::PartialBayes => "partialbayes",
            Self::Average => "average",
            Self::Simple => "simple",
        }
    }
}

impl DistanceMeasure {
    /// Every measure.
    pub const ALL: [Self; 8] = [
        Self::Hypergeometric,
        Self::Manhattan,
        Self::Euclidean,
        Self::Jaccard,
        Self::Sorensen,
        Self::Cosine,
        Self::Tanimoto,
        Self::Pearson,
    ];

    /// Name passed to the analysis runner.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hypergeometric => "hypergeometric",
            Self::Manhattan => "manhattan",
            Self::Euclidean => "euclidean",
            Self::Jaccard => "jaccard",
            Self::Sorensen => "sorensen",
            Self::Cosine => "cosine",
            Self::Tanimoto => "tanimoto",
            Self::Pearson => "pearson",
        }
    }
}

impl fmt::Display for ClassifierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct KindOptions {
    methods: BTreeSet<ClassifierMethod>,
    distance_measures: BTreeSet<DistanceMeasure>,
}

/// Allowed methods and distance measures per experiment kind.
///
/// ```rust
/// use phenomatrix::experiment::{ClassifierMethod, ExperimentKind, OptionRegistry};
///
/// let registry = OptionRegistry::standard();
/// assert!(registry.allows_method(ExperimentKind::Knn, ClassifierMethod::Average));
/// assert!(!registry.allows_method(ExperimentKind::John, ClassifierMethod::Average));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    knn: KindOptions,
    john: KindOptions,
}

impl OptionRegistry {
    /// Registry with nothing allowed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard option table.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for method in [
            ClassifierMethod::NaiveBayes,
            ClassifierMethod::Average,
            ClassifierMethod::Simple,
        ] {
            registry.allow_method(ExperimentKind::Knn, method);
        }
        for method in [ClassifierMethod::NaiveBayes, ClassifierMethod::PartialBayes] {
            registry.allow_method(ExperimentKind::John, method);
        }
        for measure in DistanceMeasure::ALL {
            registry.allow_distance_measure(ExperimentKind::Knn, measure);
            registry.allow_distance_measure(ExperimentKind::John, measure);
        }
        registry
    }

    const fn options(&self, kind: ExperimentKind) -> &KindOptions {
        match kind {
            ExperimentKind::Knn => &self.knn,
            ExperimentKind::John => &self.john,
        }
    }

    fn options_mut(&mut self, kind: ExperimentKind) -> &mut KindOptions {
        match kind {
            ExperimentKind::Knn => &mut self.knn,
            ExperimentKind::John => &mut self.john,
        }
    }

    /// Allow a method for a kind.
    pub fn allow_method(&mut self, kind: ExperimentKind, method: ClassifierMethod) {
        self.options_mut(kind).methods.insert(method);
    }

    /// Allow a distance measure for a kind.
    pub fn allow_distance_measure(&mut self, kind: ExperimentKind, measure: DistanceMeasure) {
        self.options_mut(kind).distance_measures.insert(measure);
    }

    /// True if `method` is allowed for `kind`.
    #[must_use]
    pub fn allows_method(&self, kind: ExperimentKind, method: ClassifierMethod) -> bool {
        self.options(kind).methods.contains(&method)
    }

    /// True if `measure` is allowed for `kind`.
    #[must_use]
    pub fn allows_distance_measure(&self, kind: ExperimentKind, measure: DistanceMeasure) -> bool {
        self.options(kind).distance_measures.contains(&measure)
    }

    /// Allowed methods for `kind`, in a stable order.
    #[must_use]
    pub fn methods(&self, kind: ExperimentKind) -> Vec<ClassifierMethod> {
        self.options(kind).methods.iter().copied().collect()
    }

    /// Allowed distance measures for `kind`, in a stable order.
    #[must_use]
    pub fn distance_measures(&self, kind: ExperimentKind) -> Vec<DistanceMeasure> {
        self.options(kind).distance_measures.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let registry = OptionRegistry::standard();
        assert_eq!(registry.methods(ExperimentKind::Knn).len(), 3);
        assert_eq!(registry.methods(ExperimentKind::John).len(), 2);
        assert_eq!(registry.distance_measures(ExperimentKind::Knn).len(), 8);
        assert!(!registry.allows_method(ExperimentKind::Knn, ClassifierMethod::PartialBayes));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DistanceMeasure::Cosine).unwrap();
        assert_eq!(json, "\"cosine\"");
        let method: ClassifierMethod = serde_json::from_str("\"naivebayes\"").unwrap();
        assert_eq!(method, ClassifierMethod::NaiveBayes);
        assert_eq!(method.to_string(), "naivebayes");
    }
}
