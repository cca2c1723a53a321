//! Error types for phenomatrix
//!
//! Every variant maps onto one [`ErrorKind`] so callers (and the job
//! orchestrator wrapping the engine) can decide whether to surface, skip or
//! abort without matching on individual variants.

use std::path::PathBuf;

use thiserror::Error;

use crate::matrix::NodeId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tree or store integrity violated. Fatal, never retried.
    Integrity,
    /// Bad caller input (file lines, options, configuration). Recoverable.
    Input,
    /// A partially built tree level was found. Fatal, needs manual cleanup.
    ConcurrencyHazard,
    /// Storage or filesystem failure.
    Storage,
}

/// phenomatrix error types
#[derive(Error, Debug)]
pub enum Error {
    /// A node references a parent that is not in the store
    #[error("Integrity error: node {node} references missing parent {parent}")]
    DanglingParent {
        /// Node whose parent could not be found
        node: NodeId,
        /// The missing parent id
        parent: NodeId,
    },

    /// The parent chain of a node loops back on itself
    #[error("Integrity error: parent chain of node {0} contains a cycle")]
    ParentCycle(NodeId),

    /// Node id not present in the store
    #[error("Integrity error: node {0} does not exist")]
    NodeNotFound(NodeId),

    /// Node already has children (or a fold marker); fractalize must not run twice
    #[error("Integrity error: node {node} has already been fractalized ({children} children)\n\
        Copy the matrix and fractalize the copy instead.")]
    AlreadyFractalized {
        /// Node that was fractalized before
        node: NodeId,
        /// Number of existing children
        children: usize,
    },

    /// Nothing to divide
    #[error("Integrity error: cannot split an empty item set for node {0}")]
    EmptySplit(NodeId),

    /// A level has fewer items than folds, so some children would be empty
    #[error("Integrity error: fractalizing node {node} would create empty children: \
        level {level} has {items} items for {pieces} folds")]
    TooFewItems {
        /// Node being fractalized
        node: NodeId,
        /// 0-based depth of the offending level
        level: usize,
        /// Rows or cells available at that level
        items: usize,
        /// Fold count of that level
        pieces: usize,
    },

    /// Per-level split methods do not line up with fold counts
    #[error("Integrity error: {folds} fold counts but {methods} split methods")]
    FoldMismatch {
        /// Number of fold counts given
        folds: usize,
        /// Number of split methods given
        methods: usize,
    },

    /// `split_set` called with nothing to split
    #[error("Integrity error: split_set called with an empty item set")]
    EmptyItemSet,

    /// Leaf record without a parent
    #[error("Integrity error: leaf node {0} has no parent")]
    OrphanLeaf(NodeId),

    /// Children of one node mix branches and leaves
    #[error("Integrity error: children of node {0} mix branch and leaf nodes")]
    MixedLevel(NodeId),

    /// Fold list empty or containing a zero
    #[error("Integrity error: invalid folds {0:?} (need at least one count, each >= 1)")]
    InvalidFolds(Vec<usize>),

    /// Operation requires a branch node but got a leaf
    #[error("Integrity error: node {0} is a leaf (mask) and has no data of its own")]
    NotABranch(NodeId),

    /// Malformed line in a row/cell file
    #[error("Input error: {path}:{line}: malformed entry {content:?}")]
    MalformedLine {
        /// Source being read
        path: String,
        /// 1-based line number
        line: usize,
        /// Offending line
        content: String,
    },

    /// Invalid caller-supplied value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Some but not all children of a level are present
    #[error("Concurrency hazard: node {node} expects {expected} children but has {found}\n\
        A previous fractalization was interrupted; remove the node's children manually.")]
    PartialLevel {
        /// Parent of the incomplete level
        node: NodeId,
        /// Fold count recorded on the parent
        expected: usize,
        /// Children actually present
        found: usize,
    },

    /// Filesystem failure while exporting a node
    #[error("Export error for node {node} at {}: {source}", .path.display())]
    Export {
        /// Node being exported
        node: NodeId,
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Storage error (snapshot, catalog)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DanglingParent { .. }
            | Self::ParentCycle(_)
            | Self::NodeNotFound(_)
            | Self::AlreadyFractalized { .. }
            | Self::EmptySplit(_)
            | Self::TooFewItems { .. }
            | Self::FoldMismatch { .. }
            | Self::EmptyItemSet
            | Self::OrphanLeaf(_)
            | Self::MixedLevel(_)
            | Self::InvalidFolds(_)
            | Self::NotABranch(_) => ErrorKind::Integrity,
            Self::MalformedLine { .. }
            | Self::InvalidInput(_)
            | Self::Config(_)
            | Self::Toml(_) => ErrorKind::Input,
            Self::PartialLevel { .. } => ErrorKind::ConcurrencyHazard,
            Self::Export { .. }
            | Self::StorageError(_)
            | Self::Io(_)
            | Self::Arrow(_)
            | Self::Parquet(_)
            | Self::Json(_) => ErrorKind::Storage,
        }
    }

    /// Fatal errors abort the whole call for the affected subtree.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Integrity | ErrorKind::ConcurrencyHazard
        )
    }
}
