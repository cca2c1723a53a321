//! Matrix tree model
//!
//! ## Tree Structure
//!
//! ```text
//! BranchNode (root, full data)
//!   ├── BranchNode (training set: all slices but 0)   ── LeafNode × k (masks)
//!   ├── BranchNode (training set: all slices but 1)   ── LeafNode × k
//!   └── ...
//! ```
//!
//! - Root and intermediate nodes are stored in their entirety.
//! - Leaves are stored as masks of their (branch) parent: the cells a leaf
//!   stores are the held-out test set, and its effective contents are the
//!   parent's contents minus the mask.
//! - Levels can use different fold counts (`[10]`, `[5, 5]`, `[10, 5]`).
//! - A singleton matrix (no parent, no children) is a branch.

mod derive;
mod entry;
mod fractalize;
mod node;
mod resolve;
mod split;
mod tree;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use derive::{copy, copy_and_randomize, density, make_empty_copy};
pub use entry::{Cell, ColumnId, Entry, RowId};
pub use fractalize::{
    fractalize, Division, FractalizeOptions, Fractalizer, NodeState, SplitMethod,
};
pub use node::{BranchNode, LeafNode, MatrixNode};
pub use resolve::{CellValue, MaskResolver};
pub use split::{combine_all_but_one, split_set};
pub use tree::{has_grandchildren, has_great_grandchildren, stages, verify_level};

/// Default species tag for rows and columns.
pub const DEFAULT_SPECIES: &str = "Hs";

/// Unique identifier of a matrix node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage rule of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Owns its entries directly and completely
    Branch,
    /// Stored entries are a mask against the parent
    Leaf,
}

/// Semantic names of rows and columns, and the file names derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryInfo {
    row_title: String,
    column_title: String,
}

impl EntryInfo {
    /// Create a descriptor.
    #[must_use]
    pub fn new(row_title: impl Into<String>, column_title: impl Into<String>) -> Self {
        Self {
            row_title: row_title.into(),
            column_title: column_title.into(),
        }
    }

    /// The gene × phenotype descriptor.
    #[must_use]
    pub fn gene_phenotype() -> Self {
        Self::new("gene", "phenotype")
    }

    /// Row title, e.g. `"gene"`.
    #[must_use]
    pub fn row_title(&self) -> &str {
        &self.row_title
    }

    /// Column title, e.g. `"phenotype"`.
    #[must_use]
    pub fn column_title(&self) -> &str {
        &self.column_title
    }

    /// True for gene × phenotype matrices.
    #[must_use]
    pub fn is_phenomatrix(&self) -> bool {
        self.row_title == "gene" && self.column_title == "phenotype"
    }

    /// Row file name for a species, e.g. `genes.Hs`.
    #[must_use]
    pub fn row_filename(&self, species: &str) -> String {
        format!("{}.{species}", file_stem(&self.row_title))
    }

    /// Cell file name for a species, e.g. `genes_phenes.Hs`.
    #[must_use]
    pub fn cell_filename(&self, species: &str) -> String {
        format!(
            "{}_{}.{species}",
            file_stem(&self.row_title),
            file_stem(&self.column_title)
        )
    }
}

impl Default for EntryInfo {
    fn default() -> Self {
        Self::gene_phenotype()
    }
}

fn file_stem(title: &str) -> String {
    match title {
        "phenotype" => "phenes".to_string(),
        other => format!("{other}s"),
    }
}

/// Catalog record of a persisted node.
///
/// Counts are denormalized caches of the node's *own* storage; they are
/// refreshed by the importer and the fractalizer and by
/// [`MatrixStore::refresh_counts`](crate::store::MatrixStore::refresh_counts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    id: NodeId,
    title: String,
    parent: Option<NodeId>,
    cardinality: Option<usize>,
    kind: NodeKind,
    row_species: String,
    column_species: String,
    row_count: usize,
    column_count: usize,
    cell_count: usize,
    conjugate: Option<NodeId>,
    entry_info: EntryInfo,
    fold_count: Option<usize>,
    created_at: DateTime<Utc>,
}

impl NodeRecord {
    /// Materialize a record for `new` under the id chosen by the store.
    #[must_use]
    pub fn from_new(id: NodeId, new: NewMatrix) -> Self {
        Self {
            id,
            title: new.title,
            parent: new.parent,
            cardinality: new.cardinality,
            kind: new.kind,
            row_species: new.row_species,
            column_species: new.column_species,
            row_count: 0,
            column_count: 0,
            cell_count: 0,
            conjugate: new.conjugate,
            entry_info: new.entry_info,
            fold_count: new.fold_count,
            created_at: Utc::now(),
        }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// `"{id}: {title}"`, unique even when titles repeat.
    #[must_use]
    pub fn unique_descriptor(&self) -> String {
        format!("{}: {}", self.id, self.title)
    }

    /// Parent, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// 0-based position among siblings.
    #[must_use]
    pub const fn cardinality(&self) -> Option<usize> {
        self.cardinality
    }

    /// Storage rule.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Row species tag.
    #[must_use]
    pub fn row_species(&self) -> &str {
        &self.row_species
    }

    /// Column species tag (selects file names).
    #[must_use]
    pub fn column_species(&self) -> &str {
        &self.column_species
    }

    /// Cached distinct row count.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Cached distinct column count.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    /// Cached cell count.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Matrix this one was randomized from.
    #[must_use]
    pub const fn conjugate(&self) -> Option<NodeId> {
        self.conjugate
    }

    /// Row/column descriptor.
    #[must_use]
    pub const fn entry_info(&self) -> &EntryInfo {
        &self.entry_info
    }

    /// Number of children this node was fractalized into, once started.
    #[must_use]
    pub const fn fold_count(&self) -> Option<usize> {
        self.fold_count
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Row file name in this node's working directory.
    #[must_use]
    pub fn row_filename(&self) -> String {
        self.entry_info.row_filename(&self.column_species)
    }

    /// Cell file name in this node's working directory.
    #[must_use]
    pub fn cell_filename(&self) -> String {
        self.entry_info.cell_filename(&self.column_species)
    }

    /// Replace the cached counts.
    pub fn set_counts(&mut self, rows: usize, columns: usize, cells: usize) {
        self.row_count = rows;
        self.column_count = columns;
        self.cell_count = cells;
    }

    /// Record the fold count before children are written.
    pub fn set_fold_count(&mut self, folds: usize) {
        self.fold_count = Some(folds);
    }
}

/// Attributes of a node that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatrix {
    title: String,
    parent: Option<NodeId>,
    cardinality: Option<usize>,
    kind: NodeKind,
    row_species: String,
    column_species: String,
    conjugate: Option<NodeId>,
    entry_info: EntryInfo,
    fold_count: Option<usize>,
}

impl NewMatrix {
    /// A root branch with default species and the gene × phenotype descriptor.
    #[must_use]
    pub fn root(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent: None,
            cardinality: None,
            kind: NodeKind::Branch,
            row_species: DEFAULT_SPECIES.to_string(),
            column_species: DEFAULT_SPECIES.to_string(),
            conjugate: None,
            entry_info: EntryInfo::default(),
            fold_count: None,
        }
    }

    /// Child `n` of `total` under `parent`, inheriting species and
    /// descriptor. Titled `"{parent title} ({n+1}/{total})"`.
    #[must_use]
    pub fn child_of(parent: &NodeRecord, n: usize, total: usize, kind: NodeKind) -> Self {
        Self {
            title: format!("{} ({}/{total})", parent.title(), n + 1),
            parent: Some(parent.id()),
            cardinality: Some(n),
            kind,
            row_species: parent.row_species().to_string(),
            column_species: parent.column_species().to_string(),
            conjugate: None,
            entry_info: parent.entry_info().clone(),
            fold_count: None,
        }
    }

    /// Copy the descriptive attributes of `source` into a new root.
    #[must_use]
    pub fn like(source: &NodeRecord, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent: None,
            cardinality: None,
            kind: NodeKind::Branch,
            row_species: source.row_species().to_string(),
            column_species: source.column_species().to_string(),
            conjugate: None,
            entry_info: source.entry_info().clone(),
            fold_count: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the parent.
    #[must_use]
    pub const fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the sibling position.
    #[must_use]
    pub const fn cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// Set the storage rule.
    #[must_use]
    pub const fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the row species.
    #[must_use]
    pub fn row_species(mut self, species: impl Into<String>) -> Self {
        self.row_species = species.into();
        self
    }

    /// Set the column species.
    #[must_use]
    pub fn column_species(mut self, species: impl Into<String>) -> Self {
        self.column_species = species.into();
        self
    }

    /// Mark as derived (randomized) from another matrix.
    #[must_use]
    pub const fn conjugate(mut self, conjugate: NodeId) -> Self {
        self.conjugate = Some(conjugate);
        self
    }

    /// Set the descriptor.
    #[must_use]
    pub fn entry_info(mut self, entry_info: EntryInfo) -> Self {
        self.entry_info = entry_info;
        self
    }

    /// Record the fold count of the level below before any child exists.
    #[must_use]
    pub const fn fold_count(mut self, folds: usize) -> Self {
        self.fold_count = Some(folds);
        self
    }

    /// Parent that will be recorded.
    #[must_use]
    pub const fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }

    /// Storage rule that will be recorded.
    #[must_use]
    pub const fn node_kind(&self) -> NodeKind {
        self.kind
    }
}
