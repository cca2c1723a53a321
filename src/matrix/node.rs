//! Branch and leaf nodes.
//!
//! A branch owns its entries; a leaf's entries are a mask against its parent.
//! The two storage rules are separate types behind the [`MatrixNode`] enum,
//! so every query states which rule it applies.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use super::{Cell, ColumnId, Entry, NodeId, NodeKind, NodeRecord, RowId};
use crate::store::MatrixStore;
use crate::{Error, Result};

/// Node that stores its contents in full (root or intermediate level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    record: NodeRecord,
}

/// Node whose stored entries are removed from its parent's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    record: NodeRecord,
    parent: NodeId,
}

/// A node of the cross-validation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixNode {
    /// Full storage
    Branch(BranchNode),
    /// Mask storage
    Leaf(LeafNode),
}

/// Ancestors visited while resolving, to catch cycles in corrupted catalogs.
struct Trail {
    start: NodeId,
    seen: FxHashSet<NodeId>,
}

impl Trail {
    fn new(start: NodeId) -> Self {
        Self {
            start,
            seen: FxHashSet::default(),
        }
    }

    fn visit(&mut self, id: NodeId) -> Result<()> {
        if self.seen.insert(id) {
            Ok(())
        } else {
            Err(Error::ParentCycle(self.start))
        }
    }
}

impl BranchNode {
    /// Catalog record.
    #[must_use]
    pub const fn record(&self) -> &NodeRecord {
        &self.record
    }

    fn cells<S: MatrixStore + ?Sized>(&self, store: &S) -> Result<BTreeSet<Cell>> {
        store.cells(self.record.id())
    }

    fn empty_rows<S: MatrixStore + ?Sized>(&self, store: &S) -> Result<BTreeSet<RowId>> {
        store.empty_rows(self.record.id())
    }
}

impl LeafNode {
    /// Catalog record.
    #[must_use]
    pub const fn record(&self) -> &NodeRecord {
        &self.record
    }

    /// Parent id (always present for a leaf).
    #[must_use]
    pub const fn parent_id(&self) -> NodeId {
        self.parent
    }

    /// Load the parent.
    ///
    /// # Errors
    /// `DanglingParent` if the parent is no longer in the store.
    pub fn parent<S: MatrixStore + ?Sized>(&self, store: &S) -> Result<MatrixNode> {
        match store.node(self.parent) {
            Ok(record) => MatrixNode::from_record(record),
            Err(Error::NodeNotFound(_)) => Err(Error::DanglingParent {
                node: self.record.id(),
                parent: self.parent,
            }),
            Err(e) => Err(e),
        }
    }

    fn cells<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
        trail: &mut Trail,
    ) -> Result<BTreeSet<Cell>> {
        let mut cells = self.parent(store)?.cells_along(store, trail)?;
        for masked in store.cells(self.record.id())? {
            cells.remove(&masked);
        }
        Ok(cells)
    }

    fn empty_rows<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
        trail: &mut Trail,
    ) -> Result<BTreeSet<RowId>> {
        let mut rows = self.parent(store)?.empty_rows_along(store, trail)?;
        rows.extend(store.empty_rows(self.record.id())?);
        Ok(rows)
    }
}

impl MatrixNode {
    /// Wrap a catalog record in the variant its kind selects.
    ///
    /// # Errors
    /// `OrphanLeaf` for a leaf record without a parent.
    pub fn from_record(record: NodeRecord) -> Result<Self> {
        match (record.kind(), record.parent()) {
            (NodeKind::Branch, _) => Ok(Self::Branch(BranchNode { record })),
            (NodeKind::Leaf, Some(parent)) => Ok(Self::Leaf(LeafNode { record, parent })),
            (NodeKind::Leaf, None) => Err(Error::OrphanLeaf(record.id())),
        }
    }

    /// Load a node from the store.
    ///
    /// # Errors
    /// `NodeNotFound` or `OrphanLeaf`.
    pub fn load<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<Self> {
        Self::from_record(store.node(id)?)
    }

    /// Catalog record.
    #[must_use]
    pub const fn record(&self) -> &NodeRecord {
        match self {
            Self::Branch(branch) => &branch.record,
            Self::Leaf(leaf) => &leaf.record,
        }
    }

    /// Node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.record().id()
    }

    /// True if stored entries are a delta against the parent.
    #[must_use]
    pub const fn is_mask(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Cells after applying every mask up the ancestor chain.
    ///
    /// # Errors
    /// `DanglingParent` or `ParentCycle` on a corrupted chain.
    pub fn effective_cells<S: MatrixStore + ?Sized>(&self, store: &S) -> Result<BTreeSet<Cell>> {
        self.cells_along(store, &mut Trail::new(self.id()))
    }

    /// Empty rows inherited from ancestors plus the node's own.
    ///
    /// # Errors
    /// `DanglingParent` or `ParentCycle` on a corrupted chain.
    pub fn effective_empty_rows<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<BTreeSet<RowId>> {
        self.empty_rows_along(store, &mut Trail::new(self.id()))
    }

    /// Rows of the effective contents; with a column, only rows that have a
    /// cell in it.
    ///
    /// # Errors
    /// `DanglingParent` or `ParentCycle` on a corrupted chain.
    pub fn effective_rows<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
        column: Option<ColumnId>,
    ) -> Result<BTreeSet<RowId>> {
        let cells = self.effective_cells(store)?;
        match column {
            Some(j) => Ok(cells.iter().filter(|c| c.j == j).map(|c| c.i).collect()),
            None => {
                let mut rows: BTreeSet<RowId> = cells.iter().map(|c| c.i).collect();
                rows.extend(self.effective_empty_rows(store)?);
                Ok(rows)
            }
        }
    }

    /// Entries exactly as stored: the held-out test set of a leaf, the full
    /// contents of a branch.
    ///
    /// # Errors
    /// `NodeNotFound` if the node vanished from the store.
    pub fn own_entries<S: MatrixStore + ?Sized>(&self, store: &S) -> Result<Vec<Entry>> {
        store.entries(self.id())
    }

    fn cells_along<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
        trail: &mut Trail,
    ) -> Result<BTreeSet<Cell>> {
        trail.visit(self.id())?;
        match self {
            Self::Branch(branch) => branch.cells(store),
            Self::Leaf(leaf) => leaf.cells(store, trail),
        }
    }

    fn empty_rows_along<S: MatrixStore + ?Sized>(
        &self,
        store: &S,
        trail: &mut Trail,
    ) -> Result<BTreeSet<RowId>> {
        trail.visit(self.id())?;
        match self {
            Self::Branch(branch) => branch.empty_rows(store),
            Self::Leaf(leaf) => leaf.empty_rows(store, trail),
        }
    }
}
