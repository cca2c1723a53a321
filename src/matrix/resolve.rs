//! Node-id based view over effective (mask-resolved) contents.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Cell, ColumnId, Entry, MatrixNode, NodeId, RowId};
use crate::store::MatrixStore;
use crate::Result;

/// Display state of a cell in a leaf's parent view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellValue {
    /// True if the cell is held out by the node's mask
    pub masked: bool,
}

/// Resolves masks up the ancestor chain for nodes of one store.
///
/// # Example
///
/// ```rust
/// use phenomatrix::matrix::{MaskResolver, NewMatrix, NodeKind};
/// use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
///
/// # fn main() -> phenomatrix::Result<()> {
/// let store = MemoryMatrixStore::new();
/// let root = store.insert_node(NewMatrix::root("m"))?;
/// store.find_or_create_cell(root, 1, 1)?;
/// store.find_or_create_cell(root, 2, 1)?;
///
/// let parent = store.node(root)?;
/// let leaf = store.insert_node(NewMatrix::child_of(&parent, 0, 1, NodeKind::Leaf))?;
/// store.find_or_create_cell(leaf, 2, 1)?;
///
/// let resolver = MaskResolver::new(&store);
/// assert_eq!(resolver.effective_cells(leaf)?.len(), 1);
/// assert_eq!(resolver.held_out_entries(leaf)?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MaskResolver<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S: MatrixStore + ?Sized> MaskResolver<'s, S> {
    /// Create a resolver over `store`.
    #[must_use]
    pub const fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &'s S {
        self.store
    }

    /// Load a node.
    ///
    /// # Errors
    /// `NodeNotFound` or `OrphanLeaf`.
    pub fn node(&self, id: NodeId) -> Result<MatrixNode> {
        MatrixNode::load(self.store, id)
    }

    /// True if the node's stored entries are a mask.
    ///
    /// # Errors
    /// `NodeNotFound` or `OrphanLeaf`.
    pub fn is_mask(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_mask())
    }

    /// Effective cells of a node.
    ///
    /// # Errors
    /// Integrity errors on a corrupted ancestor chain.
    pub fn effective_cells(&self, id: NodeId) -> Result<BTreeSet<Cell>> {
        self.node(id)?.effective_cells(self.store)
    }

    /// Effective empty rows of a node.
    ///
    /// # Errors
    /// Integrity errors on a corrupted ancestor chain.
    pub fn effective_empty_rows(&self, id: NodeId) -> Result<BTreeSet<RowId>> {
        self.node(id)?.effective_empty_rows(self.store)
    }

    /// Effective rows, optionally restricted to rows with a cell in `column`.
    ///
    /// # Errors
    /// Integrity errors on a corrupted ancestor chain.
    pub fn effective_rows(&self, id: NodeId, column: Option<ColumnId>) -> Result<BTreeSet<RowId>> {
        self.node(id)?.effective_rows(self.store, column)
    }

    /// Effective cells followed by the effective empty rows that have no cell.
    ///
    /// # Errors
    /// Integrity errors on a corrupted ancestor chain.
    pub fn effective_entries(&self, id: NodeId) -> Result<Vec<Entry>> {
        let node = self.node(id)?;
        let cells = node.effective_cells(self.store)?;
        let rows_with_cells: BTreeSet<RowId> = cells.iter().map(|c| c.i).collect();

        let mut entries: Vec<Entry> = cells.into_iter().map(Entry::Cell).collect();
        entries.extend(
            node.effective_empty_rows(self.store)?
                .into_iter()
                .filter(|i| !rows_with_cells.contains(i))
                .map(Entry::EmptyRow),
        );
        Ok(entries)
    }

    /// Stored entries without mask inversion: a leaf's test set.
    ///
    /// # Errors
    /// `NodeNotFound` or `OrphanLeaf`.
    pub fn held_out_entries(&self, id: NodeId) -> Result<Vec<Entry>> {
        self.node(id)?.own_entries(self.store)
    }

    /// Cells for display: effective cells unmasked, plus (for a leaf) its
    /// stored cells marked as masked.
    ///
    /// # Errors
    /// Integrity errors on a corrupted ancestor chain.
    pub fn cells_for_display(&self, id: NodeId) -> Result<BTreeMap<Cell, CellValue>> {
        let node = self.node(id)?;
        let mut display: BTreeMap<Cell, CellValue> = node
            .effective_cells(self.store)?
            .into_iter()
            .map(|cell| (cell, CellValue { masked: false }))
            .collect();
        if node.is_mask() {
            for cell in self.store.cells(id)? {
                display.insert(cell, CellValue { masked: true });
            }
        }
        Ok(display)
    }
}
