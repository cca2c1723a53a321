//! Sparse matrix storage
//!
//! Entries are scoped to a node id. Writes are append-only except for the
//! implicit dedup rules:
//! - inserting an existing cell is a no-op;
//! - inserting a cell for a row that has an empty-row marker converts the row;
//! - inserting an empty row for a row that already has data is a no-op.
//!
//! So a node's own storage never holds both an EmptyRow and a Cell for the
//! same row.
//!
//! # Example
//!
//! ```rust
//! use phenomatrix::matrix::NewMatrix;
//! use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
//!
//! # fn main() -> phenomatrix::Result<()> {
//! let store = MemoryMatrixStore::new();
//! let id = store.insert_node(NewMatrix::root("Human"))?;
//!
//! store.find_or_create_cell(id, 1, 10)?;
//! store.find_or_create_cell(id, 2, 10)?;
//! store.create_empty_row(id, 3)?;
//!
//! assert_eq!(store.unique_rows(id)?.len(), 3);
//! assert_eq!(store.rows_by_column(id, 10)?.len(), 2);
//! # Ok(())
//! # }
//! ```

mod memory;
pub mod snapshot;

pub use memory::MemoryMatrixStore;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::matrix::{Cell, ColumnId, Entry, NewMatrix, NodeId, NodeRecord, RowId};
use crate::Result;

/// Entry counts of a node's own storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Stored cells
    pub cells: usize,
    /// Stored entries (cells + empty rows)
    pub entries: usize,
    /// Stored empty rows
    pub empty_rows: usize,
}

/// Storage of node records and their entries.
///
/// Implementors provide the catalog and own-storage primitives; the set
/// queries have default implementations on top of them.
pub trait MatrixStore: Send + Sync {
    /// Insert a node and return its new id.
    ///
    /// # Errors
    /// Fails if the parent is not in the store, or a leaf has no parent.
    fn insert_node(&self, new: NewMatrix) -> Result<NodeId>;

    /// Fetch a node record.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn node(&self, id: NodeId) -> Result<NodeRecord>;

    /// True if the node exists.
    fn contains_node(&self, id: NodeId) -> bool;

    /// Replace a node record (same id).
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn update_node(&self, record: NodeRecord) -> Result<()>;

    /// Children of a node ordered by cardinality.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn children(&self, id: NodeId) -> Result<Vec<NodeRecord>>;

    /// All node ids, ascending.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Delete a node, all of its descendants and their entries.
    /// Returns the number of nodes removed.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn delete_node(&self, id: NodeId) -> Result<usize>;

    /// Insert cell `(i, j)`; returns false if it already existed.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn find_or_create_cell(&self, id: NodeId, i: RowId, j: ColumnId) -> Result<bool>;

    /// Register row `i` as present but empty; returns false if the row
    /// already had an entry.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn create_empty_row(&self, id: NodeId, i: RowId) -> Result<bool>;

    /// Own stored cells.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn cells(&self, id: NodeId) -> Result<BTreeSet<Cell>>;

    /// Own stored empty rows.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn empty_rows(&self, id: NodeId) -> Result<BTreeSet<RowId>>;

    /// Own stored entries of one row.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn entries_for_row(&self, id: NodeId, i: RowId) -> Result<Vec<Entry>>;

    /// Insert one entry with the dedup rules of the concrete kind.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn insert_entry(&self, id: NodeId, entry: Entry) -> Result<bool> {
        match entry {
            Entry::Cell(cell) => self.find_or_create_cell(id, cell.i, cell.j),
            Entry::EmptyRow(i) => self.create_empty_row(id, i),
        }
    }

    /// Insert entries in bulk; returns how many were new.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn insert_entries(&self, id: NodeId, entries: &[Entry]) -> Result<usize> {
        let mut created = 0;
        for entry in entries {
            if self.insert_entry(id, *entry)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// All own stored entries, cells first.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn entries(&self, id: NodeId) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self.cells(id)?.into_iter().map(Entry::Cell).collect();
        entries.extend(self.empty_rows(id)?.into_iter().map(Entry::EmptyRow));
        Ok(entries)
    }

    /// Distinct row ids over all entries (cells and empty rows), sorted.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn unique_rows(&self, id: NodeId) -> Result<BTreeSet<RowId>> {
        let mut rows: BTreeSet<RowId> = self.cells(id)?.iter().map(|c| c.i).collect();
        rows.extend(self.empty_rows(id)?);
        Ok(rows)
    }

    /// Distinct column ids of stored cells, sorted.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn unique_columns(&self, id: NodeId) -> Result<BTreeSet<ColumnId>> {
        Ok(self.cells(id)?.iter().map(|c| c.j).collect())
    }

    /// Distinct rows with a cell in column `j`.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn rows_by_column(&self, id: NodeId, j: ColumnId) -> Result<BTreeSet<RowId>> {
        Ok(self
            .cells(id)?
            .iter()
            .filter(|c| c.j == j)
            .map(|c| c.i)
            .collect())
    }

    /// Distinct columns with a cell in row `i`.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn columns_by_row(&self, id: NodeId, i: RowId) -> Result<BTreeSet<ColumnId>> {
        Ok(self
            .entries_for_row(id, i)?
            .iter()
            .filter_map(Entry::column)
            .collect())
    }

    /// Column → number of distinct rows with a cell in it.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn count_rows_by_column(&self, id: NodeId) -> Result<BTreeMap<ColumnId, usize>> {
        let mut counts = BTreeMap::new();
        // Cells are unique per (i, j), so each cell is one distinct row of its column.
        for cell in self.cells(id)? {
            *counts.entry(cell.j).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Number of distinct rows.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn count_unique_rows(&self, id: NodeId) -> Result<usize> {
        Ok(self.unique_rows(id)?.len())
    }

    /// Number of distinct columns.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn count_unique_columns(&self, id: NodeId) -> Result<usize> {
        Ok(self.unique_columns(id)?.len())
    }

    /// Number of stored cells.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn count_cells(&self, id: NodeId) -> Result<usize> {
        Ok(self.cells(id)?.len())
    }

    /// Entry counts of the node's own storage.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn statistics(&self, id: NodeId) -> Result<Statistics> {
        let cells = self.cells(id)?.len();
        let empty_rows = self.empty_rows(id)?.len();
        Ok(Statistics {
            cells,
            entries: cells + empty_rows,
            empty_rows,
        })
    }

    /// Recompute the cached row/column/cell counts from live queries.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    fn refresh_counts(&self, id: NodeId) -> Result<NodeRecord> {
        let mut record = self.node(id)?;
        let cells = self.cells(id)?;
        let columns: BTreeSet<ColumnId> = cells.iter().map(|c| c.j).collect();
        let rows = self.count_unique_rows(id)?;
        record.set_counts(rows, columns.len(), cells.len());
        self.update_node(record.clone())?;
        Ok(record)
    }
}
