//! In-memory matrix store using `DashMap`.
//!
//! This is the default backend - data is lost on process restart unless it
//! is written out with [`save_snapshot`](super::snapshot::save_snapshot).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::MatrixStore;
use crate::matrix::{Cell, ColumnId, Entry, NewMatrix, NodeId, NodeKind, NodeRecord, RowId};
use crate::{Error, Result};

/// Own storage of one node.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeEntries {
    pub(crate) cells: BTreeSet<Cell>,
    pub(crate) empty_rows: BTreeSet<RowId>,
}

impl NodeEntries {
    fn row_has_cells(&self, i: RowId) -> bool {
        self.cells
            .range(Cell::row_start(i)..=Cell::row_end(i))
            .next()
            .is_some()
    }
}

/// In-memory matrix store.
///
/// Thread-safe through `DashMap`; no guard is held across calls into other
/// maps, so nested lookups cannot deadlock.
///
/// # Example
///
/// ```rust
/// use phenomatrix::matrix::NewMatrix;
/// use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
///
/// # fn main() -> phenomatrix::Result<()> {
/// let store = MemoryMatrixStore::new();
/// let id = store.insert_node(NewMatrix::root("Arabidopsis"))?;
/// assert!(store.find_or_create_cell(id, 5, 1)?);
/// assert!(!store.find_or_create_cell(id, 5, 1)?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryMatrixStore {
    nodes: DashMap<NodeId, NodeRecord>,
    entries: DashMap<NodeId, NodeEntries>,
    next_id: AtomicU64,
}

impl MemoryMatrixStore {
    /// Create an empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild a store from persisted parts without validating references.
    pub(crate) fn restore(
        records: Vec<NodeRecord>,
        entries: Vec<(NodeId, Entry)>,
        next_id: u64,
    ) -> Self {
        let store = Self::new();
        let mut max_id = 0;
        for record in records {
            max_id = max_id.max(record.id().0);
            store.entries.insert(record.id(), NodeEntries::default());
            store.nodes.insert(record.id(), record);
        }
        for (id, entry) in entries {
            let mut own = store.entries.entry(id).or_default();
            match entry {
                Entry::Cell(cell) => {
                    own.cells.insert(cell);
                }
                Entry::EmptyRow(i) => {
                    own.empty_rows.insert(i);
                }
            }
        }
        store
            .next_id
            .store(next_id.max(max_id + 1), Ordering::SeqCst);
        store
    }

    /// Id the next inserted node will receive.
    pub(crate) fn peek_next_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// All `(node, entry)` pairs, ordered by node id.
    pub(crate) fn all_entries(&self) -> Vec<(NodeId, Entry)> {
        let mut out = Vec::new();
        for id in self.node_ids() {
            if let Some(own) = self.entries.get(&id) {
                out.extend(own.cells.iter().map(|c| (id, Entry::Cell(*c))));
                out.extend(own.empty_rows.iter().map(|&i| (id, Entry::EmptyRow(i))));
            }
        }
        out
    }

    fn ensure_node(&self, id: NodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::NodeNotFound(id))
        }
    }

    fn with_entries<T>(&self, id: NodeId, f: impl FnOnce(&NodeEntries) -> T) -> Result<T> {
        self.ensure_node(id)?;
        Ok(match self.entries.get(&id) {
            Some(own) => f(own.value()),
            None => f(&NodeEntries::default()),
        })
    }

    fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|record| record.parent() == Some(id))
            .map(|record| record.id())
            .collect()
    }
}

impl Default for MemoryMatrixStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStore for MemoryMatrixStore {
    fn insert_node(&self, new: NewMatrix) -> Result<NodeId> {
        match new.parent_id() {
            Some(parent) => self.ensure_node(parent)?,
            None if new.node_kind() == NodeKind::Leaf => {
                return Err(Error::InvalidInput(
                    "a leaf node must have a parent".to_string(),
                ));
            }
            None => {}
        }

        let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries.insert(id, NodeEntries::default());
        self.nodes.insert(id, NodeRecord::from_new(id, new));
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Result<NodeRecord> {
        self.nodes
            .get(&id)
            .map(|record| record.value().clone())
            .ok_or(Error::NodeNotFound(id))
    }

    fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn update_node(&self, record: NodeRecord) -> Result<()> {
        let mut slot = self
            .nodes
            .get_mut(&record.id())
            .ok_or(Error::NodeNotFound(record.id()))?;
        *slot = record;
        Ok(())
    }

    fn children(&self, id: NodeId) -> Result<Vec<NodeRecord>> {
        self.ensure_node(id)?;
        let mut children: Vec<NodeRecord> = self
            .nodes
            .iter()
            .filter(|record| record.parent() == Some(id))
            .map(|record| record.value().clone())
            .collect();
        children.sort_by_key(|record| (record.cardinality(), record.id()));
        Ok(children)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().map(|record| record.id()).collect();
        ids.sort_unstable();
        ids
    }

    fn delete_node(&self, id: NodeId) -> Result<usize> {
        self.ensure_node(id)?;

        // Collect the subtree first; removal must not run while iterating.
        let mut doomed = vec![id];
        let mut frontier = vec![id];
        while let Some(next) = frontier.pop() {
            let children = self.child_ids(next);
            doomed.extend(&children);
            frontier.extend(children);
        }

        for node in &doomed {
            self.entries.remove(node);
            self.nodes.remove(node);
        }
        Ok(doomed.len())
    }

    fn find_or_create_cell(&self, id: NodeId, i: RowId, j: ColumnId) -> Result<bool> {
        self.ensure_node(id)?;
        let mut own = self.entries.entry(id).or_default();
        own.empty_rows.remove(&i);
        Ok(own.cells.insert(Cell::new(i, j)))
    }

    fn create_empty_row(&self, id: NodeId, i: RowId) -> Result<bool> {
        self.ensure_node(id)?;
        let mut own = self.entries.entry(id).or_default();
        if own.row_has_cells(i) {
            return Ok(false);
        }
        Ok(own.empty_rows.insert(i))
    }

    fn cells(&self, id: NodeId) -> Result<BTreeSet<Cell>> {
        self.with_entries(id, |own| own.cells.clone())
    }

    fn empty_rows(&self, id: NodeId) -> Result<BTreeSet<RowId>> {
        self.with_entries(id, |own| own.empty_rows.clone())
    }

    fn entries_for_row(&self, id: NodeId, i: RowId) -> Result<Vec<Entry>> {
        self.with_entries(id, |own| {
            let mut row: Vec<Entry> = own
                .cells
                .range(Cell::row_start(i)..=Cell::row_end(i))
                .map(|c| Entry::Cell(*c))
                .collect();
            if own.empty_rows.contains(&i) {
                row.push(Entry::EmptyRow(i));
            }
            row
        })
    }

    fn rows_by_column(&self, id: NodeId, j: ColumnId) -> Result<BTreeSet<RowId>> {
        self.with_entries(id, |own| {
            own.cells.iter().filter(|c| c.j == j).map(|c| c.i).collect()
        })
    }

    fn unique_rows(&self, id: NodeId) -> Result<BTreeSet<RowId>> {
        self.with_entries(id, |own| {
            let mut rows: BTreeSet<RowId> = own.cells.iter().map(|c| c.i).collect();
            rows.extend(own.empty_rows.iter().copied());
            rows
        })
    }
}
