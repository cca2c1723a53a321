//! Matrices derived from existing ones: copies, empty copies, randomized
//! copies, and density.

use std::collections::BTreeMap;

use rand::seq::index;
use rand::Rng;
use tracing::info;

use super::{Entry, MaskResolver, NewMatrix, NodeId, RowId};
use crate::store::MatrixStore;
use crate::Result;

/// Copy the effective contents of `id` into a new root titled
/// `"{title} copy"`.
///
/// # Errors
/// `NodeNotFound` or an integrity error from mask resolution.
pub fn copy<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<NodeId> {
    let source = store.node(id)?;
    let entries = MaskResolver::new(store).effective_entries(id)?;

    let copy = store.insert_node(NewMatrix::like(&source, format!("{} copy", source.title())))?;
    store.insert_entries(copy, &entries)?;
    store.refresh_counts(copy)?;
    Ok(copy)
}

/// New root with the same rows as `id`, every one an empty row.
///
/// # Errors
/// `NodeNotFound` or an integrity error from mask resolution.
pub fn make_empty_copy<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<NodeId> {
    let source = store.node(id)?;
    let rows = MaskResolver::new(store).effective_rows(id, None)?;
    empty_copy_with_rows(
        store,
        NewMatrix::like(&source, format!("{} copy", source.title())),
        rows,
    )
}

fn empty_copy_with_rows<S: MatrixStore + ?Sized>(
    store: &S,
    new: NewMatrix,
    rows: impl IntoIterator<Item = RowId>,
) -> Result<NodeId> {
    let copy = store.insert_node(new)?;
    let entries: Vec<Entry> = rows.into_iter().map(Entry::EmptyRow).collect();
    store.insert_entries(copy, &entries)?;
    store.refresh_counts(copy)?;
    Ok(copy)
}

/// Randomized copy of `id` that keeps the row set and each column's size.
///
/// Titled `"{title}r"`, with `r` appended to the column species and
/// `conjugate` pointing back at `id`. For a column with `k` distinct rows,
/// `k` distinct rows are drawn uniformly from all rows of `id`.
///
/// # Errors
/// `NodeNotFound` or an integrity error from mask resolution.
pub fn copy_and_randomize<S, R>(store: &S, id: NodeId, rng: &mut R) -> Result<NodeId>
where
    S: MatrixStore + ?Sized,
    R: Rng + ?Sized,
{
    let source = store.node(id)?;
    let resolver = MaskResolver::new(store);
    let rows: Vec<RowId> = resolver.effective_rows(id, None)?.into_iter().collect();
    let cells = resolver.effective_cells(id)?;

    let new = NewMatrix::like(&source, format!("{}r", source.title()))
        .column_species(format!("{}r", source.column_species()))
        .conjugate(id);
    let copy = empty_copy_with_rows(store, new, rows.iter().copied())?;

    let mut column_sizes = BTreeMap::new();
    for cell in &cells {
        *column_sizes.entry(cell.j).or_insert(0usize) += 1;
    }
    for (&j, &size) in &column_sizes {
        for pick in index::sample(&mut *rng, rows.len(), size.min(rows.len())) {
            store.find_or_create_cell(copy, rows[pick], j)?;
        }
    }

    let record = store.refresh_counts(copy)?;
    info!(
        source = %id,
        copy = %copy,
        columns = record.column_count(),
        cells = record.cell_count(),
        "Randomized matrix"
    );
    Ok(copy)
}

/// Cells per column, rounded. A node without columns of its own (a mask of
/// empty rows) takes the density of its nearest ancestor that has columns.
///
/// # Errors
/// `NodeNotFound` if an ancestor is missing.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn density<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<usize> {
    let mut record = store.node(id)?;
    while record.column_count() == 0 {
        match record.parent() {
            Some(parent) => record = store.node(parent)?,
            None => return Ok(0),
        }
    }
    Ok((record.cell_count() as f64 / record.column_count() as f64).round() as usize)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::matrix::{fractalize, Cell, NodeKind};
    use crate::store::MemoryMatrixStore;

    fn sample_matrix() -> (MemoryMatrixStore, NodeId) {
        let store = MemoryMatrixStore::new();
        let root = store
            .insert_node(NewMatrix::root("Human").column_species("Hs"))
            .unwrap();
        for (i, j) in [(1, 1), (2, 1), (3, 1), (1, 2), (4, 2), (5, 3)] {
            store.find_or_create_cell(root, i, j).unwrap();
        }
        store.create_empty_row(root, 6).unwrap();
        store.refresh_counts(root).unwrap();
        (store, root)
    }

    #[test]
    fn test_copy_of_leaf_uses_effective_cells() {
        let (store, root) = sample_matrix();
        fractalize(&store, root, &[2], false).unwrap();
        let leaf = store.children(root).unwrap()[0].clone();

        let copy = copy(&store, leaf.id()).unwrap();
        let record = store.node(copy).unwrap();
        assert_eq!(record.title(), "Human (1/2) copy");
        assert_eq!(record.parent(), None);
        assert_eq!(record.kind(), NodeKind::Branch);
        assert_eq!(
            store.cells(copy).unwrap(),
            MaskResolver::new(&store).effective_cells(leaf.id()).unwrap()
        );
    }

    #[test]
    fn test_empty_copy_keeps_rows() {
        let (store, root) = sample_matrix();
        let copy = make_empty_copy(&store, root).unwrap();

        let record = store.node(copy).unwrap();
        assert_eq!(record.row_count(), 6);
        assert_eq!(record.column_count(), 0);
        assert!(store.cells(copy).unwrap().is_empty());
    }

    #[test]
    fn test_randomize_preserves_column_sizes() {
        let (store, root) = sample_matrix();
        let mut rng = StdRng::seed_from_u64(11);
        let copy = copy_and_randomize(&store, root, &mut rng).unwrap();

        let record = store.node(copy).unwrap();
        assert_eq!(record.title(), "Humanr");
        assert_eq!(record.column_species(), "Hsr");
        assert_eq!(record.conjugate(), Some(root));
        assert_eq!(record.row_count(), 6);
        assert_eq!(
            store.count_rows_by_column(copy).unwrap(),
            store.count_rows_by_column(root).unwrap()
        );
        let rows = store.unique_rows(root).unwrap();
        assert!(store.cells(copy).unwrap().iter().all(|c: &Cell| rows.contains(&c.i)));
    }

    #[test]
    fn test_density() {
        let (store, root) = sample_matrix();
        assert_eq!(density(&store, root).unwrap(), 2);

        let parent = store.node(root).unwrap();
        let leaf = store
            .insert_node(NewMatrix::child_of(&parent, 0, 1, NodeKind::Leaf))
            .unwrap();
        store.create_empty_row(leaf, 6).unwrap();
        store.refresh_counts(leaf).unwrap();
        assert_eq!(density(&store, leaf).unwrap(), 2);
    }
}
