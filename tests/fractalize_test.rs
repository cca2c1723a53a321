//! End-to-end fractalization tests over the in-memory store

use std::collections::BTreeSet;

use phenomatrix::matrix::{
    fractalize, has_grandchildren, has_great_grandchildren, stages, verify_level, Cell,
    FractalizeOptions, Fractalizer, MaskResolver, NewMatrix, NodeId, NodeKind, SplitMethod,
};
use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
use phenomatrix::{Error, ErrorKind};

/// 40 genes, each annotated with two of eight phenotypes; genes 41..=44 empty.
fn gene_matrix() -> (MemoryMatrixStore, NodeId) {
    let store = MemoryMatrixStore::new();
    let root = store.insert_node(NewMatrix::root("Human")).unwrap();
    for gene in 1..=40 {
        store.find_or_create_cell(root, gene, gene % 8).unwrap();
        store.find_or_create_cell(root, gene, 8 + gene % 3).unwrap();
    }
    for gene in 41..=44 {
        store.create_empty_row(root, gene).unwrap();
    }
    store.refresh_counts(root).unwrap();
    (store, root)
}

fn leaves_of(store: &MemoryMatrixStore, id: NodeId) -> Vec<NodeId> {
    store
        .children(id)
        .unwrap()
        .iter()
        .map(|c| c.id())
        .collect()
}

#[test]
fn test_single_level_children_partition_rows() {
    let (store, root) = gene_matrix();
    fractalize(&store, root, &[4], true).unwrap();

    let children = verify_level(&store, root).unwrap();
    assert_eq!(children.len(), 4);
    assert!(children.iter().all(|c| c.kind() == NodeKind::Leaf));
    assert_eq!(
        children.iter().map(|c| c.cardinality()).collect::<Vec<_>>(),
        vec![Some(0), Some(1), Some(2), Some(3)]
    );

    let resolver = MaskResolver::new(&store);
    let all_rows = store.unique_rows(root).unwrap();
    let mut held_out_rows = BTreeSet::new();
    for child in &children {
        let rows: BTreeSet<u64> = store.unique_rows(child.id()).unwrap();
        assert!(held_out_rows.is_disjoint(&rows));
        held_out_rows.extend(rows);

        // Each training set plus its test set is the whole matrix again.
        let mut cells = resolver.effective_cells(child.id()).unwrap();
        cells.extend(store.cells(child.id()).unwrap());
        assert_eq!(cells, store.cells(root).unwrap());
    }
    assert_eq!(held_out_rows, all_rows);
}

#[test]
fn test_two_stage_tree_shape() {
    let (store, root) = gene_matrix();
    fractalize(&store, root, &[2, 5], true).unwrap();

    assert_eq!(stages(&store, root).unwrap(), 2);
    assert!(has_grandchildren(&store, root).unwrap());
    assert!(!has_great_grandchildren(&store, root).unwrap());

    for branch in verify_level(&store, root).unwrap() {
        assert_eq!(branch.kind(), NodeKind::Branch);
        assert_eq!(branch.fold_count(), Some(5));
        let leaves = verify_level(&store, branch.id()).unwrap();
        assert_eq!(leaves.len(), 5);

        // Leaves of a branch hold out disjoint rows of that branch only.
        let branch_rows = store.unique_rows(branch.id()).unwrap();
        let held: BTreeSet<u64> = leaves
            .iter()
            .flat_map(|leaf| store.unique_rows(leaf.id()).unwrap())
            .collect();
        assert_eq!(held, branch_rows);
    }
}

#[test]
fn test_second_fractalize_is_rejected() {
    let (store, root) = gene_matrix();
    fractalize(&store, root, &[2], false).unwrap();

    let err = fractalize(&store, root, &[3], false).unwrap_err();
    assert!(matches!(err, Error::AlreadyFractalized { children: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(leaves_of(&store, root).len(), 2);
}

#[test]
fn test_interrupted_level_is_a_concurrency_hazard() {
    let (store, root) = gene_matrix();

    // Fold count recorded, only one of three children written.
    let mut record = store.node(root).unwrap();
    record.set_fold_count(3);
    store.update_node(record.clone()).unwrap();
    store
        .insert_node(NewMatrix::child_of(&record, 0, 3, NodeKind::Leaf))
        .unwrap();

    let err = fractalize(&store, root, &[3], false).unwrap_err();
    assert!(matches!(
        err,
        Error::PartialLevel {
            expected: 3,
            found: 1,
            ..
        }
    ));
    assert!(err.is_fatal());
    assert!(verify_level(&store, root).is_err());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let held_out = |seed: u64| {
        let (store, root) = gene_matrix();
        Fractalizer::new(&store, FractalizeOptions::default().seed(seed))
            .run(root, &[3])
            .unwrap();
        leaves_of(&store, root)
            .into_iter()
            .map(|leaf| store.unique_rows(leaf).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(held_out(7), held_out(7));
}

#[test]
fn test_cell_split_holds_out_cells() {
    let (store, root) = gene_matrix();
    let options = FractalizeOptions::default()
        .shuffle(false)
        .methods(vec![SplitMethod::Cell]);
    Fractalizer::new(&store, options).run(root, &[4]).unwrap();

    let root_cells = store.cells(root).unwrap();
    let mut union: BTreeSet<Cell> = BTreeSet::new();
    for leaf in leaves_of(&store, root) {
        let cells = store.cells(leaf).unwrap();
        assert!(union.is_disjoint(&cells));
        union.extend(cells);
    }
    assert!(union.is_subset(&root_cells));
}

#[test]
fn test_invalid_folds_leave_store_untouched() {
    let (store, root) = gene_matrix();
    for folds in [&[][..], &[0][..], &[3, 0][..]] {
        let err = fractalize(&store, root, folds, false).unwrap_err();
        assert!(matches!(err, Error::InvalidFolds(_)));
    }
    assert!(store.children(root).unwrap().is_empty());
    assert_eq!(store.node(root).unwrap().fold_count(), None);
}

#[test]
fn test_unfillable_folds_leave_store_untouched() {
    let (store, root) = gene_matrix();
    // 44 rows: [1, 2] empties every branch, [45] outnumbers the rows, and
    // [4, 40] leaves each 33-row branch short.
    for folds in [&[1, 2][..], &[45][..], &[4, 40][..]] {
        let err = fractalize(&store, root, folds, true).unwrap_err();
        assert!(matches!(err, Error::TooFewItems { node, .. } if node == root));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }
    assert_eq!(store.len(), 1);
    assert_eq!(store.node(root).unwrap().fold_count(), None);

    fractalize(&store, root, &[4, 2], true).unwrap();
    for branch in verify_level(&store, root).unwrap() {
        assert_eq!(branch.fold_count(), Some(2));
        assert_eq!(verify_level(&store, branch.id()).unwrap().len(), 2);
    }
}

#[test]
fn test_leaf_cannot_be_fractalized() {
    let (store, root) = gene_matrix();
    fractalize(&store, root, &[2], false).unwrap();
    let leaf = leaves_of(&store, root)[0];

    let err = fractalize(&store, leaf, &[2], false).unwrap_err();
    assert!(matches!(err, Error::NotABranch(id) if id == leaf));
}

#[test]
fn test_delete_root_removes_tree() {
    let (store, root) = gene_matrix();
    fractalize(&store, root, &[2, 2], false).unwrap();
    assert_eq!(store.len(), 1 + 2 + 4);

    assert_eq!(store.delete_node(root).unwrap(), 7);
    assert!(store.is_empty());
}
