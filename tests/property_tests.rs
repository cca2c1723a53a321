//! Property-based tests for phenomatrix
//!
//! - Fold slicing is a balanced, order-preserving partition
//! - Fractalized leaves plus their mask reproduce the parent exactly
//! - A fold list the matrix cannot fill writes nothing
//! - 64 cases per property

use std::collections::BTreeSet;

use proptest::prelude::*;
use quickcheck::{quickcheck, TestResult};

use phenomatrix::matrix::{
    combine_all_but_one, fractalize, split_set, Cell, MaskResolver, NewMatrix,
};
use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
use phenomatrix::Error;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Sparse matrices as (row, column) pairs over a small id space.
fn arb_cells() -> impl Strategy<Value = BTreeSet<(u64, u64)>> {
    proptest::collection::btree_set((1u64..60, 1u64..12), 1..150)
}

/// Fold-count lists of one or two levels.
fn arb_folds() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..5, 1..=2)
}

fn store_with(cells: &BTreeSet<(u64, u64)>) -> (MemoryMatrixStore, phenomatrix::matrix::NodeId) {
    let store = MemoryMatrixStore::new();
    let root = store.insert_node(NewMatrix::root("Random")).unwrap();
    for &(i, j) in cells {
        store.find_or_create_cell(root, i, j).unwrap();
    }
    (store, root)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: slices are balanced and concatenate back to the input
    #[test]
    fn prop_split_set_partitions(
        items in proptest::collection::vec(any::<u32>(), 1..200),
        pieces in 1usize..20
    ) {
        let slices = split_set(&items, pieces).unwrap();
        prop_assert_eq!(slices.len(), pieces);

        let sizes: Vec<usize> = slices.iter().map(Vec::len).collect();
        let max = sizes.iter().copied().max().unwrap();
        let min = sizes.iter().copied().min().unwrap();
        prop_assert!(max - min <= 1);
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));

        let joined: Vec<u32> = slices.concat();
        prop_assert_eq!(joined, items);
    }

    /// Property: every leaf's training set and test set recombine to its parent
    #[test]
    fn prop_mask_round_trip(cells in arb_cells(), folds in arb_folds()) {
        let (store, root) = store_with(&cells);
        match fractalize(&store, root, &folds, true) {
            Ok(_) => {}
            Err(Error::TooFewItems { .. }) => {
                prop_assert_eq!(store.len(), 1);
                prop_assert_eq!(store.node(root).unwrap().fold_count(), None);
                return Ok(());
            }
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        }
        let resolver = MaskResolver::new(&store);

        for id in store.node_ids() {
            let record = store.node(id).unwrap();
            let Some(parent) = record.parent() else { continue };
            if !resolver.is_mask(id).unwrap() {
                continue;
            }
            let mut rebuilt: BTreeSet<Cell> = resolver.effective_cells(id).unwrap();
            let held_out = store.cells(id).unwrap();
            prop_assert!(rebuilt.is_disjoint(&held_out));
            rebuilt.extend(held_out);
            prop_assert_eq!(rebuilt, resolver.effective_cells(parent).unwrap());
        }
    }

    /// Property: sibling test sets are disjoint and cover the parent's rows
    #[test]
    fn prop_test_sets_cover_rows(cells in arb_cells(), fold in 1usize..6) {
        let (store, root) = store_with(&cells);
        prop_assume!(fold <= store.unique_rows(root).unwrap().len());
        fractalize(&store, root, &[fold], true).unwrap();

        let mut covered = BTreeSet::new();
        for child in store.children(root).unwrap() {
            for row in store.unique_rows(child.id()).unwrap() {
                prop_assert!(covered.insert(row));
            }
        }
        prop_assert_eq!(covered, store.unique_rows(root).unwrap());
    }
}

// ============================================================================
// QuickCheck Properties
// ============================================================================

quickcheck! {
    fn qc_combine_all_but_one_drops_one_slice(
        items: Vec<u16>,
        pieces: u8,
        leave_out: u8
    ) -> TestResult {
        let pieces = usize::from(pieces % 16) + 1;
        let leave_out = usize::from(leave_out) % pieces;
        if items.is_empty() {
            return TestResult::discard();
        }
        let slices = split_set(&items, pieces).unwrap();
        let combined = combine_all_but_one(&slices, leave_out);
        TestResult::from_bool(combined.len() + slices[leave_out].len() == items.len())
    }

    fn qc_split_empty_is_error(pieces: u8) -> bool {
        split_set::<u8>(&[], usize::from(pieces) + 1).is_err()
    }
}
