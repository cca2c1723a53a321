//! Tree shape queries.

use super::{NodeId, NodeRecord};
use crate::store::MatrixStore;
use crate::{Error, Result};

/// Depth of cross-validation below `id`: 0 for a bare matrix, 1 for a
/// single-stage tree, 2 for `[5, 5]` and so on. Follows the first child.
///
/// # Errors
/// `NodeNotFound` if a node vanished mid-walk.
pub fn stages<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<usize> {
    let mut depth = 0;
    let mut current = id;
    while let Some(first) = store.children(current)?.into_iter().next() {
        depth += 1;
        current = first.id();
    }
    Ok(depth)
}

/// True if the tree has at least two stages.
///
/// # Errors
/// `NodeNotFound` if the id is unknown.
pub fn has_grandchildren<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<bool> {
    Ok(stages(store, id)? >= 2)
}

/// True if the tree has at least three stages.
///
/// # Errors
/// `NodeNotFound` if the id is unknown.
pub fn has_great_grandchildren<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<bool> {
    Ok(stages(store, id)? >= 3)
}

/// Children of `id` after checking the level is complete and uniform.
///
/// A level is complete when the child count matches the recorded fold count
/// and the cardinalities are exactly `0..count`.
///
/// # Errors
/// `PartialLevel` for an incomplete level, `MixedLevel` if branches and
/// leaves are mixed.
pub fn verify_level<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<Vec<NodeRecord>> {
    let record = store.node(id)?;
    let children = store.children(id)?;
    let expected = record.fold_count().unwrap_or(children.len());

    let contiguous = children
        .iter()
        .enumerate()
        .all(|(n, child)| child.cardinality() == Some(n));
    if children.len() != expected || !contiguous {
        return Err(Error::PartialLevel {
            node: id,
            expected,
            found: children.len(),
        });
    }

    if let Some(first) = children.first() {
        if children.iter().any(|child| child.kind() != first.kind()) {
            return Err(Error::MixedLevel(id));
        }
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{NewMatrix, NodeKind};
    use crate::store::MemoryMatrixStore;

    fn with_children(kinds: &[NodeKind], fold_count: Option<usize>) -> (MemoryMatrixStore, NodeId) {
        let store = MemoryMatrixStore::new();
        let root = store.insert_node(NewMatrix::root("m")).unwrap();
        let mut record = store.node(root).unwrap();
        if let Some(folds) = fold_count {
            record.set_fold_count(folds);
            store.update_node(record.clone()).unwrap();
        }
        for (n, kind) in kinds.iter().enumerate() {
            store
                .insert_node(NewMatrix::child_of(&record, n, kinds.len(), *kind))
                .unwrap();
        }
        (store, root)
    }

    #[test]
    fn test_stages() {
        let (store, root) = with_children(&[NodeKind::Branch, NodeKind::Branch], Some(2));
        assert_eq!(stages(&store, root).unwrap(), 1);
        assert!(!has_grandchildren(&store, root).unwrap());

        let first = store.children(root).unwrap()[0].clone();
        store
            .insert_node(NewMatrix::child_of(&first, 0, 1, NodeKind::Leaf))
            .unwrap();
        assert_eq!(stages(&store, root).unwrap(), 2);
        assert!(has_grandchildren(&store, root).unwrap());
        assert!(!has_great_grandchildren(&store, root).unwrap());
    }

    #[test]
    fn test_verify_complete_level() {
        let (store, root) = with_children(&[NodeKind::Leaf; 3], Some(3));
        assert_eq!(verify_level(&store, root).unwrap().len(), 3);
    }

    #[test]
    fn test_verify_partial_level() {
        let (store, root) = with_children(&[NodeKind::Leaf; 2], Some(4));
        assert!(matches!(
            verify_level(&store, root),
            Err(Error::PartialLevel { expected: 4, found: 2, .. })
        ));
    }

    #[test]
    fn test_verify_mixed_level() {
        let (store, root) = with_children(&[NodeKind::Leaf, NodeKind::Branch], Some(2));
        assert!(matches!(verify_level(&store, root), Err(Error::MixedLevel(_))));
    }
}
