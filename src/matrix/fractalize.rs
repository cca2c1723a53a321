//! Fractalization: recursive N-fold partitioning into a cross-validation tree
//!
//! `folds = [f0, f1, ...]` builds `f0` children under the root. With more
//! than one count left the children are branches holding the union of all
//! slices but their own, and each is fractalized with the remaining counts.
//! The last count builds leaves whose mask is exactly their slice.
//!
//! The whole tree is planned in memory first, so a fold count that would
//! leave a child empty fails before anything is written. Persisting then
//! goes level by level, copying child entries from the persisted parent.
//! Every node's `fold_count` is recorded before its first child is written,
//! so an interrupted level is detectable.
//!
//! # Example
//!
//! ```rust
//! use phenomatrix::matrix::{Fractalizer, FractalizeOptions, NewMatrix};
//! use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
//!
//! # fn main() -> phenomatrix::Result<()> {
//! let store = MemoryMatrixStore::new();
//! let root = store.insert_node(NewMatrix::root("Human"))?;
//! for i in 1..=10 {
//!     store.find_or_create_cell(root, i, 1)?;
//! }
//!
//! let options = FractalizeOptions::default().seed(7);
//! Fractalizer::new(&store, options).run(root, &[2, 5])?;
//!
//! assert_eq!(store.children(root)?.len(), 2);
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    combine_all_but_one, split_set, Cell, MatrixNode, NewMatrix, NodeId, NodeKind, NodeRecord,
    RowId,
};
use crate::store::MatrixStore;
use crate::{Error, Result};

/// What a level divides among its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    /// Whole rows move together
    #[default]
    Row,
    /// Individual cells are divided (legacy)
    Cell,
}

/// Contents planned for one child, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Division {
    /// Rows whose parent entries are copied into the child
    Rows(Vec<RowId>),
    /// Cells copied into the child; `rows` are all parent rows, used to
    /// record empty rows in branch children
    Cells {
        /// Cells of the child
        cells: Vec<Cell>,
        /// Every row of the parent
        rows: Vec<RowId>,
    },
}

impl Division {
    /// Number of divided items (rows or cells).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Cells { cells, .. } => cells.len(),
        }
    }

    /// True if there is nothing to divide.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the items of a node being split come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState<'a> {
    /// Nothing planned yet; has no items
    #[default]
    Unbuilt,
    /// Planned in memory, not yet in the store
    BuiltInMemory(&'a Division),
    /// Written to the store under this id
    Persisted(NodeId),
}

/// Options for a fractalization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractalizeOptions {
    /// Shuffle before splitting each level
    pub shuffle: bool,
    /// Seed for reproducible shuffles; entropy if unset
    pub seed: Option<u64>,
    /// Split method per level; `Row` everywhere if unset
    pub methods: Option<Vec<SplitMethod>>,
}

impl Default for FractalizeOptions {
    fn default() -> Self {
        Self {
            shuffle: true,
            seed: None,
            methods: None,
        }
    }
}

impl FractalizeOptions {
    /// Enable or disable shuffling.
    #[must_use]
    pub const fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Fix the shuffle seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set one split method per level.
    #[must_use]
    pub fn methods(mut self, methods: Vec<SplitMethod>) -> Self {
        self.methods = Some(methods);
        self
    }
}

/// Rows (empty rows included) and cells of a node, both ascending.
#[derive(Debug, Default)]
struct Contents {
    rows: Vec<RowId>,
    cells: Vec<Cell>,
}

impl Contents {
    /// What a child planned from `self` with `division` will hold.
    fn narrow(&self, division: &Division) -> Self {
        match division {
            Division::Rows(rows) => {
                let keep: FxHashSet<RowId> = rows.iter().copied().collect();
                let mut rows = rows.clone();
                rows.sort_unstable();
                Self {
                    rows,
                    cells: self
                        .cells
                        .iter()
                        .filter(|c| keep.contains(&c.i))
                        .copied()
                        .collect(),
                }
            }
            Division::Cells { cells, rows } => {
                let mut cells = cells.clone();
                cells.sort_unstable();
                Self {
                    rows: rows.clone(),
                    cells,
                }
            }
        }
    }
}

/// A level's items after splitting.
enum Slices {
    Rows(Vec<Vec<RowId>>),
    Cells {
        slices: Vec<Vec<Cell>>,
        rows: Vec<RowId>,
    },
}

impl Slices {
    /// Leaf `n` keeps slice `n`; branch `n` keeps everything else.
    fn child(&self, n: usize, terminal: bool) -> Division {
        match self {
            Self::Rows(slices) => Division::Rows(if terminal {
                slices[n].clone()
            } else {
                combine_all_but_one(slices, n)
            }),
            Self::Cells { slices, rows } => Division::Cells {
                cells: if terminal {
                    slices[n].clone()
                } else {
                    combine_all_but_one(slices, n)
                },
                rows: rows.clone(),
            },
        }
    }
}

/// One planned child and the plan of the level below it.
struct Planned {
    division: Division,
    children: Vec<Planned>,
}

/// Reject a level that would leave some child without items.
fn check_items(root: NodeId, level: usize, items: usize, pieces: usize) -> Result<()> {
    if items == 0 && level == 0 {
        return Err(Error::EmptySplit(root));
    }
    if items < pieces {
        return Err(Error::TooFewItems {
            node: root,
            level,
            items,
            pieces,
        });
    }
    Ok(())
}

/// Builds cross-validation trees in a store.
#[derive(Debug)]
pub struct Fractalizer<'s, S: ?Sized> {
    store: &'s S,
    options: FractalizeOptions,
    rng: StdRng,
}

impl<'s, S: MatrixStore + ?Sized> Fractalizer<'s, S> {
    /// Create a fractalizer over `store`.
    #[must_use]
    pub fn new(store: &'s S, options: FractalizeOptions) -> Self {
        let rng = options
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            store,
            options,
            rng,
        }
    }

    /// Fractalize `root` with one fold count per level and return its
    /// refreshed record.
    ///
    /// Nothing is written unless every level can give each child at least
    /// one row (or cell).
    ///
    /// # Errors
    /// - `InvalidFolds` if `folds` is empty or holds a zero
    /// - `FoldMismatch` if per-level methods do not match `folds`
    /// - `NotABranch` if `root` is a leaf
    /// - `AlreadyFractalized` if `root` already has children
    /// - `PartialLevel` if a previous run was interrupted
    /// - `EmptySplit` if the root has nothing to divide
    /// - `TooFewItems` if some level has fewer items than folds
    pub fn run(&mut self, root: NodeId, folds: &[usize]) -> Result<NodeRecord> {
        if folds.is_empty() || folds.contains(&0) {
            return Err(Error::InvalidFolds(folds.to_vec()));
        }
        let methods = match &self.options.methods {
            Some(methods) if methods.len() != folds.len() => {
                return Err(Error::FoldMismatch {
                    folds: folds.len(),
                    methods: methods.len(),
                });
            }
            Some(methods) => methods.clone(),
            None => vec![SplitMethod::Row; folds.len()],
        };

        let mut record = match MatrixNode::load(self.store, root)? {
            MatrixNode::Branch(branch) => branch.record().clone(),
            MatrixNode::Leaf(_) => return Err(Error::NotABranch(root)),
        };
        self.ensure_unfractalized(&record)?;

        let contents = self.contents(NodeState::Persisted(root), &Contents::default())?;
        let plan = self.plan_level(root, 0, &contents, folds, &methods)?;

        record.set_fold_count(folds[0]);
        self.store.update_node(record.clone())?;
        self.persist_level(&record, plan, folds)?;
        self.store.node(root)
    }

    fn ensure_unfractalized(&self, record: &NodeRecord) -> Result<()> {
        let found = self.store.children(record.id())?.len();
        match (record.fold_count(), found) {
            (None, 0) => Ok(()),
            (Some(expected), found) if found < expected => Err(Error::PartialLevel {
                node: record.id(),
                expected,
                found,
            }),
            (_, children) => Err(Error::AlreadyFractalized {
                node: record.id(),
                children,
            }),
        }
    }

    /// Items of a node about to be split. A persisted node is read from the
    /// store, a planned one is narrowed from its parent's contents.
    fn contents(&self, state: NodeState<'_>, parent: &Contents) -> Result<Contents> {
        match state {
            NodeState::Persisted(id) => Ok(Contents {
                rows: self.store.unique_rows(id)?.into_iter().collect(),
                cells: self.store.cells(id)?.into_iter().collect(),
            }),
            NodeState::BuiltInMemory(division) => Ok(parent.narrow(division)),
            NodeState::Unbuilt => Ok(Contents::default()),
        }
    }

    fn plan_level(
        &mut self,
        root: NodeId,
        level: usize,
        contents: &Contents,
        folds: &[usize],
        methods: &[SplitMethod],
    ) -> Result<Vec<Planned>> {
        let (Some(&pieces), Some(&method)) = (folds.first(), methods.first()) else {
            return Ok(Vec::new());
        };
        let terminal = folds.len() == 1;
        let slices = self.split_level(root, level, contents, method, pieces)?;

        let mut planned = Vec::with_capacity(pieces);
        for n in 0..pieces {
            let division = slices.child(n, terminal);
            let children = if terminal {
                Vec::new()
            } else {
                let below = self.contents(NodeState::BuiltInMemory(&division), contents)?;
                self.plan_level(root, level + 1, &below, &folds[1..], &methods[1..])?
            };
            planned.push(Planned { division, children });
        }
        Ok(planned)
    }

    fn split_level(
        &mut self,
        root: NodeId,
        level: usize,
        contents: &Contents,
        method: SplitMethod,
        pieces: usize,
    ) -> Result<Slices> {
        match method {
            SplitMethod::Row => {
                let mut items = contents.rows.clone();
                check_items(root, level, items.len(), pieces)?;
                if self.options.shuffle {
                    items.shuffle(&mut self.rng);
                }
                debug!(root = %root, level, rows = items.len(), pieces, "Splitting rows");
                Ok(Slices::Rows(split_set(&items, pieces)?))
            }
            SplitMethod::Cell => {
                let mut items = contents.cells.clone();
                check_items(root, level, items.len(), pieces)?;
                if self.options.shuffle {
                    items.shuffle(&mut self.rng);
                }
                debug!(root = %root, level, cells = items.len(), pieces, "Splitting cells");
                Ok(Slices::Cells {
                    slices: split_set(&items, pieces)?,
                    rows: contents.rows.clone(),
                })
            }
        }
    }

    /// Write one planned level under the persisted `parent`, then the levels
    /// below it.
    fn persist_level(
        &self,
        parent: &NodeRecord,
        level: Vec<Planned>,
        folds: &[usize],
    ) -> Result<()> {
        let total = level.len();
        let below = folds.get(1).copied();

        let mut written = Vec::with_capacity(total);
        for (n, planned) in level.into_iter().enumerate() {
            let id = self.persist_child(parent, n, total, below, &planned.division)?;
            written.push((id, planned.children));
        }

        if below.is_some() {
            for (id, children) in written {
                let child = self.store.node(id)?;
                self.persist_level(&child, children, &folds[1..])?;
            }
        }
        Ok(())
    }

    /// Insert child `n` and copy its entries from `parent`. A branch child
    /// carries the fold count of its own level from the start.
    fn persist_child(
        &self,
        parent: &NodeRecord,
        n: usize,
        total: usize,
        below: Option<usize>,
        division: &Division,
    ) -> Result<NodeId> {
        let new = match below {
            Some(folds) => {
                NewMatrix::child_of(parent, n, total, NodeKind::Branch).fold_count(folds)
            }
            None => NewMatrix::child_of(parent, n, total, NodeKind::Leaf),
        };
        let id = self.store.insert_node(new)?;

        match division {
            Division::Rows(rows) => {
                for &i in rows {
                    let entries = self.store.entries_for_row(parent.id(), i)?;
                    self.store.insert_entries(id, &entries)?;
                }
            }
            Division::Cells { cells, rows } => {
                for cell in cells {
                    self.store.find_or_create_cell(id, cell.i, cell.j)?;
                }
                if below.is_some() {
                    let covered: FxHashSet<RowId> = cells.iter().map(|c| c.i).collect();
                    for &i in rows.iter().filter(|i| !covered.contains(i)) {
                        self.store.create_empty_row(id, i)?;
                    }
                }
            }
        }

        let record = self.store.refresh_counts(id)?;
        info!(
            rows = record.row_count(),
            parent = %parent.id(),
            child = %id,
            "Generated child matrix"
        );
        Ok(id)
    }
}

/// Fractalize with default options apart from `shuffle`.
///
/// # Errors
/// See [`Fractalizer::run`].
pub fn fractalize<S: MatrixStore + ?Sized>(
    store: &S,
    root: NodeId,
    folds: &[usize],
    shuffle: bool,
) -> Result<NodeRecord> {
    Fractalizer::new(store, FractalizeOptions::default().shuffle(shuffle)).run(root, folds)
}
