//! # phenomatrix: Tree Cross-Validation for Sparse Gene × Phenotype Matrices
//!
//! phenomatrix stores large sparse binary association matrices and
//! recursively partitions them ("fractalizes") into a balanced tree of
//! training and test sets for N-fold, optionally multi-stage,
//! cross-validation.
//!
//! ## Design Principles
//!
//! - **Masks, not copies**: root and intermediate nodes store full data;
//!   leaves store only their held-out test set and resolve the rest from
//!   their parent.
//! - **Detectable interruption**: a level records its fold count before any
//!   child is written, so a half-built level is reported instead of used.
//! - **Idempotent export**: a prepared working directory is never rewritten.
//!
//! ## Example Usage
//!
//! ```rust
//! use phenomatrix::export::Exporter;
//! use phenomatrix::matrix::{fractalize, NewMatrix};
//! use phenomatrix::store::{MatrixStore, MemoryMatrixStore};
//!
//! # fn main() -> phenomatrix::Result<()> {
//! let store = MemoryMatrixStore::new();
//! let root = store.insert_node(NewMatrix::root("Human"))?;
//! for gene in 1..=20 {
//!     store.find_or_create_cell(root, gene, gene % 4)?;
//! }
//!
//! // Two-stage cross-validation: 2 training sets with 5 folds each
//! fractalize(&store, root, &[2, 5], true)?;
//!
//! let work = std::env::temp_dir().join("phenomatrix-doc");
//! let prepared = Exporter::new(&store, &work).prepare_tree(root)?;
//! assert_eq!(prepared.len(), 3);
//! # std::fs::remove_dir_all(&work).ok();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod export;
pub mod import;
pub mod matrix;
pub mod store;

pub use error::{Error, ErrorKind, Result};
