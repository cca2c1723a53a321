//! Working-directory export
//!
//! Every branch node gets one directory with its row and cell files; leaf
//! children contribute their held-out test sets to the parent's directory:
//!
//! ```text
//! {work_root}/matrix_{id}/genes.Hs          effective rows, one per line
//! {work_root}/matrix_{id}/genes_phenes.Hs   effective cells ("i\tj" or "i")
//! {work_root}/matrix_{id}/testset.5-0       stored mask of leaf child 0
//! ...
//! ```
//!
//! A directory is assembled under `matrix_{id}.partial` and renamed into
//! place once every file is flushed. An existing directory is never touched
//! again; delete it with [`Exporter::remove_inputs`] to rebuild.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::matrix::{verify_level, MaskResolver, MatrixNode, NodeId, NodeKind};
use crate::store::MatrixStore;
use crate::{Error, Result};

/// Default test-set file prefix.
pub const DEFAULT_FILE_PREFIX: &str = "testset";

/// Which entries of a node a cell file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    /// Mask-resolved contents
    Effective,
    /// Stored entries (a leaf's test set)
    HeldOut,
}

/// Outcome of [`Exporter::prepare_inputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Directory already existed and was left alone
    Existing(PathBuf),
    /// Directory was written with these files
    Created {
        /// Node directory
        dir: PathBuf,
        /// File names inside `dir`
        files: Vec<String>,
    },
}

impl Prepared {
    /// Node directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self {
            Self::Existing(dir) | Self::Created { dir, .. } => dir,
        }
    }

    /// True if this call wrote the directory.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Writes node directories under a working root.
#[derive(Debug)]
pub struct Exporter<'s, S: ?Sized> {
    store: &'s S,
    work_root: PathBuf,
    file_prefix: String,
}

impl<'s, S: MatrixStore + ?Sized> Exporter<'s, S> {
    /// Create an exporter writing below `work_root`.
    #[must_use]
    pub fn new(store: &'s S, work_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            work_root: work_root.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    /// Use a different test-set prefix.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Working root.
    #[must_use]
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Test-set prefix.
    #[must_use]
    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    /// Directory of a node: `{work_root}/matrix_{id}`.
    #[must_use]
    pub fn node_dir(&self, id: NodeId) -> PathBuf {
        self.work_root.join(format!("matrix_{id}"))
    }

    fn staging_dir(&self, id: NodeId) -> PathBuf {
        self.work_root.join(format!("matrix_{id}.partial"))
    }

    /// Test-set file name of child `cardinality` among `total` siblings.
    #[must_use]
    pub fn child_filename(&self, total: usize, cardinality: usize) -> String {
        format!("{}.{total}-{cardinality}", self.file_prefix)
    }

    /// Test-set file names of all children of `id`, in cardinality order.
    ///
    /// # Errors
    /// `NodeNotFound` if the id is unknown.
    pub fn children_filenames(&self, id: NodeId) -> Result<Vec<String>> {
        let children = self.store.children(id)?;
        let total = children.len();
        Ok(children
            .iter()
            .map(|child| self.child_filename(total, child.cardinality().unwrap_or_default()))
            .collect())
    }

    /// Write the effective rows of `id`, one per line. Returns the row count.
    ///
    /// # Errors
    /// Resolution errors, or `Io` if the writer fails.
    pub fn write_rows<W: Write>(&self, id: NodeId, writer: &mut W) -> Result<usize> {
        let rows = MaskResolver::new(self.store).effective_rows(id, None)?;
        for row in &rows {
            writeln!(writer, "{row}")?;
        }
        Ok(rows.len())
    }

    /// Write the cells of `id` in cell-file format. Returns the entry count.
    ///
    /// # Errors
    /// Resolution errors, or `Io` if the writer fails.
    pub fn write_cells<W: Write>(
        &self,
        id: NodeId,
        view: CellView,
        writer: &mut W,
    ) -> Result<usize> {
        let resolver = MaskResolver::new(self.store);
        let entries = match view {
            CellView::Effective => resolver.effective_entries(id)?,
            CellView::HeldOut => resolver.held_out_entries(id)?,
        };
        for entry in &entries {
            writeln!(writer, "{entry}")?;
        }
        Ok(entries.len())
    }

    /// Write the directory of branch `id` unless it already exists.
    ///
    /// # Errors
    /// - `NotABranch` for a leaf (leaves have no directory)
    /// - `PartialLevel` / `MixedLevel` if the children are incomplete
    /// - `Export` for any filesystem failure, naming node and path
    pub fn prepare_inputs(&self, id: NodeId) -> Result<Prepared> {
        let record = match MatrixNode::load(self.store, id)? {
            MatrixNode::Branch(branch) => branch.record().clone(),
            MatrixNode::Leaf(_) => return Err(Error::NotABranch(id)),
        };

        let dir = self.node_dir(id);
        if dir.exists() {
            debug!(node = %id, dir = %dir.display(), "Inputs already prepared");
            return Ok(Prepared::Existing(dir));
        }
        let children = verify_level(self.store, id)?;

        let staging = self.staging_dir(id);
        if staging.exists() {
            warn!(node = %id, dir = %staging.display(), "Removing stale staging directory");
            fs::remove_dir_all(&staging).map_err(|source| export_error(id, &staging, source))?;
        }
        fs::create_dir_all(&staging).map_err(|source| export_error(id, &staging, source))?;

        let mut files = Vec::with_capacity(children.len() + 2);

        let rows_name = record.row_filename();
        write_file(id, &staging.join(&rows_name), |w| self.write_rows(id, w))?;
        files.push(rows_name);

        let cells_name = record.cell_filename();
        write_file(id, &staging.join(&cells_name), |w| {
            self.write_cells(id, CellView::Effective, w)
        })?;
        files.push(cells_name);

        let total = children.len();
        for child in children.iter().filter(|c| c.kind() == NodeKind::Leaf) {
            let name = self.child_filename(total, child.cardinality().unwrap_or_default());
            write_file(id, &staging.join(&name), |w| {
                self.write_cells(child.id(), CellView::HeldOut, w)
            })?;
            files.push(name);
        }

        fs::rename(&staging, &dir).map_err(|source| export_error(id, &dir, source))?;
        info!(node = %id, dir = %dir.display(), files = files.len(), "Prepared matrix inputs");
        Ok(Prepared::Created { dir, files })
    }

    /// Prepare `root` and every branch below it, depth first.
    ///
    /// # Errors
    /// As [`Exporter::prepare_inputs`]; the first failure stops the walk.
    pub fn prepare_tree(&self, root: NodeId) -> Result<Vec<Prepared>> {
        let mut prepared = Vec::new();
        self.prepare_subtree(root, &mut prepared)?;
        Ok(prepared)
    }

    fn prepare_subtree(&self, id: NodeId, prepared: &mut Vec<Prepared>) -> Result<()> {
        prepared.push(self.prepare_inputs(id)?);
        for child in verify_level(self.store, id)? {
            if child.kind() == NodeKind::Branch {
                self.prepare_subtree(child.id(), prepared)?;
            }
        }
        Ok(())
    }

    /// Delete the directory of `id`. Returns false if there was none.
    ///
    /// # Errors
    /// `Export` if the directory cannot be removed.
    pub fn remove_inputs(&self, id: NodeId) -> Result<bool> {
        let dir = self.node_dir(id);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|source| export_error(id, &dir, source))?;
        info!(node = %id, dir = %dir.display(), "Removed matrix inputs");
        Ok(true)
    }
}

fn export_error(node: NodeId, path: &Path, source: std::io::Error) -> Error {
    Error::Export {
        node,
        path: path.to_path_buf(),
        source,
    }
}

fn write_file<F>(node: NodeId, path: &Path, write: F) -> Result<usize>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<usize>,
{
    let file = File::create(path).map_err(|source| export_error(node, path, source))?;
    let mut writer = BufWriter::new(file);
    let written = write(&mut writer).map_err(|e| match e {
        Error::Io(source) => export_error(node, path, source),
        other => other,
    })?;
    writer
        .flush()
        .map_err(|source| export_error(node, path, source))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{fractalize, NewMatrix};
    use crate::store::MemoryMatrixStore;

    fn fractalized(folds: &[usize]) -> (MemoryMatrixStore, NodeId) {
        let store = MemoryMatrixStore::new();
        let root = store.insert_node(NewMatrix::root("Human")).unwrap();
        for i in 1..=10 {
            store.find_or_create_cell(root, i, 100).unwrap();
        }
        store.create_empty_row(root, 11).unwrap();
        fractalize(&store, root, folds, false).unwrap();
        (store, root)
    }

    #[test]
    fn test_prepare_writes_rows_cells_and_test_sets() {
        let (store, root) = fractalized(&[2]);
        let work = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(&store, work.path());

        let prepared = exporter.prepare_inputs(root).unwrap();
        assert!(prepared.was_created());
        let dir = prepared.dir().to_path_buf();
        assert_eq!(dir, work.path().join(format!("matrix_{root}")));

        let rows = fs::read_to_string(dir.join("genes.Hs")).unwrap();
        assert_eq!(rows.lines().count(), 11);
        let cells = fs::read_to_string(dir.join("genes_phenes.Hs")).unwrap();
        assert!(cells.starts_with("1\t100\n"));
        assert!(cells.ends_with("11\n"));

        let first = fs::read_to_string(dir.join("testset.2-0")).unwrap();
        assert_eq!(first.lines().count(), 6);
        let second = fs::read_to_string(dir.join("testset.2-1")).unwrap();
        assert_eq!(second.lines().last(), Some("11"));
        assert!(!work.path().join(format!("matrix_{root}.partial")).exists());
    }

    #[test]
    fn test_prepare_twice_changes_nothing() {
        let (store, root) = fractalized(&[2]);
        let work = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(&store, work.path());

        exporter.prepare_inputs(root).unwrap();
        let dir = exporter.node_dir(root);
        fs::write(dir.join("genes.Hs"), "sentinel\n").unwrap();

        let again = exporter.prepare_inputs(root).unwrap();
        assert_eq!(again, Prepared::Existing(dir.clone()));
        assert_eq!(fs::read_to_string(dir.join("genes.Hs")).unwrap(), "sentinel\n");
    }

    #[test]
    fn test_leaf_has_no_directory() {
        let (store, root) = fractalized(&[2]);
        let work = tempfile::tempdir().unwrap();
        let leaf = store.children(root).unwrap()[0].id();

        assert!(matches!(
            Exporter::new(&store, work.path()).prepare_inputs(leaf),
            Err(Error::NotABranch(id)) if id == leaf
        ));
    }

    #[test]
    fn test_stale_staging_is_replaced() {
        let (store, root) = fractalized(&[2]);
        let work = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(&store, work.path()).with_file_prefix("fold");
        let staging = work.path().join(format!("matrix_{root}.partial"));
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("junk"), "x").unwrap();

        let prepared = exporter.prepare_inputs(root).unwrap();
        assert!(!prepared.dir().join("junk").exists());
        assert!(prepared.dir().join("fold.2-1").exists());
    }

    #[test]
    fn test_prepare_tree_and_remove() {
        let (store, root) = fractalized(&[2, 2]);
        let work = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(&store, work.path());

        let prepared = exporter.prepare_tree(root).unwrap();
        assert_eq!(prepared.len(), 3);
        // Only the last level writes test sets.
        assert!(!exporter.node_dir(root).join("testset.2-0").exists());
        for branch in store.children(root).unwrap() {
            assert!(exporter.node_dir(branch.id()).join("testset.2-1").exists());
        }
        assert_eq!(
            exporter.children_filenames(root).unwrap(),
            vec!["testset.2-0", "testset.2-1"]
        );

        assert!(exporter.remove_inputs(root).unwrap());
        assert!(!exporter.remove_inputs(root).unwrap());
    }
}
