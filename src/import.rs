//! Row and cell file import
//!
//! Both file kinds share one line format:
//!
//! ```text
//! 5         row 5 exists (empty row)
//! 7<TAB>12  cell (7, 12)
//! ```
//!
//! A row file lists rows only; a cell file may mix both. Entries follow the
//! store's dedup rules, so a row listed in the row file and again with cells
//! ends up as cells only.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::matrix::{Entry, EntryInfo, NewMatrix, NodeId, DEFAULT_SPECIES};
use crate::store::MatrixStore;
use crate::{Error, Result};

/// Attributes of an imported matrix; unset fields are inferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    title: Option<String>,
    row_species: Option<String>,
    column_species: Option<String>,
    entry_info: Option<EntryInfo>,
}

impl ImportOptions {
    /// Options with everything inferred.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Title (default: the path of the first file).
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Row species (default: inferred from the file suffix, else `Hs`).
    #[must_use]
    pub fn row_species(mut self, species: impl Into<String>) -> Self {
        self.row_species = Some(species.into());
        self
    }

    /// Column species (default: `Hs`).
    #[must_use]
    pub fn column_species(mut self, species: impl Into<String>) -> Self {
        self.column_species = Some(species.into());
        self
    }

    /// Row/column descriptor (default: gene × phenotype).
    #[must_use]
    pub fn entry_info(mut self, entry_info: EntryInfo) -> Self {
        self.entry_info = Some(entry_info);
        self
    }

    fn into_new_matrix(self, path: &Path) -> NewMatrix {
        let title = self.title.unwrap_or_else(|| path.display().to_string());
        let row_species = self
            .row_species
            .or_else(|| infer_species_from_filename(path))
            .unwrap_or_else(|| DEFAULT_SPECIES.to_string());
        let column_species = self
            .column_species
            .unwrap_or_else(|| DEFAULT_SPECIES.to_string());

        NewMatrix::root(title)
            .row_species(row_species)
            .column_species(column_species)
            .entry_info(self.entry_info.unwrap_or_default())
    }
}

/// Species abbreviation from the last dot-suffix of a file name, e.g. `At`
/// for `genes.At`. The suffix must be one capital followed by one or two
/// lowercase letters.
///
/// ```rust
/// use std::path::Path;
/// use phenomatrix::import::infer_species_from_filename;
///
/// assert_eq!(infer_species_from_filename(Path::new("data/genes.Mm")).as_deref(), Some("Mm"));
/// assert_eq!(infer_species_from_filename(Path::new("genes.txt")), None);
/// ```
#[must_use]
pub fn infer_species_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once('.')?;

    let mut chars = suffix.chars();
    let head = chars.next()?;
    let tail: Vec<char> = chars.collect();
    let valid = head.is_ascii_uppercase()
        && (1..=2).contains(&tail.len())
        && tail.iter().all(char::is_ascii_lowercase);
    valid.then(|| suffix.to_string())
}

/// Parse entries from `reader`. `source` names the input in error messages.
///
/// # Errors
/// `MalformedLine` for a line that is not one or two tab-separated integers.
pub fn read_entries<R: BufRead>(reader: R, source: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() {
            continue;
        }

        let malformed = || Error::MalformedLine {
            path: source.to_string(),
            line: index + 1,
            content: trimmed.to_string(),
        };
        let mut fields = trimmed.split('\t').map(|f| f.trim().parse::<u64>());
        let entry = match (fields.next(), fields.next(), fields.next()) {
            (Some(Ok(i)), None, None) => Entry::EmptyRow(i),
            (Some(Ok(i)), Some(Ok(j)), None) => Entry::cell(i, j),
            _ => return Err(malformed()),
        };
        entries.push(entry);
    }
    Ok(entries)
}

fn read_file(path: &Path) -> Result<Vec<Entry>> {
    let file = File::open(path).map_err(|e| {
        Error::StorageError(format!("Failed to open {}: {e}", path.display()))
    })?;
    read_entries(BufReader::new(file), &path.display().to_string())
}

/// Create a root matrix from one file.
///
/// # Errors
/// Returns error if the file is missing or holds a malformed line. Nothing is
/// inserted in that case.
pub fn create_from_file<S: MatrixStore + ?Sized>(
    store: &S,
    path: &Path,
    options: ImportOptions,
) -> Result<NodeId> {
    let entries = read_file(path)?;
    let id = store.insert_node(options.into_new_matrix(path))?;
    store.insert_entries(id, &entries)?;
    finish_import(store, id)
}

/// Create a root matrix from a row file and a cell file.
///
/// # Errors
/// Returns error if a file is missing or holds a malformed line. Nothing is
/// inserted in that case.
pub fn create_from_file_pair<S: MatrixStore + ?Sized>(
    store: &S,
    rows_path: &Path,
    cells_path: &Path,
    options: ImportOptions,
) -> Result<NodeId> {
    let rows = read_file(rows_path)?;
    let cells = read_file(cells_path)?;

    let id = store.insert_node(options.into_new_matrix(rows_path))?;
    store.insert_entries(id, &rows)?;
    store.insert_entries(id, &cells)?;
    finish_import(store, id)
}

fn finish_import<S: MatrixStore + ?Sized>(store: &S, id: NodeId) -> Result<NodeId> {
    let record = store.refresh_counts(id)?;
    info!(
        node = %id,
        title = record.title(),
        rows = record.row_count(),
        columns = record.column_count(),
        cells = record.cell_count(),
        "Imported matrix"
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_entries_mixed() {
        let input = "1\t10\n2\n\n3\t11\r\n";
        let entries = read_entries(input.as_bytes(), "mem").unwrap();
        assert_eq!(
            entries,
            vec![Entry::cell(1, 10), Entry::EmptyRow(2), Entry::cell(3, 11)]
        );
    }

    #[test]
    fn test_read_entries_rejects_garbage() {
        let err = read_entries("1\t2\nabc\n".as_bytes(), "cells.Hs").unwrap_err();
        match err {
            Error::MalformedLine { path, line, content } => {
                assert_eq!(path, "cells.Hs");
                assert_eq!(line, 2);
                assert_eq!(content, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_entries_rejects_three_fields() {
        assert!(read_entries("1\t2\t3\n".as_bytes(), "x").is_err());
    }

    #[test]
    fn test_species_inference() {
        assert_eq!(infer_species_from_filename(Path::new("genes.At")).as_deref(), Some("At"));
        assert_eq!(infer_species_from_filename(Path::new("genes.Dme")).as_deref(), Some("Dme"));
        assert_eq!(infer_species_from_filename(Path::new("genes.H")), None);
        assert_eq!(infer_species_from_filename(Path::new("genes.HS")), None);
        assert_eq!(infer_species_from_filename(Path::new("genes")), None);
    }

    #[test]
    fn test_options_infer_defaults() {
        let new = ImportOptions::new().into_new_matrix(Path::new("/data/genes.Sc"));
        let record = crate::matrix::NodeRecord::from_new(NodeId(1), new);
        assert_eq!(record.title(), "/data/genes.Sc");
        assert_eq!(record.row_species(), "Sc");
        assert_eq!(record.column_species(), "Hs");
        assert!(record.entry_info().is_phenomatrix());
    }
}
