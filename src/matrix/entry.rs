//! Entries: the two kinds of record a sparse binary matrix is made of.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier (typically an Entrez gene id).
pub type RowId = u64;

/// Column identifier (typically a phenotype id).
pub type ColumnId = u64;

/// A true (positive) association between row `i` and column `j`.
///
/// Ordering is by row, then column, so a `BTreeSet<Cell>` doubles as a
/// row-major index: all cells of one row form a contiguous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Row index
    pub i: RowId,
    /// Column index
    pub j: ColumnId,
}

impl Cell {
    /// Create a cell.
    #[must_use]
    pub const fn new(i: RowId, j: ColumnId) -> Self {
        Self { i, j }
    }

    /// Smallest cell of row `i`, for range scans.
    #[must_use]
    pub const fn row_start(i: RowId) -> Self {
        Self { i, j: ColumnId::MIN }
    }

    /// Largest cell of row `i`, for range scans.
    #[must_use]
    pub const fn row_end(i: RowId) -> Self {
        Self { i, j: ColumnId::MAX }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.i, self.j)
    }
}

/// A stored matrix entry.
///
/// An empty row distinguishes "gene present, no phenotype" from "gene
/// absent": organisms lacking a gene have no entry for it at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entry {
    /// Positive association
    Cell(Cell),
    /// Row with no positive associations
    EmptyRow(RowId),
}

impl Entry {
    /// Shorthand for `Entry::Cell(Cell::new(i, j))`.
    #[must_use]
    pub const fn cell(i: RowId, j: ColumnId) -> Self {
        Self::Cell(Cell::new(i, j))
    }

    /// Row index of the entry.
    #[must_use]
    pub const fn row(&self) -> RowId {
        match self {
            Self::Cell(cell) => cell.i,
            Self::EmptyRow(i) => *i,
        }
    }

    /// Column index, `None` for an empty row.
    #[must_use]
    pub const fn column(&self) -> Option<ColumnId> {
        match self {
            Self::Cell(cell) => Some(cell.j),
            Self::EmptyRow(_) => None,
        }
    }

    /// Render with a custom separator (`":"` is used for display keys).
    #[must_use]
    pub fn to_string_with(&self, sep: &str) -> String {
        match self {
            Self::Cell(cell) => format!("{}{sep}{}", cell.i, cell.j),
            Self::EmptyRow(i) => i.to_string(),
        }
    }
}

impl From<Cell> for Entry {
    fn from(cell: Cell) -> Self {
        Self::Cell(cell)
    }
}

/// Cell-file line format: `i\tj` or just `i`.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => cell.fmt(f),
            Self::EmptyRow(i) => write!(f, "{i}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display_matches_cell_file_format() {
        assert_eq!(Entry::cell(12, 7).to_string(), "12\t7");
        assert_eq!(Entry::EmptyRow(12).to_string(), "12");
        assert_eq!(Entry::cell(12, 7).to_string_with(":"), "12:7");
    }

    #[test]
    fn test_cells_sort_row_major() {
        let mut cells = vec![Cell::new(2, 1), Cell::new(1, 9), Cell::new(1, 3)];
        cells.sort();
        assert_eq!(cells, vec![Cell::new(1, 3), Cell::new(1, 9), Cell::new(2, 1)]);
        assert!(Cell::row_start(1) <= cells[0] && cells[1] <= Cell::row_end(1));
    }

    #[test]
    fn test_entry_accessors() {
        assert_eq!(Entry::cell(4, 5).row(), 4);
        assert_eq!(Entry::cell(4, 5).column(), Some(5));
        assert_eq!(Entry::EmptyRow(4).column(), None);
    }
}
