//! Durable snapshots of a [`MemoryMatrixStore`] (Arrow/Parquet + JSON)
//!
//! Layout of a snapshot directory:
//!
//! ```text
//! <dir>/nodes.json       node catalog (serde_json)
//! <dir>/entries.parquet  node_id: UInt64, i: UInt64, j: UInt64 (null = empty row)
//! ```
//!
//! Loading does not repair references. A dangling parent in a snapshot is
//! reported by the mask resolver when the affected node is read.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{MatrixStore, MemoryMatrixStore};
use crate::matrix::{Cell, Entry, NodeId, NodeRecord};
use crate::{Error, Result};

/// Catalog file name.
pub const NODES_FILE: &str = "nodes.json";

/// Entry file name.
pub const ENTRIES_FILE: &str = "entries.parquet";

/// Rows per record batch when writing entries.
const BATCH_ROWS: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct Catalog {
    next_id: u64,
    nodes: Vec<NodeRecord>,
}

fn entries_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("node_id", DataType::UInt64, false),
        Field::new("i", DataType::UInt64, false),
        Field::new("j", DataType::UInt64, true),
    ]))
}

/// True if `dir` holds a snapshot catalog.
#[must_use]
pub fn snapshot_exists(dir: &Path) -> bool {
    dir.join(NODES_FILE).is_file()
}

/// Write every node and entry of `store` into `dir` (created if missing).
///
/// # Errors
/// Returns error if the directory or files cannot be written.
pub fn save_snapshot(store: &MemoryMatrixStore, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut nodes = Vec::with_capacity(store.len());
    for id in store.node_ids() {
        nodes.push(store.node(id)?);
    }
    let catalog = Catalog {
        next_id: store.peek_next_id(),
        nodes,
    };

    let mut writer = BufWriter::new(File::create(dir.join(NODES_FILE))?);
    serde_json::to_writer_pretty(&mut writer, &catalog)?;
    writer.flush()?;

    let entries = store.all_entries();
    let schema = entries_schema();
    let file = File::create(dir.join(ENTRIES_FILE))?;
    let mut parquet = ArrowWriter::try_new(file, Arc::clone(&schema), None)?;
    for chunk in entries.chunks(BATCH_ROWS) {
        parquet.write(&entries_batch(&schema, chunk)?)?;
    }
    parquet.close()?;

    info!(
        nodes = catalog.nodes.len(),
        entries = entries.len(),
        dir = %dir.display(),
        "Saved matrix snapshot"
    );
    Ok(())
}

fn entries_batch(schema: &SchemaRef, chunk: &[(NodeId, Entry)]) -> Result<RecordBatch> {
    let node_ids: Vec<u64> = chunk.iter().map(|(id, _)| id.0).collect();
    let rows: Vec<u64> = chunk.iter().map(|(_, entry)| entry.row()).collect();
    let columns: Vec<Option<u64>> = chunk.iter().map(|(_, entry)| entry.column()).collect();

    Ok(RecordBatch::try_new(
        Arc::clone(schema),
        vec![
            Arc::new(UInt64Array::from(node_ids)) as ArrayRef,
            Arc::new(UInt64Array::from(rows)) as ArrayRef,
            Arc::new(UInt64Array::from(columns)) as ArrayRef,
        ],
    )?)
}

/// Load a snapshot written by [`save_snapshot`].
///
/// # Errors
/// Returns error if files are missing, unreadable, or have the wrong schema.
pub fn load_snapshot(dir: &Path) -> Result<MemoryMatrixStore> {
    let reader = BufReader::new(File::open(dir.join(NODES_FILE)).map_err(|e| {
        Error::StorageError(format!(
            "Failed to open snapshot catalog in {}: {e}",
            dir.display()
        ))
    })?);
    let catalog: Catalog = serde_json::from_reader(reader)?;

    let file = File::open(dir.join(ENTRIES_FILE)).map_err(|e| {
        Error::StorageError(format!(
            "Failed to open snapshot entries in {}: {e}",
            dir.display()
        ))
    })?;
    let batches = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut entries = Vec::new();
    for batch in batches {
        let batch = batch?;
        let node_ids = u64_column(&batch, 0)?;
        let rows = u64_column(&batch, 1)?;
        let columns = u64_column(&batch, 2)?;
        for idx in 0..batch.num_rows() {
            let entry = if columns.is_null(idx) {
                Entry::EmptyRow(rows.value(idx))
            } else {
                Entry::Cell(Cell::new(rows.value(idx), columns.value(idx)))
            };
            entries.push((NodeId(node_ids.value(idx)), entry));
        }
    }

    debug!(
        nodes = catalog.nodes.len(),
        entries = entries.len(),
        "Loaded matrix snapshot"
    );
    Ok(MemoryMatrixStore::restore(
        catalog.nodes,
        entries,
        catalog.next_id,
    ))
}

fn u64_column(batch: &RecordBatch, index: usize) -> Result<&UInt64Array> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| {
            Error::StorageError(format!(
                "Snapshot column {index} is {:?}, expected UInt64",
                batch.column(index).data_type()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::NewMatrix;

    #[test]
    fn test_snapshot_round_trip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryMatrixStore::new();
        let id = store.insert_node(NewMatrix::root("Human")).unwrap();
        store.find_or_create_cell(id, 1, 10).unwrap();
        store.find_or_create_cell(id, 2, 11).unwrap();
        store.create_empty_row(id, 3).unwrap();
        store.refresh_counts(id).unwrap();

        save_snapshot(&store, dir.path()).unwrap();
        assert!(snapshot_exists(dir.path()));

        let loaded = load_snapshot(dir.path()).unwrap();
        assert_eq!(loaded.node(id).unwrap(), store.node(id).unwrap());
        assert_eq!(loaded.cells(id).unwrap(), store.cells(id).unwrap());
        assert_eq!(loaded.empty_rows(id).unwrap(), store.empty_rows(id).unwrap());
    }

    #[test]
    fn test_load_missing_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_snapshot(dir.path());
        assert!(matches!(result, Err(Error::StorageError(_))));
    }

    #[test]
    fn test_empty_store_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryMatrixStore::new();
        save_snapshot(&store, dir.path()).unwrap();
        let loaded = load_snapshot(dir.path()).unwrap();
        assert!(loaded.is_empty());
    }
}
