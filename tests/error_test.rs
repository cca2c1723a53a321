//! Tests for error types

use phenomatrix::matrix::NodeId;
use phenomatrix::{Error, ErrorKind};

#[test]
fn test_dangling_parent_error() {
    let error = Error::DanglingParent {
        node: NodeId(7),
        parent: NodeId(3),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("node 7"));
    assert!(error_str.contains("missing parent 3"));
    assert_eq!(error.kind(), ErrorKind::Integrity);
    assert!(error.is_fatal());
}

#[test]
fn test_already_fractalized_error() {
    let error = Error::AlreadyFractalized {
        node: NodeId(1),
        children: 5,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("already been fractalized"));
    assert!(error_str.contains("5 children"));
    assert!(error_str.contains("Copy the matrix"));
}

#[test]
fn test_partial_level_error() {
    let error = Error::PartialLevel {
        node: NodeId(2),
        expected: 10,
        found: 4,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("expects 10 children but has 4"));
    assert_eq!(error.kind(), ErrorKind::ConcurrencyHazard);
    assert!(error.is_fatal());
}

#[test]
fn test_malformed_line_error() {
    let error = Error::MalformedLine {
        path: "genes.Hs".to_string(),
        line: 12,
        content: "x\ty".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("genes.Hs:12"));
    assert_eq!(error.kind(), ErrorKind::Input);
    assert!(!error.is_fatal());
}

#[test]
fn test_invalid_folds_error() {
    let error = Error::InvalidFolds(vec![2, 0]);
    assert!(format!("{error}").contains("[2, 0]"));
}

#[test]
fn test_export_error_names_node_and_path() {
    let error = Error::Export {
        node: NodeId(9),
        path: "/tmp/work/matrix_9".into(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("node 9"));
    assert!(error_str.contains("/tmp/work/matrix_9"));
    assert!(std::error::Error::source(&error).is_some());
    assert_eq!(error.kind(), ErrorKind::Storage);
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("k should be greater than 0".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("k should be greater than 0"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(!error.is_fatal());
}

#[test]
fn test_too_few_items_error() {
    let error = Error::TooFewItems {
        node: NodeId(1),
        level: 1,
        items: 0,
        pieces: 2,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("empty children"));
    assert!(error_str.contains("level 1 has 0 items for 2 folds"));
    assert!(error.is_fatal());
}

#[test]
fn test_error_debug() {
    let error = Error::NodeNotFound(NodeId(4));
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NodeNotFound"));
}
