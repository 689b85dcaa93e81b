//! Filesystem storage for book files.
//!
//! This module provides the storage layer for kindle-courier:
//!
//! - Scanning the source directory for candidate books
//! - Creating the delivered and failed directories on demand
//! - Moving attempted books without ever overwriting an existing file

mod library;

pub use library::{
    destination_for, Library, LibraryError, Result, DELIVERED_DIR_NAME, FAILED_DIR_NAME,
};
