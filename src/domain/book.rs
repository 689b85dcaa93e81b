//! Candidate book files.

use std::path::{Path, PathBuf};

/// File name suffix accepted for delivery, compared case-insensitively.
pub const BOOK_EXTENSION: &str = ".epub";

/// MIME type of the attachment sent for each book.
pub const BOOK_MIME_TYPE: &str = "application/epub+zip";

/// A document in the source directory that is eligible for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name including extension.
    pub file_name: String,
    /// Size in bytes at scan time.
    pub size_bytes: u64,
}

impl CandidateFile {
    /// Creates a candidate from a path and its size.
    ///
    /// Returns `None` if the path has no UTF-8 file name.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path,
            file_name,
            size_bytes,
        })
    }

    /// Book title used as the message subject: the file name without its extension.
    pub fn title(&self) -> &str {
        book_title(&self.file_name)
    }

    /// Size in mebibytes, for logging.
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Returns true if `file_name` carries the book extension, ignoring case.
pub fn is_book_file_name(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(BOOK_EXTENSION)
}

/// Strips the final extension from a file name.
///
/// A leading dot does not start an extension, so `.epub` stays `.epub`.
pub fn book_title(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// Returns the UTF-8 file name of `path`, if any.
pub fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
