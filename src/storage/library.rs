//! Source directory layout and file relocation.
//!
//! Books are picked up from the source directory and, once attempted, moved
//! into one of two subdirectories recording the outcome. A move never
//! replaces an existing file: colliding names get a `_1`, `_2`, ... suffix.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{book_title, file_name_of, is_book_file_name, CandidateFile};

/// Subdirectory receiving delivered books.
pub const DELIVERED_DIR_NAME: &str = "已发送至Kindle";

/// Subdirectory receiving books that could not be delivered.
pub const FAILED_DIR_NAME: &str = "发送失败";

/// Errors that can occur during filesystem operations on the library.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The source directory could not be listed.
    #[error("failed to list {}: {source}", .path.display())]
    Scan {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A destination directory could not be created.
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A file could not be moved.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Relocate {
        /// Original location.
        from: PathBuf,
        /// Intended destination.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The path has no usable file name.
    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// A source directory with its delivered and failed subdirectories.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    delivered_dir: PathBuf,
    failed_dir: PathBuf,
}

impl Library {
    /// Creates a library rooted at `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            delivered_dir: root.join(DELIVERED_DIR_NAME),
            failed_dir: root.join(FAILED_DIR_NAME),
            root,
        }
    }

    /// The source directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where delivered books end up.
    pub fn delivered_dir(&self) -> &Path {
        &self.delivered_dir
    }

    /// Where undeliverable books end up.
    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Lists candidate books in the source directory, sorted by file name.
    ///
    /// Only regular files with the book extension are returned. A file named
    /// `exclude` is skipped even if it matches.
    pub fn scan(&self, exclude: Option<&str>) -> Result<Vec<CandidateFile>> {
        let scan_err = |source| LibraryError::Scan {
            path: self.root.clone(),
            source,
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();

            let Some(name) = file_name_of(&path) else {
                tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            if !is_book_file_name(name) || exclude == Some(name) {
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if let Some(candidate) = CandidateFile::new(path, metadata.len()) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        tracing::info!(dir = %self.root.display(), found = candidates.len(), "Scanned source directory");
        Ok(candidates)
    }

    /// Creates the delivered and failed directories if missing.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.root, &self.delivered_dir, &self.failed_dir] {
            fs::create_dir_all(dir).map_err(|source| LibraryError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Moves `path` into the delivered or failed directory.
    ///
    /// Returns the new location.
    pub fn relocate(&self, path: &Path, delivered: bool) -> Result<PathBuf> {
        let dest_dir = if delivered {
            &self.delivered_dir
        } else {
            &self.failed_dir
        };
        let file_name =
            file_name_of(path).ok_or_else(|| LibraryError::NoFileName(path.to_path_buf()))?;

        fs::create_dir_all(dest_dir).map_err(|source| LibraryError::CreateDir {
            path: dest_dir.clone(),
            source,
        })?;

        let dest = destination_for(dest_dir, file_name, |p| p.exists());
        fs::rename(path, &dest).map_err(|source| LibraryError::Relocate {
            from: path.to_path_buf(),
            to: dest.clone(),
            source,
        })?;

        tracing::info!(from = %path.display(), to = %dest.display(), "Moved file");
        Ok(dest)
    }
}

/// Picks a path in `dir` for `file_name` that `exists` reports as free.
///
/// The plain name is used if free, otherwise `stem_N.ext` for the smallest
/// `N >= 1` that is free.
pub fn destination_for(dir: &Path, file_name: &str, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(file_name);
    if !exists(&candidate) {
        return candidate;
    }

    let stem = book_title(file_name);
    let ext = &file_name[stem.len()..];
    (1u64..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !exists(p))
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn destination_without_collision() {
        let dest = destination_for(Path::new("/sent"), "book.epub", |_| false);
        assert_eq!(dest, PathBuf::from("/sent/book.epub"));
    }

    #[test]
    fn destination_appends_counter_before_extension() {
        let taken: HashSet<PathBuf> = ["/sent/book.epub", "/sent/book_1.epub"]
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let dest = destination_for(Path::new("/sent"), "book.epub", |p| taken.contains(p));
        assert_eq!(dest, PathBuf::from("/sent/book_2.epub"));
    }

    #[test]
    fn destination_keeps_inner_dots() {
        let dest = destination_for(Path::new("/sent"), "vol.2.epub", |p| {
            p == Path::new("/sent/vol.2.epub")
        });
        assert_eq!(dest, PathBuf::from("/sent/vol.2_1.epub"));
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.epub", "A.EPUB", "notes.txt", "send_log.txt", "c.Epub"] {
            fs::write(dir.path().join(name), b"PK").unwrap();
        }
        fs::create_dir(dir.path().join("folder.epub")).unwrap();

        let library = Library::new(dir.path());
        let names: Vec<_> = library
            .scan(Some("send_log.txt"))
            .unwrap()
            .into_iter()
            .map(|c| c.file_name)
            .collect();

        assert_eq!(names, vec!["A.EPUB", "b.epub", "c.Epub"]);
    }

    #[test]
    fn scan_honours_exclusion() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("log.epub"), b"PK").unwrap();
        fs::write(dir.path().join("book.epub"), b"PK").unwrap();

        let candidates = Library::new(dir.path()).scan(Some("log.epub")).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].file_name, "book.epub");
    }

    #[test]
    fn scan_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let library = Library::new(dir.path().join("missing"));
        assert!(matches!(library.scan(None), Err(LibraryError::Scan { .. })));
    }

    #[test]
    fn prepare_creates_outcome_directories() {
        let dir = TempDir::new().unwrap();
        let library = Library::new(dir.path().join("books"));

        library.prepare().unwrap();

        assert!(library.delivered_dir().is_dir());
        assert!(library.failed_dir().is_dir());
    }

    #[test]
    fn relocate_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let library = Library::new(dir.path());
        library.prepare().unwrap();

        let mut destinations = Vec::new();
        for round in 0..3 {
            let source = dir.path().join("book.epub");
            fs::write(&source, format!("round {round}")).unwrap();
            destinations.push(library.relocate(&source, true).unwrap());
            assert!(!source.exists());
        }

        let names: Vec<_> = destinations
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["book.epub", "book_1.epub", "book_2.epub"]);

        for (round, dest) in destinations.iter().enumerate() {
            assert_eq!(fs::read_to_string(dest).unwrap(), format!("round {round}"));
        }
    }

    #[test]
    fn relocate_failed_goes_to_failed_dir() {
        let dir = TempDir::new().unwrap();
        let library = Library::new(dir.path());
        let source = dir.path().join("broken.epub");
        fs::write(&source, b"nope").unwrap();

        let dest = library.relocate(&source, false).unwrap();

        assert_eq!(dest, library.failed_dir().join("broken.epub"));
        assert!(dest.exists());
    }

    #[test]
    fn relocate_missing_source_reports_error() {
        let dir = TempDir::new().unwrap();
        let library = Library::new(dir.path());

        let result = library.relocate(&dir.path().join("gone.epub"), true);
        assert!(matches!(result, Err(LibraryError::Relocate { .. })));
    }
}
