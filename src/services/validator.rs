//! Book file validation.
//!
//! EPUB files are ZIP containers, so a well-formed book starts with the ZIP
//! local file header signature. Files passing the check are hashed in full so
//! the log records exactly which bytes were sent.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use ring::digest::{Context, SHA256};
use thiserror::Error;

/// Leading bytes of every ZIP archive ("PK").
pub const ARCHIVE_SIGNATURE: [u8; 2] = [0x50, 0x4B];

const CHUNK_SIZE: usize = 8192;

/// Reasons a file is refused before sending.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The file does not start with the archive signature.
    #[error("{} is not an EPUB archive (bad signature)", .0.display())]
    BadSignature(PathBuf),

    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Unreadable {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBook {
    /// Validated file.
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the whole file.
    pub sha256: String,
}

/// Returns true if `bytes` begins with the archive signature.
pub fn has_archive_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&ARCHIVE_SIGNATURE)
}

/// Checks the signature of the file at `path` and digests its contents.
///
/// Never panics on I/O problems; they come back as
/// [`ValidationError::Unreadable`].
pub fn validate_book(path: &Path) -> Result<ValidatedBook, ValidationError> {
    let result = read_and_digest(path);
    match &result {
        Ok(book) => tracing::info!(file = %path.display(), sha256 = %book.sha256, "File validated"),
        Err(e) => tracing::error!(file = %path.display(), error = %e, "File validation failed"),
    }
    result
}

fn read_and_digest(path: &Path) -> Result<ValidatedBook, ValidationError> {
    let unreadable = |source| ValidationError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(path).map_err(unreadable)?);

    let mut head = [0u8; 2];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..]).map_err(unreadable)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if !has_archive_signature(&head[..filled]) {
        return Err(ValidationError::BadSignature(path.to_path_buf()));
    }

    let mut context = Context::new(&SHA256);
    context.update(&head[..filled]);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).map_err(unreadable)?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    Ok(ValidatedBook {
        path: path.to_path_buf(),
        sha256: to_hex(context.finish().as_ref()),
    })
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
