//! Input checks: make sure the source file can actually be read.
//!
//! The path is checked when a [`crate::JobConfiguration`] is built, so a
//! typo'd path is reported with the other invalid fields before any network
//! call. The upload opens the file again later and may still fail if the
//! file vanished in between.

use crate::error::SqlizerError;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tracing::debug;

/// Check that `path` names a regular file this process may open.
///
/// Returns a short human-readable reason on failure.
pub fn check_readable(path: &Path) -> Result<(), String> {
    let meta = std::fs::metadata(path).map_err(|e| describe(&e))?;
    if !meta.is_file() {
        return Err("not a regular file".to_string());
    }
    std::fs::File::open(path).map_err(|e| describe(&e))?;
    Ok(())
}

/// Open the source file for chunked reading.
pub async fn open_input(path: &Path) -> Result<File, SqlizerError> {
    let file = File::open(path)
        .await
        .map_err(|source| SqlizerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Opened input file: {}", path.display());
    Ok(file)
}

fn describe(e: &io::Error) -> String {
    match e.kind() {
        io::ErrorKind::NotFound => "file not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => e.to_string(),
    }
}
