//! Streaming access to the generated SQL.
//!
//! ## Why stream?
//!
//! A conversion result is roughly as large as its input, which may be
//! hundreds of megabytes. [`ResultStream`] yields the response body in the
//! pieces the network delivers, so callers can pipe it to disk or into a
//! database client without holding it all in memory.

use crate::error::SqlizerError;
use bytes::Bytes;
use tokio_stream::{Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A boxed stream of SQL bytes.
pub type ResultStream = Pin<Box<dyn Stream<Item = Result<Bytes, SqlizerError>> + Send>>;

/// Drain a result stream into a `String`.
///
/// Buffers the whole result; intended for small outputs and tests.
pub async fn collect_text(mut stream: ResultStream) -> Result<String, SqlizerError> {
    let mut buf = Vec::new();
    while let Some(piece) = stream.next().await {
        buf.extend_from_slice(&piece?);
    }
    String::from_utf8(buf)
        .map_err(|e| SqlizerError::Internal(format!("result is not valid UTF-8: {e}")))
}

/// Write a result stream to `path`, returning the number of bytes written.
///
/// Uses atomic write (temp file + rename) so a failed download never leaves
/// a truncated SQL script behind. The temp file is created next to `path`
/// under a unique name and is deleted on every error path, so concurrent
/// writers to the same target never share it.
pub async fn write_to_file(mut stream: ResultStream, path: &Path) -> Result<u64, SqlizerError> {
    let write_err = |source: std::io::Error| SqlizerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };

    // `tmp_path` removes the file when dropped, i.e. on any early return.
    let (file, tmp_path) = tempfile::Builder::new()
        .prefix(".sqlizer-")
        .suffix(".sql.tmp")
        .tempfile_in(parent)
        .map_err(write_err)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let mut written: u64 = 0;

    while let Some(piece) = stream.next().await {
        let piece = piece?;
        file.write_all(&piece).await.map_err(write_err)?;
        written += piece.len() as u64;
    }

    file.flush().await.map_err(write_err)?;
    drop(file);
    tmp_path.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn pieces(parts: Vec<Result<&'static str, SqlizerError>>) -> ResultStream {
        Box::pin(stream::iter(
            parts
                .into_iter()
                .map(|p| p.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn collects_all_pieces() {
        let s = pieces(vec![Ok("CREATE TABLE t (id INT);\n"), Ok("INSERT INTO t VALUES (1);\n")]);
        let text = collect_text(s).await.unwrap();
        assert_eq!(text, "CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);\n");
    }

    #[tokio::test]
    async fn writes_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out.sql");
        let n = write_to_file(pieces(vec![Ok("abc"), Ok("def")]), &out)
            .await
            .unwrap();
        assert_eq!(n, 6);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "abcdef");
        assert_eq!(entries(out.parent().unwrap()), vec!["out.sql"]);
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.sql");
        let err = write_to_file(
            pieces(vec![
                Ok("partial"),
                Err(SqlizerError::ResultFetchFailed {
                    url: "http://x".into(),
                    reason: "reset".into(),
                }),
            ]),
            &out,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SqlizerError::ResultFetchFailed { .. }));
        assert!(!out.exists());
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the final rename fail.
        let out = dir.path().join("out.sql");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("keep"), b"x").unwrap();

        let err = write_to_file(pieces(vec![Ok("abc")]), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlizerError::OutputWriteFailed { .. }));
        assert_eq!(entries(dir.path()), vec!["out.sql"]);
    }

    #[tokio::test]
    async fn concurrent_writes_to_same_target_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.sql");
        let (a, b) = tokio::join!(
            write_to_file(pieces(vec![Ok("first"), Ok("-a")]), &out),
            write_to_file(pieces(vec![Ok("second"), Ok("-b")]), &out),
        );
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 8);
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text == "first-a" || text == "second-b", "got {text:?}");
        assert_eq!(entries(dir.path()), vec!["out.sql"]);
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
