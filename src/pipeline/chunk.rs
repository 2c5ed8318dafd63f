//! Sequential fixed-size reads over the source file.
//!
//! Files can be hundreds of megabytes, so they are never loaded whole: the
//! reader hands out one block at a time, and each block is uploaded before
//! the next is read. At most one block is in memory at any moment.

use crate::error::SqlizerError;
use crate::pipeline::input;
use futures::stream::{self, Stream};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Block size used by the service for multi-part uploads (10 MB).
pub const DEFAULT_CHUNK_SIZE: usize = 10_000_000;

/// Reads a file front to back in blocks of `chunk_size` bytes.
///
/// Every block is full except possibly the last. Once a read comes back
/// empty the reader is exhausted and stays so; it cannot be rewound.
///
/// The file handle lives inside the reader and is closed when the reader is
/// dropped, whichever way the upload ends.
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    offset: u64,
    exhausted: bool,
}

impl ChunkReader {
    /// Open `path` for chunked reading.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, SqlizerError> {
        if chunk_size == 0 {
            return Err(SqlizerError::InvalidOptions(
                "chunk size must be ≥ 1 byte".into(),
            ));
        }
        let file = input::open_input(path).await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            chunk_size,
            offset: 0,
            exhausted: false,
        })
    }

    /// Bytes handed out so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next block, or `None` at end of file.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SqlizerError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(self.chunk_size);
        // A single read may return fewer bytes than asked for; keep reading
        // until the block is full or the file ends.
        (&mut self.file)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)
            .await
            .map_err(|source| SqlizerError::FileRead {
                path: self.path.clone(),
                source,
            })?;

        if buf.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.offset += buf.len() as u64;
        Ok(Some(buf))
    }

    /// Turn the reader into a lazy stream of blocks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, SqlizerError>> {
        stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_chunk().await?.map(|chunk| (chunk, reader)))
        })
    }
}
