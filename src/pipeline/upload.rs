//! Ordered multi-part upload of the source file.
//!
//! The service reassembles the file by part number, so parts are numbered
//! 1, 2, 3… in the order they are read and sent one at a time: the next
//! read does not start until the previous part was acknowledged. Any part
//! failure aborts the whole upload; there is no resume.

use crate::api::SqlizerApi;
use crate::error::SqlizerError;
use crate::pipeline::chunk::ChunkReader;
use crate::progress::ProgressCallback;
use std::path::Path;
use tracing::debug;

/// What an upload sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub parts: u32,
    pub bytes: u64,
}

/// Upload `path` to job `job_id` in `chunk_size` blocks.
///
/// An empty file sends no parts.
pub async fn upload_file(
    api: &dyn SqlizerApi,
    job_id: &str,
    path: &Path,
    file_name: &str,
    chunk_size: usize,
    progress: Option<&ProgressCallback>,
) -> Result<UploadSummary, SqlizerError> {
    let total_bytes = tokio::fs::metadata(path).await.ok().map(|m| m.len());
    let mut reader = ChunkReader::open(path, chunk_size).await?;
    let mut summary = UploadSummary::default();

    while let Some(chunk) = reader.next_chunk().await? {
        let part_number = summary.parts + 1;
        let len = chunk.len() as u64;
        debug!("Job {}: uploading part {} ({} bytes)", job_id, part_number, len);

        api.upload_part(job_id, part_number, file_name, chunk).await?;

        summary.parts = part_number;
        summary.bytes += len;
        if let Some(cb) = progress {
            cb.on_part_uploaded(part_number, summary.bytes, total_bytes);
        }
    }

    Ok(summary)
}
