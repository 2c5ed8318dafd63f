//! Result types returned by a successful conversion.

use crate::error::SqlizerError;
use crate::job::JobState;
use crate::stream::{self, ResultStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Timing and volume figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Parts sent to the service.
    pub parts_uploaded: u32,
    /// Bytes of source file uploaded.
    pub bytes_uploaded: u64,
    /// Status requests issued while waiting for the job.
    pub polls: u32,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A finished conversion: the SQL stream plus what the service reported.
pub struct ConversionOutput {
    /// Generated SQL, not yet read.
    pub stream: ResultStream,
    /// Final job snapshot (status `Complete`).
    pub state: JobState,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Read the whole result into memory.
    pub async fn text(self) -> Result<String, SqlizerError> {
        stream::collect_text(self.stream).await
    }

    /// Stream the result to `path`; returns bytes written.
    pub async fn write_to(self, path: impl AsRef<Path>) -> Result<u64, SqlizerError> {
        stream::write_to_file(self.stream, path.as_ref()).await
    }

    /// Split into the raw stream and the metadata.
    pub fn into_parts(self) -> (ResultStream, JobState, ConversionStats) {
        (self.stream, self.state, self.stats)
    }
}

impl fmt::Debug for ConversionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOutput")
            .field("stream", &"<ResultStream>")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}
