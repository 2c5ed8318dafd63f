//! Progress-callback trait for job lifecycle events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConvertOptionsBuilder::progress_callback`] to receive
//! events as the conversion moves through creation, upload and processing.
//!
//! A conversion spends most of its wall time in two places: pushing parts
//! and waiting on the service. The events below cover both, so a host can
//! draw an upload bar first and a status spinner afterwards. Forwarding to a
//! channel or a log sink is left to the implementor.
//!
//! # Example
//!
//! ```rust
//! use sqlizer_client::{ConversionProgressCallback, ConvertOptions};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PartCounter {
//!     parts: AtomicU32,
//! }
//!
//! impl ConversionProgressCallback for PartCounter {
//!     fn on_part_uploaded(&self, part: u32, bytes_sent: u64, total_bytes: Option<u64>) {
//!         self.parts.store(part, Ordering::SeqCst);
//!         eprintln!("part {part}: {bytes_sent}/{total_bytes:?} bytes");
//!     }
//! }
//!
//! let options = ConvertOptions::builder()
//!     .progress_callback(Arc::new(PartCounter { parts: AtomicU32::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobState;
use std::sync::Arc;

/// Called by the orchestrator as a conversion advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events of one conversion arrive in order, from one
/// task at a time.
pub trait ConversionProgressCallback: Send + Sync {
    /// The service accepted the job and assigned `job_id`.
    fn on_job_created(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Part `part` was acknowledged.
    ///
    /// # Arguments
    /// * `part`        — 1-based part number
    /// * `bytes_sent`  — cumulative bytes uploaded so far
    /// * `total_bytes` — file size, when it could be determined
    fn on_part_uploaded(&self, part: u32, bytes_sent: u64, total_bytes: Option<u64>) {
        let _ = (part, bytes_sent, total_bytes);
    }

    /// Every part is uploaded; the job is about to be marked as such.
    fn on_upload_complete(&self, parts: u32, bytes: u64) {
        let _ = (parts, bytes);
    }

    /// A new snapshot arrived (after "uploaded" and after every poll).
    fn on_status(&self, state: &JobState) {
        let _ = state;
    }

    /// The job completed and the result stream is about to be returned.
    fn on_conversion_complete(&self, state: &JobState) {
        let _ = state;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConvertOptions`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
