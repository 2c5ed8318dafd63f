//! Conversion entry points: the job lifecycle from creation to result.
//!
//! ## Lifecycle
//!
//! ```text
//! create ──▶ upload parts ──▶ mark Uploaded ──▶ poll ──▶ resolve
//!  (New)      1, 2, … N        (Uploaded)      (Queued/   (Complete → SQL stream,
//!                                               Analysing/  otherwise an error)
//!                                               Processing)
//! ```
//!
//! Every step awaits the previous one; nothing in a single conversion runs
//! concurrently. Each response produces a fresh [`JobState`] snapshot which
//! is passed forward explicitly, and a failure carries the last snapshot in
//! its [`ConversionError`].

use crate::api::{HttpApi, SqlizerApi};
use crate::config::{ConvertOptions, JobConfiguration, JobConfigurationBuilder};
use crate::error::{ConversionError, SqlizerError};
use crate::job::{JobState, JobStatus};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::poll::{self, Deadline};
use crate::pipeline::{retrieve, upload};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Convert a file to SQL through the service.
///
/// This is the primary entry point for the library. The timeout in
/// `options.timeout`, if any, counts from the moment this function is
/// called.
///
/// # Returns
/// `Ok(ConversionOutput)` once the job is `Complete`; the SQL has not been
/// downloaded yet, read it from `output.stream`.
///
/// # Errors
/// Every failure is fatal and nothing is retried:
/// - `CreateFailed` when the service refuses the job
/// - transport errors on any request
/// - `Timeout` when polling outlasts `options.timeout`
/// - `SubscriptionRequired` / `PaymentRequired` / `ConversionFailed` for the
///   corresponding terminal statuses
pub async fn convert(
    job: &JobConfiguration,
    options: &ConvertOptions,
) -> Result<ConversionOutput, ConversionError> {
    let total_start = Instant::now();
    let deadline = options.timeout.map(|limit| Deadline::new(total_start, limit));
    let progress = options.progress_callback.as_ref();
    info!(
        "Starting conversion: {} → {} table '{}'",
        job.path().display(),
        job.database_type(),
        job.table_name()
    );

    let api = resolve_api(job, options)?;

    // ── Step 1: Create job ───────────────────────────────────────────────
    let state = api.create_job(job).await?;
    let job_id = match state.job_id() {
        Some(id) => id.to_string(),
        None => {
            let e = SqlizerError::MissingJobId {
                status: state.status_label().to_string(),
            };
            return Err(ConversionError::at(e, &state));
        }
    };
    info!("Created job {}", job_id);
    if let Some(cb) = progress {
        cb.on_job_created(&job_id);
    }

    // ── Step 2: Upload parts ─────────────────────────────────────────────
    let upload_start = Instant::now();
    let summary = upload::upload_file(
        api.as_ref(),
        &job_id,
        job.path(),
        job.file_name(),
        options.chunk_size,
        progress,
    )
    .await
    .map_err(|e| ConversionError::at(e, &state))?;
    let upload_duration_ms = upload_start.elapsed().as_millis() as u64;
    info!(
        "Job {}: uploaded {} parts ({} bytes) in {}ms",
        job_id, summary.parts, summary.bytes, upload_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_upload_complete(summary.parts, summary.bytes);
    }

    // ── Step 3: Mark uploaded ────────────────────────────────────────────
    let state = api
        .mark_uploaded(&job_id)
        .await
        .map_err(|e| ConversionError::at(e, &state))?;
    debug!("Job {}: marked uploaded → {}", job_id, state.status_label());
    if let Some(cb) = progress {
        cb.on_status(&state);
    }

    // ── Step 4: Poll until settled ───────────────────────────────────────
    let settled = poll::poll_until_settled(
        api.as_ref(),
        state,
        options.backoff.as_ref(),
        deadline,
        progress,
    )
    .await?;
    let state = settled.state;

    // ── Step 5: Resolve ──────────────────────────────────────────────────
    resolve(&state).map_err(|e| ConversionError::at(e, &state))?;
    let stream = retrieve::open_result(api.as_ref(), &state)
        .await
        .map_err(|e| ConversionError::at(e, &state))?;

    let stats = ConversionStats {
        parts_uploaded: summary.parts,
        bytes_uploaded: summary.bytes,
        polls: settled.polls,
        upload_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: job {} ({} rows) in {}ms",
        job_id,
        state
            .result_rows
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".to_string()),
        stats.total_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_conversion_complete(&state);
    }

    Ok(ConversionOutput {
        stream,
        state,
        stats,
    })
}

/// Convert a file and stream the SQL directly into `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    job: &JobConfiguration,
    output_path: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<(JobState, ConversionStats), ConversionError> {
    let output = convert(job, options).await?;
    let (stream, state, stats) = output.into_parts();
    crate::stream::write_to_file(stream, output_path.as_ref())
        .await
        .map_err(|e| ConversionError::at(e, &state))?;
    Ok((state, stats))
}

/// Synchronous wrapper around [`convert`] that also reads the whole result.
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    job: &JobConfiguration,
    options: &ConvertOptions,
) -> Result<String, ConversionError> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        SqlizerError::Internal(format!("Failed to create tokio runtime: {}", e))
    })?;
    runtime.block_on(async {
        let output = convert(job, options).await?;
        let state = output.state.clone();
        output
            .text()
            .await
            .map_err(|e| ConversionError::at(e, &state))
    })
}

/// Convert file content held in memory.
///
/// `bytes` is written to a managed [`tempfile`] which becomes the job's
/// path; any path already set on `job` is replaced. The temp file is removed
/// once the upload is done and `convert` returns.
///
/// # Example
/// ```rust,no_run
/// use sqlizer_client::{convert_from_bytes, ConvertOptions, DatabaseType, FileType, JobConfiguration};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = JobConfiguration::builder()
///     .file_type(FileType::Json)
///     .file_name("events.json")
///     .table_name("events")
///     .database_type(DatabaseType::Sqlite);
/// let body = br#"[{"id": 1, "kind": "click"}]"#;
/// let output = convert_from_bytes(body, job, &ConvertOptions::default()).await?;
/// println!("{}", output.text().await?);
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    job: JobConfigurationBuilder,
    options: &ConvertOptions,
) -> Result<ConversionOutput, ConversionError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| SqlizerError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| SqlizerError::Internal(format!("tempfile write: {e}")))?;

    let job = job.path(tmp.path()).build()?;
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(&job, options).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the caller's API client if given, otherwise talk HTTP to `base_url`
/// with the job's API key.
fn resolve_api(
    job: &JobConfiguration,
    options: &ConvertOptions,
) -> Result<Arc<dyn SqlizerApi>, SqlizerError> {
    if let Some(ref api) = options.api {
        return Ok(Arc::clone(api));
    }
    let api = HttpApi::new(&options.base_url, job.api_key(), options.request_timeout_secs)?;
    Ok(Arc::new(api))
}

/// Map a settled snapshot to success or the matching error.
fn resolve(state: &JobState) -> Result<(), SqlizerError> {
    match state.status {
        Some(JobStatus::Complete) => Ok(()),
        Some(JobStatus::SubscriptionRequired) => {
            warn!("Job {:?}: subscription required", state.id);
            Err(SqlizerError::SubscriptionRequired)
        }
        Some(JobStatus::PaymentRequired) => {
            warn!("Job {:?}: payment required", state.id);
            Err(SqlizerError::PaymentRequired)
        }
        Some(
            JobStatus::Failed
            | JobStatus::Unknown
            | JobStatus::New
            | JobStatus::Uploaded
            | JobStatus::Queued
            | JobStatus::Analysing
            | JobStatus::Processing,
        )
        | None => {
            let message = state
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(
                "Job {:?}: conversion failed ({}): {}",
                state.id,
                state.status_label(),
                message
            );
            Err(SqlizerError::ConversionFailed { message })
        }
    }
}
