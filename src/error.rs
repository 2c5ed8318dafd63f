//! Error types for the sqlizer-client library.
//!
//! Two layers reflect two questions a caller asks after a failure:
//!
//! * [`SqlizerError`] — **what** went wrong. Every fatal condition of a
//!   conversion (bad configuration, transport failure, timeout, a billing or
//!   conversion failure reported by the service) is one variant.
//!
//! * [`ConversionError`] — **where the job was** when it went wrong. It wraps
//!   a [`SqlizerError`] together with the last [`JobState`] snapshot the
//!   service returned, so callers can log the job id and status for support
//!   requests. Partial progress is never rolled back.

use crate::job::JobState;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sqlizer-client library.
#[derive(Debug, Error)]
pub enum SqlizerError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// One or more configuration fields are missing or invalid.
    ///
    /// Lists every violation, not just the first one found.
    #[error("Invalid job configuration: {}", format_violations(.violations))]
    InvalidConfig { violations: Vec<ConfigViolation> },

    /// Client options (base URL, chunk size…) are unusable.
    #[error("Invalid client options: {0}")]
    InvalidOptions(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The job-creation request was answered with something other than 200/201.
    #[error("Failed to create conversion job: HTTP {status}\n{body}")]
    CreateFailed { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset…).
    #[error("Request failed during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success HTTP status.
    #[error("Unexpected HTTP {status} during {operation}\n{body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered 2xx but the body is not a job description.
    #[error("Invalid response during {operation}: {detail}")]
    InvalidResponse {
        operation: &'static str,
        detail: String,
    },

    /// The service did not assign an id, so the job cannot be addressed.
    #[error("Service returned no job id (status: {status})")]
    MissingJobId { status: String },

    /// Downloading the generated SQL failed.
    #[error("Failed to fetch conversion result from '{url}': {reason}")]
    ResultFetchFailed { url: String, reason: String },

    // ── Terminal job statuses ─────────────────────────────────────────────
    /// Polling exceeded the caller-supplied timeout.
    #[error("Conversion timeout reached after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },

    /// The account needs a subscription for this file.
    #[error("Subscription required to convert this file")]
    SubscriptionRequired,

    /// The account needs a payment for this file.
    #[error("Payment required to convert this file")]
    PaymentRequired,

    /// The service reported the conversion as failed.
    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The input file could not be opened or read.
    #[error("Failed to read input file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output SQL file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlizerError {
    /// True for failures of the request/response layer rather than of the job.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SqlizerError::Transport { .. }
                | SqlizerError::UnexpectedStatus { .. }
                | SqlizerError::InvalidResponse { .. }
                | SqlizerError::MissingJobId { .. }
                | SqlizerError::ResultFetchFailed { .. }
        )
    }

    /// Violations carried by [`SqlizerError::InvalidConfig`], empty otherwise.
    pub fn violations(&self) -> &[ConfigViolation] {
        match self {
            SqlizerError::InvalidConfig { violations } => violations,
            _ => &[],
        }
    }
}

/// The validation rule a configuration field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationRule {
    /// Field is mandatory and was absent or empty.
    Required,
    /// Value is not one of the accepted variants.
    OneOf,
    /// Text is longer than allowed.
    MaxLength,
    /// Path does not point at a readable file.
    Readable,
}

impl fmt::Display for ViolationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationRule::Required => "required",
            ViolationRule::OneOf => "oneOf",
            ViolationRule::MaxLength => "maxLength",
            ViolationRule::Readable => "readable",
        };
        f.write_str(s)
    }
}

/// A single broken rule on a single configuration field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfigViolation {
    /// Wire name of the field, e.g. `"FileType"`.
    pub field: &'static str,
    pub rule: ViolationRule,
    pub message: String,
}

impl ConfigViolation {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            rule: ViolationRule::Required,
            message: format!("Field \"{field}\" is required"),
        }
    }

    pub fn one_of(field: &'static str, got: &str, allowed: &[&str]) -> Self {
        Self {
            field,
            rule: ViolationRule::OneOf,
            message: format!(
                "Field \"{field}\" must be one of {} (got \"{got}\")",
                allowed.join(", ")
            ),
        }
    }

    pub fn max_length(field: &'static str, max: usize) -> Self {
        Self {
            field,
            rule: ViolationRule::MaxLength,
            message: format!("Field \"{field}\" must be at most {max} characters"),
        }
    }

    pub fn readable(field: &'static str, path: &std::path::Path, reason: &str) -> Self {
        Self {
            field,
            rule: ViolationRule::Readable,
            message: format!(
                "Field \"{field}\" must be a readable file ('{}': {reason})",
                path.display()
            ),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn format_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failed `convert` call: the cause plus the last job snapshot observed.
///
/// `last_state` is `None` when the failure happened before the service
/// created a job (configuration errors, a rejected create request).
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ConversionError {
    #[source]
    pub error: SqlizerError,
    pub last_state: Option<JobState>,
}

impl ConversionError {
    /// Attach the snapshot that was current when `error` happened.
    pub fn at(error: SqlizerError, state: &JobState) -> Self {
        Self {
            error,
            last_state: Some(state.clone()),
        }
    }

    pub fn error(&self) -> &SqlizerError {
        &self.error
    }

    pub fn last_state(&self) -> Option<&JobState> {
        self.last_state.as_ref()
    }

    pub fn into_inner(self) -> SqlizerError {
        self.error
    }
}

impl From<SqlizerError> for ConversionError {
    fn from(error: SqlizerError) -> Self {
        Self {
            error,
            last_state: None,
        }
    }
}
