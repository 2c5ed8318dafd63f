//! # sqlizer-client
//!
//! Convert CSV, JSON, XLSX and XML files to SQL scripts with the SQLizer
//! conversion service.
//!
//! The conversion itself happens remotely. This crate drives one job
//! through its lifecycle: it creates the job, uploads the file in ordered
//! parts, tells the service the upload is finished, polls until the job
//! settles and hands back the generated SQL as a byte stream.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Validate  check the job configuration, collect every violation
//!  ├─ 2. Create    POST /api/files                       → job id
//!  ├─ 3. Upload    POST /api/files/{id}/data?PartNumber=N (10 MB parts, in order)
//!  ├─ 4. Uploaded  PUT  /api/files/{id}                  → Queued
//!  ├─ 5. Poll      GET  /api/files/{id}, 500 ms + 1 ms per poll
//!  └─ 6. Resolve   Complete → SQL stream, anything else → error
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlizer_client::{convert, ConvertOptions, DatabaseType, FileType, JobConfiguration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = JobConfiguration::builder()
//!         .file_type(FileType::Csv)
//!         .file_name("customers.csv")
//!         .table_name("customers")
//!         .database_type(DatabaseType::PostgreSql)
//!         .file_has_headers(true)
//!         .path("data/customers.csv")
//!         .api_key(std::env::var("SQLIZER_API_KEY").unwrap_or_default())
//!         .build()?;
//!
//!     let options = ConvertOptions::builder().timeout_secs(600).build()?;
//!     let output = convert(&job, &options).await?;
//!     eprintln!("{} rows", output.state.result_rows.unwrap_or(0));
//!     output.write_to("customers.sql").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sqlizer` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sqlizer-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{HttpApi, SqlizerApi};
pub use config::{
    ConvertOptions, ConvertOptionsBuilder, DatabaseType, FileType, JobConfiguration,
    JobConfigurationBuilder, RawJobConfiguration, DEFAULT_BASE_URL,
};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file};
pub use error::{ConfigViolation, ConversionError, SqlizerError, ViolationRule};
pub use job::{JobState, JobStatus};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::chunk::{ChunkReader, DEFAULT_CHUNK_SIZE};
pub use pipeline::poll::{FixedBackoff, LinearBackoff, PollBackoff};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::ResultStream;
