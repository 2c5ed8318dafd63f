//! Configuration types for file-to-SQL conversion.
//!
//! Two structs split the knobs by who owns them:
//!
//! * [`JobConfiguration`] describes *what* the service should convert: the
//!   file, its format, and the SQL dialect wanted. It is validated once at
//!   construction and immutable afterwards.
//! * [`ConvertOptions`] describes *how* this client talks to the service:
//!   base URL, timeout, chunk size, polling backoff, progress reporting.
//!
//! Both are built through builders. Validation of a [`JobConfiguration`]
//! never stops at the first problem: every missing or invalid field is
//! reported in one [`SqlizerError::InvalidConfig`].

use crate::api::SqlizerApi;
use crate::error::{ConfigViolation, SqlizerError};
use crate::pipeline::chunk::DEFAULT_CHUNK_SIZE;
use crate::pipeline::input;
use crate::pipeline::poll::{LinearBackoff, PollBackoff};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Production endpoint of the conversion service.
pub const DEFAULT_BASE_URL: &str = "https://sqlizer.io";

/// Longest accepted delimiter, in characters.
pub const MAX_DELIMITER_LEN: usize = 2;

// ── Wire field names ─────────────────────────────────────────────────────

const FIELD_FILE_TYPE: &str = "FileType";
const FIELD_FILE_NAME: &str = "FileName";
const FIELD_TABLE_NAME: &str = "TableName";
const FIELD_DATABASE_TYPE: &str = "DatabaseType";
const FIELD_DELIMITER: &str = "Delimiter";
const FIELD_PATH: &str = "Path";

const FIELD_ORDER: [&str; 6] = [
    FIELD_FILE_TYPE,
    FIELD_FILE_NAME,
    FIELD_TABLE_NAME,
    FIELD_DATABASE_TYPE,
    FIELD_DELIMITER,
    FIELD_PATH,
];

// ── Enums ────────────────────────────────────────────────────────────────

/// Format of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "xlsx")]
    Xlsx,
    #[serde(rename = "xml")]
    Xml,
}

impl FileType {
    pub const ALL: [FileType; 4] = [FileType::Csv, FileType::Json, FileType::Xlsx, FileType::Xml];

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Json => "json",
            FileType::Xlsx => "xlsx",
            FileType::Xml => "xml",
        }
    }

    /// Guess the file type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown file type '{s}'"))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL dialect of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    #[serde(rename = "MySQL")]
    MySql,
    #[serde(rename = "SQLServer")]
    SqlServer,
    #[serde(rename = "PostgreSQL")]
    PostgreSql,
    #[serde(rename = "SQLite")]
    Sqlite,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 4] = [
        DatabaseType::MySql,
        DatabaseType::SqlServer,
        DatabaseType::PostgreSql,
        DatabaseType::Sqlite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseType::MySql => "MySQL",
            DatabaseType::SqlServer => "SQLServer",
            DatabaseType::PostgreSql => "PostgreSQL",
            DatabaseType::Sqlite => "SQLite",
        }
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown database type '{s}'"))
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── JobConfiguration ─────────────────────────────────────────────────────

/// A validated, immutable conversion request.
///
/// Built via [`JobConfiguration::builder()`] or from untyped input with
/// [`RawJobConfiguration::validate`].
///
/// # Example
/// ```rust,no_run
/// use sqlizer_client::{DatabaseType, FileType, JobConfiguration};
///
/// let job = JobConfiguration::builder()
///     .file_type(FileType::Csv)
///     .file_name("customers.csv")
///     .table_name("customers")
///     .database_type(DatabaseType::PostgreSql)
///     .file_has_headers(true)
///     .delimiter(",")
///     .path("./customers.csv")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, PartialEq)]
pub struct JobConfiguration {
    file_type: FileType,
    file_name: String,
    table_name: String,
    database_type: DatabaseType,
    file_has_headers: bool,
    delimiter: Option<String>,
    check_table_exists: bool,
    insert_spacing: Option<i64>,
    path: PathBuf,
    api_key: Option<String>,
}

impl JobConfiguration {
    /// Create a new builder for `JobConfiguration`.
    pub fn builder() -> JobConfigurationBuilder {
        JobConfigurationBuilder::default()
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    pub fn file_has_headers(&self) -> bool {
        self.file_has_headers
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn check_table_exists(&self) -> bool {
        self.check_table_exists
    }

    pub fn insert_spacing(&self) -> Option<i64> {
        self.insert_spacing
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When present, every API request is sent with `Authorization: Bearer`.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for JobConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfiguration")
            .field("file_type", &self.file_type)
            .field("file_name", &self.file_name)
            .field("table_name", &self.table_name)
            .field("database_type", &self.database_type)
            .field("file_has_headers", &self.file_has_headers)
            .field("delimiter", &self.delimiter)
            .field("check_table_exists", &self.check_table_exists)
            .field("insert_spacing", &self.insert_spacing)
            .field("path", &self.path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Builder for [`JobConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct JobConfigurationBuilder {
    file_type: Option<FileType>,
    file_name: Option<String>,
    table_name: Option<String>,
    database_type: Option<DatabaseType>,
    file_has_headers: bool,
    delimiter: Option<String>,
    check_table_exists: bool,
    insert_spacing: Option<i64>,
    path: Option<PathBuf>,
    api_key: Option<String>,
}

impl JobConfigurationBuilder {
    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn database_type(mut self, db: DatabaseType) -> Self {
        self.database_type = Some(db);
        self
    }

    pub fn file_has_headers(mut self, v: bool) -> Self {
        self.file_has_headers = v;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn check_table_exists(mut self, v: bool) -> Self {
        self.check_table_exists = v;
        self
    }

    pub fn insert_spacing(mut self, n: i64) -> Self {
        self.insert_spacing = Some(n);
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Build the configuration, reporting every invalid field at once.
    pub fn build(self) -> Result<JobConfiguration, SqlizerError> {
        self.finish(Vec::new())
    }

    /// Validate on top of violations already found while parsing raw input.
    fn finish(self, mut violations: Vec<ConfigViolation>) -> Result<JobConfiguration, SqlizerError> {
        let already = |violations: &[ConfigViolation], field: &str| {
            violations.iter().any(|v| v.field == field)
        };

        if self.file_type.is_none() && !already(&violations, FIELD_FILE_TYPE) {
            violations.push(ConfigViolation::required(FIELD_FILE_TYPE));
        }
        let file_name = non_empty(self.file_name);
        if file_name.is_none() {
            violations.push(ConfigViolation::required(FIELD_FILE_NAME));
        }
        let table_name = non_empty(self.table_name);
        if table_name.is_none() {
            violations.push(ConfigViolation::required(FIELD_TABLE_NAME));
        }
        if self.database_type.is_none() && !already(&violations, FIELD_DATABASE_TYPE) {
            violations.push(ConfigViolation::required(FIELD_DATABASE_TYPE));
        }
        if let Some(ref d) = self.delimiter {
            if d.chars().count() > MAX_DELIMITER_LEN {
                violations.push(ConfigViolation::max_length(FIELD_DELIMITER, MAX_DELIMITER_LEN));
            }
        }
        let path = self.path.filter(|p| !p.as_os_str().is_empty());
        match path {
            None => violations.push(ConfigViolation::required(FIELD_PATH)),
            Some(ref p) => {
                if let Err(reason) = input::check_readable(p) {
                    violations.push(ConfigViolation::readable(FIELD_PATH, p, &reason));
                }
            }
        }

        violations.sort_by_key(|v| FIELD_ORDER.iter().position(|f| *f == v.field));

        match (self.file_type, file_name, table_name, self.database_type, path) {
            (Some(file_type), Some(file_name), Some(table_name), Some(database_type), Some(path))
                if violations.is_empty() =>
            {
                Ok(JobConfiguration {
                    file_type,
                    file_name,
                    table_name,
                    database_type,
                    file_has_headers: self.file_has_headers,
                    delimiter: self.delimiter,
                    check_table_exists: self.check_table_exists,
                    insert_spacing: self.insert_spacing,
                    path,
                    api_key: self.api_key,
                })
            }
            _ => Err(SqlizerError::InvalidConfig { violations }),
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Untyped conversion request as a caller would hand it over, e.g. from a
/// JSON options file. Keys use the service's PascalCase spelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawJobConfiguration {
    pub api_key: Option<String>,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub table_name: Option<String>,
    pub database_type: Option<String>,
    pub file_has_headers: Option<bool>,
    pub delimiter: Option<String>,
    pub check_table_exists: Option<bool>,
    pub insert_spacing: Option<i64>,
    pub path: Option<String>,
}

impl RawJobConfiguration {
    /// Parse a JSON object into a raw configuration.
    pub fn from_json(json: &str) -> Result<Self, SqlizerError> {
        serde_json::from_str(json).map_err(|e| SqlizerError::InvalidOptions(format!(
            "job configuration is not valid JSON: {e}"
        )))
    }

    /// Check every field and produce a [`JobConfiguration`].
    pub fn validate(self) -> Result<JobConfiguration, SqlizerError> {
        let mut violations = Vec::new();
        let mut builder = JobConfiguration::builder()
            .file_has_headers(self.file_has_headers.unwrap_or(false))
            .check_table_exists(self.check_table_exists.unwrap_or(false));

        if let Some(raw) = non_empty(self.file_type) {
            match raw.parse::<FileType>() {
                Ok(t) => builder = builder.file_type(t),
                Err(_) => violations.push(ConfigViolation::one_of(
                    FIELD_FILE_TYPE,
                    &raw,
                    &FileType::names(),
                )),
            }
        }
        if let Some(raw) = non_empty(self.database_type) {
            match raw.parse::<DatabaseType>() {
                Ok(t) => builder = builder.database_type(t),
                Err(_) => violations.push(ConfigViolation::one_of(
                    FIELD_DATABASE_TYPE,
                    &raw,
                    &DatabaseType::names(),
                )),
            }
        }
        if let Some(name) = self.file_name {
            builder = builder.file_name(name);
        }
        if let Some(name) = self.table_name {
            builder = builder.table_name(name);
        }
        if let Some(d) = self.delimiter {
            builder = builder.delimiter(d);
        }
        if let Some(n) = self.insert_spacing {
            builder = builder.insert_spacing(n);
        }
        if let Some(p) = self.path {
            builder = builder.path(p);
        }
        if let Some(k) = self.api_key {
            builder = builder.api_key(k);
        }

        builder.finish(violations)
    }
}

impl TryFrom<RawJobConfiguration> for JobConfiguration {
    type Error = SqlizerError;

    fn try_from(raw: RawJobConfiguration) -> Result<Self, Self::Error> {
        raw.validate()
    }
}

// ── ConvertOptions ───────────────────────────────────────────────────────

/// Client-side behaviour of a conversion.
///
/// Built via [`ConvertOptions::builder()`] or using
/// [`ConvertOptions::default()`].
#[derive(Clone)]
pub struct ConvertOptions {
    /// Service root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Give up polling once this much time has passed since `convert` was
    /// called. Default: none (poll until the job settles).
    ///
    /// Checked between polls only, so a call can outlive the limit by up to
    /// one polling round-trip.
    pub timeout: Option<Duration>,

    /// Size of each uploaded part in bytes. Default: 10,000,000.
    pub chunk_size: usize,

    /// Delay strategy between status polls. Default: [`LinearBackoff`]
    /// (500 ms, growing by 1 ms per poll).
    pub backoff: Arc<dyn PollBackoff>,

    /// Per-request HTTP timeout in seconds. Default: 300.
    ///
    /// Applies to each individual request, including a full part upload.
    pub request_timeout_secs: u64,

    /// Pre-constructed service client. Takes precedence over `base_url`.
    pub api: Option<Arc<dyn SqlizerApi>>,

    /// Receives lifecycle events (job created, part uploaded, status change).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backoff: Arc::new(LinearBackoff::default()),
            request_timeout_secs: 300,
            api: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("chunk_size", &self.chunk_size)
            .field("backoff", &self.backoff)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api", &self.api.as_ref().map(|_| "<dyn SqlizerApi>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConvertOptions {
    /// Create a new builder for `ConvertOptions`.
    pub fn builder() -> ConvertOptionsBuilder {
        ConvertOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConvertOptions`].
#[derive(Debug)]
pub struct ConvertOptionsBuilder {
    options: ConvertOptions,
}

impl ConvertOptionsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.options.chunk_size = bytes;
        self
    }

    pub fn backoff(mut self, backoff: Arc<dyn PollBackoff>) -> Self {
        self.options.backoff = backoff;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.options.request_timeout_secs = secs;
        self
    }

    pub fn api(mut self, api: Arc<dyn SqlizerApi>) -> Self {
        self.options.api = Some(api);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.options.progress_callback = Some(cb);
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConvertOptions, SqlizerError> {
        let o = &self.options;
        if o.chunk_size == 0 {
            return Err(SqlizerError::InvalidOptions(
                "chunk size must be ≥ 1 byte".into(),
            ));
        }
        if o.api.is_none()
            && !(o.base_url.starts_with("http://") || o.base_url.starts_with("https://"))
        {
            return Err(SqlizerError::InvalidOptions(format!(
                "base URL must be http(s), got '{}'",
                o.base_url
            )));
        }
        if o.request_timeout_secs == 0 {
            return Err(SqlizerError::InvalidOptions(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.options)
    }
}
