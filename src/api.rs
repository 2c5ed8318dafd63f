//! The service API as seen by the orchestrator.
//!
//! [`SqlizerApi`] is the one seam between job orchestration and HTTP: five
//! calls, one per endpoint. [`HttpApi`] implements it with reqwest; tests
//! and embedders can supply their own implementation through
//! [`crate::ConvertOptions::api`].
//!
//! | Call            | Request                                   |
//! |-----------------|-------------------------------------------|
//! | `create_job`    | `POST /api/files`                         |
//! | `upload_part`   | `POST /api/files/{id}/data?PartNumber=N`  |
//! | `mark_uploaded` | `PUT /api/files/{id}`                     |
//! | `get_job`       | `GET /api/files/{id}`                     |
//! | `open_result`   | `GET {ResultUrl}` (no auth header)        |

use crate::config::{DatabaseType, FileType, JobConfiguration};
use crate::error::SqlizerError;
use crate::job::{JobState, JobStatus};
use crate::pipeline::retrieve;
use crate::stream::ResultStream;
use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Calls the orchestrator makes against the conversion service.
///
/// Implementations must be `Send + Sync`: independent conversions may share
/// one client.
#[async_trait]
pub trait SqlizerApi: Send + Sync {
    /// Create a job for `job`. Only 200/201 count as success.
    async fn create_job(&self, job: &JobConfiguration) -> Result<JobState, SqlizerError>;

    /// Send one block of the file as part `part_number` (1-based).
    async fn upload_part(
        &self,
        job_id: &str,
        part_number: u32,
        file_name: &str,
        chunk: Vec<u8>,
    ) -> Result<(), SqlizerError>;

    /// Tell the service every part has been sent.
    async fn mark_uploaded(&self, job_id: &str) -> Result<JobState, SqlizerError>;

    /// Read the current job status.
    async fn get_job(&self, job_id: &str) -> Result<JobState, SqlizerError>;

    /// Open the generated SQL at `location`.
    async fn open_result(&self, location: &str) -> Result<ResultStream, SqlizerError>;
}

/// Body of `POST /api/files`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateJobRequest<'a> {
    file_type: FileType,
    file_name: &'a str,
    table_name: &'a str,
    database_type: DatabaseType,
    file_has_headers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delimiter: Option<&'a str>,
    check_table_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    insert_spacing: Option<i64>,
    status: JobStatus,
}

impl<'a> From<&'a JobConfiguration> for CreateJobRequest<'a> {
    fn from(job: &'a JobConfiguration) -> Self {
        Self {
            file_type: job.file_type(),
            file_name: job.file_name(),
            table_name: job.table_name(),
            database_type: job.database_type(),
            file_has_headers: job.file_has_headers(),
            delimiter: job.delimiter(),
            check_table_exists: job.check_table_exists(),
            insert_spacing: job.insert_spacing(),
            status: JobStatus::New,
        }
    }
}

/// Body of `PUT /api/files/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StatusUpdate {
    status: JobStatus,
}

/// reqwest-backed [`SqlizerApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    /// Total time allowed for each JSON/upload call. Never applied to the
    /// result download, whose body is read at the caller's pace.
    request_timeout: Option<Duration>,
}

impl HttpApi {
    /// Client for the service at `base_url`.
    ///
    /// `api_key`, when present, is sent as a bearer token on every API call.
    /// `request_timeout_secs` bounds each API call end to end; the result
    /// download only gets it as a connect timeout.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        request_timeout_secs: u64,
    ) -> Result<Self, SqlizerError> {
        let request_timeout = Duration::from_secs(request_timeout_secs);
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| SqlizerError::Internal(format!("Failed to build HTTP client: {e}")))?;
        let mut api = Self::with_client(client, base_url, api_key)?;
        api.request_timeout = Some(request_timeout);
        Ok(api)
    }

    /// Reuse an existing reqwest client (connection pool, proxies…).
    ///
    /// Timeouts are whatever `client` was built with.
    pub fn with_client(
        client: Client,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<Self, SqlizerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SqlizerError::InvalidOptions(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SqlizerError::InvalidOptions(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            request_timeout: None,
        })
    }

    /// `{base}/api/files[/{id}][/data]`
    fn files_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "files"]).extend(segments);
        }
        url
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        req: RequestBuilder,
    ) -> Result<Response, SqlizerError> {
        let req = match self.request_timeout {
            Some(timeout) => req.timeout(timeout),
            None => req,
        };
        self.authorized(req)
            .send()
            .await
            .map_err(|source| SqlizerError::Transport { operation, source })
    }
}

/// Read a body, failing on non-2xx, and decode it as a job snapshot.
async fn read_state(operation: &'static str, response: Response) -> Result<JobState, SqlizerError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| SqlizerError::Transport { operation, source })?;

    if !status.is_success() {
        return Err(SqlizerError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    JobState::from_json(&body).map_err(|e| SqlizerError::InvalidResponse {
        operation,
        detail: e.to_string(),
    })
}

#[async_trait]
impl SqlizerApi for HttpApi {
    async fn create_job(&self, job: &JobConfiguration) -> Result<JobState, SqlizerError> {
        const OP: &str = "job creation";
        let url = self.files_url(&[]);
        debug!("POST {}", url);

        let req = self.client.post(url).json(&CreateJobRequest::from(job));
        let response = self.send(OP, req).await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(SqlizerError::CreateFailed {
                status: status.as_u16(),
                body,
            });
        }
        read_state(OP, response).await
    }

    async fn upload_part(
        &self,
        job_id: &str,
        part_number: u32,
        file_name: &str,
        chunk: Vec<u8>,
    ) -> Result<(), SqlizerError> {
        const OP: &str = "part upload";
        let url = self.files_url(&[job_id, "data"]);
        debug!("POST {} (part {}, {} bytes)", url, part_number, chunk.len());

        let file_part = multipart::Part::bytes(chunk).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .text("PartNumber", part_number.to_string())
            .part("file", file_part);

        let req = self
            .client
            .post(url)
            .query(&[("PartNumber", part_number)])
            .multipart(form);
        let response = self.send(OP, req).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SqlizerError::UnexpectedStatus {
                operation: OP,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn mark_uploaded(&self, job_id: &str) -> Result<JobState, SqlizerError> {
        const OP: &str = "upload completion";
        let url = self.files_url(&[job_id]);
        debug!("PUT {}", url);

        let req = self.client.put(url).json(&StatusUpdate {
            status: JobStatus::Uploaded,
        });
        let response = self.send(OP, req).await?;
        read_state(OP, response).await
    }

    async fn get_job(&self, job_id: &str) -> Result<JobState, SqlizerError> {
        const OP: &str = "status poll";
        let url = self.files_url(&[job_id]);

        let response = self.send(OP, self.client.get(url)).await?;
        read_state(OP, response).await
    }

    async fn open_result(&self, location: &str) -> Result<ResultStream, SqlizerError> {
        retrieve::fetch_result_stream(&self.client, location).await
    }
}
