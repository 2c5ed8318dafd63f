//! Result retrieval: stream the generated SQL back to the caller.
//!
//! The result can be as large as the input, so it is handed over as a byte
//! stream straight from the response body instead of being buffered. The
//! download link is pre-signed by the service; no auth header is sent.

use crate::api::SqlizerApi;
use crate::error::SqlizerError;
use crate::job::JobState;
use crate::stream::ResultStream;
use futures::TryStreamExt;
use tracing::info;

/// Open the result of a `Complete` job.
pub async fn open_result(
    api: &dyn SqlizerApi,
    state: &JobState,
) -> Result<ResultStream, SqlizerError> {
    let location = state
        .result_location()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| SqlizerError::ResultFetchFailed {
            url: String::new(),
            reason: "service reported Complete without a result URL".to_string(),
        })?;

    info!("Fetching conversion result from {}", location);
    api.open_result(location).await
}

/// GET `url` and expose the body as a [`ResultStream`].
pub async fn fetch_result_stream(
    client: &reqwest::Client,
    url: &str,
) -> Result<ResultStream, SqlizerError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SqlizerError::ResultFetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(SqlizerError::ResultFetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let owned_url = url.to_string();
    let body = response
        .bytes_stream()
        .map_err(move |e| SqlizerError::ResultFetchFailed {
            url: owned_url.clone(),
            reason: e.to_string(),
        });

    Ok(Box::pin(body))
}
