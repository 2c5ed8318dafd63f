//! HTTP-level tests for `HttpApi` and the full conversion against a mock
//! SQLizer server.

use futures::StreamExt;
use sqlizer_client::{
    convert, ConvertOptions, DatabaseType, FileType, FixedBackoff, HttpApi, JobConfiguration,
    JobStatus, SqlizerApi, SqlizerError,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness; set `RUST_LOG` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn job_for(file: &tempfile::NamedTempFile, api_key: Option<&str>) -> JobConfiguration {
    let mut builder = JobConfiguration::builder()
        .file_type(FileType::Csv)
        .file_name("test1.csv")
        .table_name("test1")
        .database_type(DatabaseType::MySql)
        .file_has_headers(true)
        .delimiter(",")
        .check_table_exists(true)
        .insert_spacing(250)
        .path(file.path());
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    builder.build().unwrap()
}

fn state(status: &str) -> serde_json::Value {
    serde_json::json!({ "ID": "12345", "Status": status })
}

fn fast_options(server: &MockServer) -> ConvertOptions {
    ConvertOptions::builder()
        .base_url(server.uri())
        .backoff(Arc::new(FixedBackoff(Duration::ZERO)))
        .chunk_size(4)
        .build()
        .unwrap()
}

// ── HttpApi ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_job_sends_configuration_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(serde_json::json!({
            "FileType": "csv",
            "FileName": "test1.csv",
            "TableName": "test1",
            "DatabaseType": "MySQL",
            "FileHasHeaders": true,
            "Delimiter": ",",
            "CheckTableExists": true,
            "InsertSpacing": 250,
            "Status": "New"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(state("New")))
        .expect(1)
        .mount(&server)
        .await;

    let file = csv_file("a,b\n");
    let api = HttpApi::new(&server.uri(), Some("secret"), 30).unwrap();
    let created = api.create_job(&job_for(&file, Some("secret"))).await.unwrap();
    assert_eq!(created.job_id(), Some("12345"));
    assert_eq!(created.status, Some(JobStatus::New));
}

#[tokio::test]
async fn test_create_job_rejects_non_created_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let file = csv_file("a,b\n");
    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let err = api.create_job(&job_for(&file, None)).await.unwrap_err();
    match err {
        SqlizerError::CreateFailed { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected CreateFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_job_accepted_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(202).set_body_json(state("New")))
        .mount(&server)
        .await;

    let file = csv_file("a,b\n");
    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let err = api.create_job(&job_for(&file, None)).await.unwrap_err();
    assert!(matches!(err, SqlizerError::CreateFailed { status: 202, .. }));
}

#[tokio::test]
async fn test_upload_part_sends_part_number_and_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/12345/data"))
        .and(query_param("PartNumber", "3"))
        .and(body_string_contains("name=\"PartNumber\""))
        .and(body_string_contains("filename=\"test1.csv\""))
        .and(body_string_contains("id,name"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    api.upload_part("12345", 3, "test1.csv", b"id,name\n".to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mark_uploaded_puts_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/files/12345"))
        .and(body_json(serde_json::json!({ "Status": "Uploaded" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(state("Queued")))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let s = api.mark_uploaded("12345").await.unwrap();
    assert_eq!(s.status, Some(JobStatus::Queued));
}

#[tokio::test]
async fn test_get_job_with_garbage_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let err = api.get_job("12345").await.unwrap_err();
    assert!(matches!(err, SqlizerError::InvalidResponse { .. }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_get_job_server_error_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let err = api.get_job("12345").await.unwrap_err();
    assert!(matches!(
        err,
        SqlizerError::UnexpectedStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn test_result_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/downloads/gone.sql"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 30).unwrap();
    let url = format!("{}/downloads/gone.sql", server.uri());
    let err = match api.open_result(&url).await {
        Ok(_) => panic!("expected ResultFetchFailed"),
        Err(e) => e,
    };
    assert!(matches!(err, SqlizerError::ResultFetchFailed { .. }));
}

#[tokio::test]
async fn test_result_stream_outlives_request_timeout() {
    let server = MockServer::start().await;
    let body = vec![b'x'; 512 * 1024];
    Mock::given(method("GET"))
        .and(path("/downloads/big.sql"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    // One-second budget for API calls; the consumer takes longer than that.
    let api = HttpApi::new(&server.uri(), None, 1).unwrap();
    let url = format!("{}/downloads/big.sql", server.uri());
    let mut stream = api.open_result(&url).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let mut read = 0usize;
    while let Some(piece) = stream.next().await {
        read += piece.unwrap().len();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(read, body.len());
}

#[tokio::test]
async fn test_slow_api_call_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/12345"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(state("Queued"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let api = HttpApi::new(&server.uri(), None, 1).unwrap();
    let err = api.get_job("12345").await.unwrap_err();
    assert!(matches!(err, SqlizerError::Transport { .. }));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let file = csv_file("a,b\n");
    let api = HttpApi::new("http://127.0.0.1:1", None, 5).unwrap();
    let err = api.create_job(&job_for(&file, None)).await.unwrap_err();
    assert!(matches!(err, SqlizerError::Transport { .. }));
}

// ── Full conversion ──────────────────────────────────────────────────────────

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state("New")))
        .expect(1)
        .mount(server)
        .await;

    for part in 1..=3 {
        Mock::given(method("POST"))
            .and(path("/api/files/12345/data"))
            .and(query_param("PartNumber", part.to_string()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
    }

    Mock::given(method("PUT"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state("Queued")))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ID": "12345",
            "Status": "Processing",
            "PercentComplete": 50
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ID": "12345",
            "Status": "Complete",
            "PercentComplete": 100,
            "ResultRows": 1,
            "ResultUrl": format!("{}/downloads/12345.sql", server.uri())
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/downloads/12345.sql"))
        .respond_with(ResponseTemplate::new(200).set_body_string("CREATE TABLE my_table..."))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_convert_end_to_end() {
    init_tracing();
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    // 12 bytes in 4-byte parts → 3 parts.
    let file = csv_file("id,name\n1,a\n");
    let output = convert(&job_for(&file, Some("secret")), &fast_options(&server))
        .await
        .unwrap();

    assert_eq!(output.state.status, Some(JobStatus::Complete));
    assert_eq!(output.state.result_rows, Some(1));
    assert_eq!(output.stats.parts_uploaded, 3);
    assert_eq!(output.stats.bytes_uploaded, 12);
    assert_eq!(output.stats.polls, 2);
    assert_eq!(output.text().await.unwrap(), "CREATE TABLE my_table...");

    let requests = server.received_requests().await.unwrap();
    for req in &requests {
        let auth = req.headers.get("authorization");
        if req.url.path().starts_with("/api/") {
            assert_eq!(auth.and_then(|v| v.to_str().ok()), Some("Bearer secret"));
        } else {
            assert!(auth.is_none(), "result fetch must not carry credentials");
        }
    }
}

#[tokio::test]
async fn test_convert_without_api_key_sends_no_authorization() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let file = csv_file("id,name\n1,a\n");
    convert(&job_for(&file, None), &fast_options(&server))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| r.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn test_convert_payment_required() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state("New")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/12345/data"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/files/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(state("PaymentRequired")))
        .mount(&server)
        .await;

    let file = csv_file("a,b\n");
    let err = convert(&job_for(&file, None), &fast_options(&server))
        .await
        .unwrap_err();
    assert!(matches!(err.error(), SqlizerError::PaymentRequired));
    assert_eq!(err.to_string(), "Payment required to convert this file");
    assert_eq!(
        err.last_state().unwrap().status,
        Some(JobStatus::PaymentRequired)
    );
}

#[tokio::test]
async fn test_convert_create_failure_stops_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/12345/data"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let file = csv_file("a,b\n");
    let err = convert(&job_for(&file, None), &fast_options(&server))
        .await
        .unwrap_err();
    assert!(matches!(
        err.error(),
        SqlizerError::CreateFailed { status: 400, .. }
    ));
    assert!(err.last_state().is_none());
}
