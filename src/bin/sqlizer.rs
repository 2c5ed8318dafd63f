//! CLI binary for sqlizer-client.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `JobConfiguration` / `ConvertOptions` and streams the SQL out.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sqlizer_client::{
    convert, convert_to_file, ConversionError, ConversionProgressCallback, ConvertOptions,
    DatabaseType, FileType, JobConfiguration, JobState, ProgressCallback, SqlizerError,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a byte bar while uploading, then a spinner showing the
/// job status and percentage while the service works.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        bar.set_style(spinner_style());
        bar.set_prefix("Creating");
        bar.set_message("job…");
        Arc::new(Self { bar })
    }

    /// Stop the ticker and wipe the bar so error output starts on a clean line.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&TICKS)
}

fn upload_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {bytes}/{total_bytes}  {msg}  ETA {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&TICKS)
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_job_created(&self, job_id: &str) {
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Job {job_id} created"))));
        self.bar.set_style(upload_style());
        self.bar.set_prefix("Uploading");
        self.bar.set_message("");
        self.bar.reset_eta();
    }

    fn on_part_uploaded(&self, part: u32, bytes_sent: u64, total_bytes: Option<u64>) {
        if let Some(total) = total_bytes {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
            }
        }
        self.bar.set_position(bytes_sent);
        self.bar.set_message(format!("part {part}"));
    }

    fn on_upload_complete(&self, parts: u32, bytes: u64) {
        self.bar.println(format!(
            "  {} Uploaded {} in {}",
            green("✓"),
            bold(&format!("{bytes} bytes")),
            dim(&format!("{parts} part(s)")),
        ));
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Converting");
        self.bar.set_message("waiting for the service…");
    }

    fn on_status(&self, state: &JobState) {
        let pct = state
            .percent_complete
            .map(|p| format!(" {p:.0}%"))
            .unwrap_or_default();
        self.bar
            .set_message(format!("{}{}", state.status_label(), pct));
    }

    fn on_conversion_complete(&self, state: &JobState) {
        self.bar.finish_and_clear();
        let rows = state
            .result_rows
            .map(|r| format!("{r} rows"))
            .unwrap_or_else(|| "done".to_string());
        eprintln!("{} Conversion complete  {}", green("✔"), dim(&rows));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a CSV with a header row to MySQL (stdout)
  sqlizer --headers customers.csv

  # PostgreSQL script into a file, custom table name
  sqlizer -d postgresql -t clients --headers customers.csv -o customers.sql

  # Semicolon-separated values, batch INSERTs by 500 rows
  sqlizer --delimiter ';' --insert-spacing 500 export.csv -o export.sql

  # Give up after ten minutes of waiting
  sqlizer --timeout 600 big.xlsx -o big.sql

ENVIRONMENT VARIABLES:
  SQLIZER_API_KEY    API key sent as a bearer token
  SQLIZER_BASE_URL   Service endpoint (default https://sqlizer.io)
  RUST_LOG           Override the log filter (e.g. sqlizer_client=debug)
"#;

/// Convert CSV, JSON, XLSX and XML files to SQL with SQLizer.
#[derive(Parser, Debug)]
#[command(
    name = "sqlizer",
    version,
    about = "Convert CSV, JSON, XLSX and XML files to SQL with SQLizer",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    input: PathBuf,

    /// Source format. Inferred from the file extension when omitted.
    #[arg(short = 'f', long, value_enum)]
    file_type: Option<FileTypeArg>,

    /// Name reported to the service. Default: the input's file name.
    #[arg(long)]
    file_name: Option<String>,

    /// Table to create or insert into. Default: the input's file stem.
    #[arg(short, long)]
    table_name: Option<String>,

    /// SQL dialect of the output.
    #[arg(short, long, value_enum, env = "SQLIZER_DATABASE_TYPE", default_value = "mysql")]
    database_type: DatabaseArg,

    /// The first row holds column names.
    #[arg(long)]
    headers: bool,

    /// Field separator for CSV input (at most two characters).
    #[arg(long)]
    delimiter: Option<String>,

    /// Emit a check for an existing table before CREATE TABLE.
    #[arg(long)]
    check_table_exists: bool,

    /// Rows per generated INSERT statement.
    #[arg(long)]
    insert_spacing: Option<i64>,

    /// API key for the service.
    #[arg(long, env = "SQLIZER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Give up waiting for the job after this many seconds.
    #[arg(long, env = "SQLIZER_TIMEOUT")]
    timeout: Option<u64>,

    /// Service endpoint.
    #[arg(long, env = "SQLIZER_BASE_URL", default_value = sqlizer_client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "SQLIZER_REQUEST_TIMEOUT", default_value_t = 300)]
    request_timeout: u64,

    /// Write SQL to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FileTypeArg {
    Csv,
    Json,
    Xlsx,
    Xml,
}

impl From<FileTypeArg> for FileType {
    fn from(v: FileTypeArg) -> Self {
        match v {
            FileTypeArg::Csv => FileType::Csv,
            FileTypeArg::Json => FileType::Json,
            FileTypeArg::Xlsx => FileType::Xlsx,
            FileTypeArg::Xml => FileType::Xml,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DatabaseArg {
    Mysql,
    Sqlserver,
    Postgresql,
    Sqlite,
}

impl From<DatabaseArg> for DatabaseType {
    fn from(v: DatabaseArg) -> Self {
        match v {
            DatabaseArg::Mysql => DatabaseType::MySql,
            DatabaseArg::Sqlserver => DatabaseType::SqlServer,
            DatabaseArg::Postgresql => DatabaseType::PostgreSql,
            DatabaseArg::Sqlite => DatabaseType::Sqlite,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level lifecycle logs.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let job = build_job(&cli)?;

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let options = build_options(&cli, progress_cb)?;
    let on_failure = |err: ConversionError| {
        if let Some(ref bar) = cli_progress {
            bar.clear();
        }
        describe_failure(err)
    };

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let (state, stats) = convert_to_file(&job, output_path, &options)
            .await
            .map_err(on_failure)
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  job {}  {} part(s)  {} polls  {}ms  →  {}",
                green("✔"),
                state.job_id().unwrap_or("?"),
                stats.parts_uploaded,
                stats.polls,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = convert(&job, &options)
            .await
            .map_err(on_failure)
            .context("Conversion failed")?;
        let (mut stream, _state, stats) = output.into_parts();

        let mut stdout = tokio::io::stdout();
        while let Some(piece) = stream.next().await {
            let piece = piece.context("Failed to download result")?;
            stdout
                .write_all(&piece)
                .await
                .context("Failed to write to stdout")?;
        }
        stdout.flush().await.context("Failed to write to stdout")?;

        if !cli.quiet && !show_progress {
            eprintln!(
                "Converted in {} part(s), {} polls, {}ms",
                stats.parts_uploaded, stats.polls, stats.total_duration_ms
            );
        }
    }

    Ok(())
}

/// Map CLI args to `JobConfiguration`, filling names from the input path.
fn build_job(cli: &Cli) -> Result<JobConfiguration> {
    let file_type = match cli.file_type {
        Some(t) => Some(FileType::from(t)),
        None => FileType::from_path(&cli.input),
    };
    let file_name = cli
        .file_name
        .clone()
        .or_else(|| file_component(&cli.input, Path::file_name));
    let table_name = cli
        .table_name
        .clone()
        .or_else(|| file_component(&cli.input, Path::file_stem));

    let mut builder = JobConfiguration::builder()
        .database_type(cli.database_type.into())
        .file_has_headers(cli.headers)
        .check_table_exists(cli.check_table_exists)
        .path(&cli.input);
    if let Some(t) = file_type {
        builder = builder.file_type(t);
    }
    if let Some(name) = file_name {
        builder = builder.file_name(name);
    }
    if let Some(name) = table_name {
        builder = builder.table_name(name);
    }
    if let Some(ref d) = cli.delimiter {
        builder = builder.delimiter(d.clone());
    }
    if let Some(n) = cli.insert_spacing {
        builder = builder.insert_spacing(n);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }

    let job = builder.build().map_err(|e| {
        for v in e.violations() {
            eprintln!("  {} {}", red("✗"), v.message);
        }
        e
    });
    job.context("Invalid job configuration")
}

/// Map CLI args to `ConvertOptions`.
fn build_options(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConvertOptions> {
    let mut builder = ConvertOptions::builder()
        .base_url(cli.base_url.clone())
        .request_timeout_secs(cli.request_timeout);
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid options")
}

fn file_component(path: &Path, part: fn(&Path) -> Option<&std::ffi::OsStr>) -> Option<String> {
    part(path).map(|s| s.to_string_lossy().into_owned())
}

/// Print where the job stood when it failed, then hand the error on.
fn describe_failure(err: ConversionError) -> SqlizerError {
    if let Some(state) = err.last_state() {
        eprintln!(
            "  {} job {}  last status {}",
            red("✗"),
            state.job_id().unwrap_or("?"),
            state.status_label()
        );
    }
    err.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_finishes_a_running_bar() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        cb.on_job_created("12345");
        cb.on_part_uploaded(1, 10, Some(20));
        assert!(!cb.bar.is_finished());

        cb.clear();
        assert!(cb.bar.is_finished());
        // Clearing twice is harmless.
        cb.clear();
    }

    #[test]
    fn completed_conversion_finishes_the_bar() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        cb.on_conversion_complete(&JobState::default());
        assert!(cb.bar.is_finished());
    }
}
