use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use readership::analytics::GeoIpService;
use readership::auth::AuthClient;
use readership::config::{validate_session_timeout, Config};
use readership::pipeline::{Pipeline, PipelineError, ReportWriter};
use readership::resolver::HttpResolver;

#[derive(Parser)]
#[command(name = "readership")]
#[command(about = "Count deduplicated, geo-enriched reading sessions from access logs", long_about = None)]
struct Cli {
    /// Session timeout in seconds (overrides SESSION_TIMEOUT)
    #[arg(long)]
    session_timeout: Option<i64>,

    /// Slide the session window on every request (overrides ROLLOVER; `--rollover false` disables it)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    rollover: Option<bool>,

    /// Write a header row before the report (overrides ADD_HEADERS; `--add-headers false` disables it)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    add_headers: Option<bool>,

    /// Read the access log from a file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the report, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(PipelineError::Resolution { .. }) = e.downcast_ref::<PipelineError>() {
                eprintln!("{e}");
            } else {
                error!("{e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(timeout) = cli.session_timeout {
        config.session.timeout_secs =
            validate_session_timeout(timeout).context("invalid --session-timeout")?;
    }
    if let Some(rollover) = cli.rollover {
        config.session.rollover = rollover;
    }
    if let Some(add_headers) = cli.add_headers {
        config.report.add_headers = add_headers;
    }
    info!(
        timeout_secs = config.session.timeout_secs,
        rollover = config.session.rollover,
        "Loaded configuration"
    );

    let token = AuthClient::from_config(&config.auth)?
        .fetch_token()
        .await
        .context("authentication failed")?;
    info!("🔐 Authenticated against {}", config.auth.endpoint);

    let resolver = HttpResolver::from_config(&config.resolver, token)?;
    info!(
        "Resolving identifiers via {} (scheme: {}, strict: {}, {} excluded URLs)",
        config.resolver.endpoint,
        config.resolver.scheme,
        config.resolver.strict,
        config.resolver.excluded_urls.len()
    );

    let geo = GeoIpService::new(config.geo.database_path.as_deref())?;
    match config.geo.database_path.as_deref() {
        Some(path) => info!("🌍 Using GeoIP database: {}", path),
        None => info!("🌍 No GeoIP database configured, countries will be left empty"),
    }

    let pipeline = Pipeline::new(
        Arc::new(resolver),
        config.resolver.excluded_urls.clone(),
        Arc::new(geo),
        &config.session,
    );

    let input: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut output = pipeline.run(input).await?;

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut report = ReportWriter::new(sink, &config.report.measure_uri, config.report.add_headers)?;
    report.write_all(output.hits.drain().iter())?;
    report.finish()?.flush()?;

    Ok(())
}
