//! `requester` command line.
//!
//! Issues one request through the resumable requester, or inspects and replays
//! the request journal.
//!
//! ```text
//! requester --config requester.toml get /api/v1/resource --param limit=20
//! requester --config requester.toml post /api/v1/statuses --auth --resumable --param status=hi
//! requester post /api/v2/media --auth --resumable --file file=cat.png --part description=cat
//! requester --config requester.toml resume
//! ```
//!
//! Ctrl-C while a request is in flight interrupts it; resumable requests stay
//! journaled for `resume`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use resumable_requester::clock::SystemClock;
use resumable_requester::config::{load_config, RequesterConfig};
use resumable_requester::observability::logging::init_logging;
use resumable_requester::observability::metrics::describe_metrics;
use resumable_requester::{
    Authentication, FormPart, Method, Parameters, RequestDescriptor, RequestExecutor, Requester,
    RequesterError, ResumableRequester, Response, Resumption,
};

#[derive(Parser)]
#[command(name = "requester")]
#[command(about = "Deduplicating, retrying, resumable HTTP requester", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(RequestArgs),
    /// Send a POST request
    Post(RequestArgs),
    /// Send a DELETE request
    Delete(RequestArgs),
    /// Replay every journaled request
    Resume,
    /// List journaled requests
    Pending,
    /// Drop every journaled request
    Clear,
}

#[derive(Args)]
struct RequestArgs {
    /// Route relative to the configured base URL
    route: String,

    /// Unlock with the configured access token first
    #[arg(long)]
    auth: bool,

    /// Journal the request so an interruption can be resumed
    #[arg(long)]
    resumable: bool,

    /// Request parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Multipart text field as name=value (repeatable, POST only)
    #[arg(long = "part", value_parser = parse_param)]
    parts: Vec<(String, String)>,

    /// Multipart file field as name=path (repeatable, POST only)
    #[arg(long = "file", value_parser = parse_param)]
    files: Vec<(String, String)>,
}

impl RequestArgs {
    async fn descriptor(&self, method: Method) -> std::io::Result<RequestDescriptor> {
        let authentication = if self.auth {
            Authentication::Scheduled
        } else {
            Authentication::None
        };

        let mut parts: Vec<FormPart> = self
            .parts
            .iter()
            .map(|(name, value)| FormPart::text(name.clone(), value.clone()))
            .collect();
        for (name, path) in &self.files {
            let bytes = tokio::fs::read(path).await?;
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            parts.push(FormPart::file(name.clone(), file_name, None, bytes));
        }

        Ok(RequestDescriptor::new(method, self.route.clone(), authentication)
            .with_parameters(Parameters::from_pairs(self.params.clone()))
            .with_parts(parts))
    }

    fn resumption(&self) -> Resumption {
        if self.resumable {
            Resumption::Resumable
        } else {
            Resumption::None
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => RequesterConfig::default(),
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Warning: logging disabled: {}", e);
    }
    describe_metrics();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &RequesterConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = Requester::from_config(config).await?;
    tracing::debug!(
        base_url = %config.transport.base_url,
        max_retries = config.retries.max_retries,
        journal = ?config.journal.path,
        "Requester ready"
    );

    let (method, args) = match command {
        Commands::Get(args) => (Method::Get, args),
        Commands::Post(args) => (Method::Post, args),
        Commands::Delete(args) => (Method::Delete, args),
        Commands::Resume => {
            let summary = requester.resume().await?;
            println!(
                "resumed {} request(s), {} failed, {} discarded",
                summary.resumed, summary.failed, summary.discarded
            );
            return Ok(());
        }
        Commands::Pending => {
            for entry in requester.journal().select_all().await? {
                println!("{}", entry.descriptor);
            }
            return Ok(());
        }
        Commands::Clear => {
            requester.journal().clear().await?;
            return Ok(());
        }
    };

    let executor: Arc<dyn RequestExecutor> = if config.cache.enabled {
        Arc::new(
            ResumableRequester::new(requester, Arc::new(SystemClock::new()))
                .with_time_to_live(config.cache.time_to_live()),
        )
    } else {
        Arc::new(requester)
    };

    if method != Method::Post && !(args.parts.is_empty() && args.files.is_empty()) {
        return Err(format!("--part and --file only apply to post, not {}", method).into());
    }
    let descriptor = args.descriptor(method).await?;
    let request = executor.execute(descriptor, args.resumption());
    tokio::pin!(request);

    let result = tokio::select! {
        result = &mut request => result,
        _ = tokio::signal::ctrl_c() => {
            let interrupted = executor.interrupt();
            tracing::warn!(interrupted, "Interrupted by Ctrl-C");
            request.await
        }
    };

    match result {
        Ok(response) => print_response(&response),
        Err(RequesterError::Interrupted { descriptor }) if args.resumable => {
            eprintln!("Interrupted: {} stays journaled, run `resume` to replay it", descriptor);
            Err(RequesterError::Interrupted { descriptor }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_response(response: &Response) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(value) = response.json::<serde_json::Value>() {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", String::from_utf8_lossy(&response.body));
    }
    Ok(())
}
