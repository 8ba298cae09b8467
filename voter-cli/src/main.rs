//! The `voter` binary: single lookups, batch files and environment checks.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use elections_adapter::{init, ElectionsSite};
use tracing_subscriber::EnvFilter;
use voter_cli::batch::{read_ids, run_batch};
use voter_cli::errors::CliError;
use voter_cli::settings::{RuntimeArgs, Settings};
use voter_cli::shutdown::shutdown_after;
use voter_lookup::{validate, LookupResponse, RetryingLookupOrchestrator, VoterLookup};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    runtime: RuntimeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a single national ID
    Lookup {
        /// 14-digit national ID
        national_id: String,
    },
    /// Look up every national ID in a text or CSV file
    Batch {
        /// Input file: one ID per line, or a table with a الرقم القومي column
        input: PathBuf,
        /// Write JSON Lines here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Locate chromedriver or probe the remote WebDriver server
    Check,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "voter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let settings = Settings::resolve(&cli.runtime)?;

    match cli.command {
        Commands::Lookup { national_id } => run_lookup(settings, &national_id).await,
        Commands::Batch { input, output } => run_batch_file(settings, &input, output).await,
        Commands::Check => run_check(&settings).await,
    }
}

async fn run_lookup(settings: Settings, raw: &str) -> Result<ExitCode, CliError> {
    // Reject malformed input before starting a browser.
    if let Err(err) = validate(raw) {
        print_json(&LookupResponse::from_validation(&err))?;
        return Ok(ExitCode::from(2));
    }

    let site = Arc::new(ElectionsSite::connect(settings.adapter).await?);
    let service = VoterLookup::new(
        RetryingLookupOrchestrator::with_config(settings.lookup),
        site.clone(),
    );

    let response = service.respond(raw).await;
    shutdown_after(print_json(&response), site.shutdown()).await?;

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_batch_file(
    settings: Settings,
    input: &std::path::Path,
    output: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let batch = read_ids(input)?;
    let concurrency = settings.adapter.pool.size;
    let file = output.map(std::fs::File::create).transpose()?;

    let site = Arc::new(ElectionsSite::connect(settings.adapter).await?);
    let service = VoterLookup::new(
        RetryingLookupOrchestrator::with_config(settings.lookup),
        site.clone(),
    );

    let result = match file {
        Some(file) => {
            let mut writer = std::io::BufWriter::new(file);
            run_batch(&service, batch.rows, concurrency, &mut writer).await
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            run_batch(&service, batch.rows, concurrency, &mut stdout).await
        }
    };

    let summary = shutdown_after(result, site.shutdown()).await?;
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_check(settings: &Settings) -> Result<ExitCode, CliError> {
    let report = init(&settings.adapter).await?;
    print_json(&report)?;

    let healthy = report.remote_ready.unwrap_or(true);
    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
