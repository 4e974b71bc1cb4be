mod report;

use cast_analysis::CastAnalyzer;
use cast_client::{CastClient, CastClientConfig, CastSearchResponse};
use castlens_core::{
    retry_with_backoff, AnalysisResult, AppConfig, Cast, CoreError, ErrorExt, ErrorReporter,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use session_store::{AnalysisStore, FileBackend, SessionRecord};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Scores how much of a Farcaster user's recent casting is investment talk.
#[derive(Parser)]
#[command(name = "castlens")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a user's casts, analyze them and cache the result
    Analyze {
        /// Farcaster id of the author
        #[arg(long)]
        fid: String,

        /// Give up on the fetch after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Retry transient fetch failures this many times
        #[arg(long, default_value = "0")]
        retries: usize,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Do not write the result to the session cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Analyze casts from a JSON file (no API key needed)
    AnalyzeFile {
        /// A JSON array of casts, or a saved cast search response
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the cached result of the last analysis
    Show {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop the cached analysis
    Clear,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CastInput {
    Casts(Vec<Cast>),
    Search(CastSearchResponse),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            eprintln!("{}", e.user_friendly_message());
            if e.is_retryable() {
                eprintln!("This looks temporary; run the command again to retry.");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "castlens=debug,cast_client=debug,cast_analysis=debug,session_store=debug"
    } else {
        "castlens=info,cast_client=info,cast_analysis=info,session_store=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            fid,
            timeout,
            retries,
            json,
            no_cache,
        } => {
            let result = fetch_and_analyze(&config, &fid, timeout, retries).await?;
            if !no_cache {
                cache_result(&config, &result);
            }
            print_result(&result, json, None)
        }
        Commands::AnalyzeFile { path, json } => {
            let casts = read_casts(&path)?;
            let result = CastAnalyzer::new(config.keyword_set()).analyze(casts);
            print_result(&result, json, None)
        }
        Commands::Show { json } => match analysis_store(&config).load()? {
            Some(entry) => print_result(&entry.value, json, Some(entry.stored_at.as_str())),
            None => {
                println!("No cached analysis. Run `castlens analyze --fid <FID>` first.");
                Ok(())
            }
        },
        Commands::Clear => {
            analysis_store(&config).clear()?;
            tracing::info!("Cleared cached analysis");
            Ok(())
        }
    }
}

async fn fetch_and_analyze(
    config: &AppConfig,
    fid: &str,
    timeout: Option<u64>,
    retries: usize,
) -> Result<AnalysisResult, CoreError> {
    let client = CastClient::new(CastClientConfig::from(config))?;
    let analyzer = CastAnalyzer::new(config.keyword_set());

    let client = &client;
    let timeout = timeout.map(Duration::from_secs);
    let casts = retry_with_backoff(
        move || async move {
            match timeout {
                Some(limit) => client.fetch_casts_with_timeout(fid, limit).await,
                None => client.fetch_casts(fid).await,
            }
        },
        retries,
        Duration::from_secs(1),
    )
    .await?;

    Ok(analyzer.analyze(casts))
}

fn analysis_store(config: &AppConfig) -> AnalysisStore<FileBackend> {
    let backend = config
        .session_dir
        .clone()
        .map(FileBackend::new)
        .unwrap_or_else(FileBackend::in_temp_dir);
    AnalysisStore::new(backend)
}

/// A cache failure is reported but never fails the analysis itself.
fn cache_result(config: &AppConfig, result: &AnalysisResult) {
    let store = analysis_store(config);
    let outcome = SessionRecord::get_or_create(store.cache()).and_then(|session| {
        tracing::debug!("Caching analysis for session {}", session.value.id);
        store.store(result)
    });

    if let Err(e) = outcome {
        ErrorReporter::new().report_warning(&e);
    }
}

fn read_casts(path: &Path) -> Result<Vec<Cast>, CoreError> {
    let contents = std::fs::read_to_string(path)?;
    let casts = match serde_json::from_str::<CastInput>(&contents) {
        Ok(CastInput::Casts(casts)) => casts,
        Ok(CastInput::Search(response)) => response.result.casts,
        Err(e) => {
            return Err(CoreError::InvalidInput {
                message: format!("{} is not a cast list or search response: {}", path.display(), e),
            })
        }
    };
    tracing::debug!("Read {} casts from {}", casts.len(), path.display());
    Ok(casts)
}

fn print_result(
    result: &AnalysisResult,
    json: bool,
    stored_at: Option<&str>,
) -> Result<(), CoreError> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", report::Report::new(result, stored_at));
    }
    Ok(())
}
