// # piphos - publish and collect public IPs through a gist
//
// This binary is a thin integration layer:
// 1. Parse the command line
// 2. Layer configuration (config.json, environment, flags)
// 3. Register beacons and tenders
// 4. Run one command and map the outcome to an exit code
//
// ## Commands
//
// - `piphos ping [-b beacon]`: print this machine's public IP
// - `piphos push [-b beacon] [-t tender] [-n hostname]`: store it under the hostname
// - `piphos pull [-t tender]`: print every `hostname: ip` pair
//
// ## Configuration
//
// `<config dir>/piphos/config.json`:
//
// ```json
// { "hostname": "laptop", "token": "ghp_...", "beacon": "aws", "tender": "github" }
// ```
//
// ### Environment
// - `PIPHOS_HOSTNAME`, `PIPHOS_BEACON`, `PIPHOS_TENDER`
// - `PIPHOS_GITHUB_TOKEN` (or `GITHUB_TOKEN`)
// - `PIPHOS_RECORD_ID`: Known gist id, skips discovery
// - `PIPHOS_STATE_PATH`: Record id state file
// - `PIPHOS_TENDER_URL`: Tender API root (GitHub Enterprise)
// - `PIPHOS_MODE=dry-run`: Never write to the tender
// - `PIPHOS_LOG_LEVEL`: trace, debug, info, warn (default), error

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use piphos_core::state::{FileRecordIdStore, MemoryRecordIdStore};
use piphos_core::traits::RecordIdStore;
use piphos_core::{ErrorKind, Piphos, ProviderRegistry, PullRequest, PushRequest, PushResult};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use settings::{CONFIG_FILE, Settings};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiphosExitCode {
    /// Command succeeded
    Success = 0,
    /// Configuration error or bad usage
    ConfigError = 1,
    /// Network, tender or beacon failure
    RuntimeError = 2,
    /// Interrupted by SIGINT or SIGTERM
    Interrupted = 130,
}

impl From<PiphosExitCode> for ExitCode {
    fn from(code: PiphosExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "piphos", version, about = "Share public IPs between machines through a private gist")]
struct Cli {
    /// Path to config.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Decide what to write, but do not write it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print this machine's public IP
    Ping {
        /// Beacon to ask (random if omitted)
        #[arg(short = 'b', long)]
        beacon: Option<String>,
    },
    /// Store this machine's public IP under its hostname
    Push {
        /// Beacon to ask (random if omitted)
        #[arg(short = 'b', long)]
        beacon: Option<String>,
        /// Tender to write to
        #[arg(short = 't', long)]
        tender: Option<String>,
        /// Name to store the IP under
        #[arg(short = 'n', long)]
        hostname: Option<String>,
    },
    /// Print every stored hostname and IP
    Pull {
        /// Tender to read from
        #[arg(short = 't', long)]
        tender: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                PiphosExitCode::ConfigError.into()
            } else {
                PiphosExitCode::Success.into()
            };
        }
    };

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return PiphosExitCode::ConfigError.into();
        }
    };

    let log_level = match parse_level(settings.log_level.as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return PiphosExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PiphosExitCode::ConfigError.into();
    }

    debug!("Settings: {:?}", settings);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return PiphosExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_until_signal(cli.command, settings).await {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{}", output);
                }
                PiphosExitCode::Success
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| settings::default_path(CONFIG_FILE));

    let config = match &config_path {
        Some(path) => settings::load_file(path)?,
        None => Default::default(),
    };

    let mut settings = Settings::from_config(config);
    settings.apply_env(|key| std::env::var(key).ok());

    match &cli.command {
        Command::Ping { beacon } => {
            if let Some(beacon) = beacon {
                settings.config.beacon = beacon.clone();
            }
        }
        Command::Push {
            beacon,
            tender,
            hostname,
        } => {
            if let Some(beacon) = beacon {
                settings.config.beacon = beacon.clone();
            }
            if let Some(tender) = tender {
                settings.config.tender = tender.clone();
            }
            if let Some(hostname) = hostname {
                settings.config.hostname = hostname.clone();
            }
            settings.fill_hostname(settings::system_hostname);
        }
        Command::Pull { tender } => {
            if let Some(tender) = tender {
                settings.config.tender = tender.clone();
            }
        }
    }

    if cli.dry_run {
        settings.dry_run = true;
    }

    Ok(settings)
}

fn parse_level(level: Option<&str>) -> Result<Level> {
    Ok(match level.map(str::to_lowercase).as_deref() {
        None | Some("warn") => Level::WARN,
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("error") => Level::ERROR,
        Some(other) => anyhow::bail!(
            "PIPHOS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            other
        ),
    })
}

fn exit_code_for(err: &anyhow::Error) -> PiphosExitCode {
    match err.downcast_ref::<piphos_core::Error>().map(|e| e.kind()) {
        Some(ErrorKind::Cancelled) => PiphosExitCode::Interrupted,
        Some(ErrorKind::MissingCredential | ErrorKind::Config) => PiphosExitCode::ConfigError,
        _ => PiphosExitCode::RuntimeError,
    }
}

/// Run the command, abandoning it if a shutdown signal arrives first
async fn run_until_signal(command: Command, settings: Settings) -> Result<String> {
    tokio::select! {
        result = run(command, settings) => result,
        signal = wait_for_shutdown() => {
            let signal = signal?;
            warn!("Received {}, abandoning command", signal);
            Err(piphos_core::Error::cancelled(format!("interrupted by {}", signal)).into())
        }
    }
}

async fn run(command: Command, settings: Settings) -> Result<String> {
    let piphos = build(&settings).await?;
    let config = &settings.config;

    match command {
        Command::Ping { .. } => Ok(piphos.ping(&config.beacon).await?),
        Command::Push { .. } => {
            config.validate_for_push()?;
            let ip = piphos
                .ping(&config.beacon)
                .await
                .context("Unable to get public IP")?;

            let result = piphos
                .push(PushRequest {
                    tender: config.tender_or_default().to_string(),
                    token: config.token.clone(),
                    hostname: config.hostname.clone(),
                    ip: ip.clone(),
                    cached_record_id: non_empty(&config.record_id),
                })
                .await
                .with_context(|| format!("Unable to push to {}", config.tender_or_default()))?;

            Ok(describe_push(&config.hostname, &ip, &result))
        }
        Command::Pull { .. } => {
            config.validate_for_tender()?;
            let hosts = piphos
                .pull(PullRequest {
                    tender: config.tender_or_default().to_string(),
                    token: config.token.clone(),
                    cached_record_id: non_empty(&config.record_id),
                })
                .await
                .with_context(|| format!("Unable to pull from {}", config.tender_or_default()))?;

            Ok(hosts
                .iter()
                .map(|(host, ip)| format!("{}: {}", host, ip))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

/// Register providers and open the record id store
async fn build(settings: &Settings) -> Result<Piphos> {
    let registry = ProviderRegistry::new();
    piphos_beacon_http::register(&registry);
    piphos_tender_github::register(&registry);

    let store: Arc<dyn RecordIdStore> = match &settings.state_path {
        Some(path) => match FileRecordIdStore::new(path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Record id state unavailable ({}), continuing without it", e);
                Arc::new(MemoryRecordIdStore::new())
            }
        },
        None => Arc::new(MemoryRecordIdStore::new()),
    };

    if settings.dry_run {
        warn!("Running in DRY-RUN mode - no changes will be made");
    }

    Ok(Piphos::new(registry, store)
        .with_dry_run(settings.dry_run)
        .with_tender_base_url(settings.tender_base_url.clone()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn describe_push(hostname: &str, ip: &str, result: &PushResult) -> String {
    match result {
        PushResult::Created { record_id } => {
            format!("{}: {} (created record {})", hostname, ip, record_id)
        }
        PushResult::Updated {
            previous_ip: Some(previous),
            ..
        } => format!("{}: {} (was {})", hostname, ip, previous),
        PushResult::Updated { .. } => format!("{}: {} (added)", hostname, ip),
        PushResult::Unchanged { .. } => format!("{}: {} (unchanged)", hostname, ip),
        PushResult::DryRun { .. } => format!("{}: {} (dry-run, nothing written)", hostname, ip),
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
