//! chunkwise: upload files to a chunked upload endpoint.

mod config;
mod endpoint_adapter;
mod files;
mod upload;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{CliConfig, Overrides};

/// Resumable chunked uploader.
#[derive(Parser, Debug)]
#[command(name = "chunkwise", version, about)]
struct Cli {
    /// Configuration file (default: ~/.config/chunkwise/config.json).
    #[arg(long, env = "CHUNKWISE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one or more files.
    Upload(UploadArgs),
    /// Print the effective configuration as JSON.
    Config(SettingsArgs),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Files to upload, in queue order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the final summary as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Chunk upload URL; finalize is posted to `<endpoint>/finalize`.
    #[arg(long, env = "CHUNKWISE_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the upload endpoint.
    #[arg(long, env = "CHUNKWISE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Per-request timeout in seconds (0 disables).
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Automatic retries of failed files.
    #[arg(long)]
    retries: Option<u32>,

    /// Chunk size in bytes.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Largest accepted file in bytes.
    #[arg(long)]
    max_size: Option<u64>,

    /// Maximum number of files per run.
    #[arg(long)]
    max_files: Option<usize>,

    /// Accepted types, e.g. `image/*,.pdf`.
    #[arg(long)]
    accept: Option<String>,

    /// Send a SHA-256 checksum with every chunk.
    #[arg(long)]
    checksums: bool,

    /// Retries continue from the last acknowledged chunk.
    #[arg(long)]
    resume: bool,
}

impl SettingsArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            endpoint: self.endpoint,
            token: self.token,
            timeout_secs: self.timeout_secs,
            retries: self.retries,
            chunk_size: self.chunk_size,
            max_size: self.max_size,
            max_files: self.max_files,
            accept: self.accept,
            checksums: self.checksums,
            resume: self.resume,
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "info,chunkwise=debug",
        _ => "debug",
    };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, settings: SettingsArgs) -> anyhow::Result<CliConfig> {
    let mut config = CliConfig::load(path)?;
    config.apply(settings.into_overrides());
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting chunkwise");

    match cli.command {
        Command::Config(settings) => {
            let mut config = load_config(cli.config.as_deref(), settings)?;
            if config.token.is_some() {
                config.token = Some("<redacted>".into());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Upload(args) => {
            let config = load_config(cli.config.as_deref(), args.settings)?;

            let mut uploads = Vec::with_capacity(args.files.len());
            for path in &args.files {
                uploads.push(files::load_upload_file(path).await?);
            }

            let summary = upload::run(&config, uploads).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print_text();
            }

            Ok(if summary.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
