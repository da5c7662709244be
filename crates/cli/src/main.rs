//! CLI entry point for cloud-encode
//!
//! Resolves the configuration, runs one encoding scenario and exits non-zero
//! when the encoding could not be created, failed or was abandoned.

use clap::{Parser, Subcommand};
use cloud_encode::config::{ConfigSources, LOCAL_CONFIG_FILE};
use cloud_encode::{Config, Scenario, Workflow, WorkflowError};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Run example encodings against the Bitmovin Encoding API
#[derive(Parser, Debug)]
#[command(name = "cloud-encode")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// H.264/AAC and H.265/AC3 renditions in MP4 and progressive TS
    MultiCodec(RunArgs),
    /// Map mono audio tracks to stereo and 5.1 surround tracks
    StreamMapping(RunArgs),
}

impl Command {
    fn scenario(&self) -> Scenario {
        match self {
            Command::MultiCodec(_) => Scenario::MultiCodec,
            Command::StreamMapping(_) => Scenario::StreamMappingMonoTracks,
        }
    }

    fn run_args(&self) -> &RunArgs {
        match self {
            Command::MultiCodec(args) | Command::StreamMapping(args) => args,
        }
    }
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Local configuration file
    #[arg(short, long, default_value = LOCAL_CONFIG_FILE)]
    config: PathBuf,

    /// Seconds between status requests
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Stop waiting for the encoding after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration overrides, e.g. HTTP_INPUT_HOST=my-storage.example.com
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn resolve_config(args: &RunArgs) -> Result<Config, WorkflowError> {
    let mut sources = ConfigSources::with_defaults(args.overrides.clone());
    sources.local_file = Some(args.config.clone());

    let mut config = Config::resolve(&sources)?;
    if let Some(secs) = args.poll_interval {
        config.polling.interval_secs = Some(secs);
    }
    if let Some(secs) = args.timeout {
        config.polling.timeout_secs = Some(secs);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let scenario = args.command.scenario();

    let workflow = match resolve_config(args.command.run_args()).and_then(Workflow::new) {
        Ok(workflow) => workflow,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, no longer waiting for the encoding");
            on_interrupt.cancel();
        }
    });

    match workflow.with_cancellation(cancel).run(scenario).await {
        Ok(plan) => {
            info!(
                encoding = %plan.encoding.id,
                namespace = %plan.namespace,
                "{} encoding finished",
                scenario
            );
            ExitCode::SUCCESS
        }
        Err(WorkflowError::EncodingFailed(failure)) => {
            error!(
                "encoding failed with {} error message(s)",
                failure.messages.len()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
