use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use flvjoin::{JoinError, Joiner};

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "twitch-join",
    version = env!("TWITCH_JOIN_VERSION"),
    author,
    override_usage = "twitch-join [-o output.flv] input1.flv input2.flv ..."
)]
/// Joins FLV fragments recorded from a stream into a single file.
///
/// Metadata of every fragment is repaired with yamdi before ffmpeg
/// concatenates them without re-encoding.
pub struct JoinArgs {
    /// Output file name. If not specified, it will be inferred from the
    /// input file names.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Fragments to join, in playback order.
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .try_from_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = JoinArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: JoinArgs) -> anyhow::Result<()> {
    let mut joiner = Joiner::new(args.inputs);
    if let Some(output) = args.output {
        joiner = joiner.output(output);
    }

    match joiner.run().await {
        Ok(output) => {
            tracing::info!("All finished. Please checkout your file at {}", output.display());
            Ok(())
        }
        Err(e) => {
            if let Some(output) = e.tool_output() {
                tracing::error!("Output of the failed command:\n{output}");
            }
            if let JoinError::MissingExecutable(_) = e {
                tracing::error!("yamdi and ffmpeg must be installed and in PATH.");
            }
            Err(anyhow::Error::new(e).context("Failed to join fragments"))
        }
    }
}
