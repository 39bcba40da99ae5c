mod downsample;
mod io;
mod plot;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "apogee",
    version,
    about = "Plot rocket radar and payload telemetry, downsampled with LTTB"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an HTML chart from radar and payload logs
    Plot(plot::Opts),
    /// Summarize the channels of radar and payload logs
    Report(report::Opts),
    /// Downsample an x,y series read as CSV or JSON lines
    Downsample(downsample::Opts),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plot(opts) => plot::plot(&opts).await,
        Command::Report(opts) => report::report(&opts).await,
        Command::Downsample(opts) => downsample::downsample(&opts).await,
    }
}
