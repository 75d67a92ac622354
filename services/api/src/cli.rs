use crate::demo::{run_demo, run_scan, DemoArgs, ScanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ike_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Enrollment Conflict Engine",
    about = "Detect enrollment conflicts and drive compensation notifications from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a one-shot conflict scan over a JSON dataset
    Scan(ScanArgs),
    /// Run an end-to-end CLI demo over the built-in mock dataset
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args),
        Command::Demo(args) => run_demo(args),
    }
}
