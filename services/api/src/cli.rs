use crate::demo::{run_classify, run_demo, ClassifyArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use storefront_crm::error::AppError;

/// Storefront CRM: RFM segments, loyalty points, coupons and customer campaigns.
#[derive(Parser, Debug)]
#[command(name = "storefront-crm", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the CRM API. Runs when no subcommand is given.
    Serve(ServeArgs),
    /// Offline segment tools over exported order aggregates
    Segments {
        #[command(subcommand)]
        command: SegmentsCommand,
    },
    /// Walk a sample shop through segments, points, a coupon and a birthday campaign
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SegmentsCommand {
    /// Print R/F/M bands and the segment for each customer row
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Bind address, replacing APP_HOST
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Listen port, replacing APP_PORT
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load the sample customers into the in-memory store before listening
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let command = Cli::parse()
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Segments {
            command: SegmentsCommand::Classify(args),
        } => run_classify(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
