use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use callbridge::bootstrap::Server;
use callbridge::config::Config;
use callbridge::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "callbridge")]
#[command(author, version, about = "Call routing and lifecycle reconciliation engine")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    init_tracing(&config.telemetry)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting callbridge"
    );

    info!(
        address = %config.http.address,
        operators = config.directory.operators.len(),
        sales_reps = config.directory.sales_reps.len(),
        carrier_mock = config.carrier.mock,
        "configuration loaded"
    );

    // Validate only mode
    if args.validate {
        info!("configuration is valid");
        return Ok(());
    }

    Server::new(config).run().await
}
