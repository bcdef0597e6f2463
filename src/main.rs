//! Command-line entry point for txn-loadgen
//!
//! ```bash
//! # Per-record transactions against CockroachDB until Ctrl-C
//! txn-loadgen --connection-string postgresql://root@localhost:26257/defaultdb
//!
//! # One 100k-insert transaction against TiDB, timestamps in UTC
//! txn-loadgen --connection-string mysql://root@127.0.0.1:4000/test \
//!   --mode once --batch-limit 100000 --timezone UTC
//!
//! # Empty the table
//! txn-loadgen --connection-string postgresql://root@localhost:26257/defaultdb --delete-all
//! ```

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use txn_loadgen::logging::{banner, start_time};
use txn_loadgen::{connect, run, LoadConfig, LoadOpts, Outcome};

#[derive(Parser)]
#[command(name = "txn-loadgen")]
#[command(about = "Drive insert transactions against a distributed SQL database")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    opts: LoadOpts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run_cli().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_cli() -> anyhow::Result<()> {
    // Initialize tracing, defaulting to info when RUST_LOG is unset
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("{}", banner("Start", start_time(&cli.opts.timezone)));

    let config = LoadConfig::from_opts(&cli.opts)?;
    let clock = config.clock();

    let store = connect(&config.connection_string, config.dry_run)
        .await
        .context("Failed to open store")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            on_signal.cancel();
        }
    });

    match run(config, store, cancel).await? {
        Outcome::Reset => info!("All records deleted"),
        Outcome::PerRecord(_) | Outcome::Batched(_) => {
            info!("{}", banner("End", clock.now()));
        }
    }

    Ok(())
}
