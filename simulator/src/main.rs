mod args;
mod driver;
mod logging;
mod model;
mod oracle;
mod pool_shim;
mod scheduler;
mod threaded;

use clap::Parser;
use jobagent_db::logging::LogWriter;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::Level;

use crate::args::{Args, SimConfig};

fn main() {
    let args = Args::parse();
    let config = SimConfig::from_args(args);
    let writer = LogWriter::new(config.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::info!("config: {}", config_json);

    let outcome = match config.threads {
        Some(threads) => threaded::run_threads(&config, threads),
        None => {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            driver::run(&config, &mut rng)
        }
    };
    match outcome {
        Ok(summary) => tracing::info!("{summary}"),
        Err(reason) => {
            tracing::error!("seed {} failed: {reason}", config.seed);
            std::process::exit(1);
        }
    }
}
