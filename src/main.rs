use clap::Parser;
use std::path::Path;
use weft::cli::{self, Args};
use weft::core::config::WeftConfig;
use weft::logging;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match WeftConfig::load(Path::new(".")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load weft.toml: {}", err);
            std::process::exit(2);
        }
    };

    let default_level = args.log_level.clone().unwrap_or(config.log_level);
    if let Err(err) = logging::init(&default_level) {
        eprintln!("failed to initialize logging: {}", err);
        std::process::exit(2);
    }

    if let Err(err) = cli::run(args).await {
        tracing::error!("command failed: {:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
