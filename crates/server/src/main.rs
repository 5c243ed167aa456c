// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
use clap::Parser;
use log::error;
use std::path::PathBuf;
use tokio::signal;

use splitpot_server::{Config, Server};

#[derive(Debug, Parser)]
struct Cli {
    /// Number of shard workers.
    #[clap(long, short, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
    workers: u16,
    /// Match history database path, in memory when not set.
    #[clap(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = Config {
        workers: cli.workers as usize,
        db_path: cli.db,
    };

    match Server::start(config) {
        Ok(server) => {
            let _ = signal::ctrl_c().await;
            log::info!("Received shutdown signal...");
            server.shutdown().await;
        }
        Err(e) => error!("{e}"),
    }
}
