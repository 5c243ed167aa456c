// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Splitpot engine server entry point.
use anyhow::{Result, bail};
use log::info;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};

use crate::{broker::Broker, db::Db, worker::spawn_worker};

/// Server config.
#[derive(Debug)]
pub struct Config {
    /// The number of shard workers.
    pub workers: usize,
    /// The match history database path, in memory when missing.
    pub db_path: Option<PathBuf>,
}

/// A running engine server.
///
/// Holds the broker the transport layer talks to and the shutdown channels
/// for the shard workers.
#[derive(Debug)]
pub struct Server {
    broker: Broker,
    shutdown_broadcast_tx: broadcast::Sender<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
    shutdown_complete_rx: mpsc::Receiver<()>,
}

impl Server {
    /// Starts the shard workers.
    pub fn start(config: Config) -> Result<Server> {
        if config.workers == 0 {
            bail!("the server needs at least one worker");
        }

        let db = match &config.db_path {
            Some(path) => Db::open(path)?,
            None => Db::open_in_memory()?,
        };

        let (broker, receivers) = Broker::new(config.workers);
        let (shutdown_broadcast_tx, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        for (shard, shard_receivers) in receivers.into_iter().enumerate() {
            spawn_worker(
                shard,
                broker.clone(),
                db.clone(),
                shard_receivers,
                &shutdown_broadcast_tx,
                &shutdown_complete_tx,
            );
        }

        info!("Started {} shard workers", config.workers);

        Ok(Server {
            broker,
            shutdown_broadcast_tx,
            shutdown_complete_tx,
            shutdown_complete_rx,
        })
    }

    /// The broker for routing messages in and out of the workers.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Stops the workers and waits for them to drain.
    pub async fn shutdown(self) {
        let Server {
            shutdown_broadcast_tx,
            shutdown_complete_tx,
            mut shutdown_complete_rx,
            ..
        } = self;

        // Notify all workers to start shutdown then wait for all of them to
        // terminate and drop their shutdown channel.
        drop(shutdown_broadcast_tx);
        drop(shutdown_complete_tx);
        let _ = shutdown_complete_rx.recv().await;
    }
}
