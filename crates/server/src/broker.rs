// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Message broker between the transport layer and the shard workers.
//!
//! Each shard owns three inbound queues, one per worker loop, and every
//! inbound message is routed to the shard its match hashes to so a match is
//! only ever touched by one worker. Outgoing messages fan out on a single
//! broadcast channel the transport processes subscribe to.
use ahash::AHashMap;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use splitpot_core::{
    message::{Outbound, RegistryMessage, StepMessage, TimeoutRequest},
    poker::GameId,
};

/// Capacity of the outgoing broadcast channel.
const OUTGOING_CAPACITY: usize = 1024;

/// The receiving ends of one shard's queues.
#[derive(Debug)]
pub struct ShardReceivers {
    /// Match lifecycle messages for the registry loop.
    pub registry_rx: mpsc::UnboundedReceiver<String>,
    /// Game events for the step loop.
    pub step_rx: mpsc::UnboundedReceiver<String>,
    /// Deadline tracking requests for the timeout detector.
    pub timeout_rx: mpsc::UnboundedReceiver<String>,
}

/// The sending ends of one shard's queues.
#[derive(Debug, Clone)]
struct ShardQueues {
    registry_tx: mpsc::UnboundedSender<String>,
    step_tx: mpsc::UnboundedSender<String>,
    timeout_tx: mpsc::UnboundedSender<String>,
}

/// Routes messages between the transport layer and the shard workers.
#[derive(Debug, Clone)]
pub struct Broker {
    shards: Arc<Vec<ShardQueues>>,
    outgoing: broadcast::Sender<String>,
    kv: KvStore,
}

impl Broker {
    /// Creates the queues for the given number of shards.
    pub fn new(workers: usize) -> (Self, Vec<ShardReceivers>) {
        assert!(workers > 0);

        let mut shards = Vec::with_capacity(workers);
        let mut receivers = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (registry_tx, registry_rx) = mpsc::unbounded_channel();
            let (step_tx, step_rx) = mpsc::unbounded_channel();
            let (timeout_tx, timeout_rx) = mpsc::unbounded_channel();
            shards.push(ShardQueues {
                registry_tx,
                step_tx,
                timeout_tx,
            });
            receivers.push(ShardReceivers {
                registry_rx,
                step_rx,
                timeout_rx,
            });
        }

        let (outgoing, _) = broadcast::channel(OUTGOING_CAPACITY);
        let broker = Broker {
            shards: Arc::new(shards),
            outgoing,
            kv: KvStore::default(),
        };

        (broker, receivers)
    }

    /// The number of shards.
    pub fn workers(&self) -> usize {
        self.shards.len()
    }

    /// Sends a registry message to the owning shard.
    pub fn send_registry(&self, msg: &RegistryMessage) -> Result<()> {
        let game_id = match msg {
            RegistryMessage::Init { game_id, .. } | RegistryMessage::Gc { game_id } => game_id,
        };
        let shard = self.shard_for(game_id);
        self.shards[shard]
            .registry_tx
            .send(serde_json::to_string(msg)?)
            .map_err(|_| anyhow!("registry queue for shard {shard} is closed"))
    }

    /// Sends a step message to the owning shard.
    pub fn send_step(&self, msg: &StepMessage) -> Result<()> {
        let game_id = match msg {
            StepMessage::GameInit { game_id }
            | StepMessage::Action { game_id, .. }
            | StepMessage::TimeoutPossibility { game_id }
            | StepMessage::SendStateToUser { game_id, .. } => game_id,
        };
        let shard = self.shard_for(game_id);
        self.shards[shard]
            .step_tx
            .send(serde_json::to_string(msg)?)
            .map_err(|_| anyhow!("step queue for shard {shard} is closed"))
    }

    /// Asks the owning shard's timeout detector to track a match deadline.
    pub fn send_timeout(&self, msg: &TimeoutRequest) -> Result<()> {
        let shard = self.shard_for(&msg.game_id);
        self.shards[shard]
            .timeout_tx
            .send(serde_json::to_string(msg)?)
            .map_err(|_| anyhow!("timeout queue for shard {shard} is closed"))
    }

    /// Publishes an outgoing message to the transport subscribers.
    pub fn publish(&self, msg: &Outbound) -> Result<()> {
        // A send with no subscribers is not an error, nobody is listening.
        let _ = self.outgoing.send(serde_json::to_string(msg)?);
        Ok(())
    }

    /// Subscribes to the outgoing messages.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.outgoing.subscribe()
    }

    /// The shared key value store.
    pub fn kv(&self) -> &KvStore {
        &self.kv
    }

    fn shard_for(&self, game_id: &GameId) -> usize {
        game_id.shard(self.shards.len())
    }
}

/// In-process key value store shared with the transport layer.
///
/// Holds the uid to player id maps the transport needs to route incoming
/// actions and outgoing messages for a match.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    entries: Arc<Mutex<AHashMap<String, String>>>,
}

impl KvStore {
    /// Sets a key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Removes a key.
    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Publishes the seat maps for a new match.
    pub fn set_game_maps(&self, game_id: &GameId, uids: &[String], player_ids: &[String]) {
        let mut entries = self.entries.lock();
        for (uid, player_id) in uids.iter().zip(player_ids) {
            entries.insert(
                format!("uid_to_player_id:{}:{uid}", game_id.as_str()),
                player_id.clone(),
            );
            entries.insert(
                format!("player_id_to_uid:{}:{player_id}", game_id.as_str()),
                uid.clone(),
            );
            entries.insert(format!("user:{uid}:game"), game_id.as_str().to_string());
        }
    }

    /// Removes the seat maps for a destroyed match.
    pub fn clear_game_maps(&self, game_id: &GameId, uids: &[String], player_ids: &[String]) {
        let mut entries = self.entries.lock();
        for (uid, player_id) in uids.iter().zip(player_ids) {
            entries.remove(&format!("uid_to_player_id:{}:{uid}", game_id.as_str()));
            entries.remove(&format!("player_id_to_uid:{}:{player_id}", game_id.as_str()));
            entries.remove(&format!("user:{uid}:game"));
        }
    }

    /// The in-game player id for a lobby uid.
    pub fn player_for_uid(&self, game_id: &GameId, uid: &str) -> Option<String> {
        self.get(&format!("uid_to_player_id:{}:{uid}", game_id.as_str()))
    }

    /// The lobby uid for an in-game player id.
    pub fn uid_for_player(&self, game_id: &GameId, player_id: &str) -> Option<String> {
        self.get(&format!("player_id_to_uid:{}:{player_id}", game_id.as_str()))
    }

    /// The match a lobby user is playing in.
    pub fn game_for_user(&self, uid: &str) -> Option<GameId> {
        self.get(&format!("user:{uid}:game")).map(GameId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_route_to_the_owning_shard() {
        let (broker, mut receivers) = Broker::new(4);

        let game_id = GameId::new("routing-test");
        let shard = game_id.shard(broker.workers());

        broker
            .send_step(&StepMessage::GameInit {
                game_id: game_id.clone(),
            })
            .unwrap();
        broker
            .send_timeout(&TimeoutRequest {
                game_id: game_id.clone(),
            })
            .unwrap();

        let raw = receivers[shard].step_rx.try_recv().unwrap();
        let msg: StepMessage = serde_json::from_str(&raw).unwrap();
        assert!(matches!(msg, StepMessage::GameInit { game_id: id } if id == game_id));
        assert!(receivers[shard].timeout_rx.try_recv().is_ok());

        for (i, rx) in receivers.iter_mut().enumerate() {
            if i != shard {
                assert!(rx.step_rx.try_recv().is_err());
                assert!(rx.timeout_rx.try_recv().is_err());
            }
        }
    }

    #[test]
    fn publish_fans_out_to_subscribers() {
        let (broker, _receivers) = Broker::new(1);
        let mut rx = broker.subscribe();

        let msg = Outbound::Error {
            game_id: GameId::new("g"),
            player_id: "p".to_string(),
            payload: splitpot_core::message::ErrorPayload {
                message: "oops".to_string(),
            },
        };
        broker.publish(&msg).unwrap();

        let raw = rx.try_recv().unwrap();
        let msg: Outbound = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg.player_id(), "p");
    }

    #[test]
    fn kv_maps_uids_and_player_ids() {
        let (broker, _receivers) = Broker::new(1);
        let kv = broker.kv();

        let game_id = GameId::new("kv-test");
        let uids = vec!["u0".to_string(), "u1".to_string()];
        let player_ids = vec!["p0".to_string(), "p1".to_string()];

        kv.set_game_maps(&game_id, &uids, &player_ids);
        assert_eq!(kv.player_for_uid(&game_id, "u1"), Some("p1".to_string()));
        assert_eq!(kv.uid_for_player(&game_id, "p0"), Some("u0".to_string()));
        assert_eq!(kv.game_for_user("u0"), Some(game_id.clone()));

        kv.clear_game_maps(&game_id, &uids, &player_ids);
        assert_eq!(kv.player_for_uid(&game_id, "u1"), None);
        assert_eq!(kv.game_for_user("u0"), None);
    }
}
