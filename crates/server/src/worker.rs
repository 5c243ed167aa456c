// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Shard worker loops.
//!
//! Every shard runs three tasks over a shared match registry: a registry
//! loop that creates and destroys matches, a step loop that applies game
//! events, and a timeout detector that watches turn deadlines. Matches are
//! partitioned by match id so no two shards ever share one.
use anyhow::{Result, bail};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::{cmp::Ordering, cmp::Reverse, collections::BinaryHeap, sync::Arc};
use tokio::{
    sync::{broadcast, mpsc},
    time::{self, Duration},
};

use ahash::AHashMap;
use splitpot_core::{
    message::{ErrorPayload, Outbound, RegistryMessage, StepMessage, TimeoutRequest},
    poker::{Chips, GameId, unix_time},
};

use crate::{
    broker::{Broker, ShardReceivers},
    db::Db,
    game::{GameManager, MatchSummary},
};

/// How long the timeout detector sleeps with no deadline to watch.
const IDLE_POLL: Duration = Duration::from_secs(60);

/// The matches owned by one shard.
#[derive(Debug, Default)]
struct Registry {
    games: AHashMap<GameId, GameManager>,
}

/// Spawns the three worker tasks for one shard.
pub fn spawn_worker(
    shard: usize,
    broker: Broker,
    db: Db,
    receivers: ShardReceivers,
    shutdown_broadcast_tx: &broadcast::Sender<()>,
    shutdown_complete_tx: &mpsc::Sender<()>,
) {
    let registry = Arc::new(Mutex::new(Registry::default()));

    let mut task = RegistryTask {
        shard,
        registry: registry.clone(),
        broker: broker.clone(),
        rx: receivers.registry_rx,
        shutdown_broadcast_rx: shutdown_broadcast_tx.subscribe(),
        _shutdown_complete_tx: shutdown_complete_tx.clone(),
    };
    tokio::spawn(async move {
        task.run().await;
        info!("Registry loop for shard {} stopped", task.shard);
    });

    let mut task = StepTask {
        shard,
        registry: registry.clone(),
        broker: broker.clone(),
        db,
        rx: receivers.step_rx,
        shutdown_broadcast_rx: shutdown_broadcast_tx.subscribe(),
        _shutdown_complete_tx: shutdown_complete_tx.clone(),
    };
    tokio::spawn(async move {
        task.run().await;
        info!("Step loop for shard {} stopped", task.shard);
    });

    let mut task = TimeoutTask {
        shard,
        registry,
        broker,
        heap: BinaryHeap::new(),
        rx: receivers.timeout_rx,
        shutdown_broadcast_rx: shutdown_broadcast_tx.subscribe(),
        _shutdown_complete_tx: shutdown_complete_tx.clone(),
    };
    tokio::spawn(async move {
        task.run().await;
        info!("Timeout detector for shard {} stopped", task.shard);
    });
}

/// Creates and destroys the shard's matches.
struct RegistryTask {
    shard: usize,
    registry: Arc<Mutex<Registry>>,
    broker: Broker,
    rx: mpsc::UnboundedReceiver<String>,
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl RegistryTask {
    async fn run(&mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_broadcast_rx.recv() => break,
                res = self.rx.recv() => match res {
                    Some(raw) => {
                        // One bad message must not stop the loop.
                        if let Err(err) = self.handle_message(&raw) {
                            error!("Shard {} registry message failed: {err}", self.shard);
                        }
                    }
                    None => break,
                },
            }
        }
    }

    fn handle_message(&self, raw: &str) -> Result<()> {
        match serde_json::from_str::<RegistryMessage>(raw)? {
            RegistryMessage::Init {
                game_id,
                game_type,
                uids,
                player_ids,
                room_settings,
            } => {
                let mut registry = self.registry.lock();
                if registry.games.contains_key(&game_id) {
                    // A lobby retry, the match is already running.
                    info!("Shard {}: match {game_id} already registered", self.shard);
                    return Ok(());
                }

                let game = GameManager::new(
                    game_id.clone(),
                    game_type,
                    uids,
                    player_ids,
                    room_settings,
                    unix_time(),
                )?;
                self.broker
                    .kv()
                    .set_game_maps(&game_id, game.uids(), game.player_ids());
                registry.games.insert(game_id.clone(), game);

                info!("Shard {}: match {game_id} registered", self.shard);
                self.broker.send_step(&StepMessage::GameInit { game_id })
            }
            RegistryMessage::Gc { game_id } => {
                let mut registry = self.registry.lock();
                match registry.games.get(&game_id) {
                    None => {
                        info!("Shard {}: gc for unknown match {game_id}", self.shard);
                    }
                    Some(game) if !game.done() => {
                        warn!(
                            "Shard {}: gc refused, match {game_id} is still running",
                            self.shard
                        );
                    }
                    Some(game) => {
                        self.broker
                            .kv()
                            .clear_game_maps(&game_id, game.uids(), game.player_ids());
                        registry.games.remove(&game_id);
                        info!("Shard {}: match {game_id} removed", self.shard);
                    }
                }
                Ok(())
            }
        }
    }
}

/// Applies game events to the shard's matches.
struct StepTask {
    shard: usize,
    registry: Arc<Mutex<Registry>>,
    broker: Broker,
    db: Db,
    rx: mpsc::UnboundedReceiver<String>,
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl StepTask {
    async fn run(&mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown_broadcast_rx.recv() => break,
                res = self.rx.recv() => match res {
                    Some(raw) => match self.handle_message(&raw) {
                        // The match just finished, persist it.
                        Ok(Some(summary)) => {
                            if let Err(err) = self.db.save_summary(summary).await {
                                error!("Shard {} history save failed: {err}", self.shard);
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            error!("Shard {} step message failed: {err}", self.shard);
                        }
                    },
                    None => break,
                },
            }
        }
    }

    /// Handles one step message, returns a summary when the match completes.
    fn handle_message(&self, raw: &str) -> Result<Option<MatchSummary>> {
        let msg = serde_json::from_str::<StepMessage>(raw)?;
        let now = unix_time();
        let mut registry = self.registry.lock();

        match msg {
            StepMessage::GameInit { game_id } => {
                let Some(game) = registry.games.get_mut(&game_id) else {
                    info!("Shard {}: init for unknown match {game_id}", self.shard);
                    return Ok(None);
                };

                let messages = game.wake(now)?;
                self.publish_all(&messages);
                self.track_deadline(&game_id)?;
                Ok(game.summary(now))
            }
            StepMessage::Action {
                game_id,
                player_id,
                amount,
                action_count,
                received_at,
            } => {
                let Some(game) = registry.games.get_mut(&game_id) else {
                    self.publish_error(&game_id, &player_id, "no such match");
                    return Ok(None);
                };

                // The grace window covers transport latency, an action that
                // arrives after it has lost the race with the timeout.
                let messages = match validate_amount(amount) {
                    Ok(_) if received_at > game.deadline() - game.grace() => {
                        vec![error_outbound(&game_id, &player_id, "the turn deadline has passed")]
                    }
                    Ok(amount) => game.handle_action(
                        Some(&player_id),
                        amount,
                        Some(action_count),
                        received_at,
                        false,
                        now,
                    )?,
                    Err(err) => vec![error_outbound(&game_id, &player_id, &err.to_string())],
                };

                self.publish_all(&messages);
                self.track_deadline(&game_id)?;
                Ok(game.summary(now))
            }
            StepMessage::TimeoutPossibility { game_id } => {
                let Some(game) = registry.games.get_mut(&game_id) else {
                    debug!("Shard {}: timeout for unknown match {game_id}", self.shard);
                    return Ok(None);
                };

                if game.done() {
                    return Ok(None);
                }
                if now < game.deadline() {
                    // An action beat the timeout, the detector tracks the
                    // new deadline already.
                    debug!("Shard {}: stale timeout for match {game_id}", self.shard);
                    return Ok(None);
                }

                let messages = if game.sleeping() {
                    game.wake(now)?
                } else {
                    // Force a check or fold for the seat on the clock.
                    game.handle_action(None, Chips::ZERO, None, now, true, now)?
                };

                self.publish_all(&messages);
                self.track_deadline(&game_id)?;
                Ok(game.summary(now))
            }
            StepMessage::SendStateToUser { game_id, player_id } => {
                let Some(game) = registry.games.get(&game_id) else {
                    self.publish_error(&game_id, &player_id, "no such match");
                    return Ok(None);
                };

                match game.state_for(&player_id, now) {
                    Ok(msg) => self.publish_all(std::slice::from_ref(&msg)),
                    Err(err) => self.publish_error(&game_id, &player_id, &err.to_string()),
                }
                Ok(None)
            }
        }
    }

    fn publish_all(&self, messages: &[Outbound]) {
        for msg in messages {
            if let Err(err) = self.broker.publish(msg) {
                error!("Shard {} publish failed: {err}", self.shard);
            }
        }
    }

    fn publish_error(&self, game_id: &GameId, player_id: &str, message: &str) {
        self.publish_all(&[error_outbound(game_id, player_id, message)]);
    }

    fn track_deadline(&self, game_id: &GameId) -> Result<()> {
        self.broker.send_timeout(&TimeoutRequest {
            game_id: game_id.clone(),
        })
    }
}

fn error_outbound(game_id: &GameId, player_id: &str, message: &str) -> Outbound {
    Outbound::Error {
        game_id: game_id.clone(),
        player_id: player_id.to_string(),
        payload: ErrorPayload {
            message: message.to_string(),
        },
    }
}

/// Rejects amounts outside the chips range before they reach the match.
fn validate_amount(amount: i64) -> Result<Chips> {
    if amount < 0 || amount > i64::from(u32::MAX) {
        bail!("invalid amount {amount}");
    }
    Ok(Chips::new(amount as u32))
}

/// A tracked deadline, the heap pops the earliest first.
#[derive(Debug)]
struct DeadlineEntry {
    deadline: f64,
    game_id: GameId,
}

impl Ord for DeadlineEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .total_cmp(&other.deadline)
            .then_with(|| self.game_id.cmp(&other.game_id))
    }
}

impl PartialOrd for DeadlineEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DeadlineEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeadlineEntry {}

/// Watches the shard's turn deadlines.
///
/// Tracked deadlines are never removed, a stale entry is dropped when it
/// pops and the match has moved on to a later deadline.
struct TimeoutTask {
    shard: usize,
    registry: Arc<Mutex<Registry>>,
    broker: Broker,
    heap: BinaryHeap<Reverse<DeadlineEntry>>,
    rx: mpsc::UnboundedReceiver<String>,
    shutdown_broadcast_rx: broadcast::Receiver<()>,
    _shutdown_complete_tx: mpsc::Sender<()>,
}

impl TimeoutTask {
    async fn run(&mut self) {
        loop {
            let sleep_for = self
                .heap
                .peek()
                .map(|Reverse(entry)| {
                    Duration::from_secs_f64((entry.deadline - unix_time()).max(0.0))
                })
                .unwrap_or(IDLE_POLL);

            tokio::select! {
                _ = self.shutdown_broadcast_rx.recv() => break,
                _ = time::sleep(sleep_for) => {}
                res = self.rx.recv() => match res {
                    Some(raw) => {
                        if let Err(err) = self.track(&raw) {
                            error!("Shard {} timeout request failed: {err}", self.shard);
                        }
                    }
                    None => break,
                },
            }

            self.fire_elapsed();
        }
    }

    /// Records the current deadline of the requested match.
    fn track(&mut self, raw: &str) -> Result<()> {
        let request = serde_json::from_str::<TimeoutRequest>(raw)?;
        let registry = self.registry.lock();
        if let Some(game) = registry.games.get(&request.game_id) {
            self.heap.push(Reverse(DeadlineEntry {
                deadline: game.deadline(),
                game_id: request.game_id,
            }));
        }
        Ok(())
    }

    /// Forwards a timeout possibility for every elapsed deadline.
    fn fire_elapsed(&mut self) {
        let now = unix_time();
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.deadline <= now)
        {
            let Some(Reverse(entry)) = self.heap.pop() else {
                break;
            };

            {
                let registry = self.registry.lock();
                let Some(game) = registry.games.get(&entry.game_id) else {
                    continue;
                };
                // The entry is stale if the match moved to a later deadline.
                if game.done() || game.deadline() > entry.deadline {
                    continue;
                }
            }

            debug!(
                "Shard {}: deadline elapsed for match {}",
                self.shard, entry.game_id
            );
            if let Err(err) = self.broker.send_step(&StepMessage::TimeoutPossibility {
                game_id: entry.game_id,
            }) {
                error!("Shard {} timeout forward failed: {err}", self.shard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitpot_core::message::RoomSettings;

    // Spawns a single shard worker and returns the broker and its shutdown
    // channels.
    fn start_worker() -> (Broker, broadcast::Sender<()>, mpsc::Receiver<()>) {
        let (broker, mut receivers) = Broker::new(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (complete_tx, complete_rx) = mpsc::channel(1);
        let db = Db::open_in_memory().unwrap();
        spawn_worker(
            0,
            broker.clone(),
            db,
            receivers.remove(0),
            &shutdown_tx,
            &complete_tx,
        );
        (broker, shutdown_tx, complete_rx)
    }

    fn init_message(game_id: &GameId, seats: usize, settings: RoomSettings) -> RegistryMessage {
        RegistryMessage::Init {
            game_id: game_id.clone(),
            game_type: "sitngo".to_string(),
            uids: (0..seats).map(|i| format!("uid-{i}")).collect(),
            player_ids: (0..seats).map(|i| format!("player-{i}")).collect(),
            room_settings: settings,
        }
    }

    fn settings(chips: &[u32]) -> RoomSettings {
        RoomSettings {
            chips: chips.iter().map(|&c| Chips::new(c)).collect(),
            sb: Chips::new(10),
            bb: Chips::new(20),
            base_time: 15.0,
            timebank: 30.0,
            grace: 1.0,
            round_delay: 5.0,
        }
    }

    async fn recv_outbound(rx: &mut broadcast::Receiver<String>) -> Outbound {
        let raw = time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outgoing channel closed");
        serde_json::from_str(&raw).expect("invalid outgoing message")
    }

    #[tokio::test]
    async fn init_wakes_the_match_and_broadcasts_state() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-init");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();

        for seat in 0..2 {
            let msg = recv_outbound(&mut rx).await;
            assert_eq!(msg.game_id(), &game_id);
            assert_eq!(msg.player_id(), format!("player-{seat}"));
            assert!(matches!(msg, Outbound::StateUpdate { .. }));
        }

        // The seat maps are published for the transport layer.
        assert_eq!(
            broker.kv().player_for_uid(&game_id, "uid-0"),
            Some("player-0".to_string())
        );
    }

    #[tokio::test]
    async fn duplicate_init_is_ignored() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-dup");
        let init = init_message(&game_id, 2, settings(&[1000, 1000]));
        broker.send_registry(&init).unwrap();
        broker.send_registry(&init).unwrap();

        // Only one wake broadcast, one state update per seat.
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }
        time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn action_advances_the_match() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-action");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        broker
            .send_step(&StepMessage::Action {
                game_id: game_id.clone(),
                player_id: "player-0".to_string(),
                amount: 20,
                action_count: 1,
                received_at: unix_time(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        let Outbound::StateUpdate { payload, .. } = msg else {
            panic!("expected a state update, got {msg:?}");
        };
        assert_eq!(payload.turn, "player-1");
        assert_eq!(payload.action_count, 2);
    }

    #[tokio::test]
    async fn stale_action_gets_an_error() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-stale");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        broker
            .send_step(&StepMessage::Action {
                game_id: game_id.clone(),
                player_id: "player-0".to_string(),
                amount: 20,
                action_count: 99,
                received_at: unix_time(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        assert!(matches!(msg, Outbound::Error { .. }));
        assert_eq!(msg.player_id(), "player-0");
    }

    #[tokio::test]
    async fn negative_amount_gets_an_error() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-amount");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        broker
            .send_step(&StepMessage::Action {
                game_id: game_id.clone(),
                player_id: "player-0".to_string(),
                amount: -5,
                action_count: 1,
                received_at: unix_time(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        assert!(matches!(msg, Outbound::Error { .. }));
    }

    #[tokio::test]
    async fn unknown_match_gets_an_error() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        broker
            .send_step(&StepMessage::Action {
                game_id: GameId::new("worker-missing"),
                player_id: "player-0".to_string(),
                amount: 0,
                action_count: 1,
                received_at: unix_time(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        assert!(matches!(msg, Outbound::Error { .. }));
    }

    #[tokio::test]
    async fn state_resend_targets_one_player() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-resend");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        broker
            .send_step(&StepMessage::SendStateToUser {
                game_id: game_id.clone(),
                player_id: "player-1".to_string(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        assert!(matches!(msg, Outbound::StateUpdate { .. }));
        assert_eq!(msg.player_id(), "player-1");
    }

    #[tokio::test]
    async fn turn_timeout_forces_an_action() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        // A tiny base time so the small blind times out and folds at once.
        let mut settings = settings(&[1000, 1000]);
        settings.base_time = 0.05;
        settings.timebank = 0.0;
        settings.grace = 0.0;

        let game_id = GameId::new("worker-timeout");
        broker
            .send_registry(&init_message(&game_id, 2, settings))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        // The forced fold ends the hand with a round result per seat.
        for _ in 0..2 {
            let msg = recv_outbound(&mut rx).await;
            assert!(matches!(msg, Outbound::RoundResult { .. }));
        }
    }

    #[tokio::test]
    async fn timeout_beaten_by_an_action_is_dropped() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-beaten");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        // A real action moves the deadline forward.
        broker
            .send_step(&StepMessage::Action {
                game_id: game_id.clone(),
                player_id: "player-0".to_string(),
                amount: 20,
                action_count: 1,
                received_at: unix_time(),
            })
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        // A timeout check raised before that action arrives late, it must
        // not force anything on the new turn.
        broker
            .send_step(&StepMessage::TimeoutPossibility {
                game_id: game_id.clone(),
            })
            .unwrap();
        time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        // The match is untouched, still on the post-action counter.
        broker
            .send_step(&StepMessage::SendStateToUser {
                game_id: game_id.clone(),
                player_id: "player-1".to_string(),
            })
            .unwrap();

        let msg = recv_outbound(&mut rx).await;
        let Outbound::StateUpdate { payload, .. } = msg else {
            panic!("expected a state update, got {msg:?}");
        };
        assert_eq!(payload.turn, "player-1");
        assert_eq!(payload.action_count, 2);
    }

    #[tokio::test]
    async fn gc_refuses_a_running_match() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        let game_id = GameId::new("worker-gc");
        broker
            .send_registry(&init_message(&game_id, 2, settings(&[1000, 1000])))
            .unwrap();
        for _ in 0..2 {
            recv_outbound(&mut rx).await;
        }

        broker
            .send_registry(&RegistryMessage::Gc {
                game_id: game_id.clone(),
            })
            .unwrap();
        time::sleep(Duration::from_millis(100)).await;

        // The match still answers state requests.
        broker
            .send_step(&StepMessage::SendStateToUser {
                game_id: game_id.clone(),
                player_id: "player-0".to_string(),
            })
            .unwrap();
        let msg = recv_outbound(&mut rx).await;
        assert!(matches!(msg, Outbound::StateUpdate { .. }));
        assert!(broker.kv().player_for_uid(&game_id, "uid-0").is_some());
    }

    #[tokio::test]
    async fn finished_match_is_garbage_collected() {
        let (broker, _shutdown_tx, _complete_rx) = start_worker();
        let mut rx = broker.subscribe();

        // Seat 0 posts its whole stack as the small blind, a forced fold
        // ends the match at once.
        let mut settings = settings(&[10, 990]);
        settings.base_time = 0.05;
        settings.timebank = 0.0;
        settings.grace = 0.0;

        let game_id = GameId::new("worker-done");
        broker
            .send_registry(&init_message(&game_id, 2, settings))
            .unwrap();

        // Two state updates, two round results, two game ends.
        let mut ends = 0;
        for _ in 0..6 {
            if matches!(recv_outbound(&mut rx).await, Outbound::GameEnd { .. }) {
                ends += 1;
            }
        }
        assert_eq!(ends, 2);

        broker
            .send_registry(&RegistryMessage::Gc {
                game_id: game_id.clone(),
            })
            .unwrap();
        time::sleep(Duration::from_millis(100)).await;
        assert!(broker.kv().player_for_uid(&game_id, "uid-0").is_none());
    }

    #[tokio::test]
    async fn shutdown_stops_the_worker() {
        let (broker, shutdown_tx, mut complete_rx) = start_worker();

        drop(shutdown_tx);
        drop(broker);
        let _ = complete_rx.recv().await;
    }
}
