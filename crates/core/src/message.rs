// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Type definitions for the messages flowing through the broker queues.
//!
//! Inbound control and action messages are consumed from per-shard queues,
//! outgoing protocol messages are published to a single fan-out channel the
//! transport processes subscribe to. Every message is a tagged variant with
//! one concrete schema per `type`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::poker::{Card, Chips, GameId, HandRank, PlayerCards, Stage};

/// A control message for a shard's registry loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryMessage {
    /// Creates a match on the owning shard.
    Init {
        /// The match identifier.
        game_id: GameId,
        /// The lobby game type label.
        game_type: String,
        /// The lobby user identifiers, one per seat.
        uids: Vec<String>,
        /// The in-game player identifiers, one per seat.
        player_ids: Vec<String>,
        /// The room settings for this match.
        room_settings: RoomSettings,
    },
    /// Destroys a finished match.
    Gc {
        /// The match identifier.
        game_id: GameId,
    },
}

/// The per-room settings a match is created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// The starting stack for each seat.
    pub chips: Vec<Chips>,
    /// The small blind.
    #[serde(default = "default_sb")]
    pub sb: Chips,
    /// The big blind.
    #[serde(default = "default_bb")]
    pub bb: Chips,
    /// Base thinking time per turn in seconds.
    #[serde(default = "default_base_time")]
    pub base_time: f64,
    /// Reserve time each seat starts the hand with, in seconds.
    #[serde(default = "default_timebank")]
    pub timebank: f64,
    /// Grace window added to every deadline to absorb network latency.
    #[serde(default = "default_grace")]
    pub grace: f64,
    /// Pause between hands in seconds.
    #[serde(default = "default_round_delay")]
    pub round_delay: f64,
}

fn default_sb() -> Chips {
    Chips::new(1)
}

fn default_bb() -> Chips {
    Chips::new(2)
}

fn default_base_time() -> f64 {
    15.0
}

fn default_timebank() -> f64 {
    30.0
}

fn default_grace() -> f64 {
    1.0
}

fn default_round_delay() -> f64 {
    5.0
}

/// A message for a shard's step loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepMessage {
    /// Wakes a newly registered match.
    GameInit {
        /// The match identifier.
        game_id: GameId,
    },
    /// A player action.
    Action {
        /// The match identifier.
        game_id: GameId,
        /// The acting player.
        player_id: String,
        /// The intended contribution to date for the street.
        amount: i64,
        /// The action counter echoed by the client.
        action_count: u64,
        /// When the transport received the action, unix seconds.
        received_at: f64,
    },
    /// A conditional timeout raised by the timeout detector.
    TimeoutPossibility {
        /// The match identifier.
        game_id: GameId,
    },
    /// Resend the current state to one player, e.g. on reconnect.
    SendStateToUser {
        /// The match identifier.
        game_id: GameId,
        /// The player to send the state to.
        player_id: String,
    },
}

/// A request for the timeout detector to track a match's deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutRequest {
    /// The match identifier.
    pub game_id: GameId,
}

/// An outgoing protocol message, scoped to one player connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// A per-player view of the match state.
    StateUpdate {
        /// The match identifier.
        game_id: GameId,
        /// The receiving player.
        player_id: String,
        /// The state payload.
        payload: StatePayload,
    },
    /// The result of a finished hand.
    RoundResult {
        /// The match identifier.
        game_id: GameId,
        /// The receiving player.
        player_id: String,
        /// The result payload.
        payload: RoundResultPayload,
    },
    /// The final rankings of a finished match.
    GameEnd {
        /// The match identifier.
        game_id: GameId,
        /// The receiving player.
        player_id: String,
        /// The rankings payload.
        payload: GameEndPayload,
    },
    /// An error scoped to the offending player.
    Error {
        /// The match identifier.
        game_id: GameId,
        /// The player the error is addressed to.
        player_id: String,
        /// The error payload.
        payload: ErrorPayload,
    },
}

impl Outbound {
    /// The match this message belongs to.
    pub fn game_id(&self) -> &GameId {
        match self {
            Outbound::StateUpdate { game_id, .. }
            | Outbound::RoundResult { game_id, .. }
            | Outbound::GameEnd { game_id, .. }
            | Outbound::Error { game_id, .. } => game_id,
        }
    }

    /// The player connection this message should be routed to.
    pub fn player_id(&self) -> &str {
        match self {
            Outbound::StateUpdate { player_id, .. }
            | Outbound::RoundResult { player_id, .. }
            | Outbound::GameEnd { player_id, .. }
            | Outbound::Error { player_id, .. } => player_id,
        }
    }
}

/// The state of a match as seen by one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePayload {
    /// The current betting stage.
    pub stage: Stage,
    /// The player on the clock.
    pub turn: String,
    /// The community cards.
    pub board: Vec<Card>,
    /// The small blind.
    pub sb: Chips,
    /// The big blind.
    pub bb: Chips,
    /// The minimum raise over the current top contribution.
    pub min_raise_by: Chips,
    /// One entry per seat still in the match.
    pub players: Vec<SeatState>,
    /// The action counter clients must echo back.
    pub action_count: u64,
}

/// One seat in a state update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatState {
    /// The seat's player.
    pub player_id: String,
    /// The position label (SB, BB, UTG, ...).
    pub position: String,
    /// The seat's hole cards, covered unless they are the viewer's own.
    pub cards: PlayerCards,
    /// The seat has folded this hand.
    pub folded: bool,
    /// The seat's chips behind.
    pub chips: Chips,
    /// The seat's contribution to the pot so far this hand.
    pub bet: Chips,
    /// The seat's remaining reserve time in seconds.
    pub timebank: f64,
    /// Base time left for the seat on the clock, absent for the others.
    pub remaining_time: Option<f64>,
}

/// The result of one hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResultPayload {
    /// The community cards.
    pub board: Vec<Card>,
    /// One entry per seat that played the hand.
    pub players: Vec<SeatResult>,
}

/// One seat in a hand result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatResult {
    /// The seat's player.
    pub player_id: String,
    /// Chips after the payout.
    pub chips: Chips,
    /// Chips won from the pot.
    pub payout: Chips,
    /// Chips contributed over the whole hand.
    pub bet: Chips,
    /// Net chips change for the hand.
    pub change: i64,
    /// The seat's hand category, revealed only when the cards are.
    pub hand: Option<HandRank>,
    /// The seat's hole cards, revealed at showdown or on a lone win.
    pub cards: PlayerCards,
}

/// The final rankings of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEndPayload {
    /// Rank per player, 1 is the winner; busts in the same hand share a rank.
    pub rankings: BTreeMap<String, u32>,
}

/// An error report for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// A human readable description.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_wire_format() {
        let msg: StepMessage = serde_json::from_str(
            r#"{
                "type": "action",
                "game_id": "g-1",
                "player_id": "A",
                "amount": 20,
                "action_count": 3,
                "received_at": 1700000000.5
            }"#,
        )
        .unwrap();

        assert!(matches!(
            msg,
            StepMessage::Action { amount: 20, action_count: 3, .. }
        ));

        let msg: RegistryMessage = serde_json::from_str(
            r#"{
                "type": "init",
                "game_id": "g-1",
                "game_type": "quick",
                "uids": ["u1", "u2"],
                "player_ids": ["A", "B"],
                "room_settings": { "chips": [1000, 1000] }
            }"#,
        )
        .unwrap();

        // Omitted settings fall back to the room defaults.
        let RegistryMessage::Init { room_settings, .. } = msg else {
            panic!("expected init");
        };
        assert_eq!(room_settings.sb, Chips::new(1));
        assert_eq!(room_settings.bb, Chips::new(2));
        assert_eq!(room_settings.base_time, 15.0);
        assert_eq!(room_settings.round_delay, 5.0);
    }

    #[test]
    fn outbound_wire_format() {
        let msg = Outbound::Error {
            game_id: GameId::new("g-1"),
            player_id: "A".to_string(),
            payload: ErrorPayload {
                message: "not your turn".to_string(),
            },
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert_eq!(msg.game_id().as_str(), "g-1");
        assert_eq!(msg.player_id(), "A");

        let parsed: Outbound = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, Outbound::Error { .. }));
    }
}
