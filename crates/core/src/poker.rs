// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Types used in a Poker game.
use serde::{Deserialize, Serialize};
use std::{
    fmt, ops,
    time::{SystemTime, UNIX_EPOCH},
};

pub use splitpot_cards::{Card, Deck, Rank, Suit};
pub use splitpot_eval::{HandRank, HandValue};

/// A unique match identifier.
///
/// The identifier decides which worker owns the match: every process
/// hashes it with the same fixed-seed hasher so control and action
/// messages always land on the owning shard.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Creates a match identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The worker index owning this match in a pool of `workers` shards.
    pub fn shard(&self, workers: usize) -> usize {
        // Fixed seeds keep the routing stable across processes.
        let hasher = ahash::RandomState::with_seeds(
            0x5f3a_92e1,
            0x1c8b_44d0,
            0x97d2_6a3f,
            0x0be4_71c9,
        );
        (hasher.hash_one(&self.0) % workers as u64) as usize
    }

    /// The identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Match ids are long uuid strings, log a short prefix.
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "{short}")
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Chips amount.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Chips(u32);

impl Chips {
    /// The zero chips.
    pub const ZERO: Chips = Chips(0);

    /// Creates chips with the given value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The integer amount.
    pub fn amount(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Chips {
    fn from(val: u32) -> Self {
        Chips(val)
    }
}

impl From<Chips> for u32 {
    fn from(val: Chips) -> Self {
        val.0
    }
}

impl ops::Add for Chips {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Chips(self.0 + rhs.0)
    }
}

impl ops::AddAssign for Chips {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl ops::Sub<Chips> for Chips {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl ops::SubAssign for Chips {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl ops::Div<u32> for Chips {
    type Output = Self;

    fn div(self, rhs: u32) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl ops::Rem<u32> for Chips {
    type Output = Self;

    fn rem(self, rhs: u32) -> Self::Output {
        Self(self.0 % rhs)
    }
}

impl fmt::Display for Chips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The betting phase of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Before the flop is dealt.
    Preflop,
    /// Three community cards on the board.
    Flop,
    /// Four community cards on the board.
    Turn,
    /// Five community cards on the board.
    River,
    /// Betting is over, hands are compared.
    Showdown,
}

impl Stage {
    /// The number of community cards revealed at this stage.
    pub fn board_cards(&self) -> usize {
        match self {
            Stage::Preflop => 0,
            Stage::Flop => 3,
            Stage::Turn => 4,
            Stage::River | Stage::Showdown => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preflop => "Preflop",
            Stage::Flop => "Flop",
            Stage::Turn => "Turn",
            Stage::River => "River",
            Stage::Showdown => "Showdown",
        };

        write!(f, "{name}")
    }
}

/// The hole cards of a seat as seen by one player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCards {
    /// The seat has no cards.
    #[default]
    None,
    /// The seat has cards but their values are hidden.
    Covered,
    /// The seat cards.
    Cards(Card, Card),
}

/// The current time as fractional seconds since the unix epoch.
///
/// Deadlines and `received_at` timestamps share this clock across the
/// transport and the workers.
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_secs_f64()
}
