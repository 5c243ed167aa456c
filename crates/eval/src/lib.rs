// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Splitpot Poker hand evaluator.
//!
//! Evaluates 5 to 7 cards hands by enumerating every 5-card subset,
//! classifying it into one of the ten [HandRank] categories, and keeping
//! the strongest subset. Ties between equal categories are broken by a
//! rank by rank comparison of the best five cards, suits never matter.
//!
//! ```
//! # use splitpot_cards::Card;
//! # use splitpot_eval::{HandRank, HandValue};
//! let cards: Vec<Card> = ["AS", "KS", "QS", "JS", "TS", "2D", "7C"]
//!     .iter()
//!     .map(|s| s.parse().unwrap())
//!     .collect();
//! let value = HandValue::eval(&cards);
//! assert_eq!(value.rank(), HandRank::RoyalFlush);
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
mod eval;
pub use eval::{HandRank, HandValue, rank_groups};

// Reexport cards types.
pub use splitpot_cards::{Card, Deck, Rank, Suit};
