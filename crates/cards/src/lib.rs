// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Splitpot Poker cards types.
//!
//! This crate defines types to create cards:
//!
//! ```
//! # use splitpot_cards::{Card, Rank, Suit};
//! let ah = Card::new(Rank::Ace, Suit::Hearts);
//! let kd = Card::new(Rank::King, Suit::Diamonds);
//! assert!(ah.rank() > kd.rank());
//! ```
//!
//! and a [Deck] type that hands out cards without replacement:
//!
//! ```
//! # use splitpot_cards::Deck;
//! let mut deck = Deck::new_and_shuffled(&mut rand::rng());
//! let hole = deck.draw(2);
//! assert_eq!(hole.len(), 2);
//! assert_eq!(deck.count(), 50);
//! ```
//!
//! Cards serialize to their two character display form (`"AS"`, `"TD"`),
//! the format the game protocol puts on the wire.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
mod cards;
pub use cards::{Card, Deck, Rank, Suit};
