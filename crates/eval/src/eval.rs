// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Poker hand evaluator.
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

use splitpot_cards::{Card, Rank};

/// The rank categories of a 5-card hand, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HandRank {
    /// No pair, rank decided by the highest cards.
    #[serde(rename = "High Card")]
    HighCard,
    /// One pair.
    #[serde(rename = "One Pair")]
    OnePair,
    /// Two pairs.
    #[serde(rename = "Two Pair")]
    TwoPair,
    /// Three cards of the same rank.
    #[serde(rename = "Three of a Kind")]
    ThreeOfAKind,
    /// Five consecutive ranks.
    #[serde(rename = "Straight")]
    Straight,
    /// Five cards of the same suit.
    #[serde(rename = "Flush")]
    Flush,
    /// Three of a kind plus a pair.
    #[serde(rename = "Full House")]
    FullHouse,
    /// Four cards of the same rank.
    #[serde(rename = "Four of a Kind")]
    FourOfAKind,
    /// A straight in a single suit.
    #[serde(rename = "Straight Flush")]
    StraightFlush,
    /// Ten to ace in a single suit.
    #[serde(rename = "Royal Flush")]
    RoyalFlush,
}

impl HandRank {
    /// The category label shown to players.
    pub fn label(&self) -> &'static str {
        match self {
            HandRank::HighCard => "High Card",
            HandRank::OnePair => "One Pair",
            HandRank::TwoPair => "Two Pair",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
            HandRank::StraightFlush => "Straight Flush",
            HandRank::RoyalFlush => "Royal Flush",
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The value of an evaluated hand.
///
/// Holds the category and the best five cards sorted by descending rank.
/// Two values compare by category first, then rank by rank over the five
/// cards; suits are ignored so hands that differ only by suit are equal.
#[derive(Debug, Clone, Copy)]
pub struct HandValue {
    rank: HandRank,
    hand: [Card; 5],
}

impl HandValue {
    /// Evaluates a 5 to 7 cards hand.
    ///
    /// Enumerates every 5-card subset and returns the strongest one.
    ///
    /// Panics if `cards` does not hold 5 to 7 cards.
    pub fn eval(cards: &[Card]) -> HandValue {
        let n = cards.len();
        assert!((5..=7).contains(&n), "eval needs 5 to 7 cards");

        let mut best: Option<HandValue> = None;
        for a in 0..n {
            for b in (a + 1)..n {
                for c in (b + 1)..n {
                    for d in (c + 1)..n {
                        for e in (d + 1)..n {
                            let mut hand = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                            hand.sort_by(|x, y| y.rank().cmp(&x.rank()));

                            let value = HandValue {
                                rank: classify(&hand),
                                hand,
                            };

                            match &best {
                                Some(hv) if *hv >= value => {}
                                _ => best = Some(value),
                            }
                        }
                    }
                }
            }
        }

        best.expect("at least one 5-card subset")
    }

    /// The hand category.
    pub fn rank(&self) -> HandRank {
        self.rank
    }

    /// The best five cards, sorted by descending rank.
    pub fn hand(&self) -> &[Card; 5] {
        &self.hand
    }

    fn ranks(&self) -> [Rank; 5] {
        self.hand.map(|c| c.rank())
    }
}

impl PartialEq for HandValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HandValue {}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.ranks().cmp(&other.ranks()))
    }
}

/// Groups hand indices by equal strength, strongest group first.
///
/// The returned groups partition `0..hands.len()`; seats inside a group
/// hold hands of identical value.
pub fn rank_groups(hands: &[HandValue]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..hands.len()).collect();
    order.sort_by(|&a, &b| hands[b].cmp(&hands[a]));

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for idx in order {
        match groups.last_mut() {
            Some(group) if hands[group[0]] == hands[idx] => group.push(idx),
            _ => groups.push(vec![idx]),
        }
    }

    groups
}

/// Classifies five cards sorted by descending rank.
fn classify(hand: &[Card; 5]) -> HandRank {
    let mut counts = [0u8; 13];
    for card in hand {
        counts[card.rank() as usize] += 1;
    }

    let mut shape = counts.iter().copied().filter(|&c| c > 0).collect::<Vec<_>>();
    shape.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = hand.iter().all(|c| c.suit() == hand[0].suit());

    // Five distinct consecutive ranks; the ace only plays high so there
    // is no ace-low wheel.
    let is_straight =
        shape.len() == 5 && hand[0].rank() as usize - hand[4].rank() as usize == 4;

    if is_flush && is_straight && hand[0].rank() == Rank::Ace {
        HandRank::RoyalFlush
    } else if is_flush && is_straight {
        HandRank::StraightFlush
    } else if shape == [4, 1] {
        HandRank::FourOfAKind
    } else if shape == [3, 2] {
        HandRank::FullHouse
    } else if is_flush {
        HandRank::Flush
    } else if is_straight {
        HandRank::Straight
    } else if shape == [3, 1, 1] {
        HandRank::ThreeOfAKind
    } else if shape == [2, 2, 1] {
        HandRank::TwoPair
    } else if shape == [2, 1, 1, 1] {
        HandRank::OnePair
    } else {
        HandRank::HighCard
    }
}
