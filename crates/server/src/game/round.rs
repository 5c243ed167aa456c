// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! A single hand of poker.
//!
//! Deals the cards, drives the betting through the streets, tracks per seat
//! turn timers, and settles the pot at the end of the hand.
use anyhow::{Result, bail, ensure};
use rand::Rng;

use splitpot_core::poker::{Card, Chips, Deck, HandValue, Stage};
use splitpot_eval::rank_groups;

use crate::game::bet::BetManager;

/// The outcome of a round step.
#[derive(Debug, Clone)]
pub struct RoundStep {
    /// The hand is over, chips can be settled.
    pub finished: bool,
    /// Community cards revealed by this step.
    pub drawn: Vec<Card>,
}

/// State for one hand from the deal to the pot settlement.
#[derive(Debug)]
pub struct RoundManager {
    bet: BetManager,
    deck: Deck,
    /// Hole cards by seat.
    hole: Vec<[Card; 2]>,
    /// Revealed community cards.
    board: Vec<Card>,
    /// Seconds a seat may take before its timebank starts draining.
    base_time: f64,
    /// Remaining timebank seconds by seat.
    timebanks: Vec<f64>,
    /// Grace period added to the deadline for network latency.
    grace: f64,
    /// Absolute deadline for the seat on the clock.
    deadline: f64,
    /// When the current turn started.
    turn_started: f64,
}

impl RoundManager {
    /// Starts a hand, posts the blinds and deals two hole cards per seat.
    pub fn new<R: Rng>(
        chips: &[Chips],
        sb: Chips,
        bb: Chips,
        base_time: f64,
        timebank: f64,
        grace: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let bet = BetManager::new(chips, sb, bb)?;

        let mut deck = Deck::new_and_shuffled(rng);
        let hole = (0..chips.len())
            .map(|_| [deck.deal(), deck.deal()])
            .collect();

        Ok(Self {
            bet,
            deck,
            hole,
            board: Vec::new(),
            base_time,
            timebanks: vec![timebank; chips.len()],
            grace,
            deadline: 0.0,
            turn_started: 0.0,
        })
    }

    /// Applies an action for a seat and reveals any due community cards.
    ///
    /// Cards are revealed up to the new stage's board size as soon as the
    /// street closes, including a full runout when every live seat is all-in.
    pub fn step(&mut self, seat: usize, amount: Chips) -> Result<RoundStep> {
        ensure!(
            self.bet.current_player() == Some(seat),
            "it is not this seat's turn"
        );

        let step = self.bet.step(amount)?;

        let mut drawn = Vec::new();
        let live = self.bet.folded().iter().filter(|&&f| !f).count();
        if live > 1 {
            while self.board.len() < self.bet.stage().board_cards() {
                let card = self.deck.deal();
                self.board.push(card);
                drawn.push(card);
            }
        }

        Ok(RoundStep {
            finished: step.finished,
            drawn,
        })
    }

    /// Starts the turn clock for a seat.
    pub fn start_turn(&mut self, seat: usize, now: f64) {
        self.turn_started = now;
        self.deadline = now + self.base_time + self.timebanks[seat] + self.grace;
    }

    /// Debits a seat's timebank for the time taken beyond the base time.
    ///
    /// A fast action within the base time costs nothing, the timebank is
    /// floored at zero.
    pub fn use_timebank(&mut self, seat: usize, now: f64) {
        let overflow = (now - self.turn_started) - self.base_time;
        if overflow > 0.0 {
            self.timebanks[seat] = (self.timebanks[seat] - overflow).max(0.0);
        }
    }

    /// Settles the pot, returns the payout for each seat.
    ///
    /// When a single seat remains unfolded it takes the whole pot without a
    /// showdown, otherwise the pot is carved into layers by contribution so
    /// that side pots go to the strongest eligible hand.
    pub fn distributions(&self) -> Result<Vec<Chips>> {
        if !self.bet.is_finished() {
            bail!("the hand is still being played");
        }

        let folded = self.bet.folded();
        let live = folded.iter().filter(|&&f| !f).count();
        if let Some(winner) = folded.iter().position(|&f| !f)
            && live == 1
        {
            let mut payouts = vec![Chips::ZERO; self.seats()];
            payouts[winner] = self.bet.pot();
            return Ok(payouts);
        }

        let hands = self.hands();
        Ok(distribute(self.bet.contributions(), folded, &hands))
    }

    /// The best hand for each seat over its hole cards and the board.
    pub fn hands(&self) -> Vec<HandValue> {
        self.hole
            .iter()
            .map(|hole| {
                let mut cards = self.board.clone();
                cards.extend_from_slice(hole);
                HandValue::eval(&cards)
            })
            .collect()
    }

    /// The seat on the clock, `None` once the hand is finished.
    pub fn current_player(&self) -> Option<usize> {
        self.bet.current_player()
    }

    /// The hand is over.
    pub fn is_finished(&self) -> bool {
        self.bet.is_finished()
    }

    /// The number of seats in this hand.
    pub fn seats(&self) -> usize {
        self.bet.seats()
    }

    /// The hand stage.
    pub fn stage(&self) -> Stage {
        self.bet.stage()
    }

    /// The minimum raise increment on the current street.
    pub fn min_raise_by(&self) -> Chips {
        self.bet.min_raise_by()
    }

    /// The hole cards for a seat.
    pub fn hole(&self, seat: usize) -> [Card; 2] {
        self.hole[seat]
    }

    /// The revealed community cards.
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    /// Chips behind for each seat.
    pub fn chips(&self) -> &[Chips] {
        self.bet.chips()
    }

    /// Chips committed to the pot by each seat.
    pub fn contributions(&self) -> &[Chips] {
        self.bet.contributions()
    }

    /// Fold state for each seat.
    pub fn folded(&self) -> &[bool] {
        self.bet.folded()
    }

    /// The remaining timebank seconds for a seat.
    pub fn timebank(&self, seat: usize) -> f64 {
        self.timebanks[seat]
    }

    /// The absolute deadline for the seat on the clock.
    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    /// The grace period added to each deadline.
    pub fn grace(&self) -> f64 {
        self.grace
    }
}

/// Splits the pot among the strongest eligible hands, layer by layer.
///
/// Groups seats by hand strength best first. For each group the smallest
/// non-zero remaining contribution among its unfolded members caps a layer,
/// every seat chips into the layer up to that cap, and the layer is split
/// equally among the group members still contributing with any remainder
/// going to the lowest seat indexes.
fn distribute(contributions: &[Chips], folded: &[bool], hands: &[HandValue]) -> Vec<Chips> {
    let seats = contributions.len();
    let mut remaining: Vec<u32> = contributions.iter().map(|c| c.amount()).collect();
    let mut payouts = vec![0u32; seats];

    for group in rank_groups(hands) {
        if remaining.iter().sum::<u32>() == 0 {
            break;
        }

        let winners: Vec<usize> = group.into_iter().filter(|&i| !folded[i]).collect();
        if winners.is_empty() {
            continue;
        }

        // Snapshot how much each winner can still claim for, each layer
        // consumes the smallest of these.
        let mut claims: Vec<u32> = winners.iter().map(|&i| remaining[i]).collect();

        while let Some(&level) = claims.iter().filter(|&&c| c > 0).min() {
            let eligible: Vec<usize> = winners
                .iter()
                .zip(&claims)
                .filter(|&(_, &c)| c > 0)
                .map(|(&i, _)| i)
                .collect();

            let mut pie = 0;
            for r in remaining.iter_mut() {
                let take = (*r).min(level);
                *r -= take;
                pie += take;
            }

            let share = pie / eligible.len() as u32;
            let mut leftover = pie % eligible.len() as u32;
            for &i in &eligible {
                payouts[i] += share;
                if leftover > 0 {
                    payouts[i] += 1;
                    leftover -= 1;
                }
            }

            for c in claims.iter_mut() {
                *c = c.saturating_sub(level);
            }
        }
    }

    // Every chip contributed must be paid out, the seat holding the top
    // contribution can never fold so no layer is left unclaimed.
    debug_assert_eq!(
        payouts.iter().sum::<u32>(),
        contributions.iter().map(|c| c.amount()).sum::<u32>()
    );

    payouts.into_iter().map(Chips::new).collect()
}
