// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Betting state for a single hand.
//!
//! Tracks per seat stacks, street contributions and fold state, validates each
//! action against no-limit rules, and advances the turn and the street.
use anyhow::{Result, ensure};
use thiserror::Error;

use splitpot_core::poker::{Chips, Stage};

/// Minimum number of seats in a hand.
pub const MIN_SEATS: usize = 2;

/// Maximum number of seats in a hand.
pub const MAX_SEATS: usize = 8;

/// An invalid betting action.
///
/// None of these mutate the betting state, the acting seat keeps the turn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BetError {
    /// The amount is below the chips the seat already committed this street.
    #[error("amount is below the chips already committed this street")]
    BelowContribution,
    /// The amount requires more chips than the seat holds.
    #[error("amount is larger than the remaining stack")]
    OverStack,
    /// A call below the street target that does not use the whole stack.
    #[error("a call below the current bet must use the whole stack")]
    ShortCall,
    /// A raise below the minimum raise, short all-in raises are not accepted.
    #[error("raise is below the minimum raise")]
    BelowMinRaise,
    /// The betting for this hand is over.
    #[error("betting for this hand is finished")]
    Finished,
}

/// The outcome of a betting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetStep {
    /// No more betting is possible this hand.
    pub finished: bool,
}

/// Betting state for the seats of a single hand.
#[derive(Debug)]
pub struct BetManager {
    /// Chips behind for each seat, excludes committed chips.
    chips: Vec<Chips>,
    /// Chips committed to the pot this street by each seat.
    contributions: Vec<Chips>,
    /// Seats that folded this hand.
    folded: Vec<bool>,
    /// Number of voluntary actions this street, blinds don't count.
    acted: Vec<u32>,
    /// The current betting street.
    street: Stage,
    /// The seat on the clock.
    current: usize,
    /// The minimum raise increment for the current street.
    min_raise_by: Chips,
    sb: Chips,
    bb: Chips,
    finished: bool,
}

impl BetManager {
    /// Creates the betting state and posts the blinds.
    ///
    /// Seat 0 posts the small blind and seat 1 the big blind, a seat that
    /// cannot cover its blind posts its whole stack.
    pub fn new(chips: &[Chips], sb: Chips, bb: Chips) -> Result<Self> {
        ensure!(
            (MIN_SEATS..=MAX_SEATS).contains(&chips.len()),
            "a hand takes {MIN_SEATS} to {MAX_SEATS} seats"
        );
        ensure!(
            chips.iter().all(|&c| c > Chips::ZERO),
            "every seat in a hand must hold chips"
        );
        ensure!(sb > Chips::ZERO && bb >= sb, "invalid blinds {sb}/{bb}");

        let n = chips.len();
        let mut mgr = Self {
            chips: chips.to_vec(),
            contributions: vec![Chips::ZERO; n],
            folded: vec![false; n],
            acted: vec![0; n],
            street: Stage::Preflop,
            // Heads up the small blind acts first, otherwise under the gun.
            current: if n == 2 { 0 } else { 2 },
            min_raise_by: bb,
            sb,
            bb,
            finished: false,
        };

        mgr.post_blind(0, sb);
        mgr.post_blind(1, bb);

        Ok(mgr)
    }

    fn post_blind(&mut self, seat: usize, blind: Chips) {
        let amount = blind.min(self.chips[seat]);
        self.contributions[seat] += amount;
        self.chips[seat] -= amount;
    }

    /// Applies an action for the seat on the clock.
    ///
    /// The amount is the total contribution for this street, not a delta: zero
    /// folds when facing a bet and checks otherwise, matching the street
    /// target calls, exceeding it raises. On error nothing changes and the
    /// seat keeps the turn.
    pub fn step(&mut self, amount: Chips) -> Result<BetStep, BetError> {
        if self.finished {
            return Err(BetError::Finished);
        }

        self.apply(amount)?;
        self.advance();

        Ok(BetStep {
            finished: self.finished,
        })
    }

    fn apply(&mut self, amount: Chips) -> Result<(), BetError> {
        let seat = self.current;
        let target = self.target();
        let committed = self.contributions[seat];

        if amount == Chips::ZERO {
            if committed < target {
                self.folded[seat] = true;
            } else {
                self.acted[seat] += 1;
            }
            return Ok(());
        }

        if amount < committed {
            return Err(BetError::BelowContribution);
        }

        let delta = amount - committed;
        if delta > self.chips[seat] {
            return Err(BetError::OverStack);
        }

        if amount > target {
            let raise_by = amount - target;
            if raise_by < self.min_raise_by {
                return Err(BetError::BelowMinRaise);
            }
            self.min_raise_by = raise_by;
        } else if amount < target && delta != self.chips[seat] {
            // Calling short is only valid as an all-in.
            return Err(BetError::ShortCall);
        }

        self.contributions[seat] = amount;
        self.chips[seat] -= delta;
        self.acted[seat] += 1;

        Ok(())
    }

    /// Moves the turn to the next seat or advances the street.
    fn advance(&mut self) {
        let live = self.folded.iter().filter(|&&f| !f).count();
        if live == 1 || self.not_all_in() == 0 {
            self.finished = true;
            return;
        }

        let target = self.target();
        let undone = (0..self.seats()).any(|i| {
            !self.folded[i]
                && self.chips[i] > Chips::ZERO
                && (self.contributions[i] < target || self.acted[i] == 0)
        });

        if undone {
            loop {
                self.current = (self.current + 1) % self.seats();
                let i = self.current;
                let settled = self.contributions[i] == target && self.acted[i] > 0;
                if !self.folded[i] && self.chips[i] > Chips::ZERO && !settled {
                    break;
                }
            }
            return;
        }

        if self.street == Stage::River {
            self.finished = true;
            return;
        }

        self.street = match self.street {
            Stage::Preflop => Stage::Flop,
            Stage::Flop => Stage::Turn,
            _ => Stage::River,
        };
        self.min_raise_by = self.bb;
        self.acted.iter_mut().for_each(|a| *a = 0);

        // Postflop the small blind acts first, heads up that is seat 1 as
        // seat 0 holds the button.
        self.current = if self.seats() == 2 { 1 } else { 0 };
        while self.folded[self.current] || self.chips[self.current] == Chips::ZERO {
            self.current = (self.current + 1) % self.seats();
        }

        if self.not_all_in() == 1 {
            self.finished = true;
        }
    }

    /// Seats that can still put chips in.
    fn not_all_in(&self) -> usize {
        (0..self.seats())
            .filter(|&i| !self.folded[i] && self.chips[i] > Chips::ZERO)
            .count()
    }

    /// The contribution a seat must match to stay in this street.
    pub fn target(&self) -> Chips {
        self.contributions.iter().copied().max().unwrap_or_default()
    }

    /// The number of seats in the hand.
    pub fn seats(&self) -> usize {
        self.chips.len()
    }

    /// The seat on the clock, `None` once betting is finished.
    pub fn current_player(&self) -> Option<usize> {
        (!self.finished).then_some(self.current)
    }

    /// The betting is over for this hand.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The stage of the hand, `Showdown` once betting is finished.
    pub fn stage(&self) -> Stage {
        if self.finished {
            Stage::Showdown
        } else {
            self.street
        }
    }

    /// The minimum raise increment on the current street.
    pub fn min_raise_by(&self) -> Chips {
        self.min_raise_by
    }

    /// Chips behind for each seat.
    pub fn chips(&self) -> &[Chips] {
        &self.chips
    }

    /// Chips each seat committed this street.
    pub fn contributions(&self) -> &[Chips] {
        &self.contributions
    }

    /// Fold state for each seat.
    pub fn folded(&self) -> &[bool] {
        &self.folded
    }

    /// The total chips committed this street.
    pub fn pot(&self) -> Chips {
        self.contributions
            .iter()
            .fold(Chips::ZERO, |acc, &c| acc + c)
    }
}

/// Seat position labels ordered by seat index.
pub fn positions(seats: usize) -> &'static [&'static str] {
    match seats {
        2 => &["SB", "BB"],
        3 => &["SB", "BB", "BTN"],
        4 => &["SB", "BB", "UTG", "BTN"],
        5 => &["SB", "BB", "UTG", "CO", "BTN"],
        6 => &["SB", "BB", "UTG", "MP", "CO", "BTN"],
        7 => &["SB", "BB", "UTG", "UTG+1", "MP", "CO", "BTN"],
        _ => &["SB", "BB", "UTG", "UTG+1", "MP", "MP+1", "CO", "BTN"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chips(amounts: &[u32]) -> Vec<Chips> {
        amounts.iter().map(|&a| Chips::new(a)).collect()
    }

    fn total(mgr: &BetManager) -> u32 {
        mgr.chips().iter().map(|c| c.amount()).sum::<u32>()
            + mgr.contributions().iter().map(|c| c.amount()).sum::<u32>()
    }

    #[test]
    fn blinds_are_posted() {
        let mgr = BetManager::new(&chips(&[1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();
        assert_eq!(mgr.chips(), chips(&[990, 980]));
        assert_eq!(mgr.contributions(), chips(&[10, 20]));
        assert_eq!(mgr.current_player(), Some(0));
        assert_eq!(mgr.min_raise_by(), Chips::new(20));
        assert_eq!(mgr.stage(), Stage::Preflop);
    }

    #[test]
    fn short_stack_posts_partial_blind() {
        let mgr = BetManager::new(&chips(&[5, 8]), Chips::new(10), Chips::new(20)).unwrap();
        assert_eq!(mgr.contributions(), chips(&[5, 8]));
        assert_eq!(mgr.chips(), chips(&[0, 0]));
    }

    #[test]
    fn position_labels_per_table_size() {
        assert_eq!(positions(2), ["SB", "BB"]);
        assert_eq!(positions(3), ["SB", "BB", "BTN"]);
        assert_eq!(positions(6), ["SB", "BB", "UTG", "MP", "CO", "BTN"]);
        assert_eq!(positions(7), ["SB", "BB", "UTG", "UTG+1", "MP", "CO", "BTN"]);
        assert_eq!(
            positions(8),
            ["SB", "BB", "UTG", "UTG+1", "MP", "MP+1", "CO", "BTN"]
        );
    }

    #[test]
    fn first_actor_is_under_the_gun() {
        let mgr =
            BetManager::new(&chips(&[1000, 1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();
        assert_eq!(mgr.current_player(), Some(2));
    }

    #[test]
    fn rejects_invalid_seats() {
        assert!(BetManager::new(&chips(&[1000]), Chips::new(10), Chips::new(20)).is_err());
        assert!(BetManager::new(&chips(&[1000, 0]), Chips::new(10), Chips::new(20)).is_err());
        assert!(BetManager::new(&chips(&[1000, 1000]), Chips::new(20), Chips::new(10)).is_err());
    }

    #[test]
    fn heads_up_hand_plays_all_streets() {
        // Small blind calls, big blind checks, then both check down.
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();

        let step = mgr.step(Chips::new(20)).unwrap();
        assert!(!step.finished);
        assert_eq!(mgr.chips(), chips(&[980, 980]));
        assert_eq!(mgr.current_player(), Some(1));
        assert_eq!(mgr.stage(), Stage::Preflop);

        // Big blind checks, the flop starts with the big blind first to act.
        let step = mgr.step(Chips::ZERO).unwrap();
        assert!(!step.finished);
        assert_eq!(mgr.stage(), Stage::Flop);
        assert_eq!(mgr.current_player(), Some(1));

        for stage in [Stage::Turn, Stage::River] {
            mgr.step(Chips::ZERO).unwrap();
            mgr.step(Chips::ZERO).unwrap();
            assert_eq!(mgr.stage(), stage);
            assert_eq!(mgr.current_player(), Some(1));
        }

        mgr.step(Chips::ZERO).unwrap();
        let step = mgr.step(Chips::ZERO).unwrap();
        assert!(step.finished);
        assert!(mgr.is_finished());
        assert_eq!(mgr.stage(), Stage::Showdown);
        assert_eq!(mgr.current_player(), None);
        assert_eq!(mgr.step(Chips::ZERO), Err(BetError::Finished));
    }

    #[test]
    fn zero_folds_when_facing_a_bet() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();
        let step = mgr.step(Chips::ZERO).unwrap();
        assert!(step.finished);
        assert_eq!(mgr.folded(), [true, false]);
        // The pot keeps the dead small blind.
        assert_eq!(mgr.pot(), Chips::new(30));
    }

    #[test]
    fn amount_is_contribution_not_delta() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();

        // Seat 2 calls 20 then seat 0 completes to 20, paying only the
        // difference over the posted small blind.
        mgr.step(Chips::new(20)).unwrap();
        mgr.step(Chips::new(20)).unwrap();
        assert_eq!(mgr.chips(), chips(&[980, 980, 980]));

        // An amount below the committed chips is rejected.
        assert_eq!(mgr.step(Chips::new(10)), Err(BetError::BelowContribution));
        assert_eq!(mgr.current_player(), Some(1));
    }

    #[test]
    fn raise_reopens_the_action() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000, 1000]), Chips::new(10), Chips::new(20)).unwrap();

        // Seat 2 raises to 60, a raise of 40 over the big blind.
        mgr.step(Chips::new(60)).unwrap();
        assert_eq!(mgr.min_raise_by(), Chips::new(40));

        // A re-raise must add at least the last raise.
        assert_eq!(mgr.step(Chips::new(90)), Err(BetError::BelowMinRaise));
        mgr.step(Chips::new(100)).unwrap();
        assert_eq!(mgr.min_raise_by(), Chips::new(40));

        // The raiser gets to act again after a re-raise.
        mgr.step(Chips::new(100)).unwrap();
        assert_eq!(mgr.current_player(), Some(2));
        let step = mgr.step(Chips::new(100)).unwrap();
        assert!(!step.finished);
        assert_eq!(mgr.stage(), Stage::Flop);
    }

    #[test]
    fn short_call_must_be_all_in() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 60, 1000]), Chips::new(10), Chips::new(20)).unwrap();

        // Seat 2 raises to 100 and seat 0 calls, seat 1 has only 40 behind.
        mgr.step(Chips::new(100)).unwrap();
        mgr.step(Chips::new(100)).unwrap();

        assert_eq!(mgr.step(Chips::new(100)), Err(BetError::OverStack));
        assert_eq!(mgr.step(Chips::new(50)), Err(BetError::ShortCall));

        // The whole stack calls short.
        let before = total(&mgr);
        mgr.step(Chips::new(60)).unwrap();
        assert_eq!(mgr.chips()[1], Chips::ZERO);
        assert_eq!(total(&mgr), before);
        assert_eq!(mgr.stage(), Stage::Flop);
    }

    #[test]
    fn full_all_in_raise_sets_min_raise() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000, 45]), Chips::new(10), Chips::new(20)).unwrap();

        // Seat 2 is all-in for 45, a raise of 25 over the big blind.
        mgr.step(Chips::new(45)).unwrap();
        assert_eq!(mgr.min_raise_by(), Chips::new(25));
    }

    #[test]
    fn dead_raise_is_rejected() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000, 30]), Chips::new(10), Chips::new(20)).unwrap();

        // An all-in raise of 10 over the big blind is below the minimum
        // raise and is rejected outright.
        assert_eq!(mgr.step(Chips::new(30)), Err(BetError::BelowMinRaise));
        // The seat can still call.
        mgr.step(Chips::new(20)).unwrap();
        assert_eq!(mgr.current_player(), Some(0));
    }

    #[test]
    fn all_in_seats_end_the_betting() {
        let mut mgr =
            BetManager::new(&chips(&[100, 100]), Chips::new(10), Chips::new(20)).unwrap();

        mgr.step(Chips::new(100)).unwrap();
        let step = mgr.step(Chips::new(100)).unwrap();
        assert!(step.finished);
        assert_eq!(mgr.stage(), Stage::Showdown);
        assert_eq!(mgr.chips(), chips(&[0, 0]));
    }

    #[test]
    fn folds_end_the_hand_early() {
        let mut mgr =
            BetManager::new(&chips(&[1000, 1000, 1000, 1000]), Chips::new(10), Chips::new(20))
                .unwrap();

        mgr.step(Chips::ZERO).unwrap();
        mgr.step(Chips::ZERO).unwrap();
        // Small blind raises, big blind folds.
        mgr.step(Chips::new(60)).unwrap();
        let step = mgr.step(Chips::ZERO).unwrap();
        assert!(step.finished);
        assert_eq!(mgr.folded(), [false, true, true, true]);
    }

    #[test]
    fn chips_are_conserved() {
        let mut mgr =
            BetManager::new(&chips(&[500, 300, 800]), Chips::new(10), Chips::new(20)).unwrap();
        let before = total(&mgr);

        for amount in [60, 0, 60, 0, 120, 240, 240] {
            mgr.step(Chips::new(amount)).unwrap();
            assert_eq!(total(&mgr), before);
        }
    }
}
