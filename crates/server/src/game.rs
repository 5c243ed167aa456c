// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! A no-rebuy match from the first hand to the final rankings.
//!
//! A [`GameManager`] owns the seats, chips, and elimination rankings for one
//! match, runs a [`round::RoundManager`] per hand, and turns every applied
//! event into the protocol messages to publish. Time is always passed in so
//! handlers stay deterministic under test.
use anyhow::{Result, anyhow, bail, ensure};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;

use splitpot_core::{
    message::{
        ErrorPayload, GameEndPayload, Outbound, RoomSettings, RoundResultPayload, SeatResult,
        SeatState, StatePayload,
    },
    poker::{Chips, GameId, PlayerCards},
};

use crate::game::{
    bet::{MAX_SEATS, MIN_SEATS, positions},
    round::RoundManager,
};

pub mod bet;
pub mod round;

/// A finished match summary for the history database.
#[derive(Debug, Clone)]
pub struct MatchSummary {
    /// The match identifier.
    pub game_id: GameId,
    /// The lobby game type label.
    pub game_type: String,
    /// Seat rankings by lobby uid, 1 is the winner.
    pub rankings: BTreeMap<String, u32>,
    /// The in-game player id for each lobby uid.
    pub players: BTreeMap<String, String>,
    /// The match duration in seconds.
    pub duration: f64,
}

/// The state of one match.
#[derive(Debug)]
pub struct GameManager {
    game_id: GameId,
    game_type: String,
    /// Lobby user ids by seat.
    uids: Vec<String>,
    /// In-game player ids by seat.
    player_ids: Vec<String>,
    /// Chips by seat, updated after every action.
    chips: Vec<Chips>,
    settings: RoomSettings,
    /// The seat posting the small blind next hand.
    sb_index: usize,
    /// Maps a match seat to its seat in the active hand.
    round_seat: Vec<Option<usize>>,
    /// Maps a hand seat back to its match seat.
    round_to_game: Vec<usize>,
    /// Elimination groups, first group ranks best.
    rankings: Vec<Vec<String>>,
    /// The active hand.
    round: Option<RoundManager>,
    /// Counts turns and hand starts, clients echo it to detect staleness.
    action_count: u64,
    /// The next deadline, either the turn clock or the between-hands pause.
    deadline: f64,
    /// The match is pausing between hands.
    sleeping: bool,
    /// The match is over.
    done: bool,
    started_at: f64,
    rng: StdRng,
}

impl GameManager {
    /// Creates a match, the first hand starts on [`GameManager::wake`].
    pub fn new(
        game_id: GameId,
        game_type: String,
        uids: Vec<String>,
        player_ids: Vec<String>,
        settings: RoomSettings,
        now: f64,
    ) -> Result<Self> {
        Self::with_rng(
            game_id,
            game_type,
            uids,
            player_ids,
            settings,
            now,
            StdRng::from_os_rng(),
        )
    }

    /// Creates a match with the given randomness, used by tests for seeded
    /// deals.
    pub fn with_rng(
        game_id: GameId,
        game_type: String,
        uids: Vec<String>,
        player_ids: Vec<String>,
        settings: RoomSettings,
        now: f64,
        rng: StdRng,
    ) -> Result<Self> {
        let seats = settings.chips.len();
        ensure!(
            (MIN_SEATS..=MAX_SEATS).contains(&seats),
            "a match takes {MIN_SEATS} to {MAX_SEATS} seats"
        );
        ensure!(
            uids.len() == seats && player_ids.len() == seats,
            "each seat needs a uid and a player id"
        );
        ensure!(
            settings.chips.iter().filter(|&&c| c > Chips::ZERO).count() >= MIN_SEATS,
            "a match needs at least {MIN_SEATS} funded seats"
        );
        ensure!(
            settings.sb > Chips::ZERO && settings.bb >= settings.sb,
            "invalid blinds {}/{}",
            settings.sb,
            settings.bb
        );

        Ok(Self {
            game_id,
            game_type,
            uids,
            player_ids,
            chips: settings.chips.clone(),
            settings,
            sb_index: 0,
            round_seat: vec![None; seats],
            round_to_game: Vec::new(),
            rankings: Vec::new(),
            round: None,
            action_count: 0,
            deadline: 0.0,
            sleeping: true,
            done: false,
            started_at: now,
            rng,
        })
    }

    /// Starts the next hand and returns the state updates to publish.
    pub fn wake(&mut self, now: f64) -> Result<Vec<Outbound>> {
        if self.done {
            bail!("the match is over");
        }

        self.sleeping = false;
        self.setup_seats()?;

        let active: Vec<Chips> = self.round_to_game.iter().map(|&g| self.chips[g]).collect();
        let round = RoundManager::new(
            &active,
            self.settings.sb,
            self.settings.bb,
            self.settings.base_time,
            self.settings.timebank,
            self.settings.grace,
            &mut self.rng,
        )?;
        self.round = Some(round);
        self.sync_chips();
        self.start_turn(now)?;

        self.broadcast_state(now)
    }

    /// Applies an action for a player.
    ///
    /// With no player the seat on the clock acts, which is how timeouts force
    /// a check or fold. Validation failures produce an `error` message for
    /// the offending player and leave the match untouched.
    pub fn handle_action(
        &mut self,
        player_id: Option<&str>,
        amount: Chips,
        client_action_count: Option<u64>,
        received_at: f64,
        is_timeout: bool,
        now: f64,
    ) -> Result<Vec<Outbound>> {
        let player_id = match player_id {
            Some(id) => id.to_string(),
            None => self.current_player_id()?.to_string(),
        };

        let finished =
            match self.try_step(&player_id, amount, client_action_count, received_at, is_timeout) {
                Ok(finished) => finished,
                Err(err) => {
                    // An invalid action costs the player nothing, report it
                    // and keep waiting.
                    return Ok(vec![self.error_message(&player_id, &err.to_string())]);
                }
            };

        let mut messages = if finished {
            self.finish_round(now)?
        } else {
            self.start_turn(now)?;
            self.broadcast_state(now)?
        };

        if self.done {
            messages.extend(self.end_game(now));
        }

        Ok(messages)
    }

    /// A single player view of the current hand, e.g. for a reconnect.
    pub fn state_for(&self, player_id: &str, now: f64) -> Result<Outbound> {
        let round = self
            .round
            .as_ref()
            .filter(|_| !self.sleeping)
            .ok_or_else(|| anyhow!("no active round"))?;
        let current = round
            .current_player()
            .ok_or_else(|| anyhow!("no seat on the clock"))?;
        let viewer = self
            .player_ids
            .iter()
            .position(|id| id == player_id)
            .ok_or_else(|| anyhow!("player is not part of this match"))?;

        let mut players = Vec::with_capacity(round.seats());
        for (seat, &game_seat) in self.round_to_game.iter().enumerate() {
            let on_clock = seat == current;
            // Clients see the deadline without the latency grace.
            let time_left = (round.deadline() - round.grace() - now).max(0.0);
            let timebank = if on_clock {
                round.timebank(seat).min(time_left)
            } else {
                round.timebank(seat)
            };

            players.push(SeatState {
                player_id: self.player_ids[game_seat].clone(),
                position: positions(round.seats())[seat].to_string(),
                cards: if game_seat == viewer {
                    let [first, second] = round.hole(seat);
                    PlayerCards::Cards(first, second)
                } else {
                    PlayerCards::Covered
                },
                folded: round.folded()[seat],
                chips: self.chips[game_seat],
                bet: round.contributions()[seat],
                timebank: round2(timebank),
                remaining_time: on_clock.then(|| round2((time_left - timebank).max(0.0))),
            });
        }

        Ok(Outbound::StateUpdate {
            game_id: self.game_id.clone(),
            player_id: player_id.to_string(),
            payload: StatePayload {
                stage: round.stage(),
                turn: self.player_ids[self.round_to_game[current]].clone(),
                board: round.board().to_vec(),
                sb: self.settings.sb,
                bb: self.settings.bb,
                min_raise_by: round.min_raise_by(),
                players,
                action_count: self.action_count,
            },
        })
    }

    /// The summary to persist, available once the match is done.
    pub fn summary(&self, now: f64) -> Option<MatchSummary> {
        if !self.done {
            return None;
        }

        let by_player: BTreeMap<&String, &String> =
            self.player_ids.iter().zip(&self.uids).collect();
        let mut rankings = BTreeMap::new();
        let mut rank = 1u32;
        for group in &self.rankings {
            for player_id in group {
                if let Some(&uid) = by_player.get(player_id) {
                    rankings.insert(uid.clone(), rank);
                }
            }
            rank += group.len() as u32;
        }

        Some(MatchSummary {
            game_id: self.game_id.clone(),
            game_type: self.game_type.clone(),
            rankings,
            players: self
                .uids
                .iter()
                .cloned()
                .zip(self.player_ids.iter().cloned())
                .collect(),
            duration: now - self.started_at,
        })
    }

    /// The lobby uids by seat.
    pub fn uids(&self) -> &[String] {
        &self.uids
    }

    /// The in-game player ids by seat.
    pub fn player_ids(&self) -> &[String] {
        &self.player_ids
    }

    /// The match is over.
    pub fn done(&self) -> bool {
        self.done
    }

    /// The match is pausing between hands.
    pub fn sleeping(&self) -> bool {
        self.sleeping
    }

    /// The next deadline, turn clock or between-hands pause.
    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    /// The current action counter.
    pub fn action_count(&self) -> u64 {
        self.action_count
    }

    /// The grace window added to every deadline.
    pub fn grace(&self) -> f64 {
        self.settings.grace
    }

    /// Validates and applies one action, returns whether the hand finished.
    fn try_step(
        &mut self,
        player_id: &str,
        amount: Chips,
        client_action_count: Option<u64>,
        received_at: f64,
        is_timeout: bool,
    ) -> Result<bool> {
        let game_seat = self
            .player_ids
            .iter()
            .position(|id| id == player_id)
            .ok_or_else(|| anyhow!("player is not part of this match"))?;
        let seat = self.round_seat[game_seat]
            .ok_or_else(|| anyhow!("player is not in the active round"))?;

        if let Some(count) = client_action_count
            && count != self.action_count
        {
            bail!("action {count} is stale, the current turn is {}", self.action_count);
        }

        let round = self
            .round
            .as_mut()
            .filter(|r| !r.is_finished())
            .ok_or_else(|| anyhow!("no active round"))?;
        if !is_timeout && received_at > round.deadline() {
            bail!("the turn deadline has passed");
        }

        let step = round.step(seat, amount)?;
        round.use_timebank(seat, received_at);
        self.sync_chips();

        Ok(step.finished)
    }

    /// Settles the finished hand and schedules the next one.
    fn finish_round(&mut self, now: f64) -> Result<Vec<Outbound>> {
        let round = self
            .round
            .as_ref()
            .ok_or_else(|| anyhow!("no active round"))?;
        let payouts = round.distributions()?;
        for (seat, &game_seat) in self.round_to_game.iter().enumerate() {
            self.chips[game_seat] += payouts[seat];
        }

        self.update_rankings();
        let messages = self.round_result(&payouts)?;

        self.sb_index = (self.sb_index + 1) % self.seats();
        if self.chips.iter().filter(|&&c| c > Chips::ZERO).count() > 1 {
            // Pause before the next hand, the timeout detector wakes us.
            self.action_count += 1;
            self.deadline = now + self.settings.round_delay;
            self.sleeping = true;
        } else {
            self.done = true;
        }

        Ok(messages)
    }

    /// Picks the seats for the next hand, rotating the blinds.
    fn setup_seats(&mut self) -> Result<()> {
        let seats = self.seats();
        ensure!(
            self.chips.iter().filter(|&&c| c > Chips::ZERO).count() >= MIN_SEATS,
            "cannot start a hand with fewer than {MIN_SEATS} funded seats"
        );

        while self.chips[self.sb_index] == Chips::ZERO {
            self.sb_index = (self.sb_index + 1) % seats;
        }

        self.round_seat = vec![None; seats];
        self.round_to_game.clear();
        for offset in 0..seats {
            let game_seat = (self.sb_index + offset) % seats;
            if self.chips[game_seat] > Chips::ZERO {
                self.round_seat[game_seat] = Some(self.round_to_game.len());
                self.round_to_game.push(game_seat);
            }
        }

        Ok(())
    }

    /// Starts the clock for the seat on the clock.
    fn start_turn(&mut self, now: f64) -> Result<()> {
        self.action_count += 1;

        let round = self
            .round
            .as_mut()
            .ok_or_else(|| anyhow!("no active round"))?;
        let seat = round
            .current_player()
            .ok_or_else(|| anyhow!("no seat on the clock"))?;
        round.start_turn(seat, now);
        self.deadline = round.deadline();

        Ok(())
    }

    /// Copies the round stacks back to the match seats.
    fn sync_chips(&mut self) {
        if let Some(round) = &self.round {
            let stacks = round.chips();
            for (seat, &game_seat) in self.round_to_game.iter().enumerate() {
                self.chips[game_seat] = stacks[seat];
            }
        }
    }

    /// Inserts the seats that busted this hand at the front of the rankings.
    fn update_rankings(&mut self) {
        let busted: Vec<String> = self
            .player_ids
            .iter()
            .zip(&self.chips)
            .filter(|&(ref id, &chips)| chips == Chips::ZERO && !self.is_ranked(id))
            .map(|(id, _)| id.clone())
            .collect();

        if !busted.is_empty() {
            self.rankings.insert(0, busted);
        }
    }

    fn is_ranked(&self, player_id: &str) -> bool {
        self.rankings.iter().flatten().any(|id| id == player_id)
    }

    /// The final rankings messages, called once when the match completes.
    fn end_game(&mut self, now: f64) -> Vec<Outbound> {
        if let Some(winner) = self.chips.iter().position(|&c| c > Chips::ZERO) {
            let player_id = self.player_ids[winner].clone();
            if !self.is_ranked(&player_id) {
                self.rankings.insert(0, vec![player_id]);
            }
        }

        let rankings: BTreeMap<String, u32> = self
            .summary(now)
            .map(|s| {
                s.players
                    .iter()
                    .filter_map(|(uid, player_id)| {
                        s.rankings.get(uid).map(|&rank| (player_id.clone(), rank))
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.player_ids
            .iter()
            .map(|player_id| Outbound::GameEnd {
                game_id: self.game_id.clone(),
                player_id: player_id.clone(),
                payload: GameEndPayload {
                    rankings: rankings.clone(),
                },
            })
            .collect()
    }

    /// The state updates for every seat in the match.
    fn broadcast_state(&self, now: f64) -> Result<Vec<Outbound>> {
        self.player_ids
            .iter()
            .map(|player_id| self.state_for(player_id, now))
            .collect()
    }

    /// The hand result messages for every seat in the match.
    fn round_result(&self, payouts: &[Chips]) -> Result<Vec<Outbound>> {
        let round = self
            .round
            .as_ref()
            .ok_or_else(|| anyhow!("no active round"))?;
        let folded = round.folded();
        let showdown = folded.iter().filter(|&&f| !f).count() > 1;
        // Hands only exist at showdown, a fold win reveals the winner's
        // cards but there may be no five card hand to classify.
        let hands = showdown.then(|| round.hands());

        let mut players = Vec::with_capacity(round.seats());
        for (seat, &game_seat) in self.round_to_game.iter().enumerate() {
            let revealed = !folded[seat];
            let payout = payouts[seat];
            let bet = round.contributions()[seat];
            players.push(SeatResult {
                player_id: self.player_ids[game_seat].clone(),
                chips: self.chips[game_seat],
                payout,
                bet,
                change: i64::from(payout.amount()) - i64::from(bet.amount()),
                hand: match &hands {
                    Some(hands) if revealed => Some(hands[seat].rank()),
                    _ => None,
                },
                cards: if revealed {
                    let [first, second] = round.hole(seat);
                    PlayerCards::Cards(first, second)
                } else {
                    PlayerCards::Covered
                },
            });
        }

        let payload = RoundResultPayload {
            board: round.board().to_vec(),
            players,
        };

        Ok(self
            .player_ids
            .iter()
            .map(|player_id| Outbound::RoundResult {
                game_id: self.game_id.clone(),
                player_id: player_id.clone(),
                payload: payload.clone(),
            })
            .collect())
    }

    fn error_message(&self, player_id: &str, message: &str) -> Outbound {
        Outbound::Error {
            game_id: self.game_id.clone(),
            player_id: player_id.to_string(),
            payload: ErrorPayload {
                message: message.to_string(),
            },
        }
    }

    /// The player on the clock.
    fn current_player_id(&self) -> Result<&str> {
        let round = self
            .round
            .as_ref()
            .ok_or_else(|| anyhow!("no active round"))?;
        let seat = round
            .current_player()
            .ok_or_else(|| anyhow!("no seat on the clock"))?;
        Ok(&self.player_ids[self.round_to_game[seat]])
    }

    fn seats(&self) -> usize {
        self.player_ids.len()
    }
}

/// Rounds to two decimals for the wire.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
