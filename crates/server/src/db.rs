// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Database types for persisting match history.
use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::{collections::BTreeMap, path::Path, sync::Arc};

use splitpot_core::poker::GameId;

use crate::game::MatchSummary;

/// Database for persisting finished matches.
#[derive(Debug, Clone)]
pub struct Db {
    db: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open a database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open an in memory database, used when no path is configured.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // Create tables
        conn.execute(
            "CREATE TABLE IF NOT EXISTS matches (
               id TEXT PRIMARY KEY,
               game_type TEXT NOT NULL,
               duration REAL NOT NULL,
               created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS match_rankings (
               match_id TEXT NOT NULL,
               uid TEXT NOT NULL,
               player_id TEXT NOT NULL,
               rank INTEGER NOT NULL,
               PRIMARY KEY (match_id, uid)
            )",
            (),
        )?;

        Ok(Db {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Saves a finished match.
    pub async fn save_summary(&self, summary: MatchSummary) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut db = db.lock();

            let tx = db.transaction()?;

            tx.execute(
                "INSERT OR REPLACE INTO matches (id, game_type, duration)
                 VALUES (?1, ?2, ?3)",
                params![
                    summary.game_id.as_str(),
                    summary.game_type,
                    summary.duration
                ],
            )?;

            for (uid, rank) in &summary.rankings {
                let player_id = summary.players.get(uid).cloned().unwrap_or_default();
                tx.execute(
                    "INSERT OR REPLACE INTO match_rankings (match_id, uid, player_id, rank)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![summary.game_id.as_str(), uid, player_id, rank],
                )?;
            }

            tx.commit()?;

            Ok(())
        })
        .await?
    }

    /// The saved rankings for a match, by lobby uid.
    pub async fn rankings(&self, game_id: &GameId) -> Result<BTreeMap<String, u32>> {
        let db = self.db.clone();
        let game_id = game_id.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock();

            let mut stmt = db.prepare(
                "SELECT uid, rank
                 FROM match_rankings
                 WHERE match_id = ?1",
            )?;

            let rows = stmt.query_map(params![game_id.as_str()], |row| {
                Ok((row.get::<usize, String>(0)?, row.get::<usize, u32>(1)?))
            })?;

            let mut rankings = BTreeMap::new();
            for row in rows {
                let (uid, rank) = row?;
                rankings.insert(uid, rank);
            }

            Ok(rankings)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_loads_a_summary() {
        let db = Db::open_in_memory().unwrap();

        let summary = MatchSummary {
            game_id: GameId::new("m1"),
            game_type: "sitngo".to_string(),
            rankings: BTreeMap::from([("u0".to_string(), 2), ("u1".to_string(), 1)]),
            players: BTreeMap::from([
                ("u0".to_string(), "p0".to_string()),
                ("u1".to_string(), "p1".to_string()),
            ]),
            duration: 42.5,
        };
        db.save_summary(summary).await.unwrap();

        let rankings = db.rankings(&GameId::new("m1")).await.unwrap();
        assert_eq!(rankings.get("u0"), Some(&2));
        assert_eq!(rankings.get("u1"), Some(&1));

        let rankings = db.rankings(&GameId::new("unknown")).await.unwrap();
        assert!(rankings.is_empty());
    }
}
