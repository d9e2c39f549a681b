//! Slate assembly.
//!
//! Fetches everything the composition engine needs for today's games:
//! team histories, head-to-head, rosters, player logs and odds. Fetches
//! run concurrently per game, per team and per player. A game whose team
//! histories cannot be fetched is dropped from the slate; missing odds,
//! head-to-head or player logs degrade to empty data.

use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::data::{GameSlateProvider, OddsProvider};
use crate::error::Result;
use crate::types::{Game, GameOdds, GameSample, PlayerInfo, PlayerSample};

/// Games of history fetched per team and per player (the L15 window).
pub const HISTORY_GAMES: usize = 15;

pub struct SlateAssembler {
    slate: Arc<dyn GameSlateProvider>,
    odds: Arc<dyn OddsProvider>,
    history_games: usize,
}

impl SlateAssembler {
    pub fn new(slate: Arc<dyn GameSlateProvider>, odds: Arc<dyn OddsProvider>) -> Self {
        Self {
            slate,
            odds,
            history_games: HISTORY_GAMES,
        }
    }

    /// Assemble every game on today's slate. Only the schedule fetch is
    /// fatal.
    pub async fn assemble(&self) -> Result<Vec<GameSample>> {
        let games = self.slate.games_today().await?;
        info!(games = games.len(), "Assembling slate");

        let results = join_all(games.into_iter().map(|g| self.assemble_game(g))).await;

        let mut samples = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!(error = %e, "Game dropped from slate"),
            }
        }

        info!(
            games = samples.len(),
            players = samples
                .iter()
                .map(|s| s.home_players.len() + s.away_players.len())
                .sum::<usize>(),
            "Slate assembled"
        );
        Ok(samples)
    }

    pub async fn assemble_game(&self, game: Game) -> anyhow::Result<GameSample> {
        let n = self.history_games;
        let (home_history, away_history, head_to_head, odds, home_roster, away_roster) = tokio::join!(
            self.slate.team_recent_games(&game.home.id, n),
            self.slate.team_recent_games(&game.away.id, n),
            self.slate.head_to_head(&game.home.id, &game.away.id),
            self.odds.game_odds(&game.id),
            self.slate.players_by_team(&game.home.id),
            self.slate.players_by_team(&game.away.id),
        );

        let home_history = home_history.with_context(|| format!("History for {}", game.home.name))?;
        let away_history = away_history.with_context(|| format!("History for {}", game.away.name))?;

        let head_to_head = head_to_head.unwrap_or_else(|e| {
            warn!(game_id = %game.id, error = %e, "Head-to-head fetch failed, continuing without");
            Vec::new()
        });
        let odds = odds.unwrap_or_else(|e| {
            warn!(game_id = %game.id, error = %e, "Odds fetch failed, using fallback prices");
            GameOdds {
                game_id: game.id.clone(),
                quotes: Vec::new(),
            }
        });
        let home_roster = home_roster.unwrap_or_else(|e| {
            warn!(team = %game.home.name, error = %e, "Roster fetch failed");
            Vec::new()
        });
        let away_roster = away_roster.unwrap_or_else(|e| {
            warn!(team = %game.away.name, error = %e, "Roster fetch failed");
            Vec::new()
        });

        let (home_players, away_players) =
            tokio::join!(self.player_samples(home_roster), self.player_samples(away_roster));

        debug!(
            game_id = %game.id,
            home_games = home_history.len(),
            away_games = away_history.len(),
            h2h = head_to_head.len(),
            quotes = odds.quotes.len(),
            "Game assembled"
        );

        Ok(GameSample {
            game,
            home_history,
            away_history,
            head_to_head,
            home_players,
            away_players,
            odds,
        })
    }

    async fn player_samples(&self, roster: Vec<PlayerInfo>) -> Vec<PlayerSample> {
        let logs = join_all(
            roster
                .iter()
                .map(|p| self.slate.player_recent_stats(&p.id, self.history_games)),
        )
        .await;

        roster
            .into_iter()
            .zip(logs)
            .filter_map(|(info, logs)| match logs {
                Ok(logs) => Some(PlayerSample { info, logs }),
                Err(e) => {
                    debug!(player = %info.name, error = %e, "Player logs unavailable, skipped");
                    None
                }
            })
            .collect()
    }
}
