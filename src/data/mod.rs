//! Data providers.
//!
//! Defines the async seams the service layer fetches through. The core
//! engines never see these traits; they consume the assembled
//! `GameSample`s instead.

pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Game, GameOdds, GameResult, PlayerGameLog, PlayerInfo};

/// Schedule, results and box-score source.
///
/// Every history call returns completed games only, most recent first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameSlateProvider: Send + Sync {
    /// Games scheduled for today.
    async fn games_today(&self) -> Result<Vec<Game>>;

    /// Last `limit` completed games from the team's perspective.
    async fn team_recent_games(&self, team_id: &str, limit: usize) -> Result<Vec<GameResult>>;

    /// Last `limit` box-score lines for a player.
    async fn player_recent_stats(&self, player_id: &str, limit: usize) -> Result<Vec<PlayerGameLog>>;

    /// Current roster with injury-report fields.
    async fn players_by_team(&self, team_id: &str) -> Result<Vec<PlayerInfo>>;

    /// Meetings between the two teams, from `team_a`'s perspective.
    async fn head_to_head(&self, team_a: &str, team_b: &str) -> Result<Vec<GameResult>>;
}

/// Bookmaker price source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// All quotes for a game. An empty set is valid; lookups then fall
    /// back to the configured default price.
    async fn game_odds(&self, game_id: &str) -> Result<GameOdds>;
}
