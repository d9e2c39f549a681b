//! Provider fixtures for integration testing.
//!
//! Wraps the seeded providers with failure injection so degraded-feed
//! paths can be driven from test code.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use parlay_engine::config::AppConfig;
use parlay_engine::data::mock::{SeededOddsProvider, SeededSlateProvider};
use parlay_engine::data::{GameSlateProvider, OddsProvider};
use parlay_engine::engine::ParlayService;
use parlay_engine::types::*;

pub const SEED: u64 = 42;

pub fn slate_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

pub fn seeded_slate() -> SeededSlateProvider {
    SeededSlateProvider::with_date(SEED, slate_date())
}

/// Seeded slate whose team-history calls fail for the listed teams.
pub struct FlakySlate {
    inner: SeededSlateProvider,
    failing_teams: HashSet<String>,
}

impl FlakySlate {
    pub fn new(inner: SeededSlateProvider, failing_teams: &[&str]) -> Self {
        Self {
            inner,
            failing_teams: failing_teams.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl GameSlateProvider for FlakySlate {
    async fn games_today(&self) -> Result<Vec<Game>> {
        self.inner.games_today().await
    }

    async fn team_recent_games(&self, team_id: &str, limit: usize) -> Result<Vec<GameResult>> {
        if self.failing_teams.contains(team_id) {
            return Err(anyhow!("history feed timed out for team {team_id}"));
        }
        self.inner.team_recent_games(team_id, limit).await
    }

    async fn player_recent_stats(&self, player_id: &str, limit: usize) -> Result<Vec<PlayerGameLog>> {
        self.inner.player_recent_stats(player_id, limit).await
    }

    async fn players_by_team(&self, team_id: &str) -> Result<Vec<PlayerInfo>> {
        self.inner.players_by_team(team_id).await
    }

    async fn head_to_head(&self, team_a: &str, team_b: &str) -> Result<Vec<GameResult>> {
        self.inner.head_to_head(team_a, team_b).await
    }
}

/// Odds feed that is always down.
pub struct DownOdds;

#[async_trait]
impl OddsProvider for DownOdds {
    async fn game_odds(&self, game_id: &str) -> Result<GameOdds> {
        Err(anyhow!("odds feed unavailable for {game_id}"))
    }
}

pub fn config_with_seed(seed: Option<u64>) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.bot.selection_seed = seed;
    cfg
}

/// Service over an arbitrary slate provider with seeded odds.
pub fn service_over(slate: Arc<dyn GameSlateProvider>, games: Vec<Game>, seed: Option<u64>) -> ParlayService {
    let odds = Arc::new(SeededOddsProvider::new(SEED, games));
    ParlayService::from_config(&config_with_seed(seed), slate, odds).unwrap()
}

pub fn seeded_service(seed: Option<u64>) -> ParlayService {
    let slate = seeded_slate();
    let games = slate.games().to_vec();
    service_over(Arc::new(slate), games, seed)
}

pub fn request(legs: usize, wager: rust_decimal::Decimal, ladder: u32) -> ParlayRequest {
    ParlayRequest {
        legs,
        wager,
        ladder,
        min_confidence: None,
        requester: Requester {
            user_id: Some("user-1".into()),
            guild_id: Some("guild-1".into()),
            channel_id: None,
        },
    }
}
