//! Deterministic mock providers.
//!
//! Three fixed games with seeded, randomised histories. Each entity draws
//! from its own RNG stream keyed by id, so results do not depend on call
//! order and two providers with the same seed agree exactly.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{GameSlateProvider, OddsProvider};
use crate::types::{
    Game, GameOdds, GameResult, OddsMarket, OddsQuote, PlayerGameLog, PlayerInfo, PlayerRole, TeamRef,
};

const SLATE: &[(&str, &str, &str, &str, &str, &str)] = &[
    ("12345", "19:00", "1", "Los Angeles Lakers", "2", "Phoenix Suns"),
    ("12346", "20:30", "3", "Milwaukee Bucks", "4", "Miami Heat"),
    ("12347", "21:00", "5", "Boston Celtics", "6", "New York Knicks"),
];

/// (name, season minutes, role)
const ROSTER: &[(&str, f64, PlayerRole)] = &[
    ("Star Player", 35.0, PlayerRole::Starter),
    ("Point Guard", 31.0, PlayerRole::Starter),
    ("Power Forward", 27.0, PlayerRole::Rotation),
];

fn team(id: &str, name: &str) -> TeamRef {
    TeamRef {
        id: id.to_string(),
        name: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Slate
// ---------------------------------------------------------------------------

pub struct SeededSlateProvider {
    seed: u64,
    today: NaiveDate,
    games: Vec<Game>,
    players: HashMap<String, PlayerInfo>,
}

impl SeededSlateProvider {
    pub fn new(seed: u64) -> Self {
        Self::with_date(seed, Utc::now().date_naive())
    }

    /// Pin "today" so histories and back-to-back checks are reproducible.
    pub fn with_date(seed: u64, today: NaiveDate) -> Self {
        let date = today.format("%Y-%m-%d").to_string();
        let games: Vec<Game> = SLATE
            .iter()
            .map(|(id, time, home_id, home, away_id, away)| Game {
                id: id.to_string(),
                home: team(home_id, home),
                away: team(away_id, away),
                date: Some(date.clone()),
                time: Some(time.to_string()),
            })
            .collect();

        let mut players = HashMap::new();
        for game in &games {
            for side in [&game.home, &game.away] {
                for (i, (name, minutes, role)) in ROSTER.iter().enumerate() {
                    let id = format!("{}{:02}", side.id, i + 1);
                    players.insert(
                        id.clone(),
                        PlayerInfo {
                            id,
                            name: format!("{} {name}", short_name(&side.name)),
                            team_id: side.id.clone(),
                            injury_status: None,
                            injury_note: None,
                            is_game_time_decision: false,
                            season_average_minutes: *minutes,
                            role: *role,
                        },
                    );
                }
            }
        }

        Self {
            seed,
            today,
            games,
            players,
        }
    }

    /// Mark a player on the injury report.
    pub fn set_injury(&mut self, player_id: &str, status: &str) -> Result<()> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| anyhow!("Unknown mock player {player_id}"))?;
        player.injury_status = Some(status.to_string());
        Ok(())
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    fn stream(&self, key: &str) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ stream_salt(key))
    }

    fn date_before(&self, days: i64) -> String {
        (self.today - Duration::days(days)).format("%Y-%m-%d").to_string()
    }
}

/// FNV-1a over the key.
fn stream_salt(key: &str) -> u64 {
    key.bytes()
        .fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

fn short_name(team: &str) -> &str {
    team.rsplit(' ').next().unwrap_or(team)
}

#[async_trait]
impl GameSlateProvider for SeededSlateProvider {
    async fn games_today(&self) -> Result<Vec<Game>> {
        Ok(self.games.clone())
    }

    async fn team_recent_games(&self, team_id: &str, limit: usize) -> Result<Vec<GameResult>> {
        let mut rng = self.stream(&format!("team:{team_id}"));
        // every other day, so the slate starts rested
        Ok((0..limit)
            .map(|i| GameResult {
                game_id: format!("{team_id}-{}", 10000 + i),
                date: self.date_before(2 * (i as i64 + 1)),
                team_score: rng.gen_range(95..=125),
                opponent_score: rng.gen_range(95..=125),
                is_home: i % 2 == 0,
            })
            .collect())
    }

    async fn player_recent_stats(&self, player_id: &str, limit: usize) -> Result<Vec<PlayerGameLog>> {
        let info = self
            .players
            .get(player_id)
            .ok_or_else(|| anyhow!("Unknown mock player {player_id}"))?;
        let mut rng = self.stream(&format!("player:{player_id}"));
        let minutes = info.season_average_minutes;

        Ok((0..limit)
            .map(|i| PlayerGameLog {
                game_id: format!("{}-{}", info.team_id, 10000 + i),
                date: self.date_before(2 * (i as i64 + 1)),
                minutes: minutes + rng.gen_range(-3.0..=3.0),
                points: rng.gen_range(15..=35) as f64,
                rebounds: rng.gen_range(3..=12) as f64,
                assists: rng.gen_range(2..=10) as f64,
                threes: rng.gen_range(0..=5) as f64,
                steals: rng.gen_range(0..=3) as f64,
                blocks: rng.gen_range(0..=3) as f64,
                usage_rate: Some(rng.gen_range(18.0..=30.0)),
            })
            .collect())
    }

    async fn players_by_team(&self, team_id: &str) -> Result<Vec<PlayerInfo>> {
        let mut roster: Vec<PlayerInfo> = self
            .players
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        roster.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roster)
    }

    async fn head_to_head(&self, team_a: &str, team_b: &str) -> Result<Vec<GameResult>> {
        let mut rng = self.stream(&format!("h2h:{team_a}:{team_b}"));
        Ok((0..5)
            .map(|i| GameResult {
                game_id: format!("h2h-{team_a}-{team_b}-{i}"),
                date: self.date_before(40 * (i as i64 + 1)),
                team_score: rng.gen_range(95..=125),
                opponent_score: rng.gen_range(95..=125),
                is_home: i % 2 == 0,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// Moneyline quotes from two mock books. Other markets have no quotes and
/// fall back to the default price.
pub struct SeededOddsProvider {
    seed: u64,
    games: Vec<Game>,
}

impl SeededOddsProvider {
    pub fn new(seed: u64, games: Vec<Game>) -> Self {
        Self { seed, games }
    }
}

#[async_trait]
impl OddsProvider for SeededOddsProvider {
    async fn game_odds(&self, game_id: &str) -> Result<GameOdds> {
        let Some(game) = self.games.iter().find(|g| g.id == game_id) else {
            debug!(game_id, "No mock odds for game");
            return Ok(GameOdds {
                game_id: game_id.to_string(),
                quotes: Vec::new(),
            });
        };

        let mut rng = StdRng::seed_from_u64(self.seed ^ stream_salt(&format!("odds:{game_id}")));
        let favourite: i32 = -rng.gen_range(110..=240);
        let underdog: i32 = rng.gen_range(100..=200);
        let mut quotes = Vec::new();
        for book in ["mockbook", "altbook"] {
            let shade = rng.gen_range(0..=10);
            quotes.push(OddsQuote {
                market: OddsMarket::Moneyline,
                selection: game.home.name.clone(),
                line: None,
                american: favourite + shade,
                bookmaker: book.to_string(),
            });
            quotes.push(OddsQuote {
                market: OddsMarket::Moneyline,
                selection: game.away.name.clone(),
                line: None,
                american: underdog + shade,
                bookmaker: book.to_string(),
            });
        }

        Ok(GameOdds {
            game_id: game_id.to_string(),
            quotes,
        })
    }
}
