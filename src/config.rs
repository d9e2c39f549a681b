//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! `[rules]` section carries the locked decision tables as raw maps; they
//! are compiled once at startup by [`Rules::compile`] into typed tables and
//! never change afterwards. Every rules field has a serde default equal to
//! the locked values, so an empty `[rules]` section is valid.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::error::CoreError;
use crate::types::{CautionKey, ConfidenceTier, Ladder, PlayerStatus};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub odds: OddsConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    /// Ladder used when a request carries an invalid one.
    pub default_ladder: u32,
    pub min_legs: usize,
    pub max_legs: usize,
    pub min_wager: Decimal,
    pub max_wager: Decimal,
    /// Roster players per team considered for props.
    pub top_players_per_team: usize,
    pub prop_types: Vec<String>,
    /// Seed for deterministic leg selection. Unset = entropy.
    pub selection_seed: Option<u64>,
    /// Seed for the mock providers.
    pub mock_seed: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "PARLAY-001".to_string(),
            default_ladder: 5,
            min_legs: 2,
            max_legs: 10,
            min_wager: dec!(1),
            max_wager: dec!(10000),
            top_players_per_team: 3,
            prop_types: vec![
                "points".to_string(),
                "rebounds".to_string(),
                "assists".to_string(),
            ],
            selection_seed: None,
            mock_seed: 42,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsConfig {
    /// Price used when no bookmaker quotes a selection.
    pub fallback_american: i32,
    /// Env var holding the odds API key, when a live provider is wired in.
    pub api_key_env: Option<String>,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            fallback_american: -110,
            api_key_env: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

// ---------------------------------------------------------------------------
// Raw rule tables (as written in config.toml)
// ---------------------------------------------------------------------------

/// Confidence never reaches 100.
pub const MAX_SCORE_CEILING: i32 = 95;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BaseScoreEntry {
    pub hits: u32,
    pub games: u32,
    pub score: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CatalogEntry {
    pub severity: u8,
    pub message: String,
}

/// Minutes-analysis constants. Every field is required once the
/// `[rules.minutes]` table is present.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MinutesRules {
    /// A game is low when minutes < season average × this ratio.
    pub low_threshold_ratio: f64,
    /// Max range (minutes) across the stability window.
    pub stability_range: f64,
    /// Games required before stability can be asserted.
    pub stability_games: usize,
    pub trend_hysteresis: f64,
    pub trend_min_games: usize,
    /// Consecutive low games that veto a player.
    pub streak_veto: usize,
    pub max_games: usize,
}

impl MinutesRules {
    /// Games in each half of the trend comparison (recent vs prior).
    pub const TREND_SPAN: usize = 5;

    fn validate(&self) -> std::result::Result<(), CoreError> {
        let fail = |msg: String| Err(CoreError::ConfigurationInvariant(format!("minutes.{msg}")));
        if self.stability_games == 0 {
            return fail("stability_games must be at least 1".to_string());
        }
        if self.streak_veto == 0 {
            return fail("streak_veto must be at least 1".to_string());
        }
        if self.trend_min_games < 2 * Self::TREND_SPAN {
            return fail(format!(
                "trend_min_games = {} is below {}",
                self.trend_min_games,
                2 * Self::TREND_SPAN
            ));
        }
        if !(self.low_threshold_ratio > 0.0 && self.low_threshold_ratio <= 1.0) {
            return fail(format!("low_threshold_ratio = {} outside (0, 1]", self.low_threshold_ratio));
        }
        Ok(())
    }
}

impl Default for MinutesRules {
    fn default() -> Self {
        Self {
            low_threshold_ratio: 0.75,
            stability_range: 8.0,
            stability_games: 5,
            trend_hysteresis: 2.0,
            trend_min_games: 10,
            streak_veto: 3,
            max_games: 15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct OddsRange {
    pub min: i32,
    pub max: i32,
}

/// Rule tables as raw maps. Compiled by [`Rules::compile`].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Ladder ("5", "10", "15") → minimum hits for team-level legs.
    pub ladder_thresholds: BTreeMap<String, u32>,
    /// Window ("l5", "l10", "l15") → whole-percent floor.
    pub prop_floors: BTreeMap<String, u32>,
    pub alt_line_floors: BTreeMap<String, u32>,
    pub odds_range: OddsRange,
    pub base_scores: Vec<BaseScoreEntry>,
    pub positive_modifiers: BTreeMap<String, i32>,
    pub negative_modifiers: BTreeMap<String, i32>,
    pub max_score: i32,
    /// Tier key → lowest score in the tier.
    pub tiers: BTreeMap<String, i32>,
    pub caution_catalog: BTreeMap<String, CatalogEntry>,
    pub minutes: MinutesRules,
    pub status_modifiers: BTreeMap<String, i32>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig::from(&Rules::locked())
    }
}

// ---------------------------------------------------------------------------
// Compiled rule tables
// ---------------------------------------------------------------------------

/// Whole-percent floors for the three windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Floors {
    pub l5: u32,
    pub l10: u32,
    pub l15: u32,
}

impl Floors {
    pub fn get(&self, ladder: Ladder) -> u32 {
        match ladder {
            Ladder::L5 => self.l5,
            Ladder::L10 => self.l10,
            Ladder::L15 => self.l15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositiveModifiers {
    pub alt_line_consistency: i32,
    pub minutes_stable: i32,
    pub role_clarity: i32,
    pub favorable_matchup: i32,
    pub h2h_alignment: i32,
    pub home_advantage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegativeModifiers {
    pub questionable_or_doubtful: i32,
    pub low_minutes_single: i32,
    pub low_minutes_multiple: i32,
    pub role_shift_conflict: i32,
    pub key_teammate_missing: i32,
    pub road_disadvantage: i32,
}

/// Lowest score of each tier; anything below `moonshot` is high risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBounds {
    pub safe: i32,
    pub normal: i32,
    pub moonshot: i32,
}

impl TierBounds {
    pub fn classify(&self, score: i32) -> ConfidenceTier {
        if score >= self.safe {
            ConfidenceTier::Safe
        } else if score >= self.normal {
            ConfidenceTier::Normal
        } else if score >= self.moonshot {
            ConfidenceTier::Moonshot
        } else {
            ConfidenceTier::HighRisk
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusModifiers {
    pub active: i32,
    pub probable: i32,
    pub questionable: i32,
    pub doubtful: i32,
    pub out: i32,
    pub suspended: i32,
    pub unknown: i32,
    pub minutes_unstable: i32,
    pub role_unclear: i32,
    pub streak_veto: i32,
}

impl StatusModifiers {
    pub fn for_status(&self, status: PlayerStatus) -> i32 {
        match status {
            PlayerStatus::Active => self.active,
            PlayerStatus::Probable => self.probable,
            PlayerStatus::Questionable => self.questionable,
            PlayerStatus::Doubtful => self.doubtful,
            PlayerStatus::Out => self.out,
            PlayerStatus::Suspended => self.suspended,
            PlayerStatus::Unknown => self.unknown,
        }
    }
}

/// Locked decision tables, compiled once and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub ladder_thresholds: BTreeMap<Ladder, u32>,
    pub prop_floors: Floors,
    pub alt_line_floors: Floors,
    pub odds_range: OddsRange,
    /// (hits, games) → base score.
    pub base_scores: BTreeMap<(u32, u32), i32>,
    pub positive: PositiveModifiers,
    pub negative: NegativeModifiers,
    pub max_score: i32,
    pub tiers: TierBounds,
    pub caution_catalog: BTreeMap<CautionKey, CatalogEntry>,
    pub minutes: MinutesRules,
    pub status: StatusModifiers,
}

impl Default for Rules {
    fn default() -> Self {
        Rules::locked()
    }
}

fn entry(severity: u8, message: &str) -> CatalogEntry {
    CatalogEntry {
        severity,
        message: message.to_string(),
    }
}

impl Rules {
    /// The production rule tables.
    pub fn locked() -> Self {
        let ladder_thresholds = BTreeMap::from([(Ladder::L5, 3), (Ladder::L10, 7), (Ladder::L15, 10)]);

        let base_scores = BTreeMap::from([
            ((5, 5), 70),
            ((4, 5), 62),
            ((8, 10), 65),
            ((7, 10), 58),
            ((13, 15), 68),
            ((12, 15), 60),
            ((11, 15), 56),
            ((10, 15), 52),
        ]);

        use CautionKey::*;
        let caution_catalog = BTreeMap::from([
            (Questionable, entry(1, "Listed as Questionable")),
            (Doubtful, entry(2, "Listed as Doubtful")),
            (StatusUnknown, entry(1, "Availability status unknown")),
            (GameTimeDecision, entry(1, "Game-time decision")),
            (MinutesDropSingle, entry(1, "Minutes dropped in last game")),
            (MinutesDropMultiple, entry(2, "Minutes volatility detected (2+ games below average)")),
            (LowMinutesRecent, entry(1, "Recent low-minute game")),
            (RoleShiftMinor, entry(1, "Minor role shift detected")),
            (RoleShiftMajor, entry(2, "Significant role change detected")),
            (FacilitatorIncrease, entry(1, "Assist rate trending upward, may cap scoring")),
            (TeammateOut, entry(1, "Key teammate missing")),
            (StarPlayerOut, entry(2, "Star player ruled OUT")),
            (BackToBack, entry(1, "Back-to-back game")),
            (BlowoutRisk, entry(1, "Blowout risk may reduce late-game effort")),
            (PaceDown, entry(1, "Pace-down matchup")),
            (StrongDefender, entry(1, "Elite defender assigned")),
            (LargeSpread, entry(1, "Large spread increases variance")),
            (AltLineVolatility, entry(2, "Alt line volatility")),
            (ThinMargin, entry(1, "Thin margin on historical covers")),
            (ScoringConcentrated, entry(1, "Scoring concentrated in specific quarters")),
            (InconsistentScoring, entry(1, "Inconsistent scoring nights")),
            (RoadGame, entry(1, "Road disadvantage")),
            (PlayerOut, entry(3, "Player ruled OUT")),
            (PlayerSuspended, entry(3, "Player suspended")),
            (LowMinuteStreak, entry(3, "3+ consecutive low-minute games")),
        ]);

        Self {
            ladder_thresholds,
            prop_floors: Floors { l5: 80, l10: 70, l15: 67 },
            alt_line_floors: Floors { l5: 60, l10: 65, l15: 65 },
            odds_range: OddsRange { min: -250, max: 180 },
            base_scores,
            positive: PositiveModifiers {
                alt_line_consistency: 5,
                minutes_stable: 5,
                role_clarity: 4,
                favorable_matchup: 4,
                h2h_alignment: 3,
                home_advantage: 2,
            },
            negative: NegativeModifiers {
                questionable_or_doubtful: -6,
                low_minutes_single: -7,
                low_minutes_multiple: -12,
                role_shift_conflict: -6,
                key_teammate_missing: -5,
                road_disadvantage: -2,
            },
            max_score: MAX_SCORE_CEILING,
            tiers: TierBounds {
                safe: 80,
                normal: 60,
                moonshot: 40,
            },
            caution_catalog,
            minutes: MinutesRules::default(),
            status: StatusModifiers {
                active: 0,
                probable: -2,
                questionable: -6,
                doubtful: -15,
                out: -100,
                suspended: -100,
                unknown: -3,
                minutes_unstable: -5,
                role_unclear: -3,
                streak_veto: -20,
            },
        }
    }

    /// Compile raw tables into typed ones. Any missing key is a
    /// `ConfigurationInvariant` error.
    pub fn compile(raw: &RulesConfig) -> std::result::Result<Self, CoreError> {
        let mut ladder_thresholds = BTreeMap::new();
        for ladder in Ladder::ALL {
            let key = ladder.games().to_string();
            let hits = require(&raw.ladder_thresholds, &key, "ladder_thresholds")?;
            if hits > ladder.games() {
                return Err(CoreError::ConfigurationInvariant(format!(
                    "ladder_thresholds.{key} = {hits} exceeds the window size"
                )));
            }
            ladder_thresholds.insert(*ladder, hits);
        }

        let mut base_scores = BTreeMap::new();
        for e in &raw.base_scores {
            if Ladder::from_games(e.games).is_none() || e.hits > e.games {
                return Err(CoreError::ConfigurationInvariant(format!(
                    "base_scores entry {}/{} is not a valid window",
                    e.hits, e.games
                )));
            }
            if base_scores.insert((e.hits, e.games), e.score).is_some() {
                return Err(CoreError::ConfigurationInvariant(format!(
                    "base_scores entry {}/{} is duplicated",
                    e.hits, e.games
                )));
            }
        }
        if base_scores.is_empty() {
            return Err(CoreError::ConfigurationInvariant(
                "base_scores table is empty".to_string(),
            ));
        }

        let mut caution_catalog = BTreeMap::new();
        for key in CautionKey::ALL {
            let found = raw.caution_catalog.get(key.as_str()).ok_or_else(|| {
                CoreError::ConfigurationInvariant(format!("caution_catalog missing key: {key}"))
            })?;
            if !(1..=3).contains(&found.severity) {
                return Err(CoreError::ConfigurationInvariant(format!(
                    "caution_catalog.{key} severity {} outside 1..=3",
                    found.severity
                )));
            }
            caution_catalog.insert(*key, found.clone());
        }

        if !(0..=MAX_SCORE_CEILING).contains(&raw.max_score) {
            return Err(CoreError::ConfigurationInvariant(format!(
                "max_score = {} outside 0..={MAX_SCORE_CEILING}",
                raw.max_score
            )));
        }
        raw.minutes.validate()?;

        let pos = &raw.positive_modifiers;
        let neg = &raw.negative_modifiers;
        let st = &raw.status_modifiers;
        let tiers = &raw.tiers;

        Ok(Self {
            ladder_thresholds,
            prop_floors: compile_floors(&raw.prop_floors, "prop_floors")?,
            alt_line_floors: compile_floors(&raw.alt_line_floors, "alt_line_floors")?,
            odds_range: raw.odds_range,
            base_scores,
            positive: PositiveModifiers {
                alt_line_consistency: require(pos, "alt_line_consistency", "positive_modifiers")?,
                minutes_stable: require(pos, "minutes_stable", "positive_modifiers")?,
                role_clarity: require(pos, "role_clarity", "positive_modifiers")?,
                favorable_matchup: require(pos, "favorable_matchup", "positive_modifiers")?,
                h2h_alignment: require(pos, "h2h_alignment", "positive_modifiers")?,
                home_advantage: require(pos, "home_advantage", "positive_modifiers")?,
            },
            negative: NegativeModifiers {
                questionable_or_doubtful: require(neg, "questionable_or_doubtful", "negative_modifiers")?,
                low_minutes_single: require(neg, "low_minutes_single", "negative_modifiers")?,
                low_minutes_multiple: require(neg, "low_minutes_multiple", "negative_modifiers")?,
                role_shift_conflict: require(neg, "role_shift_conflict", "negative_modifiers")?,
                key_teammate_missing: require(neg, "key_teammate_missing", "negative_modifiers")?,
                road_disadvantage: require(neg, "road_disadvantage", "negative_modifiers")?,
            },
            max_score: raw.max_score,
            tiers: TierBounds {
                safe: require(tiers, ConfidenceTier::Safe.key(), "tiers")?,
                normal: require(tiers, ConfidenceTier::Normal.key(), "tiers")?,
                moonshot: require(tiers, ConfidenceTier::Moonshot.key(), "tiers")?,
            },
            caution_catalog,
            minutes: raw.minutes,
            status: StatusModifiers {
                active: require(st, "active", "status_modifiers")?,
                probable: require(st, "probable", "status_modifiers")?,
                questionable: require(st, "questionable", "status_modifiers")?,
                doubtful: require(st, "doubtful", "status_modifiers")?,
                out: require(st, "out", "status_modifiers")?,
                suspended: require(st, "suspended", "status_modifiers")?,
                unknown: require(st, "unknown", "status_modifiers")?,
                minutes_unstable: require(st, "minutes_unstable", "status_modifiers")?,
                role_unclear: require(st, "role_unclear", "status_modifiers")?,
                streak_veto: require(st, "streak_veto", "status_modifiers")?,
            },
        })
    }

    /// Catalog entry for a key. Compile guarantees every key is present.
    pub fn caution(&self, key: CautionKey) -> Option<&CatalogEntry> {
        self.caution_catalog.get(&key)
    }
}

fn require<V: Copy>(
    map: &BTreeMap<String, V>,
    key: &str,
    table: &str,
) -> std::result::Result<V, CoreError> {
    map.get(key)
        .copied()
        .ok_or_else(|| CoreError::ConfigurationInvariant(format!("{table} missing key: {key}")))
}

fn compile_floors(
    map: &BTreeMap<String, u32>,
    table: &str,
) -> std::result::Result<Floors, CoreError> {
    Ok(Floors {
        l5: require(map, "l5", table)?,
        l10: require(map, "l10", table)?,
        l15: require(map, "l15", table)?,
    })
}

fn floors_map(floors: Floors) -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("l5".to_string(), floors.l5),
        ("l10".to_string(), floors.l10),
        ("l15".to_string(), floors.l15),
    ])
}

impl From<&Rules> for RulesConfig {
    fn from(rules: &Rules) -> Self {
        let p = rules.positive;
        let n = rules.negative;
        let s = rules.status;
        let named = |pairs: &[(&str, i32)]| -> BTreeMap<String, i32> {
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        };

        Self {
            ladder_thresholds: rules
                .ladder_thresholds
                .iter()
                .map(|(ladder, hits)| (ladder.games().to_string(), *hits))
                .collect(),
            prop_floors: floors_map(rules.prop_floors),
            alt_line_floors: floors_map(rules.alt_line_floors),
            odds_range: rules.odds_range,
            base_scores: rules
                .base_scores
                .iter()
                .map(|(&(hits, games), &score)| BaseScoreEntry { hits, games, score })
                .collect(),
            positive_modifiers: named(&[
                ("alt_line_consistency", p.alt_line_consistency),
                ("minutes_stable", p.minutes_stable),
                ("role_clarity", p.role_clarity),
                ("favorable_matchup", p.favorable_matchup),
                ("h2h_alignment", p.h2h_alignment),
                ("home_advantage", p.home_advantage),
            ]),
            negative_modifiers: named(&[
                ("questionable_or_doubtful", n.questionable_or_doubtful),
                ("low_minutes_single", n.low_minutes_single),
                ("low_minutes_multiple", n.low_minutes_multiple),
                ("role_shift_conflict", n.role_shift_conflict),
                ("key_teammate_missing", n.key_teammate_missing),
                ("road_disadvantage", n.road_disadvantage),
            ]),
            max_score: rules.max_score,
            tiers: named(&[
                (ConfidenceTier::Safe.key(), rules.tiers.safe),
                (ConfidenceTier::Normal.key(), rules.tiers.normal),
                (ConfidenceTier::Moonshot.key(), rules.tiers.moonshot),
            ]),
            caution_catalog: rules
                .caution_catalog
                .iter()
                .map(|(key, e)| (key.as_str().to_string(), e.clone()))
                .collect(),
            minutes: rules.minutes,
            status_modifiers: named(&[
                ("active", s.active),
                ("probable", s.probable),
                ("questionable", s.questionable),
                ("doubtful", s.doubtful),
                ("out", s.out),
                ("suspended", s.suspended),
                ("unknown", s.unknown),
                ("minutes_unstable", s.minutes_unstable),
                ("role_unclear", s.role_unclear),
                ("streak_veto", s.streak_veto),
            ]),
        }
    }
}
