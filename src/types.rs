//! Shared types for the parlay engine.
//!
//! These types form the data model used across all modules. Values with
//! derived fields (odds, hit-rate windows) are built through a single
//! factory so the derivation happens exactly once; presentation code reads
//! them and never recomputes.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};

/// Hit rate as a percentage rounded to one decimal place.
/// A window with no games is 0.0, never a division by zero.
pub fn percentage(hits: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    round1(hits as f64 / games as f64 * 100.0)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// Historical sample window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Ladder {
    L5,
    L10,
    L15,
}

impl Ladder {
    pub const ALL: &'static [Ladder] = &[Ladder::L5, Ladder::L10, Ladder::L15];

    pub fn games(self) -> u32 {
        match self {
            Ladder::L5 => 5,
            Ladder::L10 => 10,
            Ladder::L15 => 15,
        }
    }

    pub fn from_games(games: u32) -> Option<Self> {
        match games {
            5 => Some(Ladder::L5),
            10 => Some(Ladder::L10),
            15 => Some(Ladder::L15),
            _ => None,
        }
    }
}

impl From<Ladder> for u32 {
    fn from(ladder: Ladder) -> u32 {
        ladder.games()
    }
}

impl TryFrom<u32> for Ladder {
    type Error = CoreError;

    fn try_from(games: u32) -> Result<Self> {
        Ladder::from_games(games).ok_or_else(|| {
            CoreError::Validation(format!("Invalid ladder: {games}. Must be 5, 10, or 15."))
        })
    }
}

impl fmt::Display for Ladder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.games())
    }
}

// ---------------------------------------------------------------------------
// Hit-rate window
// ---------------------------------------------------------------------------

/// Hits and games over the last 5, 10 and 15 samples.
///
/// Invariant: `hits_lN <= games_lN <= N`. Enforced by the constructors;
/// fields are private so nothing downstream can break it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HitRateWindow {
    hits_l5: u32,
    games_l5: u32,
    hits_l10: u32,
    games_l10: u32,
    hits_l15: u32,
    games_l15: u32,
}

impl HitRateWindow {
    pub fn new(
        hits_l5: u32,
        games_l5: u32,
        hits_l10: u32,
        games_l10: u32,
        hits_l15: u32,
        games_l15: u32,
    ) -> Result<Self> {
        for (ladder, hits, games) in [
            (Ladder::L5, hits_l5, games_l5),
            (Ladder::L10, hits_l10, games_l10),
            (Ladder::L15, hits_l15, games_l15),
        ] {
            if hits > games {
                return Err(CoreError::Validation(format!(
                    "{ladder} hits ({hits}) exceed games ({games})"
                )));
            }
            if games > ladder.games() {
                return Err(CoreError::Validation(format!(
                    "{ladder} games ({games}) exceed window size {}",
                    ladder.games()
                )));
            }
        }
        Ok(Self {
            hits_l5,
            games_l5,
            hits_l10,
            games_l10,
            hits_l15,
            games_l15,
        })
    }

    /// Build from a most-recent-first series of outcomes (true = hit).
    /// Anything past the 15th sample is ignored.
    pub fn from_outcomes(outcomes: &[bool]) -> Self {
        let count = |n: usize| {
            let window = &outcomes[..outcomes.len().min(n)];
            (
                window.iter().filter(|hit| **hit).count() as u32,
                window.len() as u32,
            )
        };
        let (hits_l5, games_l5) = count(5);
        let (hits_l10, games_l10) = count(10);
        let (hits_l15, games_l15) = count(15);
        Self {
            hits_l5,
            games_l5,
            hits_l10,
            games_l10,
            hits_l15,
            games_l15,
        }
    }

    pub fn hits(&self, ladder: Ladder) -> u32 {
        match ladder {
            Ladder::L5 => self.hits_l5,
            Ladder::L10 => self.hits_l10,
            Ladder::L15 => self.hits_l15,
        }
    }

    pub fn games(&self, ladder: Ladder) -> u32 {
        match ladder {
            Ladder::L5 => self.games_l5,
            Ladder::L10 => self.games_l10,
            Ladder::L15 => self.games_l15,
        }
    }

    /// Percentage for one window, rounded to one decimal.
    pub fn percentage(&self, ladder: Ladder) -> f64 {
        percentage(self.hits(ladder), self.games(ladder))
    }

    /// Whether the window holds a full sample (games == N).
    pub fn is_full(&self, ladder: Ladder) -> bool {
        self.games(ladder) == ladder.games()
    }
}

impl fmt::Display for HitRateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L5 {}/{} | L10 {}/{} | L15 {}/{}",
            self.hits_l5, self.games_l5, self.hits_l10, self.games_l10, self.hits_l15, self.games_l15,
        )
    }
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Per-window pass flags. `None` means the window was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowChecks {
    pub l5: Option<bool>,
    pub l10: Option<bool>,
    pub l15: Option<bool>,
}

impl WindowChecks {
    pub fn set(&mut self, ladder: Ladder, passed: bool) {
        match ladder {
            Ladder::L5 => self.l5 = Some(passed),
            Ladder::L10 => self.l10 = Some(passed),
            Ladder::L15 => self.l15 = Some(passed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub rejection_reason: Option<String>,
    pub windows: WindowChecks,
}

impl EligibilityResult {
    pub fn eligible(windows: WindowChecks) -> Self {
        Self {
            is_eligible: true,
            rejection_reason: None,
            windows,
        }
    }

    pub fn rejected(reason: impl Into<String>, windows: WindowChecks) -> Self {
        Self {
            is_eligible: false,
            rejection_reason: Some(reason.into()),
            windows,
        }
    }

    /// Apply an outright veto. An already-rejected result keeps its
    /// original reason.
    pub fn veto(self, reason: impl Into<String>) -> Self {
        if !self.is_eligible {
            return self;
        }
        Self::rejected(reason, self.windows)
    }

    /// ✅ / ❌ marker for display.
    pub fn status_emoji(&self) -> &'static str {
        if self.is_eligible {
            "✅"
        } else {
            "❌"
        }
    }
}

// ---------------------------------------------------------------------------
// Caution
// ---------------------------------------------------------------------------

/// Keys of the caution trigger catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CautionKey {
    Questionable,
    Doubtful,
    StatusUnknown,
    GameTimeDecision,
    MinutesDropSingle,
    MinutesDropMultiple,
    LowMinutesRecent,
    RoleShiftMinor,
    RoleShiftMajor,
    FacilitatorIncrease,
    TeammateOut,
    StarPlayerOut,
    BackToBack,
    BlowoutRisk,
    PaceDown,
    StrongDefender,
    LargeSpread,
    AltLineVolatility,
    ThinMargin,
    ScoringConcentrated,
    InconsistentScoring,
    RoadGame,
    PlayerOut,
    PlayerSuspended,
    LowMinuteStreak,
}

impl CautionKey {
    pub const ALL: &'static [CautionKey] = &[
        CautionKey::Questionable,
        CautionKey::Doubtful,
        CautionKey::StatusUnknown,
        CautionKey::GameTimeDecision,
        CautionKey::MinutesDropSingle,
        CautionKey::MinutesDropMultiple,
        CautionKey::LowMinutesRecent,
        CautionKey::RoleShiftMinor,
        CautionKey::RoleShiftMajor,
        CautionKey::FacilitatorIncrease,
        CautionKey::TeammateOut,
        CautionKey::StarPlayerOut,
        CautionKey::BackToBack,
        CautionKey::BlowoutRisk,
        CautionKey::PaceDown,
        CautionKey::StrongDefender,
        CautionKey::LargeSpread,
        CautionKey::AltLineVolatility,
        CautionKey::ThinMargin,
        CautionKey::ScoringConcentrated,
        CautionKey::InconsistentScoring,
        CautionKey::RoadGame,
        CautionKey::PlayerOut,
        CautionKey::PlayerSuspended,
        CautionKey::LowMinuteStreak,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CautionKey::Questionable => "questionable",
            CautionKey::Doubtful => "doubtful",
            CautionKey::StatusUnknown => "status_unknown",
            CautionKey::GameTimeDecision => "game_time_decision",
            CautionKey::MinutesDropSingle => "minutes_drop_single",
            CautionKey::MinutesDropMultiple => "minutes_drop_multiple",
            CautionKey::LowMinutesRecent => "low_minutes_recent",
            CautionKey::RoleShiftMinor => "role_shift_minor",
            CautionKey::RoleShiftMajor => "role_shift_major",
            CautionKey::FacilitatorIncrease => "facilitator_increase",
            CautionKey::TeammateOut => "teammate_out",
            CautionKey::StarPlayerOut => "star_player_out",
            CautionKey::BackToBack => "back_to_back",
            CautionKey::BlowoutRisk => "blowout_risk",
            CautionKey::PaceDown => "pace_down",
            CautionKey::StrongDefender => "strong_defender",
            CautionKey::LargeSpread => "large_spread",
            CautionKey::AltLineVolatility => "alt_line_volatility",
            CautionKey::ThinMargin => "thin_margin",
            CautionKey::ScoringConcentrated => "scoring_concentrated",
            CautionKey::InconsistentScoring => "inconsistent_scoring",
            CautionKey::RoadGame => "road_game",
            CautionKey::PlayerOut => "player_out",
            CautionKey::PlayerSuspended => "player_suspended",
            CautionKey::LowMinuteStreak => "low_minute_streak",
        }
    }
}

impl fmt::Display for CautionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate caution severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CautionLevel {
    None,
    Mild,
    High,
    Excluded,
}

impl CautionLevel {
    pub fn icon(self) -> &'static str {
        match self {
            CautionLevel::None => "",
            CautionLevel::Mild => "⚠️",
            CautionLevel::High => "⚠️⚠️",
            CautionLevel::Excluded => "❌",
        }
    }
}

impl fmt::Display for CautionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CautionLevel::None => write!(f, "NONE"),
            CautionLevel::Mild => write!(f, "MILD"),
            CautionLevel::High => write!(f, "HIGH"),
            CautionLevel::Excluded => write!(f, "EXCLUDED"),
        }
    }
}

/// One fired catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CautionTrigger {
    pub key: CautionKey,
    /// 1 = mild, 2 = high, 3 = exclude
    pub severity: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CautionResult {
    pub level: CautionLevel,
    pub icon: &'static str,
    pub triggers: Vec<CautionTrigger>,
    pub messages: Vec<String>,
    pub should_exclude: bool,
    pub total_severity: u32,
}

impl CautionResult {
    pub fn none() -> Self {
        Self {
            level: CautionLevel::None,
            icon: CautionLevel::None.icon(),
            triggers: Vec::new(),
            messages: Vec::new(),
            should_exclude: false,
            total_severity: 0,
        }
    }

    pub fn has_cautions(&self) -> bool {
        self.level != CautionLevel::None
    }
}

impl fmt::Display for CautionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_cautions() {
            return write!(f, "No cautions");
        }
        let short: Vec<&str> = self.messages.iter().take(3).map(String::as_str).collect();
        write!(f, "{} {}", self.icon, short.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Display tier for a confidence score. Never feeds back into scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Safe,
    Normal,
    Moonshot,
    HighRisk,
}

impl ConfidenceTier {
    pub const ALL: &'static [ConfidenceTier] = &[
        ConfidenceTier::Safe,
        ConfidenceTier::Normal,
        ConfidenceTier::Moonshot,
        ConfidenceTier::HighRisk,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ConfidenceTier::Safe => "safe",
            ConfidenceTier::Normal => "normal",
            ConfidenceTier::Moonshot => "moonshot",
            ConfidenceTier::HighRisk => "high_risk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceTier::Safe => "Safe",
            ConfidenceTier::Normal => "Normal",
            ConfidenceTier::Moonshot => "Moonshot",
            ConfidenceTier::HighRisk => "High Risk",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ConfidenceTier::Safe => "🛡️",
            ConfidenceTier::Normal => "⚖️",
            ConfidenceTier::Moonshot => "🚀",
            ConfidenceTier::HighRisk => "⚠️",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceResult {
    /// Final score, 0–95.
    pub score: i32,
    pub tier: ConfidenceTier,
    pub max_score: i32,
    pub base_score: i32,
    /// Window that produced the base ("5/5", "8/10", …) or "weighted".
    pub base_source: String,
    pub positive_applied: BTreeMap<String, i32>,
    pub negative_applied: BTreeMap<String, i32>,
    /// 1–4 reasons the score is not at the ceiling.
    pub why_not_higher: Vec<String>,
}

impl fmt::Display for ConfidenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({})", self.score, self.max_score, self.tier)
    }
}

// ---------------------------------------------------------------------------
// Player status
// ---------------------------------------------------------------------------

/// Player availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Active,
    Probable,
    Questionable,
    Doubtful,
    Out,
    Suspended,
    #[default]
    Unknown,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Active => "active",
            PlayerStatus::Probable => "probable",
            PlayerStatus::Questionable => "questionable",
            PlayerStatus::Doubtful => "doubtful",
            PlayerStatus::Out => "out",
            PlayerStatus::Suspended => "suspended",
            PlayerStatus::Unknown => "unknown",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            PlayerStatus::Active => "✅",
            PlayerStatus::Probable => "🟢",
            PlayerStatus::Questionable => "🟡",
            PlayerStatus::Doubtful => "🟠",
            PlayerStatus::Out => "🔴",
            PlayerStatus::Suspended => "⛔",
            PlayerStatus::Unknown => "❓",
        }
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    Starter,
    Rotation,
    Bench,
    #[default]
    Unknown,
}

impl PlayerRole {
    /// Starters and rotation players have a clear role.
    pub fn is_clear(self) -> bool {
        matches!(self, PlayerRole::Starter | PlayerRole::Rotation)
    }
}

/// Direction of a recent series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "Up"),
            Trend::Down => write!(f, "Down"),
            Trend::Stable => write!(f, "Stable"),
        }
    }
}

/// Normalised availability, minutes and role signals for one player.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerStatusRecord {
    pub player_id: String,
    pub player_name: String,
    pub team_id: String,
    pub status: PlayerStatus,
    pub injury_note: Option<String>,
    pub is_game_time_decision: bool,
    /// Up to 15 games, most recent first.
    pub minutes: Vec<f64>,
    pub season_average_minutes: f64,
    pub role: PlayerRole,
    pub usage_trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinutesAnalysis {
    pub avg_minutes: f64,
    pub median_minutes: f64,
    pub low_minute_games: usize,
    pub low_minute_streak: usize,
    pub is_stable: bool,
    pub trend: Trend,
    pub flags: Vec<String>,
}

/// Availability summary carried on a player-prop leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerContext {
    pub status: PlayerStatus,
    /// Status, minutes and role adjustments from the status table, summed.
    pub status_adjustment: i32,
    /// QUESTIONABLE/UNKNOWN players stay eligible only with a caution note.
    pub caution_required: bool,
    pub avg_minutes: f64,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Line projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Over => Direction::Under,
            Direction::Under => Direction::Over,
        }
    }

    /// Whether `value` clears `line` in this direction (strict).
    pub fn hits(self, value: f64, line: f64) -> bool {
        match self {
            Direction::Over => value > line,
            Direction::Under => value < line,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "Over"),
            Direction::Under => write!(f, "Under"),
        }
    }
}

/// Evaluation of one candidate line against a historical series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AltLineCandidate {
    pub line: f64,
    pub direction: Direction,
    pub window: HitRateWindow,
    /// Hit rates as fractions (0.0–1.0).
    pub rate_l5: f64,
    pub rate_l10: f64,
    pub rate_l15: f64,
    pub avg_margin: f64,
    /// 0–100, display ranking only.
    pub consistency_score: f64,
    pub recommended: bool,
}

// ---------------------------------------------------------------------------
// Bet and prop types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    PlayerProp,
    Moneyline,
    Spread,
    GameTotal,
    TeamTotal,
}

impl BetType {
    pub const ALL: &'static [BetType] = &[
        BetType::PlayerProp,
        BetType::Moneyline,
        BetType::Spread,
        BetType::GameTotal,
        BetType::TeamTotal,
    ];

    pub fn is_total(self) -> bool {
        matches!(self, BetType::GameTotal | BetType::TeamTotal)
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::PlayerProp => write!(f, "Player Prop"),
            BetType::Moneyline => write!(f, "Moneyline"),
            BetType::Spread => write!(f, "Spread"),
            BetType::GameTotal => write!(f, "Game Total"),
            BetType::TeamTotal => write!(f, "Team Total"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropType {
    Points,
    Rebounds,
    Assists,
    Threes,
    Steals,
    Blocks,
    PtsRebAst,
}

impl PropType {
    pub const ALL: &'static [PropType] = &[
        PropType::Points,
        PropType::Rebounds,
        PropType::Assists,
        PropType::Threes,
        PropType::Steals,
        PropType::Blocks,
        PropType::PtsRebAst,
    ];

    /// Pull this stat out of a game log.
    pub fn value(self, log: &PlayerGameLog) -> f64 {
        match self {
            PropType::Points => log.points,
            PropType::Rebounds => log.rebounds,
            PropType::Assists => log.assists,
            PropType::Threes => log.threes,
            PropType::Steals => log.steals,
            PropType::Blocks => log.blocks,
            PropType::PtsRebAst => log.points + log.rebounds + log.assists,
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropType::Points => write!(f, "Points"),
            PropType::Rebounds => write!(f, "Rebounds"),
            PropType::Assists => write!(f, "Assists"),
            PropType::Threes => write!(f, "Threes"),
            PropType::Steals => write!(f, "Steals"),
            PropType::Blocks => write!(f, "Blocks"),
            PropType::PtsRebAst => write!(f, "Pts+Reb+Ast"),
        }
    }
}

/// Attempt to parse a string into a PropType (case-insensitive).
impl std::str::FromStr for PropType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "points" | "pts" => Ok(PropType::Points),
            "rebounds" | "reb" => Ok(PropType::Rebounds),
            "assists" | "ast" => Ok(PropType::Assists),
            "threes" | "3pm" => Ok(PropType::Threes),
            "steals" | "stl" => Ok(PropType::Steals),
            "blocks" | "blk" => Ok(PropType::Blocks),
            "pts_reb_ast" | "pra" => Ok(PropType::PtsRebAst),
            _ => Err(CoreError::Validation(format!("Unknown prop type: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// American odds with their derived decimal odds and implied probability.
///
/// Only `Odds::from_american` builds one, so the derived values are
/// computed once and stay consistent everywhere they are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Odds {
    american: i32,
    decimal: Decimal,
    implied_probability: OrderedPct,
}

/// Implied probability in percent, stored as tenths so `Odds` stays `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "f64")]
struct OrderedPct(i64);

impl From<OrderedPct> for f64 {
    fn from(pct: OrderedPct) -> f64 {
        pct.0 as f64 / 10.0
    }
}

/// Largest American price magnitude accepted from a feed.
const MAX_AMERICAN: u32 = 100_000;

impl Odds {
    pub fn from_american(american: i32) -> Result<Self> {
        let abs = american.unsigned_abs();
        if !(100..=MAX_AMERICAN).contains(&abs) {
            return Err(CoreError::Validation(format!(
                "Invalid American odds: {american}"
            )));
        }
        let magnitude = Decimal::from(abs);
        let decimal = if american > 0 {
            magnitude / dec!(100) + Decimal::ONE
        } else {
            dec!(100) / magnitude + Decimal::ONE
        }
        .round_dp(3);

        let a = abs as f64;
        let implied = if american > 0 {
            100.0 / (a + 100.0) * 100.0
        } else {
            a / (a + 100.0) * 100.0
        };

        Ok(Self {
            american,
            decimal,
            implied_probability: OrderedPct((implied * 10.0).round() as i64),
        })
    }

    pub fn american(&self) -> i32 {
        self.american
    }

    pub fn decimal(&self) -> Decimal {
        self.decimal
    }

    /// Implied probability in percent, one decimal place.
    pub fn implied_probability(&self) -> f64 {
        self.implied_probability.into()
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.american > 0 {
            write!(f, "+{}", self.american)
        } else {
            write!(f, "{}", self.american)
        }
    }
}

/// Market a quote belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsMarket {
    Moneyline,
    Spread,
    GameTotal,
    TeamTotal,
    PlayerProp(PropType),
}

/// One bookmaker's price for a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub market: OddsMarket,
    /// Team name, player name, or "Over"/"Under".
    pub selection: String,
    pub line: Option<f64>,
    pub american: i32,
    pub bookmaker: String,
}

/// Best available price for a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestOdds {
    pub american: i32,
    pub bookmaker: String,
}

/// All quotes fetched for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    pub game_id: String,
    pub quotes: Vec<OddsQuote>,
}

impl GameOdds {
    /// Highest American price among quotes matching the market, a
    /// case-insensitive selection substring and (when given) the line.
    /// Falls back to `fallback` with bookmaker "average" when nothing matches.
    pub fn best(
        &self,
        market: OddsMarket,
        selection: &str,
        line: Option<f64>,
        fallback: i32,
    ) -> BestOdds {
        let needle = selection.to_lowercase();
        self.quotes
            .iter()
            .filter(|q| q.market == market)
            .filter(|q| q.selection.to_lowercase().contains(&needle))
            .filter(|q| match (line, q.line) {
                (None, _) => true,
                (Some(want), Some(got)) => (want - got).abs() < 1e-9,
                (Some(_), None) => false,
            })
            .max_by_key(|q| q.american)
            .map(|q| BestOdds {
                american: q.american,
                bookmaker: q.bookmaker.clone(),
            })
            .unwrap_or_else(|| BestOdds {
                american: fallback,
                bookmaker: "average".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Games, teams and players (provider data)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
}

/// A scheduled game on today's slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home: TeamRef,
    pub away: TeamRef,
    pub date: Option<String>,
    pub time: Option<String>,
}

/// A completed game seen from one team's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: String,
    pub date: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub is_home: bool,
}

impl GameResult {
    pub fn won(&self) -> bool {
        self.team_score > self.opponent_score
    }

    pub fn margin(&self) -> i32 {
        self.team_score as i32 - self.opponent_score as i32
    }

    pub fn total(&self) -> u32 {
        self.team_score + self.opponent_score
    }
}

/// Roster entry with the availability fields the injury feed provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub team_id: String,
    /// Raw injury-feed text; `None` when the player is not on the report.
    pub injury_status: Option<String>,
    pub injury_note: Option<String>,
    #[serde(default)]
    pub is_game_time_decision: bool,
    pub season_average_minutes: f64,
    #[serde(default)]
    pub role: PlayerRole,
}

/// One game's box-score line for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameLog {
    pub game_id: String,
    pub date: String,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub threes: f64,
    pub steals: f64,
    pub blocks: f64,
    pub usage_rate: Option<f64>,
}

/// Everything fetched for one player on the slate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSample {
    pub info: PlayerInfo,
    /// Most recent first.
    pub logs: Vec<PlayerGameLog>,
}

/// Everything fetched for one game on the slate.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSample {
    pub game: Game,
    /// Most recent first, home team's perspective.
    pub home_history: Vec<GameResult>,
    /// Most recent first, away team's perspective.
    pub away_history: Vec<GameResult>,
    /// Head-to-head results from the home team's perspective.
    pub head_to_head: Vec<GameResult>,
    pub home_players: Vec<PlayerSample>,
    pub away_players: Vec<PlayerSample>,
    pub odds: GameOdds,
}

// ---------------------------------------------------------------------------
// Legs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matchup {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_date: Option<String>,
}

impl Matchup {
    pub fn from_game(game: &Game) -> Self {
        Self {
            game_id: game.id.clone(),
            home_team: game.home.name.clone(),
            away_team: game.away.name.clone(),
            game_date: game.date.clone(),
        }
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.away_team, self.home_team)
    }
}

/// What the leg is betting on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub label: String,
    pub line: Option<f64>,
    pub direction: Option<Direction>,
    pub team: Option<TeamRef>,
    pub player_id: Option<String>,
    pub player_name: Option<String>,
    pub prop_type: Option<PropType>,
}

/// Head-to-head record within the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct H2HRecord {
    pub wins: u32,
    pub games: u32,
    pub window_days: i64,
}

impl H2HRecord {
    pub fn is_favorable(&self) -> bool {
        self.games > 0 && self.wins * 2 > self.games
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadStats {
    pub spread: f64,
    pub avg_margin: f64,
    pub covers: u32,
    pub games: u32,
}

/// One selectable betting proposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub id: String,
    pub bet_type: BetType,
    pub matchup: Matchup,
    pub selection: Selection,
    pub odds: Odds,
    pub hit_rate: HitRateWindow,
    pub ladder: Ladder,
    pub eligibility: EligibilityResult,
    pub is_home: bool,
    pub h2h: Option<H2HRecord>,
    pub spread: Option<SpreadStats>,
    pub projection: Option<AltLineCandidate>,
    pub confidence: Option<ConfidenceResult>,
    pub caution: Option<CautionResult>,
    /// Graded series, most recent first: stat values for props, margins for
    /// moneylines and spreads, scores for totals.
    pub recent: Vec<f64>,
    pub player: Option<PlayerContext>,
}

impl Leg {
    /// Eligible and not excluded by a caution. Only these may surface.
    pub fn is_selectable(&self) -> bool {
        self.eligibility.is_eligible
            && !self.caution.as_ref().is_some_and(|c| c.should_exclude)
    }

    /// Hit-rate percentage over the leg's ladder window.
    pub fn hit_rate_pct(&self) -> f64 {
        self.hit_rate.percentage(self.ladder)
    }

    pub fn confidence_score(&self) -> Option<i32> {
        self.confidence.as_ref().map(|c| c.score)
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) | {} | {}/{} ({:.1}%)",
            self.bet_type,
            self.selection.label,
            self.matchup,
            self.odds,
            self.hit_rate.hits(self.ladder),
            self.hit_rate.games(self.ladder),
            self.hit_rate_pct(),
        )?;
        if let Some(conf) = &self.confidence {
            write!(f, " | conf {conf}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parlays
// ---------------------------------------------------------------------------

/// Who asked for a parlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: Option<String>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
}

/// Parameters of a generate call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParlayRequest {
    pub legs: usize,
    pub wager: Decimal,
    /// Raw ladder value; anything outside 5/10/15 snaps to the default.
    pub ladder: u32,
    /// Only legs scoring at least this much are considered.
    pub min_confidence: Option<i32>,
    pub requester: Requester,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parlay {
    pub id: String,
    pub legs: Vec<Leg>,
    pub wager: Decimal,
    pub ladder: Ladder,
    /// Requested ladder when it was snapped to the default.
    pub ladder_snapped_from: Option<u32>,
    pub min_confidence: Option<i32>,
    pub combined_american: i32,
    pub combined_decimal: Decimal,
    pub payout: Decimal,
    pub created_at: DateTime<Utc>,
    pub requester: Requester,
}

impl Parlay {
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Payout minus stake.
    pub fn profit(&self) -> Decimal {
        self.payout - self.wager
    }

    /// Derived statistics for the insights view.
    pub fn insights(&self) -> ParlayInsights {
        let mut type_counts = BTreeMap::new();
        for leg in &self.legs {
            *type_counts.entry(leg.bet_type).or_insert(0usize) += 1;
        }

        let mut game_ids: Vec<&str> = self.legs.iter().map(|l| l.matchup.game_id.as_str()).collect();
        let total = game_ids.len();
        game_ids.sort_unstable();
        game_ids.dedup();
        let correlated_legs = total - game_ids.len();

        let average_hit_rate = if self.legs.is_empty() {
            0.0
        } else {
            round1(self.legs.iter().map(Leg::hit_rate_pct).sum::<f64>() / self.legs.len() as f64)
        };

        let by_rate = |a: &&Leg, b: &&Leg| {
            a.hit_rate_pct()
                .partial_cmp(&b.hit_rate_pct())
                .unwrap_or(std::cmp::Ordering::Equal)
        };
        let highest_risk = self.legs.iter().min_by(by_rate).map(LegSummary::from);
        let lowest_risk = self.legs.iter().max_by(by_rate).map(LegSummary::from);

        let scores: Vec<i32> = self.legs.iter().filter_map(Leg::confidence_score).collect();
        let average_confidence = if scores.is_empty() {
            None
        } else {
            Some(round1(scores.iter().sum::<i32>() as f64 / scores.len() as f64))
        };

        ParlayInsights {
            average_hit_rate,
            average_confidence,
            highest_risk,
            lowest_risk,
            correlated_legs,
            player_props: type_counts.get(&BetType::PlayerProp).copied().unwrap_or(0),
            totals: self.legs.iter().filter(|l| l.bet_type.is_total()).count(),
            type_counts,
        }
    }
}

impl fmt::Display for Parlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let american = if self.combined_american > 0 {
            format!("+{}", self.combined_american)
        } else {
            self.combined_american.to_string()
        };
        write!(
            f,
            "{} | {} legs ({}) | {} ({:.2}x) | ${:.2} to win ${:.2}",
            self.id,
            self.leg_count(),
            self.ladder,
            american,
            self.combined_decimal,
            self.wager,
            self.payout,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegSummary {
    pub leg_id: String,
    pub label: String,
    pub hit_rate_pct: f64,
}

impl From<&Leg> for LegSummary {
    fn from(leg: &Leg) -> Self {
        Self {
            leg_id: leg.id.clone(),
            label: leg.selection.label.clone(),
            hit_rate_pct: leg.hit_rate_pct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParlayInsights {
    pub average_hit_rate: f64,
    pub average_confidence: Option<f64>,
    pub highest_risk: Option<LegSummary>,
    pub lowest_risk: Option<LegSummary>,
    /// Legs sharing a game with an earlier leg.
    pub correlated_legs: usize,
    pub player_props: usize,
    pub totals: usize,
    pub type_counts: BTreeMap<BetType, usize>,
}

/// A ranked single-leg pick (pick of the day, edge finder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPick {
    pub leg: Leg,
    pub confidence: i32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
