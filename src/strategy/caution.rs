//! Contextual risk detection.
//!
//! Cautions are evaluated independently of eligibility. Each entity kind has
//! a fixed decision tree that collects catalog triggers; aggregation turns
//! them into a level. A severity-3 trigger excludes the leg everywhere
//! downstream.

use std::sync::Arc;

use tracing::warn;

use crate::config::Rules;
use crate::strategy::player_status::{PlayerEvaluation, RoleAnalysis};
use crate::types::{CautionKey, CautionLevel, CautionResult, CautionTrigger, PlayerStatus};

/// How much a player's role has moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleShift {
    #[default]
    None,
    Minor,
    Major,
}

/// Inputs for the player-prop decision tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCautionInput {
    pub status: PlayerStatus,
    pub is_game_time_decision: bool,
    pub minutes_last_game: Option<f64>,
    pub minutes_avg: Option<f64>,
    pub low_minute_games: usize,
    pub low_minute_streak: usize,
    pub facilitator_increase: bool,
    pub role_shift: RoleShift,
    pub key_teammate_out: bool,
    pub star_player_out: bool,
    pub is_back_to_back: bool,
    pub blowout_risk: bool,
    pub pace_down: bool,
    pub elite_defender: bool,
    pub is_road: bool,
}

impl PlayerCautionInput {
    /// Build from the player-status leaves. Schedule and matchup flags are
    /// left for the caller to set.
    pub fn from_evaluation(
        eval: &PlayerEvaluation,
        role: &RoleAnalysis,
        minutes: &[f64],
        season_average: f64,
    ) -> Self {
        let role_shift = if role.is_major_shift() {
            RoleShift::Major
        } else if role.shift_detected() {
            RoleShift::Minor
        } else {
            RoleShift::None
        };
        Self {
            status: eval.status,
            is_game_time_decision: eval.is_game_time_decision,
            minutes_last_game: minutes.first().copied(),
            minutes_avg: (season_average > 0.0).then_some(season_average),
            low_minute_games: eval.minutes.low_minute_games,
            low_minute_streak: eval.minutes.low_minute_streak,
            facilitator_increase: role.facilitator_shift,
            role_shift,
            ..Default::default()
        }
    }
}

/// Inputs for moneyline, total and team-total legs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamCautionInput {
    pub star_player_out: bool,
    pub key_player_out: bool,
    pub is_back_to_back: bool,
    pub is_road: bool,
    pub spread_size: f64,
    pub is_large_spread: bool,
    pub blowout_risk: bool,
}

pub struct CautionEngine {
    rules: Arc<Rules>,
}

impl Default for CautionEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl CautionEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    fn trigger(&self, key: CautionKey) -> CautionTrigger {
        match self.rules.caution(key) {
            Some(entry) => CautionTrigger {
                key,
                severity: entry.severity,
                message: entry.message.clone(),
            },
            None => {
                // unreachable once Rules::compile has run
                warn!(%key, "Caution key missing from catalog");
                CautionTrigger {
                    key,
                    severity: 1,
                    message: format!("Unknown caution: {key}"),
                }
            }
        }
    }

    /// Aggregate triggers into a result.
    pub fn aggregate(&self, triggers: Vec<CautionTrigger>) -> CautionResult {
        if triggers.is_empty() {
            return CautionResult::none();
        }

        let total_severity: u32 = triggers.iter().map(|t| t.severity as u32).sum();
        let max_severity = triggers.iter().map(|t| t.severity).max().unwrap_or(0);

        let level = if max_severity >= 3 {
            CautionLevel::Excluded
        } else if total_severity >= 3 || max_severity >= 2 {
            CautionLevel::High
        } else if total_severity >= 1 {
            CautionLevel::Mild
        } else {
            CautionLevel::None
        };

        CautionResult {
            level,
            icon: level.icon(),
            messages: triggers.iter().map(|t| t.message.clone()).collect(),
            triggers,
            should_exclude: level == CautionLevel::Excluded,
            total_severity,
        }
    }

    /// Combine several results into one, keeping trigger order.
    pub fn merge(&self, results: impl IntoIterator<Item = CautionResult>) -> CautionResult {
        let triggers = results.into_iter().flat_map(|r| r.triggers).collect();
        self.aggregate(triggers)
    }

    pub fn detect_player_cautions(&self, input: &PlayerCautionInput) -> CautionResult {
        use CautionKey::*;
        let mut keys = Vec::new();

        match input.status {
            PlayerStatus::Out => keys.push(PlayerOut),
            PlayerStatus::Suspended => keys.push(PlayerSuspended),
            PlayerStatus::Doubtful => keys.push(Doubtful),
            PlayerStatus::Questionable => keys.push(Questionable),
            PlayerStatus::Unknown => keys.push(StatusUnknown),
            PlayerStatus::Active | PlayerStatus::Probable => {}
        }
        if input.is_game_time_decision {
            keys.push(GameTimeDecision);
        }

        if input.low_minute_streak >= self.rules.minutes.streak_veto {
            keys.push(LowMinuteStreak);
        }
        if input.low_minute_games >= 2 {
            keys.push(MinutesDropMultiple);
        } else if input.low_minute_games == 1 {
            keys.push(MinutesDropSingle);
        }
        if let (Some(last), Some(avg)) = (input.minutes_last_game, input.minutes_avg) {
            if last < avg * self.rules.minutes.low_threshold_ratio {
                keys.push(LowMinutesRecent);
            }
        }

        match input.role_shift {
            RoleShift::Major => keys.push(RoleShiftMajor),
            RoleShift::Minor => keys.push(RoleShiftMinor),
            RoleShift::None => {}
        }
        if input.facilitator_increase {
            keys.push(FacilitatorIncrease);
        }

        if input.star_player_out {
            keys.push(StarPlayerOut);
        } else if input.key_teammate_out {
            keys.push(TeammateOut);
        }

        for (on, key) in [
            (input.is_back_to_back, BackToBack),
            (input.blowout_risk, BlowoutRisk),
            (input.pace_down, PaceDown),
            (input.elite_defender, StrongDefender),
            (input.is_road, RoadGame),
        ] {
            if on {
                keys.push(key);
            }
        }

        self.aggregate(keys.into_iter().map(|k| self.trigger(k)).collect())
    }

    pub fn detect_team_cautions(&self, input: &TeamCautionInput) -> CautionResult {
        use CautionKey::*;
        let mut keys = Vec::new();

        if input.star_player_out {
            keys.push(StarPlayerOut);
        } else if input.key_player_out {
            keys.push(TeammateOut);
        }
        if input.is_back_to_back {
            keys.push(BackToBack);
        }
        if input.is_road {
            keys.push(RoadGame);
        }
        if input.is_large_spread || input.spread_size.abs() >= 10.0 {
            keys.push(LargeSpread);
        }
        if input.blowout_risk {
            keys.push(BlowoutRisk);
        }

        self.aggregate(keys.into_iter().map(|k| self.trigger(k)).collect())
    }

    pub fn detect_spread_cautions(
        &self,
        spread_size: f64,
        cover_margin: f64,
        is_road: bool,
        back_to_back: bool,
    ) -> CautionResult {
        use CautionKey::*;
        let mut keys = Vec::new();

        if spread_size.abs() >= 10.0 {
            keys.push(LargeSpread);
        }
        if cover_margin.abs() < 2.0 {
            keys.push(ThinMargin);
        }
        if is_road {
            keys.push(RoadGame);
        }
        if back_to_back {
            keys.push(BackToBack);
        }

        self.aggregate(keys.into_iter().map(|k| self.trigger(k)).collect())
    }

    /// `hit_rate_variance` is the spread between the highest and lowest
    /// window rate, as a fraction.
    pub fn detect_alt_line_cautions(&self, is_alt_line: bool, hit_rate_variance: f64) -> CautionResult {
        if is_alt_line && hit_rate_variance > 0.15 {
            self.aggregate(vec![self.trigger(CautionKey::AltLineVolatility)])
        } else {
            CautionResult::none()
        }
    }
}
