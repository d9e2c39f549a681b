//! Player availability, minutes and role gating.
//!
//! Normalises injury-feed text into [`PlayerStatus`], analyses the recent
//! minutes series and produces a single [`PlayerEvaluation`] that the
//! composition engine uses as a veto and that feeds the confidence and
//! caution engines.

use std::sync::Arc;

use tracing::debug;

use crate::config::{MinutesRules, Rules};
use crate::types::{
    round1, MinutesAnalysis, PlayerContext, PlayerGameLog, PlayerSample, PlayerStatus, PlayerStatusRecord,
    Trend,
};

// ---------------------------------------------------------------------------
// Role analysis
// ---------------------------------------------------------------------------

/// Offensive role inferred from recent usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageRole {
    PrimaryOption,
    SecondaryOption,
    RolePlayer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleAnalysis {
    pub current_role: UsageRole,
    /// Assist rate up more than 15%.
    pub facilitator_shift: bool,
    /// Usage rate down more than 15%.
    pub usage_shift: bool,
    pub warnings: Vec<String>,
}

impl RoleAnalysis {
    pub fn shift_detected(&self) -> bool {
        self.facilitator_shift || self.usage_shift
    }

    /// Both shifts at once count as a major role change.
    pub fn is_major_shift(&self) -> bool {
        self.facilitator_shift && self.usage_shift
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Outcome of evaluating one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvaluation {
    pub status: PlayerStatus,
    pub is_eligible: bool,
    pub reason: Option<String>,
    /// QUESTIONABLE/UNKNOWN players stay eligible but must carry a caution.
    pub requires_caution: bool,
    pub is_game_time_decision: bool,
    pub minutes: MinutesAnalysis,
    pub role_clear: bool,
    pub confidence_modifier: i32,
    pub warnings: Vec<String>,
}

impl PlayerEvaluation {
    pub fn low_minute_games(&self) -> usize {
        self.minutes.low_minute_games
    }

    pub fn minutes_stable(&self) -> bool {
        self.minutes.is_stable
    }

    /// Summary carried on the legs built for this player.
    pub fn context(&self) -> PlayerContext {
        PlayerContext {
            status: self.status,
            status_adjustment: self.confidence_modifier,
            caution_required: self.requires_caution,
            avg_minutes: self.minutes.avg_minutes,
            warnings: self.warnings.clone(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub struct PlayerStatusEngine {
    rules: Arc<Rules>,
}

impl Default for PlayerStatusEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl PlayerStatusEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    /// Parse free-text injury status. `None` means the player is not on the
    /// report (ACTIVE); blank or unrecognised text is UNKNOWN.
    pub fn parse_injury_status(raw: Option<&str>) -> PlayerStatus {
        let Some(raw) = raw else {
            return PlayerStatus::Active;
        };
        match raw.trim().to_lowercase().as_str() {
            "active" | "available" | "healthy" => PlayerStatus::Active,
            "probable" | "likely" => PlayerStatus::Probable,
            "questionable" | "uncertain" | "gtd" | "game-time decision" | "game time decision" => {
                PlayerStatus::Questionable
            }
            "doubtful" | "unlikely" => PlayerStatus::Doubtful,
            "out" | "injured" | "dnp" | "did not play" => PlayerStatus::Out,
            "suspended" | "suspension" => PlayerStatus::Suspended,
            _ => PlayerStatus::Unknown,
        }
    }

    /// OUT, DOUBTFUL and SUSPENDED players are unavailable.
    pub fn is_available(status: PlayerStatus) -> bool {
        !matches!(
            status,
            PlayerStatus::Out | PlayerStatus::Doubtful | PlayerStatus::Suspended
        )
    }

    pub fn status_modifier(&self, status: PlayerStatus) -> i32 {
        self.rules.status.for_status(status)
    }

    /// Analyse up to the last 15 minutes values (most recent first).
    pub fn analyze_minutes(&self, minutes: &[f64], season_average: f64) -> MinutesAnalysis {
        let cfg = self.rules.minutes;
        let minutes = &minutes[..minutes.len().min(cfg.max_games)];

        if minutes.is_empty() {
            return MinutesAnalysis {
                avg_minutes: 0.0,
                median_minutes: 0.0,
                low_minute_games: 0,
                low_minute_streak: 0,
                is_stable: false,
                trend: Trend::Stable,
                flags: vec!["No minutes data available".to_string()],
            };
        }

        let threshold = season_average * cfg.low_threshold_ratio;
        let is_low = |m: &f64| *m < threshold;
        let low_minute_games = minutes.iter().filter(|m| is_low(m)).count();
        let low_minute_streak = minutes.iter().take_while(|m| is_low(m)).count();

        // Fewer than the required games can never be called stable.
        let range_ok = if cfg.stability_games > 0 && minutes.len() >= cfg.stability_games {
            let recent = &minutes[..cfg.stability_games];
            let max = recent.iter().cloned().fold(f64::MIN, f64::max);
            let min = recent.iter().cloned().fold(f64::MAX, f64::min);
            max - min <= cfg.stability_range
        } else {
            false
        };

        let span = MinutesRules::TREND_SPAN;
        let trend = if minutes.len() >= cfg.trend_min_games.max(2 * span) {
            let recent = mean(&minutes[..span]);
            let prior = mean(&minutes[span..2 * span]);
            if recent > prior + cfg.trend_hysteresis {
                Trend::Up
            } else if recent < prior - cfg.trend_hysteresis {
                Trend::Down
            } else {
                Trend::Stable
            }
        } else {
            Trend::Stable
        };

        let mut flags = Vec::new();
        if low_minute_games >= 2 {
            flags.push(format!("Minutes volatility detected ({low_minute_games} low games)"));
        } else if low_minute_games == 1 {
            flags.push("1 low-minute game in sample".to_string());
        }
        if low_minute_streak >= 2 {
            flags.push(format!("{low_minute_streak} consecutive low-minute games"));
        }
        if trend == Trend::Down {
            flags.push("Minutes trending downward".to_string());
        }
        if !range_ok {
            flags.push("Minutes not stable (high variance)".to_string());
        }

        MinutesAnalysis {
            avg_minutes: round1(mean(minutes)),
            median_minutes: round1(median(minutes)),
            low_minute_games,
            low_minute_streak,
            is_stable: range_ok && low_minute_streak < 2,
            trend,
            flags,
        }
    }

    /// Quick filter: passes unless the low-minute streak reaches the veto.
    /// Returns (passes, low-minute game count, flags).
    pub fn check_minutes_filter(&self, minutes: &[f64], season_average: f64) -> (bool, usize, Vec<String>) {
        if minutes.is_empty() {
            return (true, 0, Vec::new());
        }
        let analysis = self.analyze_minutes(minutes, season_average);
        let passes = analysis.low_minute_streak < self.rules.minutes.streak_veto;
        (passes, analysis.low_minute_games, analysis.flags)
    }

    /// Detect facilitator or usage shifts from most-recent-first rate series.
    pub fn analyze_role(&self, assist_rates: &[f64], usage_rates: &[f64]) -> RoleAnalysis {
        let mut warnings = Vec::new();
        let mut facilitator_shift = false;
        let mut usage_shift = false;

        if assist_rates.len() >= 5 && usage_rates.len() >= 5 {
            if mean(&assist_rates[..3]) > mean(&assist_rates[3..]) * 1.15 {
                facilitator_shift = true;
                warnings.push("Assist rate increased (may reduce scoring)".to_string());
            }
            if mean(&usage_rates[..3]) < mean(&usage_rates[3..]) * 0.85 {
                usage_shift = true;
                warnings.push("Usage rate decreased".to_string());
            }
        }

        let recent_usage = mean(&usage_rates[..usage_rates.len().min(3)]);
        let current_role = if !usage_rates.is_empty() && recent_usage > 25.0 {
            UsageRole::PrimaryOption
        } else if !usage_rates.is_empty() && recent_usage > 20.0 {
            UsageRole::SecondaryOption
        } else {
            UsageRole::RolePlayer
        };

        RoleAnalysis {
            current_role,
            facilitator_shift,
            usage_shift,
            warnings,
        }
    }

    /// Role analysis straight from game logs. Logs without a usage rate are
    /// skipped for the usage series.
    pub fn analyze_role_from_logs(&self, logs: &[PlayerGameLog]) -> RoleAnalysis {
        let assists: Vec<f64> = logs.iter().map(|l| l.assists).collect();
        let usage: Vec<f64> = logs.iter().filter_map(|l| l.usage_rate).collect();
        self.analyze_role(&assists, &usage)
    }

    /// Normalise provider data for one player into a status record.
    pub fn record_from_sample(&self, sample: &PlayerSample) -> PlayerStatusRecord {
        let info = &sample.info;
        let role = self.analyze_role_from_logs(&sample.logs);
        PlayerStatusRecord {
            player_id: info.id.clone(),
            player_name: info.name.clone(),
            team_id: info.team_id.clone(),
            status: Self::parse_injury_status(info.injury_status.as_deref()),
            injury_note: info.injury_note.clone(),
            is_game_time_decision: info.is_game_time_decision,
            minutes: sample
                .logs
                .iter()
                .take(self.rules.minutes.max_games)
                .map(|l| l.minutes)
                .collect(),
            season_average_minutes: info.season_average_minutes,
            role: info.role,
            usage_trend: if role.usage_shift { Trend::Down } else { Trend::Stable },
        }
    }

    /// Evaluate a player's availability. The low-minute streak veto wins
    /// over any injury status.
    pub fn evaluate(&self, record: &PlayerStatusRecord) -> PlayerEvaluation {
        let modifiers = self.rules.status;
        let minutes = self.analyze_minutes(&record.minutes, record.season_average_minutes);
        let mut warnings = minutes.flags.clone();

        if !record.minutes.is_empty() && minutes.low_minute_streak >= self.rules.minutes.streak_veto {
            debug!(
                player = %record.player_name,
                streak = minutes.low_minute_streak,
                "Player vetoed on low-minute streak"
            );
            return PlayerEvaluation {
                status: record.status,
                is_eligible: false,
                reason: Some(format!(
                    "{} consecutive low-minute games",
                    minutes.low_minute_streak
                )),
                requires_caution: false,
                is_game_time_decision: record.is_game_time_decision,
                minutes: MinutesAnalysis {
                    is_stable: false,
                    ..minutes
                },
                role_clear: false,
                confidence_modifier: modifiers.streak_veto,
                warnings,
            };
        }

        if !Self::is_available(record.status) {
            debug!(player = %record.player_name, status = %record.status, "Player unavailable");
            return PlayerEvaluation {
                status: record.status,
                is_eligible: false,
                reason: Some(format!("Player status: {}", record.status)),
                requires_caution: false,
                is_game_time_decision: record.is_game_time_decision,
                minutes,
                role_clear: false,
                confidence_modifier: modifiers.for_status(record.status),
                warnings: Vec::new(),
            };
        }

        let role_clear = record.role.is_clear();
        if !role_clear {
            warnings.push("Role uncertainty detected".to_string());
        }
        match record.status {
            PlayerStatus::Questionable => warnings.push("Listed as Questionable".to_string()),
            PlayerStatus::Unknown => warnings.push("Status unknown".to_string()),
            _ => {}
        }
        if record.is_game_time_decision {
            warnings.push("Game-time decision".to_string());
        }

        let mut confidence_modifier = modifiers.for_status(record.status);
        if !minutes.is_stable {
            confidence_modifier += modifiers.minutes_unstable;
        }
        if !role_clear {
            confidence_modifier += modifiers.role_unclear;
        }

        PlayerEvaluation {
            status: record.status,
            is_eligible: true,
            reason: None,
            requires_caution: matches!(record.status, PlayerStatus::Questionable | PlayerStatus::Unknown),
            is_game_time_decision: record.is_game_time_decision,
            minutes,
            role_clear,
            confidence_modifier,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerRole;

    // ---- helpers -----------------------------------------------------------

    fn engine() -> PlayerStatusEngine {
        PlayerStatusEngine::default()
    }

    fn record(status: PlayerStatus, minutes: Vec<f64>) -> PlayerStatusRecord {
        PlayerStatusRecord {
            player_id: "p1".into(),
            player_name: "Test Player".into(),
            team_id: "t1".into(),
            status,
            minutes,
            season_average_minutes: 32.0,
            role: PlayerRole::Starter,
            ..Default::default()
        }
    }

    fn steady() -> Vec<f64> {
        vec![33.0, 32.0, 34.0, 31.0, 33.0, 32.0, 30.0, 33.0, 34.0, 32.0]
    }

    // ---- parsing -----------------------------------------------------------

    #[test]
    fn test_parse_injury_status() {
        use PlayerStatus::*;
        assert_eq!(PlayerStatusEngine::parse_injury_status(None), Active);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("")), Unknown);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("   ")), Unknown);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("Healthy")), Active);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("likely")), Probable);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("GTD")), Questionable);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("Unlikely")), Doubtful);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("Did Not Play")), Out);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("suspension")), Suspended);
        assert_eq!(PlayerStatusEngine::parse_injury_status(Some("day-to-day (ankle)")), Unknown);
    }

    #[test]
    fn test_availability_and_modifiers() {
        let e = engine();
        assert!(PlayerStatusEngine::is_available(PlayerStatus::Questionable));
        assert!(PlayerStatusEngine::is_available(PlayerStatus::Unknown));
        assert!(!PlayerStatusEngine::is_available(PlayerStatus::Doubtful));
        assert_eq!(e.status_modifier(PlayerStatus::Active), 0);
        assert_eq!(e.status_modifier(PlayerStatus::Probable), -2);
        assert_eq!(e.status_modifier(PlayerStatus::Out), -100);
    }

    // ---- minutes -----------------------------------------------------------

    #[test]
    fn test_stable_minutes() {
        let a = engine().analyze_minutes(&steady(), 32.0);
        assert!(a.is_stable);
        assert_eq!(a.low_minute_games, 0);
        assert_eq!(a.low_minute_streak, 0);
        assert_eq!(a.trend, Trend::Stable);
        assert!(a.flags.is_empty());
    }

    #[test]
    fn test_low_minute_streak_counts_from_most_recent() {
        // threshold = 24.0
        let minutes = vec![20.0, 22.0, 30.0, 18.0, 33.0];
        let a = engine().analyze_minutes(&minutes, 32.0);
        assert_eq!(a.low_minute_games, 3);
        assert_eq!(a.low_minute_streak, 2);
        assert!(!a.is_stable);
        assert!(a.flags.contains(&"Minutes volatility detected (3 low games)".to_string()));
        assert!(a.flags.contains(&"2 consecutive low-minute games".to_string()));
    }

    #[test]
    fn test_stability_needs_five_games() {
        let a = engine().analyze_minutes(&[32.0, 32.0, 32.0], 32.0);
        assert!(!a.is_stable);
    }

    #[test]
    fn test_trend_down_with_hysteresis() {
        let minutes = vec![28.0, 28.0, 28.0, 28.0, 28.0, 33.0, 33.0, 33.0, 33.0, 33.0];
        let a = engine().analyze_minutes(&minutes, 32.0);
        assert_eq!(a.trend, Trend::Down);
        assert!(a.flags.contains(&"Minutes trending downward".to_string()));

        let minutes = vec![32.0, 32.0, 32.0, 32.0, 32.0, 33.5, 33.5, 33.5, 33.5, 33.5];
        assert_eq!(engine().analyze_minutes(&minutes, 32.0).trend, Trend::Stable);
    }

    #[test]
    fn test_short_trend_window_never_slices_past_the_series() {
        let mut rules = Rules::locked();
        rules.minutes.trend_min_games = 6;
        let e = PlayerStatusEngine::new(Arc::new(rules));
        let a = e.analyze_minutes(&[30.0; 7], 30.0);
        assert_eq!(a.trend, Trend::Stable);
        assert!(a.is_stable);
    }

    #[test]
    fn test_empty_minutes() {
        let a = engine().analyze_minutes(&[], 30.0);
        assert!(!a.is_stable);
        assert_eq!(a.flags, vec!["No minutes data available".to_string()]);
        let (passes, low, flags) = engine().check_minutes_filter(&[], 30.0);
        assert!(passes);
        assert_eq!(low, 0);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_three_straight_low_games_fail_filter() {
        let (passes, low, _) = engine().check_minutes_filter(&[15.0, 16.0, 14.0, 32.0, 33.0], 32.0);
        assert!(!passes);
        assert_eq!(low, 3);
    }

    // ---- evaluation --------------------------------------------------------

    #[test]
    fn test_active_starter_is_clean() {
        let eval = engine().evaluate(&record(PlayerStatus::Active, steady()));
        assert!(eval.is_eligible);
        assert!(!eval.requires_caution);
        assert!(eval.role_clear);
        assert_eq!(eval.confidence_modifier, 0);
    }

    #[test]
    fn test_out_and_doubtful_ineligible() {
        for status in [PlayerStatus::Out, PlayerStatus::Doubtful, PlayerStatus::Suspended] {
            let eval = engine().evaluate(&record(status, steady()));
            assert!(!eval.is_eligible, "{status} should be ineligible");
        }
    }

    #[test]
    fn test_questionable_eligible_with_caution() {
        let eval = engine().evaluate(&record(PlayerStatus::Questionable, steady()));
        assert!(eval.is_eligible);
        assert!(eval.requires_caution);
        assert_eq!(eval.confidence_modifier, -6);
        assert!(eval.warnings.contains(&"Listed as Questionable".to_string()));

        let eval = engine().evaluate(&record(PlayerStatus::Unknown, steady()));
        assert!(eval.is_eligible);
        assert!(eval.requires_caution);
    }

    #[test]
    fn test_context_carries_status_adjustment() {
        let eval = engine().evaluate(&record(PlayerStatus::Questionable, steady()));
        let ctx = eval.context();
        assert_eq!(ctx.status, PlayerStatus::Questionable);
        assert_eq!(ctx.status_adjustment, -6);
        assert!(ctx.caution_required);
        assert_eq!(ctx.avg_minutes, 32.4);
    }

    #[test]
    fn test_streak_veto_overrides_active_status() {
        let eval = engine().evaluate(&record(PlayerStatus::Active, vec![15.0, 16.0, 14.0, 32.0, 33.0]));
        assert!(!eval.is_eligible);
        assert_eq!(eval.confidence_modifier, -20);
        assert_eq!(eval.reason.as_deref(), Some("3 consecutive low-minute games"));
    }

    #[test]
    fn test_unstable_bench_player_modifier() {
        let mut rec = record(PlayerStatus::Probable, vec![32.0, 20.0, 35.0, 28.0, 33.0]);
        rec.role = PlayerRole::Bench;
        let eval = engine().evaluate(&rec);
        assert!(eval.is_eligible);
        // probable -2, unstable -5, role unclear -3
        assert_eq!(eval.confidence_modifier, -10);
        assert!(eval.warnings.contains(&"Role uncertainty detected".to_string()));
    }

    // ---- role --------------------------------------------------------------

    #[test]
    fn test_role_shifts() {
        let assists = [9.0, 8.0, 9.0, 5.0, 5.0, 5.0];
        let usage = [18.0, 18.0, 18.0, 26.0, 26.0, 26.0];
        let role = engine().analyze_role(&assists, &usage);
        assert!(role.facilitator_shift);
        assert!(role.usage_shift);
        assert!(role.is_major_shift());
        assert_eq!(role.current_role, UsageRole::RolePlayer);
    }

    #[test]
    fn test_role_labels() {
        let flat = [5.0; 5];
        assert_eq!(engine().analyze_role(&flat, &[28.0; 5]).current_role, UsageRole::PrimaryOption);
        assert_eq!(engine().analyze_role(&flat, &[22.0; 5]).current_role, UsageRole::SecondaryOption);
        assert_eq!(engine().analyze_role(&flat, &[]).current_role, UsageRole::RolePlayer);
        assert!(!engine().analyze_role(&flat, &[22.0; 5]).shift_detected());
    }
}
