//! Confidence scoring.
//!
//! A base score comes from the strongest full hit-rate window (bases never
//! stack) or, failing an exact table match, from a weighted percentage.
//! Context modifiers are then added and the result is clamped to
//! `0..=max_score`. The ceiling is 95, never 100.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Rules;
use crate::strategy::player_status::{PlayerEvaluation, RoleAnalysis};
use crate::types::{ConfidenceResult, ConfidenceTier, HitRateWindow, Ladder, PlayerStatus};

const WEIGHTED_SCALE: f64 = 0.95;
const FLOAT_GUARD: f64 = 1e-9;

/// Boolean context feeding the modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceContext {
    // positive
    pub alt_line_consistent: bool,
    pub minutes_stable: bool,
    pub role_clear: bool,
    pub favorable_matchup: bool,
    pub h2h_favorable: bool,
    pub is_home: bool,
    // negative
    pub is_questionable: bool,
    pub is_doubtful: bool,
    pub low_minute_games: usize,
    pub role_shift_detected: bool,
    pub teammate_missing: bool,
    pub is_road: bool,
}

impl ConfidenceContext {
    /// Context for a player prop, built from the player-status leaves.
    pub fn for_player(
        player: &PlayerEvaluation,
        role: &RoleAnalysis,
        is_home: bool,
        alt_line_consistent: bool,
        teammate_missing: bool,
    ) -> Self {
        Self {
            alt_line_consistent,
            minutes_stable: player.minutes_stable(),
            role_clear: player.role_clear,
            favorable_matchup: false,
            h2h_favorable: false,
            is_home,
            is_questionable: player.status == PlayerStatus::Questionable,
            is_doubtful: player.status == PlayerStatus::Doubtful,
            low_minute_games: player.low_minute_games(),
            role_shift_detected: role.shift_detected(),
            teammate_missing,
            is_road: !is_home,
        }
    }

    /// Context for a team-level leg. `side` is `Some(is_home)` for legs
    /// tied to one team, `None` for game totals.
    pub fn for_team(side: Option<bool>, h2h_favorable: bool, favorable_matchup: bool) -> Self {
        Self {
            h2h_favorable,
            favorable_matchup,
            is_home: side == Some(true),
            is_road: side == Some(false),
            // team outcomes do not depend on one player's minutes
            minutes_stable: true,
            role_clear: true,
            alt_line_consistent: true,
            ..Default::default()
        }
    }
}

pub struct ConfidenceEngine {
    rules: Arc<Rules>,
}

impl Default for ConfidenceEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl ConfidenceEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    pub fn max_score(&self) -> i32 {
        self.rules.max_score
    }

    fn clamp(&self, score: i32) -> i32 {
        score.clamp(0, self.rules.max_score)
    }

    /// Base score and the window that produced it ("5/5", … or "weighted").
    pub fn base_score(&self, window: &HitRateWindow) -> (i32, String) {
        let best = Ladder::ALL
            .iter()
            .filter(|l| window.games(**l) >= l.games())
            .filter_map(|l| {
                let key = (window.hits(*l), window.games(*l));
                self.rules
                    .base_scores
                    .get(&key)
                    .map(|score| (*score, format!("{}/{}", key.0, key.1)))
            })
            // first maximum wins on ties (shortest window)
            .fold(None::<(i32, String)>, |best, cand| match best {
                Some(b) if b.0 >= cand.0 => Some(b),
                _ => Some(cand),
            });

        if let Some(best) = best {
            return best;
        }

        let pct = |l: Ladder| {
            let games = window.games(l);
            if games == 0 {
                0.0
            } else {
                window.hits(l) as f64 / games as f64 * 100.0
            }
        };
        let weighted = pct(Ladder::L15) * 0.40 + pct(Ladder::L10) * 0.35 + pct(Ladder::L5) * 0.25;
        // Truncates like an integer cast. The 1e-9 absorbs f64 representation
        // error only: a weighted value whose exact product is a whole number
        // (e.g. 57) may land a few ulps below it. Never moves a non-integer
        // product past the next integer.
        let scaled = (weighted * WEIGHTED_SCALE + FLOAT_GUARD).floor() as i32;
        (self.clamp(scaled), "weighted".to_string())
    }

    pub fn tier(&self, score: i32) -> ConfidenceTier {
        self.rules.tiers.classify(score)
    }

    fn positive(&self, ctx: &ConfidenceContext) -> BTreeMap<String, i32> {
        let p = self.rules.positive;
        [
            (ctx.alt_line_consistent, "alt_line_consistency", p.alt_line_consistency),
            (ctx.minutes_stable, "minutes_stable", p.minutes_stable),
            (ctx.role_clear, "role_clarity", p.role_clarity),
            (ctx.favorable_matchup, "favorable_matchup", p.favorable_matchup),
            (ctx.h2h_favorable, "h2h_alignment", p.h2h_alignment),
            (ctx.is_home, "home_advantage", p.home_advantage),
        ]
        .into_iter()
        .filter(|(on, _, _)| *on)
        .map(|(_, key, value)| (key.to_string(), value))
        .collect()
    }

    /// Negative modifiers plus the reason text for each one applied.
    fn negative(&self, ctx: &ConfidenceContext) -> (BTreeMap<String, i32>, Vec<String>) {
        let n = self.rules.negative;
        let mut applied = BTreeMap::new();
        let mut reasons = Vec::new();

        if ctx.is_questionable || ctx.is_doubtful {
            applied.insert("questionable_or_doubtful".to_string(), n.questionable_or_doubtful);
            let status = if ctx.is_doubtful { "Doubtful" } else { "Questionable" };
            reasons.push(format!("Player listed as {status}"));
        }

        if ctx.low_minute_games >= 2 {
            applied.insert("low_minutes_multiple".to_string(), n.low_minutes_multiple);
            reasons.push("2+ low-minute games detected".to_string());
        } else if ctx.low_minute_games == 1 {
            applied.insert("low_minutes_single".to_string(), n.low_minutes_single);
            reasons.push("1 low-minute game detected".to_string());
        }

        if ctx.role_shift_detected {
            applied.insert("role_shift_conflict".to_string(), n.role_shift_conflict);
            reasons.push("Recent role shift detected".to_string());
        }
        if ctx.teammate_missing {
            applied.insert("key_teammate_missing".to_string(), n.key_teammate_missing);
            reasons.push("Key teammate missing".to_string());
        }
        if ctx.is_road {
            applied.insert("road_disadvantage".to_string(), n.road_disadvantage);
            reasons.push("Road disadvantage".to_string());
        }

        (applied, reasons)
    }

    fn why_not_higher(&self, score: i32, mut reasons: Vec<String>, ctx: &ConfidenceContext) -> Vec<String> {
        if (85..self.rules.max_score).contains(&score) && reasons.is_empty() {
            reasons.push("Inherent game-to-game variance".to_string());
        }
        if !ctx.minutes_stable && !reasons.iter().any(|r| r.to_lowercase().contains("minute")) {
            reasons.push("Minutes not fully stable".to_string());
        }
        if !ctx.alt_line_consistent {
            reasons.push("Alt line variance exists".to_string());
        }
        if reasons.is_empty() {
            reasons.push("Standard uncertainty in sports outcomes".to_string());
        }
        reasons.truncate(4);
        reasons
    }

    /// Score one pick.
    pub fn calculate(&self, window: &HitRateWindow, ctx: &ConfidenceContext) -> ConfidenceResult {
        let (base_score, base_source) = self.base_score(window);
        let positive_applied = self.positive(ctx);
        let (negative_applied, negative_reasons) = self.negative(ctx);

        let raw = base_score
            + positive_applied.values().sum::<i32>()
            + negative_applied.values().sum::<i32>();
        let score = self.clamp(raw);

        ConfidenceResult {
            score,
            tier: self.tier(score),
            max_score: self.rules.max_score,
            base_score,
            base_source,
            positive_applied,
            negative_applied,
            why_not_higher: self.why_not_higher(score, negative_reasons, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- helpers -----------------------------------------------------------

    fn engine() -> ConfidenceEngine {
        ConfidenceEngine::default()
    }

    fn full(h5: u32, h10: u32, h15: u32) -> HitRateWindow {
        HitRateWindow::new(h5, 5, h10, 10, h15, 15).unwrap()
    }

    // ---- base score --------------------------------------------------------

    #[test]
    fn test_perfect_l5_alone_is_70() {
        let w = HitRateWindow::new(5, 5, 5, 5, 5, 5).unwrap();
        assert_eq!(engine().base_score(&w), (70, "5/5".to_string()));
    }

    #[test]
    fn test_bases_do_not_stack() {
        let (base, source) = engine().base_score(&full(5, 8, 13));
        assert_eq!(base, 70);
        assert_eq!(source, "5/5");

        let (base, source) = engine().base_score(&full(3, 8, 13));
        assert_eq!(base, 68);
        assert_eq!(source, "13/15");
    }

    #[test]
    fn test_partial_window_ignored_by_table() {
        // 8/10 only counts when ten games were played
        let w = HitRateWindow::new(3, 5, 8, 9, 8, 9).unwrap();
        let (_, source) = engine().base_score(&w);
        assert_eq!(source, "weighted");
    }

    #[test]
    fn test_weighted_fallback() {
        // 3/5, 6/10, 9/15 → 60% everywhere → floor(60 × 0.95) = 57
        let (base, source) = engine().base_score(&full(3, 6, 9));
        assert_eq!(source, "weighted");
        assert_eq!(base, 57);
    }

    #[test]
    fn test_weighted_fallback_truncates_fractions() {
        // 2/5, 5/10, 7/15 → 40×0.25 + 50×0.35 + 46.67×0.40 = 46.17 → ×0.95 = 43.86
        let (base, source) = engine().base_score(&full(2, 5, 7));
        assert_eq!(source, "weighted");
        assert_eq!(base, 43);
    }

    // ---- calculate ---------------------------------------------------------

    #[test]
    fn test_questionable_drops_to_normal() {
        let ctx = ConfidenceContext {
            is_questionable: true,
            ..Default::default()
        };
        let result = engine().calculate(&full(5, 8, 13), &ctx);
        assert_eq!(result.base_score, 70);
        assert_eq!(result.score, 64);
        assert_eq!(result.tier, ConfidenceTier::Normal);
        assert_eq!(result.negative_applied.get("questionable_or_doubtful"), Some(&-6));
        assert_eq!(result.why_not_higher[0], "Player listed as Questionable");
        assert_eq!(result.to_string(), "64 / 95 (⚖️ Normal)");
    }

    #[test]
    fn test_low_minute_modifiers_are_exclusive() {
        let two = ConfidenceContext {
            low_minute_games: 3,
            ..Default::default()
        };
        let result = engine().calculate(&full(5, 8, 13), &two);
        assert_eq!(result.negative_applied.len(), 1);
        assert_eq!(result.negative_applied.get("low_minutes_multiple"), Some(&-12));
        assert_eq!(result.score, 58);

        let one = ConfidenceContext {
            low_minute_games: 1,
            ..Default::default()
        };
        assert_eq!(engine().calculate(&full(5, 8, 13), &one).score, 63);
    }

    #[test]
    fn test_score_never_exceeds_95() {
        let all_positive = ConfidenceContext {
            alt_line_consistent: true,
            minutes_stable: true,
            role_clear: true,
            favorable_matchup: true,
            h2h_favorable: true,
            is_home: true,
            ..Default::default()
        };
        let result = engine().calculate(&HitRateWindow::new(4, 4, 4, 4, 4, 4).unwrap(), &all_positive);
        assert_eq!(result.base_score, 95);
        assert_eq!(result.score, 95);
        assert_eq!(result.tier, ConfidenceTier::Safe);
        assert_eq!(result.why_not_higher, vec!["Standard uncertainty in sports outcomes"]);
    }

    #[test]
    fn test_score_bounded_for_every_window() {
        let worst = ConfidenceContext {
            is_doubtful: true,
            low_minute_games: 2,
            role_shift_detected: true,
            teammate_missing: true,
            is_road: true,
            ..Default::default()
        };
        let best = ConfidenceContext {
            alt_line_consistent: true,
            minutes_stable: true,
            role_clear: true,
            favorable_matchup: true,
            h2h_favorable: true,
            is_home: true,
            ..Default::default()
        };
        let e = engine();
        for h5 in 0..=5 {
            for h10 in 0..=10 {
                for h15 in (0..=15).step_by(3) {
                    let w = full(h5, h10, h15);
                    for ctx in [&worst, &best, &ConfidenceContext::default()] {
                        let r = e.calculate(&w, ctx);
                        assert!((0..=95).contains(&r.score));
                        assert!((1..=4).contains(&r.why_not_higher.len()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_why_not_higher_caps_at_four() {
        let ctx = ConfidenceContext {
            is_doubtful: true,
            low_minute_games: 1,
            role_shift_detected: true,
            teammate_missing: true,
            is_road: true,
            ..Default::default()
        };
        let r = engine().calculate(&full(5, 8, 13), &ctx);
        assert_eq!(
            r.why_not_higher,
            vec![
                "Player listed as Doubtful",
                "1 low-minute game detected",
                "Recent role shift detected",
                "Key teammate missing",
            ]
        );
    }

    #[test]
    fn test_high_score_gets_variance_reason() {
        let ctx = ConfidenceContext {
            alt_line_consistent: true,
            minutes_stable: true,
            role_clear: true,
            favorable_matchup: true,
            h2h_favorable: true,
            ..Default::default()
        };
        // 70 + 5 + 5 + 4 + 4 + 3 = 91
        let r = engine().calculate(&full(5, 8, 13), &ctx);
        assert_eq!(r.score, 91);
        assert_eq!(r.why_not_higher, vec!["Inherent game-to-game variance"]);
    }

    #[test]
    fn test_team_context_sides() {
        let home = ConfidenceContext::for_team(Some(true), false, false);
        assert!(home.is_home && !home.is_road);
        let away = ConfidenceContext::for_team(Some(false), true, false);
        assert!(away.is_road && away.h2h_favorable);
        let total = ConfidenceContext::for_team(None, false, false);
        assert!(!total.is_home && !total.is_road);
    }
}
