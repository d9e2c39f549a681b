//! Hit-rate eligibility.
//!
//! Team-level legs are judged on a per-ladder minimum-hit count. Player props
//! and alt lines must clear a percentage floor in every window, checked
//! L5 → L10 → L15 and stopping at the first failure. Odds outside the
//! allowed range veto any leg regardless of its hit rate.

use std::sync::Arc;

use tracing::debug;

use crate::config::{Floors, Rules};
use crate::types::{percentage, BetType, EligibilityResult, HitRateWindow, Ladder, WindowChecks};

fn signed(american: i32) -> String {
    if american > 0 {
        format!("+{american}")
    } else {
        american.to_string()
    }
}

/// Whether a window's rate, rounded to a whole percent, meets `floor`.
pub fn meets_floor(hits: u32, games: u32, floor: u32) -> bool {
    if games == 0 {
        return false;
    }
    percentage(hits, games).round() as u32 >= floor
}

/// Whether all three windows of `window` meet their floors.
pub fn meets_floors(window: &HitRateWindow, floors: Floors) -> bool {
    Ladder::ALL
        .iter()
        .all(|l| meets_floor(window.hits(*l), window.games(*l), floors.get(*l)))
}

pub struct EligibilityEngine {
    rules: Arc<Rules>,
}

impl Default for EligibilityEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl EligibilityEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    /// Minimum hits for a ladder, or `None` if the ladder has no entry.
    pub fn threshold_for(&self, ladder: u32) -> Option<u32> {
        Ladder::from_games(ladder).and_then(|l| self.rules.ladder_thresholds.get(&l).copied())
    }

    /// Count-threshold check for team-level legs.
    pub fn check_eligibility(&self, hits: u32, games: u32, ladder: u32) -> EligibilityResult {
        let mut windows = WindowChecks::default();

        let Some(threshold) = self.threshold_for(ladder) else {
            return EligibilityResult::rejected(
                format!("No threshold configured for ladder {ladder}"),
                windows,
            );
        };
        // threshold_for only succeeds for a valid ladder
        let Some(window) = Ladder::from_games(ladder) else {
            return EligibilityResult::rejected(format!("Invalid ladder {ladder}"), windows);
        };

        if games < ladder {
            windows.set(window, false);
            return EligibilityResult::rejected(
                format!("Insufficient sample: {games} games for {window}"),
                windows,
            );
        }

        let passed = hits >= threshold;
        windows.set(window, passed);
        if passed {
            EligibilityResult::eligible(windows)
        } else {
            EligibilityResult::rejected(
                format!("Hit rate {hits}/{games} below threshold {threshold}/{ladder}"),
                windows,
            )
        }
    }

    /// All-window percentage floors for player props.
    pub fn check_player_prop_eligibility(
        &self,
        hits_l5: u32,
        hits_l10: u32,
        hits_l15: u32,
        games_l5: u32,
        games_l10: u32,
        games_l15: u32,
    ) -> EligibilityResult {
        self.check_floors(
            [
                (Ladder::L5, hits_l5, games_l5),
                (Ladder::L10, hits_l10, games_l10),
                (Ladder::L15, hits_l15, games_l15),
            ],
            self.rules.prop_floors,
        )
    }

    /// Looser all-window floors for alternate lines.
    pub fn check_alt_line_eligibility(
        &self,
        hits_l5: u32,
        hits_l10: u32,
        hits_l15: u32,
        games_l5: u32,
        games_l10: u32,
        games_l15: u32,
    ) -> EligibilityResult {
        self.check_floors(
            [
                (Ladder::L5, hits_l5, games_l5),
                (Ladder::L10, hits_l10, games_l10),
                (Ladder::L15, hits_l15, games_l15),
            ],
            self.rules.alt_line_floors,
        )
    }

    /// Prop floors applied to a window.
    pub fn check_window(&self, window: &HitRateWindow) -> EligibilityResult {
        self.check_player_prop_eligibility(
            window.hits(Ladder::L5),
            window.hits(Ladder::L10),
            window.hits(Ladder::L15),
            window.games(Ladder::L5),
            window.games(Ladder::L10),
            window.games(Ladder::L15),
        )
    }

    fn check_floors(&self, checks: [(Ladder, u32, u32); 3], floors: Floors) -> EligibilityResult {
        let mut windows = WindowChecks::default();
        for (ladder, hits, games) in checks {
            let floor = floors.get(ladder);
            let passed = meets_floor(hits, games, floor);
            windows.set(ladder, passed);
            if !passed {
                return EligibilityResult::rejected(
                    format!(
                        "{ladder} hit rate {:.1}% ({hits}/{games}) below {floor}% floor",
                        percentage(hits, games)
                    ),
                    windows,
                );
            }
        }
        EligibilityResult::eligible(windows)
    }

    /// Whether American odds fall inside the allowed range.
    pub fn check_odds_range(&self, american: i32) -> EligibilityResult {
        let range = self.rules.odds_range;
        if (range.min..=range.max).contains(&american) {
            EligibilityResult::eligible(WindowChecks::default())
        } else {
            EligibilityResult::rejected(
                format!(
                    "Odds {} outside allowed range [{}, {}]",
                    signed(american),
                    signed(range.min),
                    signed(range.max)
                ),
                WindowChecks::default(),
            )
        }
    }

    /// Full eligibility for one leg: hit-rate rule for its bet type, then
    /// the odds veto.
    pub fn evaluate(
        &self,
        bet_type: BetType,
        window: &HitRateWindow,
        ladder: Ladder,
        american: i32,
    ) -> EligibilityResult {
        let result = match bet_type {
            BetType::PlayerProp => self.check_window(window),
            _ => self.check_eligibility(window.hits(ladder), window.games(ladder), ladder.games()),
        };

        let odds = self.check_odds_range(american);
        let result = match odds.rejection_reason {
            Some(reason) => result.veto(reason),
            None => result,
        };

        if let Some(reason) = &result.rejection_reason {
            debug!(bet_type = %bet_type, %ladder, reason = %reason, "Leg rejected");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- helpers -----------------------------------------------------------

    fn engine() -> EligibilityEngine {
        EligibilityEngine::default()
    }

    fn window(h5: u32, h10: u32, h15: u32) -> HitRateWindow {
        HitRateWindow::new(h5, 5, h10, 10, h15, 15).unwrap()
    }

    // ---- team-level thresholds --------------------------------------------

    #[test]
    fn test_thresholds() {
        let e = engine();
        assert_eq!(e.threshold_for(5), Some(3));
        assert_eq!(e.threshold_for(10), Some(7));
        assert_eq!(e.threshold_for(15), Some(10));
        assert_eq!(e.threshold_for(7), None);
    }

    #[test]
    fn test_threshold_met() {
        let r = engine().check_eligibility(3, 5, 5);
        assert!(r.is_eligible);
        assert_eq!(r.windows.l5, Some(true));
        assert_eq!(r.windows.l10, None);
    }

    #[test]
    fn test_threshold_missed_names_shortfall() {
        let r = engine().check_eligibility(2, 5, 5);
        assert!(!r.is_eligible);
        assert_eq!(r.rejection_reason.as_deref(), Some("Hit rate 2/5 below threshold 3/5"));
    }

    #[test]
    fn test_unknown_ladder_rejected_not_defaulted() {
        let r = engine().check_eligibility(7, 7, 7);
        assert!(!r.is_eligible);
        assert!(r.rejection_reason.unwrap().contains("ladder 7"));
    }

    #[test]
    fn test_short_sample_fails_closed() {
        let r = engine().check_eligibility(4, 4, 5);
        assert!(!r.is_eligible);
        assert!(r.rejection_reason.unwrap().contains("Insufficient sample"));
    }

    // ---- percentage floors -------------------------------------------------

    #[test]
    fn test_prop_eligible_at_floors() {
        let r = engine().check_player_prop_eligibility(4, 7, 10, 5, 10, 15);
        assert!(r.is_eligible);
        assert_eq!(r.windows.l5, Some(true));
        assert_eq!(r.windows.l10, Some(true));
        assert_eq!(r.windows.l15, Some(true));
    }

    #[test]
    fn test_prop_short_circuits_on_l5() {
        let r = engine().check_player_prop_eligibility(3, 7, 10, 5, 10, 15);
        assert!(!r.is_eligible);
        assert!(r.rejection_reason.unwrap().starts_with("L5"));
        assert_eq!(r.windows.l5, Some(false));
        assert_eq!(r.windows.l10, None);
        assert_eq!(r.windows.l15, None);
    }

    #[test]
    fn test_prop_fails_on_l15() {
        let r = engine().check_player_prop_eligibility(5, 8, 9, 5, 10, 15);
        assert!(!r.is_eligible);
        assert!(r.rejection_reason.unwrap().starts_with("L15"));
        assert_eq!(r.windows.l10, Some(true));
        assert_eq!(r.windows.l15, Some(false));
    }

    #[test]
    fn test_alt_line_floors_are_looser() {
        let e = engine();
        assert!(!e.check_player_prop_eligibility(3, 7, 10, 5, 10, 15).is_eligible);
        assert!(e.check_alt_line_eligibility(3, 7, 10, 5, 10, 15).is_eligible);
        assert!(!e.check_alt_line_eligibility(3, 6, 10, 5, 10, 15).is_eligible);
    }

    #[test]
    fn test_meets_floor_rounding() {
        assert!(meets_floor(10, 15, 67));
        assert!(!meets_floor(9, 15, 67));
        assert!(!meets_floor(0, 0, 0));
    }

    // ---- odds --------------------------------------------------------------

    #[test]
    fn test_odds_range_bounds() {
        let e = engine();
        assert!(e.check_odds_range(-250).is_eligible);
        assert!(e.check_odds_range(180).is_eligible);
        assert!(e.check_odds_range(-110).is_eligible);
        assert!(!e.check_odds_range(-300).is_eligible);
        let r = e.check_odds_range(200);
        assert_eq!(
            r.rejection_reason.as_deref(),
            Some("Odds +200 outside allowed range [-250, +180]")
        );
    }

    #[test]
    fn test_evaluate_odds_veto_overrides_hit_rate() {
        let r = engine().evaluate(BetType::Moneyline, &window(5, 10, 15), Ladder::L5, 250);
        assert!(!r.is_eligible);
        assert!(r.rejection_reason.unwrap().contains("Odds"));
        // hit-rate window still recorded
        assert_eq!(r.windows.l5, Some(true));
    }

    #[test]
    fn test_evaluate_uses_ladder_window_for_team_legs() {
        let w = window(2, 8, 11);
        let e = engine();
        assert!(!e.evaluate(BetType::Spread, &w, Ladder::L5, -110).is_eligible);
        assert!(e.evaluate(BetType::Spread, &w, Ladder::L10, -110).is_eligible);
        assert!(e.evaluate(BetType::GameTotal, &w, Ladder::L15, -110).is_eligible);
    }

    #[test]
    fn test_evaluate_props_use_floors() {
        let e = engine();
        assert!(e.evaluate(BetType::PlayerProp, &window(4, 7, 10), Ladder::L5, -110).is_eligible);
        assert!(!e.evaluate(BetType::PlayerProp, &window(4, 6, 10), Ladder::L5, -110).is_eligible);
    }
}
