//! Optimal line projection.
//!
//! The only candidate lines are values the subject actually produced. For
//! an OVER the scan runs ascending and stops at the first value whose
//! strict hit rate clears every floor; for an UNDER it runs descending.
//! When nothing qualifies there is no line. Callers must drop the prop
//! rather than fall back to a default.

use std::sync::Arc;

use crate::config::{Floors, Rules};
use crate::error::{CoreError, Result};
use crate::strategy::eligibility::meets_floors;
use crate::types::{round1, AltLineCandidate, Direction, HitRateWindow, Ladder};

/// Samples required before any line is projected.
pub const MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverages {
    pub l5: f64,
    pub l10: f64,
    pub l15: f64,
}

/// Selected line plus the full candidate ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub subject: String,
    pub direction: Direction,
    pub selected: AltLineCandidate,
    pub averages: WindowAverages,
    /// Every distinct candidate, best consistency first.
    pub alternatives: Vec<AltLineCandidate>,
}

impl Projection {
    /// Bullet-point explanation of the selection.
    pub fn reasoning(&self) -> String {
        let s = &self.selected;
        let dir = match self.direction {
            Direction::Over => "over",
            Direction::Under => "under",
        };
        let line = |l: Ladder| {
            format!(
                "  - {} of last {} games ({:.0}%)",
                s.window.hits(l),
                s.window.games(l),
                s.window.percentage(l)
            )
        };
        let sign = if s.avg_margin > 0.0 { "+" } else { "" };
        [
            format!("• {} has gone {dir} {} in:", self.subject, s.line),
            line(Ladder::L5),
            line(Ladder::L10),
            line(Ladder::L15),
            format!(
                "• Averages: L5 {} | L10 {} | L15 {}",
                self.averages.l5, self.averages.l10, self.averages.l15
            ),
            format!("• Average margin: {sign}{}", s.avg_margin),
        ]
        .join("\n")
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; zero below two values.
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// `mean(rates)×100 − stdev(rates)×20`, clamped to 0–100, one decimal.
pub fn consistency_score(rate_l5: f64, rate_l10: f64, rate_l15: f64) -> f64 {
    let rates = [rate_l5, rate_l10, rate_l15];
    let score = mean(&rates) * 100.0 - stdev(&rates) * 20.0;
    round1(score).clamp(0.0, 100.0)
}

fn window_rate(window: &HitRateWindow, ladder: Ladder) -> f64 {
    let games = window.games(ladder);
    if games == 0 {
        0.0
    } else {
        window.hits(ladder) as f64 / games as f64
    }
}

pub struct LineProjectionEngine {
    rules: Arc<Rules>,
}

impl Default for LineProjectionEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl LineProjectionEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    pub fn prop_floors(&self) -> Floors {
        self.rules.prop_floors
    }

    pub fn alt_line_floors(&self) -> Floors {
        self.rules.alt_line_floors
    }

    fn require_samples(values: &[f64]) -> Result<()> {
        if values.len() < MIN_SAMPLES {
            return Err(CoreError::InsufficientData {
                required: MIN_SAMPLES,
                available: values.len(),
            });
        }
        Ok(())
    }

    /// Evaluate one line against a most-recent-first series.
    pub fn analyze_line(&self, values: &[f64], line: f64, direction: Direction, floors: Floors) -> AltLineCandidate {
        let outcomes: Vec<bool> = values.iter().map(|v| direction.hits(*v, line)).collect();
        let window = HitRateWindow::from_outcomes(&outcomes);

        let l15 = &values[..values.len().min(15)];
        let margins: Vec<f64> = l15
            .iter()
            .map(|v| match direction {
                Direction::Over => v - line,
                Direction::Under => line - v,
            })
            .collect();

        let rate_l5 = window_rate(&window, Ladder::L5);
        let rate_l10 = window_rate(&window, Ladder::L10);
        let rate_l15 = window_rate(&window, Ladder::L15);

        AltLineCandidate {
            line,
            direction,
            window,
            rate_l5,
            rate_l10,
            rate_l15,
            avg_margin: round1(mean(&margins)),
            consistency_score: consistency_score(rate_l5, rate_l10, rate_l15),
            recommended: meets_floors(&window, floors),
        }
    }

    /// Distinct historical values in scan order for `direction`.
    fn scan_order(values: &[f64], direction: Direction) -> Vec<f64> {
        let mut lines: Vec<f64> = values[..values.len().min(15)].to_vec();
        lines.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        lines.dedup();
        if direction == Direction::Under {
            lines.reverse();
        }
        lines
    }

    /// First qualifying historical value, or `None`.
    pub fn find_optimal_line(&self, values: &[f64], direction: Direction, floors: Floors) -> Result<Option<f64>> {
        Self::require_samples(values)?;
        Ok(Self::scan_order(values, direction)
            .into_iter()
            .find(|line| self.analyze_line(values, *line, direction, floors).recommended))
    }

    /// Full projection with the ranked alternatives.
    pub fn project(&self, subject: &str, values: &[f64], direction: Direction, floors: Floors) -> Result<Projection> {
        let line = self
            .find_optimal_line(values, direction, floors)?
            .ok_or_else(|| CoreError::NoEligibleLine {
                subject: subject.to_string(),
                direction: direction.to_string(),
            })?;

        let selected = self.analyze_line(values, line, direction, floors);
        let mut alternatives: Vec<AltLineCandidate> = Self::scan_order(values, direction)
            .into_iter()
            .map(|l| self.analyze_line(values, l, direction, floors))
            .collect();
        alternatives.sort_by(|a, b| {
            b.consistency_score
                .partial_cmp(&a.consistency_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let avg = |n: usize| round1(mean(&values[..values.len().min(n)]));
        Ok(Projection {
            subject: subject.to_string(),
            direction,
            selected,
            averages: WindowAverages {
                l5: avg(5),
                l10: avg(10),
                l15: avg(15),
            },
            alternatives,
        })
    }

    // ---- heuristic team lines ----------------------------------------------

    /// Spread from recent margins: `-(round(avg_margin × 0.7, 1))`.
    pub fn spread_line(margins: &[f64]) -> f64 {
        let line = -round1(mean(margins) * 0.7);
        // avoid -0.0 in display
        if line == 0.0 {
            0.0
        } else {
            line
        }
    }

    /// (over line, under line) for a game total: average ∓ 2.
    pub fn game_total_lines(totals: &[f64]) -> (f64, f64) {
        let avg = mean(totals);
        (round1(avg - 2.0), round1(avg + 2.0))
    }

    /// (over line, under line) for a team total: average ∓ 1.5.
    pub fn team_total_lines(points: &[f64]) -> (f64, f64) {
        let avg = mean(points);
        (round1(avg - 1.5), round1(avg + 1.5))
    }

    /// Spread between the highest and lowest window rate.
    pub fn rate_variance(candidate: &AltLineCandidate) -> f64 {
        let rates = [candidate.rate_l5, candidate.rate_l10, candidate.rate_l15];
        let max = rates.iter().cloned().fold(f64::MIN, f64::max);
        let min = rates.iter().cloned().fold(f64::MAX, f64::min);
        max - min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- helpers -----------------------------------------------------------

    fn engine() -> LineProjectionEngine {
        LineProjectionEngine::default()
    }

    fn points() -> Vec<f64> {
        vec![
            28.0, 24.0, 31.0, 22.0, 27.0, 25.0, 30.0, 19.0, 26.0, 29.0, 23.0, 27.0, 21.0, 32.0, 24.0,
        ]
    }

    // ---- line search -------------------------------------------------------

    #[test]
    fn test_requires_five_samples() {
        let e = engine();
        let err = e
            .find_optimal_line(&[20.0, 21.0, 22.0, 23.0], Direction::Over, e.prop_floors())
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientData { required: 5, available: 4 }));
    }

    #[test]
    fn test_over_line_is_member_of_input() {
        let e = engine();
        let values = points();
        let line = e
            .find_optimal_line(&values, Direction::Over, e.prop_floors())
            .unwrap()
            .unwrap();
        assert!(values.contains(&line));
        // lowest value: L5 5/5, L10 9/10, L15 14/15
        assert_eq!(line, 19.0);
    }

    #[test]
    fn test_under_line_scans_descending() {
        let e = engine();
        let values = points();
        let line = e
            .find_optimal_line(&values, Direction::Under, e.prop_floors())
            .unwrap()
            .unwrap();
        let cand = e.analyze_line(&values, line, Direction::Under, e.prop_floors());
        assert!(cand.recommended);
        assert_eq!(line, 32.0);
        assert_eq!(cand.window.hits(Ladder::L15), 14);
    }

    #[test]
    fn test_no_line_when_floors_unreachable() {
        let e = engine();
        // alternating series never reaches 80% over L5 on a strict line
        let values = vec![10.0, 30.0, 10.0, 30.0, 10.0, 30.0];
        assert_eq!(e.find_optimal_line(&values, Direction::Over, e.prop_floors()).unwrap(), None);
        let err = e.project("Test Player points", &values, Direction::Over, e.prop_floors()).unwrap_err();
        assert!(matches!(err, CoreError::NoEligibleLine { .. }));
    }

    #[test]
    fn test_strict_comparison() {
        let e = engine();
        let values = vec![20.0; 6];
        let cand = e.analyze_line(&values, 20.0, Direction::Over, e.prop_floors());
        assert_eq!(cand.window.hits(Ladder::L5), 0);
        assert!(!cand.recommended);
    }

    #[test]
    fn test_alt_floors_allow_higher_over_line() {
        let e = engine();
        let values = points();
        let prop = e.find_optimal_line(&values, Direction::Over, e.prop_floors()).unwrap().unwrap();
        let alt = e
            .find_optimal_line(&values, Direction::Over, e.alt_line_floors())
            .unwrap()
            .unwrap();
        assert!(alt >= prop);
    }

    #[test]
    fn test_project_fills_averages_and_alternatives() {
        let e = engine();
        let p = e.project("Test Player points", &points(), Direction::Over, e.prop_floors()).unwrap();
        assert_eq!(p.selected.line, 19.0);
        assert_eq!(p.averages.l5, 26.4);
        assert!(!p.alternatives.is_empty());
        assert!(p.alternatives[0].consistency_score >= p.alternatives[p.alternatives.len() - 1].consistency_score);
        assert!(p.reasoning().contains("has gone over 19"));
    }

    // ---- scoring -----------------------------------------------------------

    #[test]
    fn test_consistency_score() {
        assert_eq!(consistency_score(1.0, 1.0, 1.0), 100.0);
        assert_eq!(consistency_score(0.0, 0.0, 0.0), 0.0);
        // mean 0.9, stdev 0.1 → 90 − 2 = 88
        assert_eq!(consistency_score(1.0, 0.9, 0.8), 88.0);
    }

    #[test]
    fn test_heuristic_team_lines() {
        assert_eq!(LineProjectionEngine::spread_line(&[10.0, 6.0, 8.0]), -5.6);
        assert_eq!(LineProjectionEngine::spread_line(&[-4.0, -6.0]), 3.5);
        assert_eq!(LineProjectionEngine::game_total_lines(&[220.0, 224.0]), (220.0, 224.0));
        assert_eq!(LineProjectionEngine::team_total_lines(&[110.0, 114.0]), (110.5, 113.5));
    }

    #[test]
    fn test_rate_variance() {
        let e = engine();
        let cand = e.analyze_line(&points(), 26.0, Direction::Over, e.alt_line_floors());
        let v = LineProjectionEngine::rate_variance(&cand);
        assert!((0.0..=1.0).contains(&v));
    }
}
