//! Number-based explanations for legs and parlays.
//!
//! Every line is derived from data already on the [`Leg`] or [`Parlay`]:
//! the graded series, the hit-rate window, confidence and cautions. Output
//! is deterministic for the same input.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Rules;
use crate::strategy::projection::LineProjectionEngine;
use crate::types::{BetType, ConfidenceTier, Direction, Ladder, Leg, Parlay};

/// Title plus bullet lines, rendered one per line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub title: String,
    pub lines: Vec<String>,
}

impl Explanation {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

fn average(values: &[f64], n: usize) -> Option<f64> {
    let window = &values[..values.len().min(n)];
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

fn joined(values: &[f64], n: usize, render: impl Fn(f64) -> String) -> String {
    values.iter().take(n).map(|v| render(*v)).collect::<Vec<_>>().join(", ")
}

/// "{verb} in 4 of last 5 games (80%)" for one window of the leg.
fn window_line(leg: &Leg, ladder: Ladder, verb: &str) -> String {
    format!(
        "• {verb} in {} of last {} games ({:.0}%)",
        leg.hit_rate.hits(ladder),
        leg.hit_rate.games(ladder),
        leg.hit_rate.percentage(ladder)
    )
}

pub struct ExplanationEngine {
    rules: Arc<Rules>,
    projection: LineProjectionEngine,
}

impl Default for ExplanationEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()))
    }
}

impl ExplanationEngine {
    pub fn new(rules: Arc<Rules>) -> Self {
        Self {
            projection: LineProjectionEngine::new(rules.clone()),
            rules,
        }
    }

    /// Type-specific reasoning followed by eligibility, confidence,
    /// cautions and price.
    pub fn explain_leg(&self, leg: &Leg) -> Explanation {
        let mut ex = match leg.bet_type {
            BetType::PlayerProp => self.explain_player_prop(leg),
            BetType::Moneyline => self.explain_moneyline(leg),
            BetType::Spread => self.explain_spread(leg),
            BetType::TeamTotal => self.explain_team_total(leg),
            BetType::GameTotal => self.explain_game_total(leg),
        };
        self.append_assessment(&mut ex, leg);
        ex
    }

    pub fn explain_player_prop(&self, leg: &Leg) -> Explanation {
        let mut ex = Explanation::new(&leg.selection.label);
        let direction = leg.selection.direction.unwrap_or(Direction::Over);
        let subject = leg
            .selection
            .player_name
            .clone()
            .unwrap_or_else(|| leg.selection.label.clone());

        match self
            .projection
            .project(&subject, &leg.recent, direction, self.rules.prop_floors)
        {
            Ok(projection) => {
                ex.lines.extend(projection.reasoning().lines().map(str::to_string));
                let mut qualifying: Vec<f64> = projection
                    .alternatives
                    .iter()
                    .filter(|c| c.recommended)
                    .map(|c| c.line)
                    .collect();
                qualifying.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                if qualifying.len() > 1 {
                    ex.push(format!(
                        "• Lines clearing every floor: {}",
                        joined(&qualifying, qualifying.len(), |v| v.to_string())
                    ));
                    let pick = match direction {
                        Direction::Over => "lowest",
                        Direction::Under => "highest",
                    };
                    ex.push(format!("• Chose {}, the {pick} of them", projection.selected.line));
                }
            }
            Err(_) => {
                let verb = match leg.selection.line {
                    Some(line) => format!("{direction} {line}"),
                    None => direction.to_string(),
                };
                for ladder in Ladder::ALL {
                    ex.push(window_line(leg, *ladder, &verb));
                }
            }
        }

        if let Some(player) = &leg.player {
            let adjustment = if player.status_adjustment == 0 {
                "no status adjustment".to_string()
            } else {
                format!("{:+} status adjustment", player.status_adjustment)
            };
            let mut line = format!(
                "• Status: {} ({adjustment}), {:.1} min average",
                player.status, player.avg_minutes
            );
            if player.caution_required {
                line.push_str(", caution note required");
            }
            ex.push(line);
        }

        if !leg.recent.is_empty() {
            ex.push(format!("• Last 5: {}", joined(&leg.recent, 5, |v| format!("{v:.0}"))));
        }
        ex
    }

    pub fn explain_moneyline(&self, leg: &Leg) -> Explanation {
        let mut ex = Explanation::new(&leg.selection.label);
        for ladder in Ladder::ALL {
            if leg.hit_rate.games(*ladder) > 0 {
                ex.push(window_line(leg, *ladder, "Won"));
            }
        }

        if let Some(h2h) = leg.h2h.filter(|h| h.games > 0) {
            ex.push(format!(
                "• Head-to-head ({} days): {}-{} ({:.0}%), supporting data only",
                h2h.window_days,
                h2h.wins,
                h2h.games - h2h.wins,
                h2h.wins as f64 / h2h.games as f64 * 100.0
            ));
        }

        if !leg.recent.is_empty() {
            let results = joined(&leg.recent, 5, |m| if m > 0.0 { "W".into() } else { "L".into() });
            ex.push(format!("• Last 5: {results}"));
        }
        ex
    }

    pub fn explain_spread(&self, leg: &Leg) -> Explanation {
        let mut ex = Explanation::new(&leg.selection.label);
        let line = leg.selection.line.or(leg.spread.map(|s| s.spread)).unwrap_or(0.0);

        if let (Some(l5), Some(l10)) = (average(&leg.recent, 5), average(&leg.recent, 10)) {
            ex.push(format!("• Average margin: L5 {l5:+.1} | L10 {l10:+.1}"));
        }
        let verb = format!("Covered {line:+.1}");
        ex.push(window_line(leg, Ladder::L5, &verb));
        if leg.hit_rate.games(Ladder::L10) > leg.hit_rate.games(Ladder::L5) {
            ex.push(window_line(leg, Ladder::L10, &verb));
        }
        if let Some(stats) = leg.spread {
            ex.push(format!(
                "• {} window: {} covers in {} games, average margin {:+.1}",
                leg.ladder, stats.covers, stats.games, stats.avg_margin
            ));
        }
        if !leg.recent.is_empty() {
            ex.push(format!(
                "• Recent margins: {}",
                joined(&leg.recent, 5, |m| format!("{m:+.0}"))
            ));
        }
        ex
    }

    pub fn explain_team_total(&self, leg: &Leg) -> Explanation {
        self.explain_total(leg, "Average scored", "Recent scores")
    }

    pub fn explain_game_total(&self, leg: &Leg) -> Explanation {
        self.explain_total(leg, "Average combined", "Recent totals")
    }

    fn explain_total(&self, leg: &Leg, average_label: &str, recent_label: &str) -> Explanation {
        let mut ex = Explanation::new(&leg.selection.label);
        let direction = leg.selection.direction.unwrap_or(Direction::Over);
        let line = leg.selection.line.unwrap_or(0.0);

        let l5 = average(&leg.recent, 5);
        if let (Some(l5), Some(l10)) = (l5, average(&leg.recent, 10)) {
            ex.push(format!("• {average_label}: L5 {l5:.1} | L10 {l10:.1}"));
        }
        let verb = format!("{direction} {line}");
        ex.push(window_line(leg, Ladder::L5, &verb));
        if leg.hit_rate.games(Ladder::L10) > leg.hit_rate.games(Ladder::L5) {
            ex.push(window_line(leg, Ladder::L10, &verb));
        }
        if let Some(l5) = l5 {
            let clears = match direction {
                Direction::Over => l5 >= line,
                Direction::Under => l5 <= line,
            };
            ex.push(format!(
                "• L5 average clears the line: {}",
                if clears { "yes" } else { "no" }
            ));
        }
        if !leg.recent.is_empty() {
            ex.push(format!("• {recent_label}: {}", joined(&leg.recent, 5, |v| format!("{v:.0}"))));
        }
        ex
    }

    fn append_assessment(&self, ex: &mut Explanation, leg: &Leg) {
        match &leg.eligibility.rejection_reason {
            Some(reason) if !leg.eligibility.is_eligible => ex.push(format!("• Not eligible: {reason}")),
            _ => ex.push(format!("• Eligible on the {} window", leg.ladder)),
        }
        if let Some(conf) = &leg.confidence {
            ex.push(format!("• Confidence: {conf}"));
            if !conf.why_not_higher.is_empty() {
                ex.push(format!("• Why not higher: {}", conf.why_not_higher.join("; ")));
            }
        }
        if let Some(caution) = leg.caution.as_ref().filter(|c| c.has_cautions()) {
            ex.push(format!("• Caution ({}): {}", caution.level, caution.messages.join("; ")));
        }
        ex.push(format!(
            "• Odds: {} ({:.1}% implied)",
            leg.odds,
            leg.odds.implied_probability()
        ));
    }

    /// Composition, confidence spread and risk factors for a whole parlay.
    pub fn explain_parlay_summary(&self, parlay: &Parlay) -> Explanation {
        let insights = parlay.insights();
        let tiers = self.rules.tiers;
        let mut ex = Explanation::new(format!(
            "Parlay {}: {} legs ({})",
            parlay.id,
            parlay.leg_count(),
            parlay.ladder
        ));

        let composition: Vec<String> = insights
            .type_counts
            .iter()
            .map(|(bet_type, count)| format!("{bet_type} {count}"))
            .collect();
        ex.push(format!("• Composition: {}", composition.join(", ")));

        let (mut safe, mut normal, mut lower) = (0usize, 0usize, 0usize);
        for leg in &parlay.legs {
            match tiers.classify(leg.confidence_score().unwrap_or(0)) {
                ConfidenceTier::Safe => safe += 1,
                ConfidenceTier::Normal => normal += 1,
                ConfidenceTier::Moonshot | ConfidenceTier::HighRisk => lower += 1,
            }
        }
        let mut confidence = format!("• Confidence: {safe} Safe, {normal} Normal, {lower} below Normal");
        if let Some(avg) = insights.average_confidence {
            confidence.push_str(&format!(", average {avg:.0}"));
        }
        ex.push(confidence);
        ex.push(format!(
            "• Average hit rate: {:.1}% on the {} window",
            insights.average_hit_rate, parlay.ladder
        ));

        if insights.correlated_legs > 0 {
            ex.push(format!(
                "• {} correlated leg(s) from the same game, increases variance",
                insights.correlated_legs
            ));
        } else {
            ex.push("• No correlated legs, every leg from a different game");
        }
        if lower > 0 {
            ex.push(format!("• {lower} leg(s) below the Normal floor ({})", tiers.normal));
        }
        if !parlay.legs.is_empty() && safe == parlay.leg_count() {
            ex.push("• All legs in the Safe tier");
        }
        if let Some(risk) = &insights.highest_risk {
            ex.push(format!("• Weakest leg: {} ({:.1}%)", risk.label, risk.hit_rate_pct));
        }

        let american = if parlay.combined_american > 0 {
            format!("+{}", parlay.combined_american)
        } else {
            parlay.combined_american.to_string()
        };
        ex.push(format!(
            "• Price: {american} ({:.2}x), ${:.2} pays ${:.2}",
            parlay.combined_decimal, parlay.wager, parlay.payout
        ));
        ex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::confidence::{ConfidenceContext, ConfidenceEngine};
    use crate::types::{
        CautionResult, EligibilityResult, H2HRecord, HitRateWindow, Matchup, Odds, PlayerContext, PlayerStatus,
        PropType, Requester, Selection, SpreadStats, WindowChecks,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    // ---- helpers -----------------------------------------------------------

    fn engine() -> ExplanationEngine {
        ExplanationEngine::default()
    }

    fn margins() -> Vec<f64> {
        vec![8.0, 12.0, 5.0, 9.0, -3.0, 7.0, 10.0, 6.0, 4.0, 11.0, -2.0, 9.0, 5.0, 8.0, 7.0]
    }

    fn points() -> Vec<f64> {
        vec![
            28.0, 24.0, 31.0, 22.0, 27.0, 25.0, 30.0, 19.0, 26.0, 29.0, 23.0, 27.0, 21.0, 32.0, 24.0,
        ]
    }

    fn leg(bet_type: BetType, label: &str, line: Option<f64>, direction: Option<Direction>, recent: Vec<f64>, hit: impl Fn(f64) -> bool) -> Leg {
        let outcomes: Vec<bool> = recent.iter().map(|v| hit(*v)).collect();
        let window = HitRateWindow::from_outcomes(&outcomes);
        Leg {
            id: format!("leg_{label}"),
            bet_type,
            matchup: Matchup {
                game_id: "g1".into(),
                home_team: "Home".into(),
                away_team: "Away".into(),
                game_date: None,
            },
            selection: Selection {
                label: label.into(),
                line,
                direction,
                team: None,
                player_id: None,
                player_name: None,
                prop_type: None,
            },
            odds: Odds::from_american(-110).unwrap(),
            hit_rate: window,
            ladder: Ladder::L5,
            eligibility: EligibilityResult::eligible(WindowChecks::default()),
            is_home: true,
            h2h: None,
            spread: None,
            projection: None,
            confidence: Some(ConfidenceEngine::default().calculate(&window, &ConfidenceContext::default())),
            caution: Some(CautionResult::none()),
            recent,
            player: None,
        }
    }

    fn scored(mut leg: Leg, game_id: &str, score: i32) -> Leg {
        leg.matchup.game_id = game_id.into();
        if let Some(conf) = leg.confidence.as_mut() {
            conf.score = score;
        }
        leg
    }

    fn parlay(legs: Vec<Leg>) -> Parlay {
        Parlay {
            id: "parlay_test".into(),
            legs,
            wager: dec!(10),
            ladder: Ladder::L5,
            ladder_snapped_from: None,
            min_confidence: None,
            combined_american: 264,
            combined_decimal: dec!(3.644281),
            payout: dec!(36.44),
            created_at: Utc::now(),
            requester: Requester::default(),
        }
    }

    // ---- legs --------------------------------------------------------------

    #[test]
    fn test_player_prop_explains_line_choice() {
        let mut prop = leg(
            BetType::PlayerProp,
            "Jay Doe Over 19 Points",
            Some(19.0),
            Some(Direction::Over),
            points(),
            |v| v > 19.0,
        );
        prop.selection.player_name = Some("Jay Doe".into());
        prop.selection.prop_type = Some(PropType::Points);
        prop.player = Some(PlayerContext {
            status: PlayerStatus::Questionable,
            status_adjustment: -6,
            caution_required: true,
            avg_minutes: 33.5,
            warnings: vec!["Listed as Questionable".into()],
        });

        let ex = engine().explain_leg(&prop);
        assert_eq!(ex.title, "Jay Doe Over 19 Points");
        assert!(ex.contains("Jay Doe has gone over 19 in:"));
        assert!(ex.contains("5 of last 5 games (100%)"));
        assert!(ex.lines.contains(&"• Lines clearing every floor: 19, 21, 22, 23".to_string()));
        assert!(ex.lines.contains(&"• Chose 19, the lowest of them".to_string()));
        assert!(ex.lines.contains(
            &"• Status: questionable (-6 status adjustment), 33.5 min average, caution note required".to_string()
        ));
        assert!(ex.lines.contains(&"• Last 5: 28, 24, 31, 22, 27".to_string()));
        assert!(ex.lines.contains(&"• Odds: -110 (52.4% implied)".to_string()));
    }

    #[test]
    fn test_moneyline_reports_form_and_h2h() {
        let mut ml = leg(BetType::Moneyline, "Home ML", None, None, margins(), |m| m > 0.0);
        ml.h2h = Some(H2HRecord {
            wins: 2,
            games: 3,
            window_days: 365,
        });

        let ex = engine().explain_leg(&ml);
        assert!(ex.lines.contains(&"• Won in 4 of last 5 games (80%)".to_string()));
        assert!(ex.lines.contains(&"• Won in 9 of last 10 games (90%)".to_string()));
        assert!(ex.lines.contains(&"• Won in 13 of last 15 games (87%)".to_string()));
        assert!(ex.lines.contains(&"• Head-to-head (365 days): 2-1 (67%), supporting data only".to_string()));
        assert!(ex.lines.contains(&"• Last 5: W, W, W, W, L".to_string()));
        assert!(ex.contains("Eligible on the L5 window"));
    }

    #[test]
    fn test_spread_reports_margins_and_covers() {
        let mut spread = leg(BetType::Spread, "Home -5.5", Some(-5.5), None, margins(), |m| m - 5.5 > 0.0);
        spread.spread = Some(SpreadStats {
            spread: -5.5,
            avg_margin: 6.2,
            covers: 3,
            games: 5,
        });

        let ex = engine().explain_spread(&spread);
        assert_eq!(ex.lines[0], "• Average margin: L5 +6.2 | L10 +6.9");
        assert!(ex.lines.contains(&"• Covered -5.5 in 3 of last 5 games (60%)".to_string()));
        assert!(ex.lines.contains(&"• Covered -5.5 in 7 of last 10 games (70%)".to_string()));
        assert!(ex.lines.contains(&"• L5 window: 3 covers in 5 games, average margin +6.2".to_string()));
        assert!(ex.lines.contains(&"• Recent margins: +8, +12, +5, +9, -3".to_string()));
    }

    #[test]
    fn test_team_total_reports_scoring() {
        let scores = vec![118.0, 112.0, 105.0, 121.0, 108.0, 115.0, 99.0, 117.0, 111.0, 104.0];
        let total = leg(
            BetType::TeamTotal,
            "Home Team Total Over 110.5",
            Some(110.5),
            Some(Direction::Over),
            scores,
            |v| v > 110.5,
        );

        let ex = engine().explain_leg(&total);
        assert_eq!(ex.lines[0], "• Average scored: L5 112.8 | L10 111.0");
        assert_eq!(ex.lines[1], "• Over 110.5 in 3 of last 5 games (60%)");
        assert_eq!(ex.lines[2], "• Over 110.5 in 6 of last 10 games (60%)");
        assert_eq!(ex.lines[3], "• L5 average clears the line: yes");
        assert_eq!(ex.lines[4], "• Recent scores: 118, 112, 105, 121, 108");
    }

    #[test]
    fn test_game_total_under() {
        let totals = vec![214.0, 226.0, 219.0, 210.0, 231.0];
        let total = leg(
            BetType::GameTotal,
            "Game Total Under 231",
            Some(231.0),
            Some(Direction::Under),
            totals,
            |v| v < 231.0,
        );

        let ex = engine().explain_game_total(&total);
        assert_eq!(ex.lines[0], "• Average combined: L5 220.0 | L10 220.0");
        assert_eq!(ex.lines[1], "• Under 231 in 4 of last 5 games (80%)");
        assert_eq!(ex.lines[2], "• L5 average clears the line: yes");
        assert_eq!(ex.lines[3], "• Recent totals: 214, 226, 219, 210, 231");
    }

    #[test]
    fn test_rejected_leg_states_reason() {
        let mut ml = leg(BetType::Moneyline, "Away ML", None, None, margins(), |m| m > 0.0);
        ml.eligibility = ml.eligibility.veto("Player status: out");
        let ex = engine().explain_leg(&ml);
        assert!(ex.lines.contains(&"• Not eligible: Player status: out".to_string()));
        assert!(!ex.contains("Eligible on the"));
    }

    // ---- parlay ------------------------------------------------------------

    #[test]
    fn test_parlay_summary_flags_correlation_and_low_confidence() {
        let base = || leg(BetType::Moneyline, "Home ML", None, None, margins(), |m| m > 0.0);
        let p = parlay(vec![
            scored(base(), "g1", 85),
            scored(base(), "g1", 65),
            scored(base(), "g2", 45),
        ]);

        let ex = engine().explain_parlay_summary(&p);
        assert_eq!(ex.title, "Parlay parlay_test: 3 legs (L5)");
        assert_eq!(ex.lines[0], "• Composition: Moneyline 3");
        assert_eq!(ex.lines[1], "• Confidence: 1 Safe, 1 Normal, 1 below Normal, average 65");
        assert!(ex.lines.contains(&"• 1 correlated leg(s) from the same game, increases variance".to_string()));
        assert!(ex.lines.contains(&"• 1 leg(s) below the Normal floor (60)".to_string()));
        assert!(!ex.contains("All legs in the Safe tier"));
        assert!(ex.lines.contains(&"• Price: +264 (3.64x), $10.00 pays $36.44".to_string()));
    }

    #[test]
    fn test_parlay_summary_all_safe_and_diversified() {
        let base = || leg(BetType::Moneyline, "Home ML", None, None, margins(), |m| m > 0.0);
        let p = parlay(vec![scored(base(), "g1", 90), scored(base(), "g2", 82)]);

        let ex = engine().explain_parlay_summary(&p);
        assert!(ex.lines.contains(&"• No correlated legs, every leg from a different game".to_string()));
        assert!(ex.lines.contains(&"• All legs in the Safe tier".to_string()));
        assert!(!ex.contains("below the Normal floor"));
        assert!(ex.to_string().starts_with("Parlay parlay_test: 2 legs (L5)\n• Composition"));
    }
}
