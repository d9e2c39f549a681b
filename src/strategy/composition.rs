//! Parlay composition.
//!
//! Builds the candidate-leg universe for a slate, runs every candidate
//! through eligibility, player status, caution and confidence, filters to
//! selectable legs, draws a diversified subset and prices the parlay.
//! Everything here is synchronous and free of I/O; the slate arrives
//! pre-fetched as [`GameSample`]s.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, Rules};
use crate::error::{CoreError, Result};
use crate::strategy::caution::{CautionEngine, PlayerCautionInput, TeamCautionInput};
use crate::strategy::confidence::{ConfidenceContext, ConfidenceEngine};
use crate::strategy::eligibility::EligibilityEngine;
use crate::strategy::player_status::PlayerStatusEngine;
use crate::strategy::projection::LineProjectionEngine;
use crate::types::{
    round1, AltLineCandidate, BetType, CautionResult, Direction, Game, GameResult, GameSample, H2HRecord,
    HitRateWindow, Ladder, Leg, Matchup, Odds, OddsMarket, Parlay, ParlayRequest, PlayerContext, PlayerSample,
    PlayerStatus, PropType, RankedPick, Selection, SpreadStats, TeamRef,
};

/// Spread size at which a blowout becomes a caution.
const BLOWOUT_SPREAD: f64 = 12.0;
/// Projected lines at or above this consistency count as consistent.
const ALT_LINE_CONSISTENT: f64 = 80.0;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSettings {
    pub default_ladder: Ladder,
    pub min_legs: usize,
    pub max_legs: usize,
    pub min_wager: Decimal,
    pub max_wager: Decimal,
    pub top_players_per_team: usize,
    pub prop_types: Vec<PropType>,
    pub fallback_american: i32,
    pub h2h_window_days: i64,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            default_ladder: Ladder::L5,
            min_legs: 2,
            max_legs: 10,
            min_wager: dec!(1),
            max_wager: dec!(10000),
            top_players_per_team: 3,
            prop_types: vec![PropType::Points, PropType::Rebounds, PropType::Assists],
            fallback_american: -110,
            h2h_window_days: 365,
        }
    }
}

impl CompositionSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let prop_types = config
            .bot
            .prop_types
            .iter()
            .map(|s| s.parse::<PropType>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            default_ladder: Ladder::try_from(config.bot.default_ladder)?,
            min_legs: config.bot.min_legs,
            max_legs: config.bot.max_legs,
            min_wager: config.bot.min_wager,
            max_wager: config.bot.max_wager,
            top_players_per_team: config.bot.top_players_per_team,
            prop_types,
            fallback_american: config.odds.fallback_american,
            ..Self::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn new_leg_id() -> String {
    format!("leg_{}", &Uuid::new_v4().simple().to_string()[..8])
}

pub fn new_parlay_id() -> String {
    format!("parlay_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Decimal odds back to American: `d ≥ 2 ⇒ (d−1)×100`, else `−100/(d−1)`.
pub fn decimal_to_american(decimal: Decimal) -> Result<i32> {
    if decimal <= Decimal::ONE {
        return Err(CoreError::Validation(format!(
            "Decimal odds must exceed 1.0, got {decimal}"
        )));
    }
    let american = if decimal >= dec!(2) {
        ((decimal - Decimal::ONE) * dec!(100)).round()
    } else {
        (dec!(-100) / (decimal - Decimal::ONE)).round()
    };
    american
        .to_i32()
        .ok_or_else(|| CoreError::Validation(format!("American odds out of range for {decimal}")))
}

/// Product of leg decimals and its American equivalent.
pub fn combine_odds(legs: &[Leg]) -> Result<(Decimal, i32)> {
    let decimal = legs
        .iter()
        .fold(Decimal::ONE, |acc, leg| acc * leg.odds.decimal());
    Ok((decimal, decimal_to_american(decimal)?))
}

/// `round(wager × decimal, 2)`.
pub fn payout(wager: Decimal, decimal: Decimal) -> Decimal {
    (wager * decimal).round_dp(2)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

fn game_day(game: &Game) -> NaiveDate {
    game.date
        .as_deref()
        .and_then(parse_date)
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn is_back_to_back(history: &[GameResult], day: NaiveDate) -> bool {
    history
        .first()
        .and_then(|g| parse_date(&g.date))
        .is_some_and(|last| (day - last).num_days() == 1)
}

/// Opponent won fewer than 40% of its last ten.
fn is_weak(history: &[GameResult]) -> bool {
    let recent = &history[..history.len().min(10)];
    !recent.is_empty() && (recent.iter().filter(|g| g.won()).count() as f64) < recent.len() as f64 * 0.4
}

fn is_out(player: &PlayerSample) -> bool {
    matches!(
        PlayerStatusEngine::parse_injury_status(player.info.injury_status.as_deref()),
        PlayerStatus::Out | PlayerStatus::Suspended
    )
}

/// Top `n` roster players by season minutes.
fn top_players(players: &[PlayerSample], n: usize) -> Vec<&PlayerSample> {
    let mut ranked: Vec<&PlayerSample> = players.iter().collect();
    ranked.sort_by(|a, b| {
        b.info
            .season_average_minutes
            .partial_cmp(&a.info.season_average_minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// One team's view of a game.
struct TeamView<'a> {
    team: &'a TeamRef,
    is_home: bool,
    history: &'a [GameResult],
    opponent_history: &'a [GameResult],
    players: &'a [PlayerSample],
    back_to_back: bool,
    star_out: bool,
    key_out: bool,
    spread_line: f64,
    h2h: Option<H2HRecord>,
}

impl TeamView<'_> {
    fn window(&self, ladder: Ladder) -> &[GameResult] {
        &self.history[..self.history.len().min(ladder.games() as usize)]
    }
}

/// A leg before odds, eligibility and confidence are attached.
struct Draft {
    bet_type: BetType,
    selection: Selection,
    window: HitRateWindow,
    market: OddsMarket,
    odds_selection: String,
    is_home: bool,
    h2h: Option<H2HRecord>,
    spread: Option<SpreadStats>,
    projection: Option<AltLineCandidate>,
    context: ConfidenceContext,
    caution: CautionResult,
    veto: Option<String>,
    recent: Vec<f64>,
    player: Option<PlayerContext>,
}

fn team_selection(label: String, team: &TeamRef, line: Option<f64>, direction: Option<Direction>) -> Selection {
    Selection {
        label,
        line,
        direction,
        team: Some(team.clone()),
        player_id: None,
        player_name: None,
        prop_type: None,
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ParlayCompositionEngine {
    rules: Arc<Rules>,
    settings: CompositionSettings,
    eligibility: EligibilityEngine,
    confidence: ConfidenceEngine,
    caution: CautionEngine,
    player_status: PlayerStatusEngine,
    projection: LineProjectionEngine,
}

impl Default for ParlayCompositionEngine {
    fn default() -> Self {
        Self::new(Arc::new(Rules::locked()), CompositionSettings::default())
    }
}

impl ParlayCompositionEngine {
    pub fn new(rules: Arc<Rules>, settings: CompositionSettings) -> Self {
        Self {
            settings,
            eligibility: EligibilityEngine::new(rules.clone()),
            confidence: ConfidenceEngine::new(rules.clone()),
            caution: CautionEngine::new(rules.clone()),
            player_status: PlayerStatusEngine::new(rules.clone()),
            projection: LineProjectionEngine::new(rules.clone()),
            rules,
        }
    }

    pub fn settings(&self) -> &CompositionSettings {
        &self.settings
    }

    pub fn rules(&self) -> &Arc<Rules> {
        &self.rules
    }

    // ---- request validation ------------------------------------------------

    /// Valid ladders pass through; anything else snaps to the default and
    /// the requested value is returned for the record.
    pub fn resolve_ladder(&self, requested: u32) -> (Ladder, Option<u32>) {
        match Ladder::from_games(requested) {
            Some(ladder) => (ladder, None),
            None => {
                warn!(
                    requested,
                    default = %self.settings.default_ladder,
                    "Invalid ladder, snapping to default"
                );
                (self.settings.default_ladder, Some(requested))
            }
        }
    }

    pub fn validate_request(&self, request: &ParlayRequest) -> Result<()> {
        let s = &self.settings;
        if request.legs < s.min_legs || request.legs > s.max_legs {
            return Err(CoreError::Validation(format!(
                "Legs must be between {} and {}, got {}",
                s.min_legs, s.max_legs, request.legs
            )));
        }
        if request.wager < s.min_wager || request.wager > s.max_wager {
            return Err(CoreError::Validation(format!(
                "Wager must be between ${} and ${}, got ${}",
                s.min_wager, s.max_wager, request.wager
            )));
        }
        Ok(())
    }

    // ---- candidate generation ----------------------------------------------

    fn team_view<'a>(&self, sample: &'a GameSample, is_home: bool, ladder: Ladder, day: NaiveDate) -> TeamView<'a> {
        let (team, history, opponent_history, players) = if is_home {
            (&sample.game.home, &sample.home_history, &sample.away_history, &sample.home_players)
        } else {
            (&sample.game.away, &sample.away_history, &sample.home_history, &sample.away_players)
        };

        let top = top_players(players, self.settings.top_players_per_team);
        let star_out = top.first().is_some_and(|p| is_out(p));
        let key_out = top.iter().skip(1).any(|p| is_out(p));

        let window = &history[..history.len().min(ladder.games() as usize)];
        let margins: Vec<f64> = window.iter().map(|g| g.margin() as f64).collect();

        TeamView {
            team,
            is_home,
            history,
            opponent_history,
            players,
            back_to_back: is_back_to_back(history, day),
            star_out,
            key_out,
            spread_line: LineProjectionEngine::spread_line(&margins),
            h2h: self.h2h_record(&sample.head_to_head, is_home, day),
        }
    }

    /// Head-to-head inside the lookback window. Results are stored from
    /// the home team's perspective.
    fn h2h_record(&self, results: &[GameResult], is_home: bool, day: NaiveDate) -> Option<H2HRecord> {
        let window_days = self.settings.h2h_window_days;
        let games: Vec<&GameResult> = results
            .iter()
            .filter(|g| {
                parse_date(&g.date).is_some_and(|d| d <= day && (day - d).num_days() <= window_days)
            })
            .collect();
        if games.is_empty() {
            return None;
        }
        let wins = games
            .iter()
            .filter(|g| if is_home { g.won() } else { g.opponent_score > g.team_score })
            .count() as u32;
        Some(H2HRecord {
            wins,
            games: games.len() as u32,
            window_days,
        })
    }

    fn team_caution(&self, side: &TeamView, blowout: bool) -> CautionResult {
        self.caution.detect_team_cautions(&TeamCautionInput {
            star_player_out: side.star_out,
            key_player_out: side.key_out,
            is_back_to_back: side.back_to_back,
            is_road: !side.is_home,
            spread_size: side.spread_line,
            is_large_spread: false,
            blowout_risk: blowout,
        })
    }

    fn moneyline(&self, side: &TeamView, blowout: bool) -> Draft {
        let outcomes: Vec<bool> = side.history.iter().map(GameResult::won).collect();
        Draft {
            bet_type: BetType::Moneyline,
            selection: team_selection(format!("{} ML", side.team.name), side.team, None, None),
            window: HitRateWindow::from_outcomes(&outcomes),
            market: OddsMarket::Moneyline,
            odds_selection: side.team.name.clone(),
            is_home: side.is_home,
            h2h: side.h2h,
            spread: None,
            projection: None,
            context: ConfidenceContext::for_team(
                Some(side.is_home),
                side.h2h.is_some_and(|h| h.is_favorable()),
                is_weak(side.opponent_history),
            ),
            caution: self.team_caution(side, blowout),
            veto: None,
            recent: side.history.iter().map(|g| g.margin() as f64).collect(),
            player: None,
        }
    }

    fn spread(&self, side: &TeamView, ladder: Ladder, blowout: bool) -> Draft {
        let line = side.spread_line;
        let window = side.window(ladder);
        let margins: Vec<f64> = window.iter().map(|g| g.margin() as f64).collect();
        let avg_margin = round1(mean(&margins));
        let outcomes: Vec<bool> = side.history.iter().map(|g| g.margin() as f64 + line > 0.0).collect();
        let covers = outcomes[..window.len()].iter().filter(|c| **c).count() as u32;

        let roster = self.caution.detect_team_cautions(&TeamCautionInput {
            star_player_out: side.star_out,
            key_player_out: side.key_out,
            blowout_risk: blowout,
            ..Default::default()
        });
        let spread = self
            .caution
            .detect_spread_cautions(line, avg_margin + line, !side.is_home, side.back_to_back);

        Draft {
            bet_type: BetType::Spread,
            selection: team_selection(format!("{} {:+.1}", side.team.name, line), side.team, Some(line), None),
            window: HitRateWindow::from_outcomes(&outcomes),
            market: OddsMarket::Spread,
            odds_selection: side.team.name.clone(),
            is_home: side.is_home,
            h2h: side.h2h,
            spread: Some(SpreadStats {
                spread: line,
                avg_margin,
                covers,
                games: window.len() as u32,
            }),
            projection: None,
            context: ConfidenceContext::for_team(
                Some(side.is_home),
                side.h2h.is_some_and(|h| h.is_favorable()),
                is_weak(side.opponent_history),
            ),
            caution: self.caution.merge([roster, spread]),
            veto: None,
            recent: side.history.iter().map(|g| g.margin() as f64).collect(),
            player: None,
        }
    }

    fn game_total(&self, home: &TeamView, away: &TeamView, direction: Direction, ladder: Ladder, blowout: bool) -> Draft {
        let totals: Vec<f64> = home.window(ladder).iter().map(|g| g.total() as f64).collect();
        let (over, under) = LineProjectionEngine::game_total_lines(&totals);
        let line = match direction {
            Direction::Over => over,
            Direction::Under => under,
        };
        let outcomes: Vec<bool> = home
            .history
            .iter()
            .map(|g| direction.hits(g.total() as f64, line))
            .collect();

        Draft {
            bet_type: BetType::GameTotal,
            selection: Selection {
                label: format!("Game Total {direction} {line}"),
                line: Some(line),
                direction: Some(direction),
                team: None,
                player_id: None,
                player_name: None,
                prop_type: None,
            },
            window: HitRateWindow::from_outcomes(&outcomes),
            market: OddsMarket::GameTotal,
            odds_selection: direction.to_string(),
            is_home: false,
            h2h: None,
            spread: None,
            projection: None,
            context: ConfidenceContext::for_team(None, false, false),
            caution: self.caution.detect_team_cautions(&TeamCautionInput {
                is_back_to_back: home.back_to_back || away.back_to_back,
                blowout_risk: blowout,
                ..Default::default()
            }),
            veto: None,
            recent: home.history.iter().map(|g| g.total() as f64).collect(),
            player: None,
        }
    }

    fn team_total(&self, side: &TeamView, direction: Direction, ladder: Ladder, blowout: bool) -> Draft {
        let scores: Vec<f64> = side.window(ladder).iter().map(|g| g.team_score as f64).collect();
        let (over, under) = LineProjectionEngine::team_total_lines(&scores);
        let line = match direction {
            Direction::Over => over,
            Direction::Under => under,
        };
        let outcomes: Vec<bool> = side
            .history
            .iter()
            .map(|g| direction.hits(g.team_score as f64, line))
            .collect();

        Draft {
            bet_type: BetType::TeamTotal,
            selection: team_selection(
                format!("{} Team Total {direction} {line}", side.team.name),
                side.team,
                Some(line),
                Some(direction),
            ),
            window: HitRateWindow::from_outcomes(&outcomes),
            market: OddsMarket::TeamTotal,
            odds_selection: format!("{} {direction}", side.team.name),
            is_home: side.is_home,
            h2h: None,
            spread: None,
            projection: None,
            context: ConfidenceContext::for_team(Some(side.is_home), false, is_weak(side.opponent_history)),
            caution: self.team_caution(side, blowout),
            veto: None,
            recent: side.history.iter().map(|g| g.team_score as f64).collect(),
            player: None,
        }
    }

    fn player_props(&self, side: &TeamView, blowout: bool) -> Vec<Draft> {
        let floors = self.projection.prop_floors();
        let top = top_players(side.players, self.settings.top_players_per_team);
        let mut drafts = Vec::new();

        for (rank, player) in top.iter().enumerate() {
            let record = self.player_status.record_from_sample(player);
            let eval = self.player_status.evaluate(&record);
            let role = self.player_status.analyze_role_from_logs(&player.logs);
            let teammate_missing = top.iter().enumerate().any(|(i, p)| i != rank && is_out(p));
            let star_out = rank != 0 && top.first().is_some_and(|p| is_out(p));
            let veto = (!eval.is_eligible)
                .then(|| eval.reason.clone().unwrap_or_else(|| "Player unavailable".to_string()));
            let player_context = eval.context();

            for prop in &self.settings.prop_types {
                let values: Vec<f64> = player.logs.iter().take(15).map(|l| prop.value(l)).collect();
                let line = match self.projection.find_optimal_line(&values, Direction::Over, floors) {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!(player = %record.player_name, prop = %prop, "No eligible line, prop skipped");
                        continue;
                    }
                    Err(e) => {
                        debug!(player = %record.player_name, prop = %prop, error = %e, "Prop skipped");
                        continue;
                    }
                };
                let candidate = self.projection.analyze_line(&values, line, Direction::Over, floors);

                let mut input = PlayerCautionInput::from_evaluation(
                    &eval,
                    &role,
                    &record.minutes,
                    record.season_average_minutes,
                );
                input.key_teammate_out = teammate_missing;
                input.star_player_out = star_out;
                input.is_back_to_back = side.back_to_back;
                input.blowout_risk = blowout;
                input.is_road = !side.is_home;
                let caution = self.caution.merge([
                    self.caution.detect_player_cautions(&input),
                    self.caution
                        .detect_alt_line_cautions(true, LineProjectionEngine::rate_variance(&candidate)),
                ]);

                drafts.push(Draft {
                    bet_type: BetType::PlayerProp,
                    selection: Selection {
                        label: format!("{} Over {} {}", record.player_name, line, prop),
                        line: Some(line),
                        direction: Some(Direction::Over),
                        team: Some(side.team.clone()),
                        player_id: Some(record.player_id.clone()),
                        player_name: Some(record.player_name.clone()),
                        prop_type: Some(*prop),
                    },
                    window: candidate.window,
                    market: OddsMarket::PlayerProp(*prop),
                    odds_selection: record.player_name.clone(),
                    is_home: side.is_home,
                    h2h: None,
                    spread: None,
                    context: ConfidenceContext::for_player(
                        &eval,
                        &role,
                        side.is_home,
                        candidate.consistency_score >= ALT_LINE_CONSISTENT,
                        teammate_missing,
                    ),
                    projection: Some(candidate),
                    caution,
                    veto: veto.clone(),
                    recent: values,
                    player: Some(player_context.clone()),
                });
            }
        }
        drafts
    }

    /// Attach odds, eligibility and confidence. A provider price that is
    /// not valid American odds drops the candidate.
    fn finish(&self, sample: &GameSample, matchup: &Matchup, ladder: Ladder, draft: Draft) -> Option<Leg> {
        let best = sample.odds.best(
            draft.market,
            &draft.odds_selection,
            draft.selection.line,
            self.settings.fallback_american,
        );
        let odds = match Odds::from_american(best.american) {
            Ok(odds) => odds,
            Err(e) => {
                debug!(label = %draft.selection.label, error = %e, "Bad provider price, candidate dropped");
                return None;
            }
        };

        let mut eligibility = self
            .eligibility
            .evaluate(draft.bet_type, &draft.window, ladder, odds.american());
        if let Some(reason) = draft.veto {
            eligibility = eligibility.veto(reason);
        }
        let confidence = self.confidence.calculate(&draft.window, &draft.context);

        Some(Leg {
            id: new_leg_id(),
            bet_type: draft.bet_type,
            matchup: matchup.clone(),
            selection: draft.selection,
            odds,
            hit_rate: draft.window,
            ladder,
            eligibility,
            is_home: draft.is_home,
            h2h: draft.h2h,
            spread: draft.spread,
            projection: draft.projection,
            confidence: Some(confidence),
            caution: Some(draft.caution),
            recent: draft.recent,
            player: draft.player,
        })
    }

    /// Every candidate leg for one game, eligible or not.
    pub fn generate_candidates(&self, sample: &GameSample, ladder: Ladder) -> Vec<Leg> {
        let matchup = Matchup::from_game(&sample.game);
        let day = game_day(&sample.game);
        let home = self.team_view(sample, true, ladder, day);
        let away = self.team_view(sample, false, ladder, day);
        let blowout = home.spread_line.abs().max(away.spread_line.abs()) >= BLOWOUT_SPREAD;

        let mut drafts = Vec::new();
        for side in [&home, &away] {
            drafts.push(self.moneyline(side, blowout));
        }
        for side in [&home, &away] {
            drafts.push(self.spread(side, ladder, blowout));
        }
        for direction in [Direction::Over, Direction::Under] {
            drafts.push(self.game_total(&home, &away, direction, ladder, blowout));
        }
        for side in [&home, &away] {
            for direction in [Direction::Over, Direction::Under] {
                drafts.push(self.team_total(side, direction, ladder, blowout));
            }
        }
        for side in [&home, &away] {
            drafts.extend(self.player_props(side, blowout));
        }

        let legs: Vec<Leg> = drafts
            .into_iter()
            .filter_map(|d| self.finish(sample, &matchup, ladder, d))
            .collect();
        debug!(
            game_id = %matchup.game_id,
            candidates = legs.len(),
            eligible = legs.iter().filter(|l| l.is_selectable()).count(),
            "Candidates generated"
        );
        legs
    }

    /// Selectable legs meeting the optional confidence floor.
    pub fn filter_pool(&self, candidates: Vec<Leg>, min_confidence: Option<i32>) -> Vec<Leg> {
        candidates
            .into_iter()
            .filter(Leg::is_selectable)
            .filter(|leg| match min_confidence {
                Some(min) => leg.confidence_score().unwrap_or(0) >= min,
                None => true,
            })
            .collect()
    }

    /// Draw `count` legs: shuffle, take legs adding a new bet type or a new
    /// game, then backfill in shuffle order. Never partial-fills.
    pub fn select_legs<R: Rng + ?Sized>(&self, mut pool: Vec<Leg>, count: usize, rng: &mut R) -> Result<Vec<Leg>> {
        if pool.len() < count {
            return Err(CoreError::NoEligibleLegs {
                requested: count,
                available: pool.len(),
            });
        }
        pool.shuffle(rng);

        let mut taken = vec![false; pool.len()];
        let mut types_used = HashSet::new();
        let mut games_used = HashSet::new();
        let mut picked = 0;

        for (i, leg) in pool.iter().enumerate() {
            if picked == count {
                break;
            }
            if !types_used.contains(&leg.bet_type) || !games_used.contains(&leg.matchup.game_id) {
                types_used.insert(leg.bet_type);
                games_used.insert(leg.matchup.game_id.clone());
                taken[i] = true;
                picked += 1;
            }
        }
        for flag in taken.iter_mut() {
            if picked == count {
                break;
            }
            if !*flag {
                *flag = true;
                picked += 1;
            }
        }

        Ok(pool
            .into_iter()
            .zip(taken)
            .filter_map(|(leg, keep)| keep.then_some(leg))
            .collect())
    }

    /// Generate, filter, select and price a parlay for the slate.
    pub fn compose<R: Rng + ?Sized>(&self, request: &ParlayRequest, samples: &[GameSample], rng: &mut R) -> Result<Parlay> {
        self.validate_request(request)?;
        let (ladder, ladder_snapped_from) = self.resolve_ladder(request.ladder);

        let candidates: Vec<Leg> = samples
            .iter()
            .flat_map(|s| self.generate_candidates(s, ladder))
            .collect();
        let total = candidates.len();
        let pool = self.filter_pool(candidates, request.min_confidence);
        info!(
            games = samples.len(),
            candidates = total,
            eligible = pool.len(),
            requested = request.legs,
            %ladder,
            "Leg pool built"
        );

        let legs = self.select_legs(pool, request.legs, rng)?;
        let (combined_decimal, combined_american) = combine_odds(&legs)?;

        Ok(Parlay {
            id: new_parlay_id(),
            legs,
            wager: request.wager,
            ladder,
            ladder_snapped_from,
            min_confidence: request.min_confidence,
            combined_american,
            combined_decimal,
            payout: payout(request.wager, combined_decimal),
            created_at: Utc::now(),
            requester: request.requester.clone(),
        })
    }

    /// Rank selectable legs by confidence, optionally plus-money only.
    pub fn rank_picks(&self, candidates: Vec<Leg>, min_confidence: i32, plus_odds_only: bool, limit: usize) -> Vec<RankedPick> {
        let mut picks: Vec<RankedPick> = candidates
            .into_iter()
            .filter(Leg::is_selectable)
            .filter(|leg| !plus_odds_only || leg.odds.american() > 0)
            .filter_map(|leg| {
                let confidence = leg.confidence_score()?;
                (confidence >= min_confidence).then_some(RankedPick { leg, confidence })
            })
            .collect();
        picks.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        picks.truncate(limit);
        picks
    }
}
