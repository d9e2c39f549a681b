//! End-to-end pipeline tests: providers → assembler → composition → caches.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal_macros::dec;

use parlay_engine::config::{AppConfig, Rules};
use parlay_engine::data::mock::SeededOddsProvider;
use parlay_engine::engine::assembler::SlateAssembler;
use parlay_engine::engine::ParlayService;
use parlay_engine::error::CoreError;
use parlay_engine::strategy::composition::ParlayCompositionEngine;
use parlay_engine::types::*;

use crate::fixtures::*;

#[tokio::test]
async fn test_generate_end_to_end() {
    let svc = seeded_service(Some(5));
    let parlay = svc.generate(request(4, dec!(20), 10)).await.unwrap();

    assert_eq!(parlay.leg_count(), 4);
    assert_eq!(parlay.ladder, Ladder::L10);
    assert_eq!(parlay.ladder_snapped_from, None);
    assert!(parlay.legs.iter().all(Leg::is_selectable));
    assert!(parlay.legs.iter().all(|l| l.ladder == Ladder::L10));

    let product = parlay
        .legs
        .iter()
        .fold(rust_decimal::Decimal::ONE, |acc, l| acc * l.odds.decimal());
    assert_eq!(parlay.combined_decimal, product);
    assert_eq!(parlay.payout, (dec!(20) * product).round_dp(2));

    let insights = parlay.insights();
    assert_eq!(insights.type_counts.values().sum::<usize>(), 4);

    for leg in &parlay.legs {
        assert_eq!(svc.get_leg(&leg.id).unwrap().id, leg.id);
    }
}

#[tokio::test]
async fn test_invalid_ladder_snaps_and_is_recorded() {
    let svc = seeded_service(Some(9));
    let parlay = svc.generate(request(2, dec!(10), 7)).await.unwrap();
    assert_eq!(parlay.ladder, Ladder::L5);
    assert_eq!(parlay.ladder_snapped_from, Some(7));
}

#[tokio::test]
async fn test_bounds_are_validated() {
    let svc = seeded_service(None);
    for req in [
        request(1, dec!(10), 5),
        request(11, dec!(10), 5),
        request(3, dec!(0.99), 5),
        request(3, dec!(10000.01), 5),
    ] {
        assert!(matches!(svc.generate(req).await, Err(CoreError::Validation(_))));
    }
}

#[tokio::test]
async fn test_unreachable_confidence_floor_never_partial_fills() {
    let svc = seeded_service(None);
    let mut req = request(2, dec!(10), 5);
    req.min_confidence = Some(95);
    let err = svc.generate(req).await.unwrap_err();
    assert!(matches!(err, CoreError::NoEligibleLegs { requested: 2, available: 0 }));
}

#[tokio::test]
async fn test_out_players_never_surface() {
    let mut slate = seeded_slate();
    let out: Vec<String> = (1..=6).map(|t| format!("{t}01")).collect();
    for id in &out {
        slate.set_injury(id, "Out").unwrap();
    }
    let games = slate.games().to_vec();
    let slate = Arc::new(slate);

    let assembler = SlateAssembler::new(
        slate.clone(),
        Arc::new(SeededOddsProvider::new(SEED, games.clone())),
    );
    let composer = ParlayCompositionEngine::default();
    let samples = assembler.assemble().await.unwrap();
    let candidates: Vec<Leg> = samples
        .iter()
        .flat_map(|s| composer.generate_candidates(s, Ladder::L5))
        .collect();

    let is_out = |leg: &Leg| leg.selection.player_id.as_ref().is_some_and(|id| out.contains(id));
    assert!(candidates.iter().any(|l| is_out(l)));
    for leg in candidates.iter().filter(|l| is_out(*l)) {
        assert!(!leg.eligibility.is_eligible);
        assert!(leg.caution.as_ref().unwrap().should_exclude);
    }

    let svc = service_over(slate, games, Some(3));
    let parlay = svc.generate(request(5, dec!(10), 5)).await.unwrap();
    assert!(!parlay.legs.iter().any(|l| is_out(l)));
    let picks = svc.picks_of_the_day(10).await.unwrap();
    assert!(!picks.iter().any(|p| is_out(&p.leg)));
}

#[tokio::test]
async fn test_failed_team_history_drops_only_that_game() {
    let inner = seeded_slate();
    let games = inner.games().to_vec();
    // team 3 plays in game 12346
    let slate = Arc::new(FlakySlate::new(inner, &["3"]));
    let svc = service_over(slate, games, Some(4));

    let parlay = svc.generate(request(3, dec!(10), 5)).await.unwrap();
    assert!(parlay.legs.iter().all(|l| l.matchup.game_id != "12346"));
}

#[tokio::test]
async fn test_odds_outage_prices_everything_at_fallback() {
    let slate = seeded_slate();
    let svc = ParlayService::from_config(
        &config_with_seed(Some(8)),
        Arc::new(slate),
        Arc::new(DownOdds),
    )
    .unwrap();

    let parlay = svc.generate(request(2, dec!(10), 5)).await.unwrap();
    assert!(parlay.legs.iter().all(|l| l.odds.american() == -110));
    assert_eq!(parlay.combined_decimal, dec!(3.644281));
    assert_eq!(parlay.combined_american, 264);
    assert_eq!(parlay.payout, dec!(36.44));
}

#[tokio::test]
async fn test_refresh_leaves_original_untouched() {
    let svc = seeded_service(Some(12));
    let original = svc.generate(request(3, dec!(15), 15)).await.unwrap();
    let snapshot = (*original).clone();

    let refreshed = svc.refresh(&original.id, None).await.unwrap();
    assert_ne!(refreshed.id, original.id);
    assert_eq!(refreshed.leg_count(), 3);
    assert_eq!(refreshed.wager, dec!(15));
    assert_eq!(refreshed.ladder, Ladder::L15);
    assert_eq!(*svc.get_parlay(&original.id).unwrap(), snapshot);
}

#[tokio::test]
async fn test_concurrent_generation_yields_distinct_parlays() {
    let svc = Arc::new(seeded_service(None));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.generate(request(2, dec!(10), 5)).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let parlay = handle.await.unwrap().unwrap();
        ids.insert(parlay.id.clone());
    }
    assert_eq!(ids.len(), 4);
    for id in &ids {
        assert!(svc.get_parlay(id).is_ok());
    }
}

#[test]
fn test_shipped_config_matches_locked_rules() {
    let cfg = AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
    let rules = Rules::compile(&cfg.rules).unwrap();
    assert_eq!(rules, Rules::locked());
    assert_eq!(cfg.bot.min_legs, 2);
    assert_eq!(cfg.odds.fallback_american, -110);
}

#[tokio::test]
async fn test_explanations_follow_refresh() {
    let svc = seeded_service(Some(21));
    let original = svc.generate(request(3, dec!(10), 10)).await.unwrap();
    let refreshed = svc.refresh(&original.id, None).await.unwrap();

    for parlay in [&original, &refreshed] {
        let explained = svc.explain_parlay(&parlay.id).unwrap();
        assert_eq!(explained.len(), parlay.leg_count() + 1);
        assert!(explained[0].contains("Composition:"));
        assert!(explained[0].contains("Price:"));
        for ex in &explained[1..] {
            assert!(ex.contains("Eligible on the L10 window"));
        }
    }
    assert!(matches!(svc.explain_parlay("parlay_missing"), Err(CoreError::NotFound(_))));
}

#[test]
fn test_tampered_ceiling_is_rejected() {
    let mut cfg = AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
    cfg.rules.max_score = 100;
    let err = Rules::compile(&cfg.rules).unwrap_err();
    assert!(matches!(err, CoreError::ConfigurationInvariant(_)));
}
