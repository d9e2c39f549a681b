//! Service layer: slate assembly, parlay generation and the id caches.
//!
//! `ParlayService` is the only async surface. It fetches through the
//! provider traits, hands pre-fetched samples to the pure composition
//! engine, and caches what it produces.

pub mod assembler;
pub mod store;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{AppConfig, Rules};
use crate::data::{GameSlateProvider, OddsProvider};
use crate::error::{CoreError, Result};
use crate::strategy::composition::{CompositionSettings, ParlayCompositionEngine};
use crate::strategy::explanation::{Explanation, ExplanationEngine};
use crate::types::{Ladder, Leg, Parlay, ParlayRequest, RankedPick, Requester};
use assembler::SlateAssembler;
use store::ParlayStore;

/// Confidence floor for picks of the day.
pub const PICKS_MIN_CONFIDENCE: i32 = 70;
/// Confidence floor for plus-money edge picks.
pub const EDGE_MIN_CONFIDENCE: i32 = 60;

pub struct ParlayService {
    assembler: SlateAssembler,
    composer: ParlayCompositionEngine,
    explainer: ExplanationEngine,
    store: ParlayStore,
    rng: Mutex<StdRng>,
}

impl ParlayService {
    /// `seed` switches leg selection to deterministic mode.
    pub fn new(assembler: SlateAssembler, composer: ParlayCompositionEngine, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            assembler,
            explainer: ExplanationEngine::new(composer.rules().clone()),
            composer,
            store: ParlayStore::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Compile the rule tables and wire the service from configuration.
    pub fn from_config(
        config: &AppConfig,
        slate: Arc<dyn GameSlateProvider>,
        odds: Arc<dyn OddsProvider>,
    ) -> Result<Self> {
        let rules = Arc::new(Rules::compile(&config.rules)?);
        let settings = CompositionSettings::from_config(config)?;
        Ok(Self::new(
            SlateAssembler::new(slate, odds),
            ParlayCompositionEngine::new(rules, settings),
            config.bot.selection_seed,
        ))
    }

    pub fn composer(&self) -> &ParlayCompositionEngine {
        &self.composer
    }

    /// Validate, assemble today's slate, compose and cache a parlay.
    pub async fn generate(&self, request: ParlayRequest) -> Result<Arc<Parlay>> {
        self.composer.validate_request(&request)?;
        let samples = self.assembler.assemble().await?;

        let parlay = {
            let mut rng = self.rng.lock().await;
            self.composer.compose(&request, &samples, &mut *rng)?
        };

        info!(
            parlay_id = %parlay.id,
            legs = parlay.leg_count(),
            ladder = %parlay.ladder,
            combined = parlay.combined_american,
            wager = %parlay.wager,
            payout = %parlay.payout,
            "Parlay created"
        );
        Ok(self.store.insert(parlay))
    }

    /// New parlay with the same leg count, wager, ladder and confidence
    /// floor. The original stays cached unchanged.
    pub async fn refresh(&self, parlay_id: &str, requester: Option<Requester>) -> Result<Arc<Parlay>> {
        let previous = self.get_parlay(parlay_id)?;
        let request = ParlayRequest {
            legs: previous.leg_count(),
            wager: previous.wager,
            ladder: previous.ladder.games(),
            min_confidence: previous.min_confidence,
            requester: requester.unwrap_or_else(|| previous.requester.clone()),
        };
        let parlay = self.generate(request).await?;
        info!(previous = %previous.id, parlay_id = %parlay.id, "Parlay refreshed");
        Ok(parlay)
    }

    pub fn get_parlay(&self, id: &str) -> Result<Arc<Parlay>> {
        self.store
            .parlay(id)
            .ok_or_else(|| CoreError::NotFound(format!("Parlay {id} not found")))
    }

    pub fn get_leg(&self, id: &str) -> Result<Arc<Leg>> {
        self.store
            .leg(id)
            .ok_or_else(|| CoreError::NotFound(format!("Leg {id} not found")))
    }

    /// Number-based reasoning for one cached leg.
    pub fn explain_leg(&self, leg_id: &str) -> Result<Explanation> {
        let leg = self.get_leg(leg_id)?;
        Ok(self.explainer.explain_leg(&leg))
    }

    /// Parlay summary followed by the reasoning for each of its legs.
    pub fn explain_parlay(&self, parlay_id: &str) -> Result<Vec<Explanation>> {
        let parlay = self.get_parlay(parlay_id)?;
        let mut out = vec![self.explainer.explain_parlay_summary(&parlay)];
        out.extend(parlay.legs.iter().map(|leg| self.explainer.explain_leg(leg)));
        Ok(out)
    }

    /// Highest-confidence selectable legs on the L5 window.
    pub async fn picks_of_the_day(&self, limit: usize) -> Result<Vec<RankedPick>> {
        let candidates = self.candidates(Ladder::L5).await?;
        let picks = self
            .composer
            .rank_picks(candidates, PICKS_MIN_CONFIDENCE, false, limit);
        info!(picks = picks.len(), "Picks of the day ranked");
        Ok(picks)
    }

    /// Plus-money selectable legs, ranked by confidence.
    pub async fn edge_finder(&self, limit: usize) -> Result<Vec<RankedPick>> {
        let candidates = self.candidates(Ladder::L5).await?;
        let picks = self
            .composer
            .rank_picks(candidates, EDGE_MIN_CONFIDENCE, true, limit);
        info!(picks = picks.len(), "Edge picks ranked");
        Ok(picks)
    }

    async fn candidates(&self, ladder: Ladder) -> Result<Vec<Leg>> {
        let samples = self.assembler.assemble().await?;
        Ok(samples
            .iter()
            .flat_map(|s| self.composer.generate_candidates(s, ladder))
            .collect())
    }
}
