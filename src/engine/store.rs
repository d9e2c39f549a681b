//! Process-lifetime parlay and leg caches.
//!
//! Entries are written once and never mutated or evicted. A refresh stores
//! a new parlay under a new id and leaves the old one in place.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::{Leg, Parlay};

#[derive(Default)]
pub struct ParlayStore {
    parlays: DashMap<String, Arc<Parlay>>,
    legs: DashMap<String, Arc<Leg>>,
}

impl ParlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache a parlay and each of its legs by id.
    pub fn insert(&self, parlay: Parlay) -> Arc<Parlay> {
        for leg in &parlay.legs {
            self.legs.insert(leg.id.clone(), Arc::new(leg.clone()));
        }
        let parlay = Arc::new(parlay);
        self.parlays.insert(parlay.id.clone(), parlay.clone());
        parlay
    }

    pub fn parlay(&self, id: &str) -> Option<Arc<Parlay>> {
        self.parlays.get(id).map(|entry| entry.value().clone())
    }

    pub fn leg(&self, id: &str) -> Option<Arc<Leg>> {
        self.legs.get(id).map(|entry| entry.value().clone())
    }

    pub fn parlay_count(&self) -> usize {
        self.parlays.len()
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ladder, Requester};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    // ---- helpers -----------------------------------------------------------

    fn empty_parlay(id: &str) -> Parlay {
        Parlay {
            id: id.into(),
            legs: Vec::new(),
            ladder: Ladder::L5,
            ladder_snapped_from: None,
            combined_decimal: dec!(1),
            combined_american: 100,
            wager: dec!(10),
            payout: dec!(10),
            min_confidence: None,
            requester: Requester::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = ParlayStore::new();
        let stored = store.insert(empty_parlay("parlay_a"));
        assert_eq!(store.parlay("parlay_a").unwrap().id, stored.id);
        assert_eq!(store.parlay_count(), 1);
        assert_eq!(store.leg_count(), 0);
        assert!(store.parlay("parlay_b").is_none());
        assert!(store.leg("leg_x").is_none());
    }
}
