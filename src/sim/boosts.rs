use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// A temporary mining multiplier granted by something outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    #[serde(rename = "type")]
    pub kind: String,
    pub multiplier: f64,
    pub expires_at: i64,
}

impl Boost {
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

/// Read-only view of the boosts currently granted to the player. The engine
/// never creates or expires boosts itself.
pub trait BoostSource: Send + Sync {
    fn boosts(&self) -> Vec<Boost>;
}

#[derive(Debug, Default)]
pub struct NoBoosts;

impl BoostSource for NoBoosts {
    fn boosts(&self) -> Vec<Boost> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
pub struct StaticBoosts {
    boosts: RwLock<Vec<Boost>>,
}

impl StaticBoosts {
    pub fn new(boosts: Vec<Boost>) -> Self {
        Self {
            boosts: RwLock::new(boosts),
        }
    }

    /// Takes over a poisoned lock; the list is only ever swapped whole.
    pub fn replace(&self, boosts: Vec<Boost>) {
        let mut guard = self.boosts.write().unwrap_or_else(|poisoned| {
            tracing::warn!("boosts.lock.poisoned");
            poisoned.into_inner()
        });
        *guard = boosts;
    }
}

impl BoostSource for StaticBoosts {
    fn boosts(&self) -> Vec<Boost> {
        self.boosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Combined multiplier of all unexpired boosts, each amplified by the
/// resonance bonus. 1.0 when nothing is active.
pub fn boost_multiplier(boosts: &[Boost], resonance_bonus: f64, now_ms: i64) -> f64 {
    let mut active = boosts.iter().filter(|boost| boost.is_active(now_ms)).peekable();
    if active.peek().is_none() {
        return 1.0;
    }
    active
        .map(|boost| boost.multiplier * (1.0 + resonance_bonus))
        .sum()
}
