use super::catalog::{self, CATALOG, Category, Effect, UnlockRequirement, UpgradeDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted form of an owned upgrade. Only the id and level are stored; the
/// rest comes from the catalog on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeProgress {
    pub id: String,
    pub level: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Upgrade {
    pub def: &'static UpgradeDef,
    pub level: u32,
}

impl Upgrade {
    pub fn new(def: &'static UpgradeDef) -> Self {
        Self { def, level: 0 }
    }

    pub fn id(&self) -> &'static str {
        self.def.id
    }

    pub fn effect(&self) -> Effect {
        self.def.effect
    }

    pub fn category(&self) -> Category {
        self.def.category
    }

    pub fn is_maxed(&self) -> bool {
        self.level >= self.def.max_level
    }

    pub fn is_owned(&self) -> bool {
        self.level > 0
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeSet {
    entries: Vec<Upgrade>,
}

impl Default for UpgradeSet {
    fn default() -> Self {
        Self::from_catalog()
    }
}

impl UpgradeSet {
    pub fn from_catalog() -> Self {
        Self {
            entries: CATALOG.iter().map(Upgrade::new).collect(),
        }
    }

    /// Rebuilds the set from saved progress, matched by id. Ids the catalog
    /// no longer knows are dropped, new catalog entries start at level 0, and
    /// levels beyond the current cap are clamped down.
    pub fn reconcile(saved: &[UpgradeProgress]) -> Self {
        let mut levels: HashMap<&str, u32> = HashMap::with_capacity(saved.len());
        for entry in saved {
            if catalog::find(&entry.id).is_none() {
                tracing::debug!(id = %entry.id, "upgrades.reconcile.dropped_unknown");
                continue;
            }
            let level = levels.entry(entry.id.as_str()).or_insert(0);
            *level = (*level).max(entry.level);
        }
        let entries = CATALOG
            .iter()
            .map(|def| Upgrade {
                def,
                level: levels
                    .get(def.id)
                    .copied()
                    .unwrap_or(0)
                    .min(def.max_level),
            })
            .collect();
        Self { entries }
    }

    pub fn progress(&self) -> Vec<UpgradeProgress> {
        self.entries
            .iter()
            .map(|upgrade| UpgradeProgress {
                id: upgrade.id().to_string(),
                level: upgrade.level,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Upgrade> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Upgrade> {
        self.entries.iter().find(|upgrade| upgrade.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Upgrade> {
        self.entries.iter_mut().find(|upgrade| upgrade.id() == id)
    }

    pub fn level(&self, id: &str) -> u32 {
        self.get(id).map(|upgrade| upgrade.level).unwrap_or(0)
    }

    /// Distinct upgrades with at least one level.
    pub fn owned_count(&self) -> u32 {
        self.entries.iter().filter(|upgrade| upgrade.is_owned()).count() as u32
    }

    pub fn total_levels(&self) -> u32 {
        self.entries.iter().map(|upgrade| upgrade.level).sum()
    }

    pub fn is_unlocked(&self, upgrade: &Upgrade, lifetime_points: f64) -> bool {
        match upgrade.def.unlock {
            None => true,
            Some(UnlockRequirement::Points(threshold)) => lifetime_points >= threshold,
            Some(UnlockRequirement::UpgradesOwned(count)) => self.owned_count() >= count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(id: &str, level: u32) -> UpgradeProgress {
        UpgradeProgress {
            id: id.to_string(),
            level,
        }
    }

    #[test]
    fn fresh_set_covers_catalog_at_level_zero() {
        let set = UpgradeSet::from_catalog();
        assert_eq!(set.iter().count(), CATALOG.len());
        assert_eq!(set.total_levels(), 0);
        assert_eq!(set.owned_count(), 0);
    }

    #[test]
    fn reconcile_drops_unknown_and_defaults_missing() {
        let saved = vec![
            progress("sharp_pickaxe", 4),
            progress("retired_shovel", 9),
        ];
        let set = UpgradeSet::reconcile(&saved);

        assert_eq!(set.level("sharp_pickaxe"), 4);
        assert_eq!(set.level("steam_drill"), 0);
        assert!(set.get("retired_shovel").is_none());
        assert_eq!(set.iter().count(), CATALOG.len());
    }

    #[test]
    fn reconcile_clamps_levels_to_current_cap() {
        let saved = vec![progress(catalog::AUTO_MINER_ID, 7)];
        let set = UpgradeSet::reconcile(&saved);
        assert_eq!(set.level(catalog::AUTO_MINER_ID), 1);
    }

    #[test]
    fn duplicate_entries_keep_highest_level() {
        let saved = vec![progress("miner_gloves", 2), progress("miner_gloves", 5)];
        let set = UpgradeSet::reconcile(&saved);
        assert_eq!(set.level("miner_gloves"), 5);
    }

    #[test]
    fn owned_count_unlocks_gated_upgrades() {
        let saved = vec![
            progress("sharp_pickaxe", 1),
            progress("miner_gloves", 1),
            progress("coffee_thermos", 1),
        ];
        let set = UpgradeSet::reconcile(&saved);
        let auto = set.get(catalog::AUTO_MINER_ID).expect("auto miner present");
        assert!(set.is_unlocked(auto, 0.0));

        let fresh = UpgradeSet::from_catalog();
        let auto = fresh.get(catalog::AUTO_MINER_ID).expect("auto miner present");
        assert!(!fresh.is_unlocked(auto, 1_000_000.0));
    }
}
