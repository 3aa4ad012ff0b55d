use super::catalog::Effect;
use super::upgrades::{Upgrade, UpgradeSet};

pub const BASE_POINTS_PER_SECOND: f64 = 1.0;
pub const BASE_ENERGY_COST: f64 = 1.0;
pub const MIN_ENERGY_COST: f64 = 0.1;
pub const BASE_ENERGY_REGEN: f64 = 1.0;
pub const BASE_MAX_ENERGY: f64 = 1_000.0;
/// Energy cost can never drop below 5% of nominal.
pub const EFFICIENCY_FLOOR: f64 = -0.95;
pub const COST_CAP_FACTOR: f64 = 500.0;

const FIRST_BREAKPOINT: u32 = 5;
const FIRST_STEP: f64 = 0.03;
const SECOND_BREAKPOINT: u32 = 15;
const SECOND_STEP: f64 = 0.05;
const MULTIPLIER_FLOOR: f64 = 0.5;

/// Per-level cost multiplier after diminishing returns. Unchanged up to
/// level 5, shrinks 3% per level past 5 and a further 5% per level past 15,
/// never below half the catalog multiplier.
pub fn adjusted_multiplier(cost_multiplier: f64, level: u32) -> f64 {
    let mut reduction = 0.0;
    if level > FIRST_BREAKPOINT {
        reduction += FIRST_STEP * (level - FIRST_BREAKPOINT) as f64;
    }
    if level > SECOND_BREAKPOINT {
        reduction += SECOND_STEP * (level - SECOND_BREAKPOINT) as f64;
    }
    (cost_multiplier * (1.0 - reduction)).max(cost_multiplier * MULTIPLIER_FLOOR)
}

pub fn cost_at_level(base_cost: f64, cost_multiplier: f64, level: u32) -> f64 {
    let raw = base_cost * adjusted_multiplier(cost_multiplier, level).powi(level as i32);
    raw.min(base_cost * COST_CAP_FACTOR)
}

pub fn purchase_cost(upgrade: &Upgrade) -> f64 {
    cost_at_level(upgrade.def.base_cost, upgrade.def.cost_multiplier, upgrade.level)
}

pub fn aggregate_effect<'a, I, P>(upgrades: I, predicate: P) -> f64
where
    I: IntoIterator<Item = &'a Upgrade>,
    P: Fn(&Upgrade) -> bool,
{
    upgrades
        .into_iter()
        .filter(|upgrade| predicate(upgrade))
        .map(|upgrade| upgrade.def.effect_value * upgrade.level as f64)
        .sum()
}

pub fn family_effect(upgrades: &UpgradeSet, effect: Effect) -> f64 {
    aggregate_effect(upgrades.iter(), |upgrade| upgrade.effect() == effect)
}

pub fn points_per_second(upgrades: &UpgradeSet) -> f64 {
    BASE_POINTS_PER_SECOND + family_effect(upgrades, Effect::MiningRate)
}

pub fn efficiency_bonus(upgrades: &UpgradeSet) -> f64 {
    family_effect(upgrades, Effect::EnergyEfficiency).max(EFFICIENCY_FLOOR)
}

pub fn regen_per_second(upgrades: &UpgradeSet) -> f64 {
    BASE_ENERGY_REGEN + family_effect(upgrades, Effect::EnergyRegen)
}

pub fn max_energy(upgrades: &UpgradeSet) -> f64 {
    BASE_MAX_ENERGY + family_effect(upgrades, Effect::EnergyCapacity)
}

pub fn resonance_bonus(upgrades: &UpgradeSet) -> f64 {
    family_effect(upgrades, Effect::Resonance)
}

pub fn has_auto_mining(upgrades: &UpgradeSet) -> bool {
    upgrades
        .iter()
        .any(|upgrade| upgrade.effect() == Effect::AutoMining && upgrade.is_owned())
}

/// How hard boosts push the miner, relative to the unboosted rate.
pub fn speed_scaling(boosted_rate: f64, points_per_second: f64) -> f64 {
    if points_per_second <= 0.0 {
        return 1.0;
    }
    (boosted_rate / points_per_second).clamp(0.5, 2.0)
}

pub fn energy_cost(speed_scaling: f64, efficiency_bonus: f64) -> f64 {
    let efficiency = efficiency_bonus.max(EFFICIENCY_FLOOR);
    (BASE_ENERGY_COST * speed_scaling * (1.0 + efficiency)).max(MIN_ENERGY_COST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::catalog::CATALOG;
    use crate::sim::upgrades::UpgradeProgress;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    fn set_with(levels: &[(&str, u32)]) -> UpgradeSet {
        let saved: Vec<_> = levels
            .iter()
            .map(|(id, level)| UpgradeProgress {
                id: id.to_string(),
                level: *level,
            })
            .collect();
        UpgradeSet::reconcile(&saved)
    }

    #[test]
    fn cost_grows_with_catalog_multiplier_up_to_level_five() {
        assert!(close(cost_at_level(10.0, 1.15, 0), 10.0));
        assert!(close(cost_at_level(10.0, 1.15, 1), 11.5));
        assert!(close(cost_at_level(10.0, 1.15, 5), 20.113_571_875));
    }

    #[test]
    fn first_breakpoint_has_no_discontinuity_at_level_five() {
        assert!(close(adjusted_multiplier(1.5, 5), 1.5));
        assert!(close(adjusted_multiplier(1.5, 6), 1.5 * 0.97));
        assert!(close(cost_at_level(100.0, 1.5, 6), 100.0 * 1.455f64.powi(6)));
    }

    #[test]
    fn second_breakpoint_engages_after_level_fifteen() {
        // 10 levels past the first breakpoint, none past the second.
        assert!(close(adjusted_multiplier(2.0, 15), 2.0 * 0.70));
        // 11 past the first plus 1 past the second.
        assert!(close(adjusted_multiplier(2.0, 16), 2.0 * (1.0 - 0.33 - 0.05)));
    }

    #[test]
    fn multiplier_never_drops_below_half() {
        assert!(close(adjusted_multiplier(2.0, 40), 1.0));
        assert!(close(adjusted_multiplier(1.2, 100), 0.6));
    }

    #[test]
    fn cost_is_capped_at_five_hundred_times_base() {
        // 10 * (3.0 * 0.91)^8 would be ~30k.
        assert!(close(cost_at_level(10.0, 3.0, 8), 5_000.0));
        for def in &CATALOG {
            for level in 0..=def.max_level {
                let cost = cost_at_level(def.base_cost, def.cost_multiplier, level);
                assert!(cost <= def.base_cost * COST_CAP_FACTOR, "{} at {level}", def.id);
                assert!(cost > 0.0);
            }
        }
    }

    #[test]
    fn derived_quantities_sum_families() {
        let set = set_with(&[
            ("sharp_pickaxe", 4),
            ("steam_drill", 2),
            ("coffee_thermos", 2),
            ("reinforced_cart", 3),
        ]);
        assert!(close(points_per_second(&set), 1.0 + 2.0 + 4.0));
        assert!(close(regen_per_second(&set), 1.5));
        assert!(close(max_energy(&set), 1_300.0));
        assert!(close(efficiency_bonus(&set), 0.0));
    }

    #[test]
    fn efficiency_bonus_is_clamped() {
        let set = set_with(&[
            ("miner_gloves", 20),
            ("ergonomic_harness", 15),
            ("zero_point_cell", 5),
        ]);
        assert!(close(efficiency_bonus(&set), EFFICIENCY_FLOOR));
        assert!(close(energy_cost(1.0, efficiency_bonus(&set)), 0.1));
    }

    #[test]
    fn speed_scaling_is_bounded() {
        assert!(close(speed_scaling(10.0, 1.0), 2.0));
        assert!(close(speed_scaling(0.1, 1.0), 0.5));
        assert!(close(speed_scaling(1.5, 1.0), 1.5));
        assert!(close(speed_scaling(3.0, 0.0), 1.0));
    }

    proptest! {
        #[test]
        fn efficiency_never_pushes_cost_below_floor(
            bonuses in proptest::collection::vec(-5.0f64..0.0, 0..32),
            scaling in 0.5f64..2.0,
        ) {
            let total: f64 = bonuses.iter().sum();
            let cost = energy_cost(scaling, total);
            prop_assert!(cost >= 0.05 * BASE_ENERGY_COST * scaling - 1e-12);
            prop_assert!(cost >= MIN_ENERGY_COST);
        }

        #[test]
        fn cost_never_exceeds_cap(
            base in 1.0f64..1_000_000.0,
            multiplier in 1.01f64..3.0,
            level in 0u32..200,
        ) {
            prop_assert!(cost_at_level(base, multiplier, level) <= base * COST_CAP_FACTOR * (1.0 + 1e-12));
        }
    }
}
