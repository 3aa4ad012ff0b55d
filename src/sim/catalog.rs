use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Early,
    Mid,
    Late,
    Endgame,
    Legendary,
}

/// Effect family an upgrade contributes to. Every derived quantity is the
/// sum of `effect_value * level` over one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    MiningRate,
    EnergyEfficiency,
    EnergyRegen,
    EnergyCapacity,
    AutoMining,
    Resonance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnlockRequirement {
    /// Lifetime points earned.
    Points(f64),
    /// Number of distinct upgrades with at least one level.
    UpgradesOwned(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct UpgradeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub effect: Effect,
    pub effect_value: f64,
    pub base_cost: f64,
    pub cost_multiplier: f64,
    pub max_level: u32,
    pub unlock: Option<UnlockRequirement>,
}

pub const AUTO_MINER_ID: &str = "auto_miner";

pub static CATALOG: [UpgradeDef; 14] = [
    UpgradeDef {
        id: "sharp_pickaxe",
        name: "Sharpened Pickaxe",
        description: "A better edge on the pick (+0.5 points/s per level).",
        category: Category::Early,
        effect: Effect::MiningRate,
        effect_value: 0.5,
        base_cost: 10.0,
        cost_multiplier: 1.15,
        max_level: 50,
        unlock: None,
    },
    UpgradeDef {
        id: "miner_gloves",
        name: "Padded Gloves",
        description: "Less strain per swing (-2% energy cost per level).",
        category: Category::Early,
        effect: Effect::EnergyEfficiency,
        effect_value: -0.02,
        base_cost: 25.0,
        cost_multiplier: 1.2,
        max_level: 20,
        unlock: None,
    },
    UpgradeDef {
        id: "coffee_thermos",
        name: "Coffee Thermos",
        description: "Faster recovery between shifts (+0.25 energy/s per level).",
        category: Category::Early,
        effect: Effect::EnergyRegen,
        effect_value: 0.25,
        base_cost: 30.0,
        cost_multiplier: 1.2,
        max_level: 30,
        unlock: None,
    },
    UpgradeDef {
        id: "reinforced_cart",
        name: "Reinforced Cart",
        description: "Carry more supplies into the shaft (+100 max energy per level).",
        category: Category::Early,
        effect: Effect::EnergyCapacity,
        effect_value: 100.0,
        base_cost: 50.0,
        cost_multiplier: 1.25,
        max_level: 25,
        unlock: None,
    },
    UpgradeDef {
        id: "steam_drill",
        name: "Steam Drill",
        description: "Pressurised boring head (+2 points/s per level).",
        category: Category::Mid,
        effect: Effect::MiningRate,
        effect_value: 2.0,
        base_cost: 250.0,
        cost_multiplier: 1.18,
        max_level: 40,
        unlock: Some(UnlockRequirement::Points(500.0)),
    },
    UpgradeDef {
        id: "ergonomic_harness",
        name: "Ergonomic Harness",
        description: "Spreads the load across the whole crew (-4% energy cost per level).",
        category: Category::Mid,
        effect: Effect::EnergyEfficiency,
        effect_value: -0.04,
        base_cost: 400.0,
        cost_multiplier: 1.22,
        max_level: 15,
        unlock: Some(UnlockRequirement::Points(1_000.0)),
    },
    UpgradeDef {
        id: AUTO_MINER_ID,
        name: "Automatic Foreman",
        description: "Restarts mining on its own once energy has recovered.",
        category: Category::Mid,
        effect: Effect::AutoMining,
        effect_value: 1.0,
        base_cost: 2_500.0,
        cost_multiplier: 2.0,
        max_level: 1,
        unlock: Some(UnlockRequirement::UpgradesOwned(3)),
    },
    UpgradeDef {
        id: "geothermal_tap",
        name: "Geothermal Tap",
        description: "Draw heat from the deep rock (+1.5 energy/s per level).",
        category: Category::Late,
        effect: Effect::EnergyRegen,
        effect_value: 1.5,
        base_cost: 3_000.0,
        cost_multiplier: 1.25,
        max_level: 25,
        unlock: Some(UnlockRequirement::Points(10_000.0)),
    },
    UpgradeDef {
        id: "dynamo_core",
        name: "Dynamo Core",
        description: "Industrial storage cells (+500 max energy per level).",
        category: Category::Late,
        effect: Effect::EnergyCapacity,
        effect_value: 500.0,
        base_cost: 5_000.0,
        cost_multiplier: 1.3,
        max_level: 20,
        unlock: Some(UnlockRequirement::Points(20_000.0)),
    },
    UpgradeDef {
        id: "plasma_cutter",
        name: "Plasma Cutter",
        description: "Slices ore straight from the seam (+12 points/s per level).",
        category: Category::Late,
        effect: Effect::MiningRate,
        effect_value: 12.0,
        base_cost: 15_000.0,
        cost_multiplier: 1.2,
        max_level: 30,
        unlock: Some(UnlockRequirement::Points(25_000.0)),
    },
    UpgradeDef {
        id: "resonance_crystal",
        name: "Resonance Crystal",
        description: "Amplifies every active boost (+5% boost strength per level).",
        category: Category::Endgame,
        effect: Effect::Resonance,
        effect_value: 0.05,
        base_cost: 50_000.0,
        cost_multiplier: 1.35,
        max_level: 10,
        unlock: Some(UnlockRequirement::UpgradesOwned(6)),
    },
    UpgradeDef {
        id: "quantum_excavator",
        name: "Quantum Excavator",
        description: "Tunnels through probability itself (+80 points/s per level).",
        category: Category::Endgame,
        effect: Effect::MiningRate,
        effect_value: 80.0,
        base_cost: 250_000.0,
        cost_multiplier: 1.22,
        max_level: 25,
        unlock: Some(UnlockRequirement::Points(500_000.0)),
    },
    UpgradeDef {
        id: "singularity_bore",
        name: "Singularity Bore",
        description: "A pinhole into the planet's core (+600 points/s per level).",
        category: Category::Legendary,
        effect: Effect::MiningRate,
        effect_value: 600.0,
        base_cost: 5_000_000.0,
        cost_multiplier: 1.25,
        max_level: 20,
        unlock: Some(UnlockRequirement::Points(10_000_000.0)),
    },
    UpgradeDef {
        id: "zero_point_cell",
        name: "Zero-Point Cell",
        description: "Mining that barely touches the reserves (-10% energy cost per level).",
        category: Category::Legendary,
        effect: Effect::EnergyEfficiency,
        effect_value: -0.10,
        base_cost: 2_000_000.0,
        cost_multiplier: 1.4,
        max_level: 5,
        unlock: Some(UnlockRequirement::UpgradesOwned(10)),
    },
];

pub fn find(id: &str) -> Option<&'static UpgradeDef> {
    CATALOG.iter().find(|def| def.id == id)
}
