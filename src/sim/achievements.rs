use super::state::ResourceState;
use super::upgrades::UpgradeSet;
use serde::{Deserialize, Serialize};

/// Everything an achievement predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub state: &'a ResourceState,
    pub upgrades: &'a UpgradeSet,
}

#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub condition: fn(&Progress<'_>) -> bool,
}

pub static ACHIEVEMENTS: [AchievementDef; 9] = [
    AchievementDef {
        id: "first_strike",
        name: "First Strike",
        description: "Earn your first point.",
        condition: |p| p.state.total_points_earned >= 1.0,
    },
    AchievementDef {
        id: "pocket_change",
        name: "Pocket Change",
        description: "Earn 1,000 points in total.",
        condition: |p| p.state.total_points_earned >= 1_000.0,
    },
    AchievementDef {
        id: "ore_baron",
        name: "Ore Baron",
        description: "Earn 1,000,000 points in total.",
        condition: |p| p.state.total_points_earned >= 1_000_000.0,
    },
    AchievementDef {
        id: "hoarder",
        name: "Hoarder",
        description: "Hold 100,000 points at once.",
        condition: |p| p.state.points >= 100_000.0,
    },
    AchievementDef {
        id: "tooled_up",
        name: "Tooled Up",
        description: "Buy your first upgrade.",
        condition: |p| p.upgrades.total_levels() >= 1,
    },
    AchievementDef {
        id: "workshop",
        name: "Workshop",
        description: "Own five different upgrades.",
        condition: |p| p.upgrades.owned_count() >= 5,
    },
    AchievementDef {
        id: "centurion",
        name: "Centurion",
        description: "Reach 100 upgrade levels in total.",
        condition: |p| p.upgrades.total_levels() >= 100,
    },
    AchievementDef {
        id: "deep_reserves",
        name: "Deep Reserves",
        description: "Raise maximum energy to 5,000.",
        condition: |p| p.state.max_energy >= 5_000.0,
    },
    AchievementDef {
        id: "fast_hands",
        name: "Fast Hands",
        description: "Mine 100 points per second.",
        condition: |p| p.state.points_per_second >= 100.0,
    },
];

/// Persisted form of an unlocked achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub id: String,
    pub unlocked_at: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub def: &'static AchievementDef,
    pub unlocked_at: Option<i64>,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Achievements {
    entries: Vec<Achievement>,
}

impl Default for Achievements {
    fn default() -> Self {
        Self::restore(&[])
    }
}

impl Achievements {
    /// Merges saved unlocks into the current list by id; ids that no longer
    /// exist are ignored.
    pub fn restore(saved: &[AchievementProgress]) -> Self {
        let entries = ACHIEVEMENTS
            .iter()
            .map(|def| Achievement {
                def,
                unlocked_at: saved
                    .iter()
                    .find(|entry| entry.id == def.id)
                    .map(|entry| entry.unlocked_at),
            })
            .collect();
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.entries.iter()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.def.id == id && entry.is_unlocked())
    }

    pub fn unlocked_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_unlocked()).count()
    }

    /// Unlocks every locked achievement whose condition now holds and returns
    /// the newly unlocked ones. Unlocks are never reverted.
    pub fn evaluate(&mut self, progress: &Progress<'_>, now_ms: i64) -> Vec<&'static AchievementDef> {
        let mut unlocked = Vec::new();
        for entry in &mut self.entries {
            if entry.is_unlocked() {
                continue;
            }
            if (entry.def.condition)(progress) {
                entry.unlocked_at = Some(now_ms);
                unlocked.push(entry.def);
            }
        }
        unlocked
    }

    pub fn progress(&self) -> Vec<AchievementProgress> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry.unlocked_at.map(|unlocked_at| AchievementProgress {
                    id: entry.def.id.to_string(),
                    unlocked_at,
                })
            })
            .collect()
    }
}

pub const MILESTONES: [f64; 11] = [
    1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12,
];
pub const MILESTONE_WINDOW: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneDetection {
    /// Fires when the value sits in `[threshold, threshold + 100)`. A jump
    /// straight over the window is never reported.
    #[default]
    Window,
    /// Fires every threshold above the highest one already reported.
    Watermark,
}

#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    mode: MilestoneDetection,
    last_window: Option<f64>,
    watermark: f64,
}

impl MilestoneTracker {
    /// A saved watermark counts as the window already reported, so reloading
    /// inside that window stays quiet.
    pub fn new(mode: MilestoneDetection, watermark: f64) -> Self {
        let watermark = watermark.max(0.0);
        Self {
            mode,
            last_window: MILESTONES.contains(&watermark).then_some(watermark),
            watermark,
        }
    }

    pub fn watermark(&self) -> f64 {
        self.watermark
    }

    pub fn observe(&mut self, value: f64) -> Vec<f64> {
        match self.mode {
            MilestoneDetection::Window => {
                let hit = MILESTONES
                    .iter()
                    .copied()
                    .find(|&threshold| value >= threshold && value < threshold + MILESTONE_WINDOW);
                match hit {
                    Some(threshold) if self.last_window != Some(threshold) => {
                        self.last_window = Some(threshold);
                        self.watermark = self.watermark.max(threshold);
                        vec![threshold]
                    }
                    _ => Vec::new(),
                }
            }
            MilestoneDetection::Watermark => {
                let crossed: Vec<f64> = MILESTONES
                    .iter()
                    .copied()
                    .filter(|&threshold| threshold > self.watermark && value >= threshold)
                    .collect();
                if let Some(&highest) = crossed.last() {
                    self.watermark = highest;
                }
                crossed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::upgrades::UpgradeProgress;

    #[test]
    fn evaluating_twice_unlocks_once() {
        let mut state = ResourceState::new(0);
        state.total_points_earned = 1_500.0;
        let upgrades = UpgradeSet::from_catalog();
        let progress = Progress {
            state: &state,
            upgrades: &upgrades,
        };
        let mut achievements = Achievements::default();

        let first = achievements.evaluate(&progress, 10);
        let ids: Vec<_> = first.iter().map(|def| def.id).collect();
        assert_eq!(ids, vec!["first_strike", "pocket_change"]);

        assert!(achievements.evaluate(&progress, 20).is_empty());
        assert_eq!(achievements.unlocked_count(), 2);
    }

    #[test]
    fn unlocks_survive_state_regression() {
        let mut state = ResourceState::new(0);
        state.points = 150_000.0;
        let upgrades = UpgradeSet::from_catalog();
        let mut achievements = Achievements::default();
        achievements.evaluate(
            &Progress {
                state: &state,
                upgrades: &upgrades,
            },
            5,
        );
        assert!(achievements.is_unlocked("hoarder"));

        state.points = 0.0;
        achievements.evaluate(
            &Progress {
                state: &state,
                upgrades: &upgrades,
            },
            6,
        );
        assert!(achievements.is_unlocked("hoarder"));
    }

    #[test]
    fn upgrade_achievements_read_aggregates() {
        let state = ResourceState::new(0);
        let upgrades = UpgradeSet::reconcile(&[UpgradeProgress {
            id: "sharp_pickaxe".to_string(),
            level: 1,
        }]);
        let mut achievements = Achievements::default();
        let unlocked = achievements.evaluate(
            &Progress {
                state: &state,
                upgrades: &upgrades,
            },
            1,
        );
        assert!(unlocked.iter().any(|def| def.id == "tooled_up"));
    }

    #[test]
    fn restore_keeps_timestamps_and_ignores_unknown_ids() {
        let saved = vec![
            AchievementProgress {
                id: "tooled_up".to_string(),
                unlocked_at: 42,
            },
            AchievementProgress {
                id: "retired".to_string(),
                unlocked_at: 7,
            },
        ];
        let achievements = Achievements::restore(&saved);
        assert_eq!(achievements.progress(), vec![saved[0].clone()]);
    }

    #[test]
    fn window_detection_fires_once_inside_the_window() {
        let mut tracker = MilestoneTracker::new(MilestoneDetection::Window, 0.0);
        assert!(tracker.observe(50.0).is_empty());
        assert_eq!(tracker.observe(120.0), vec![100.0]);
        assert!(tracker.observe(150.0).is_empty());
        assert!(tracker.observe(250.0).is_empty());
    }

    #[test]
    fn restored_window_does_not_fire_again() {
        let mut tracker = MilestoneTracker::new(MilestoneDetection::Window, 1_000.0);
        assert!(tracker.observe(1_050.0).is_empty());
        assert_eq!(tracker.observe(10_020.0), vec![10_000.0]);
    }

    #[test]
    fn window_detection_misses_a_jump_over_the_window() {
        let mut tracker = MilestoneTracker::new(MilestoneDetection::Window, 0.0);
        assert!(tracker.observe(5_000.0).is_empty());
    }

    #[test]
    fn watermark_detection_reports_every_skipped_threshold() {
        let mut tracker = MilestoneTracker::new(MilestoneDetection::Watermark, 0.0);
        assert_eq!(tracker.observe(25_000.0), vec![100.0, 1_000.0, 10_000.0]);
        assert!(tracker.observe(30_000.0).is_empty());
        assert_eq!(tracker.watermark(), 10_000.0);
    }
}
