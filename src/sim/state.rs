use super::economy::{BASE_MAX_ENERGY, BASE_POINTS_PER_SECOND};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "2.0";

fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Mutable simulation state for one session. Field names follow the
/// camelCase layout of the web client's save blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    pub points: f64,
    pub total_points_earned: f64,
    pub points_per_second: f64,
    pub is_mining: bool,
    pub current_energy: f64,
    pub max_energy: f64,
    pub last_save_time: i64,
    #[serde(default)]
    pub last_energy_regen_time: i64,
    #[serde(default)]
    pub session_start_time: i64,
    #[serde(default)]
    pub last_offline_reward_time: i64,
    #[serde(default)]
    pub unclaimed_offline_rewards: f64,
    #[serde(default)]
    pub offline_efficiency_bonus: f64,
    #[serde(default)]
    pub high_score: f64,
    #[serde(default)]
    pub all_time_high_score: f64,
    #[serde(default = "schema_version")]
    pub version: String,
}

impl ResourceState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            points: 0.0,
            total_points_earned: 0.0,
            points_per_second: BASE_POINTS_PER_SECOND,
            is_mining: false,
            current_energy: BASE_MAX_ENERGY,
            max_energy: BASE_MAX_ENERGY,
            last_save_time: now_ms,
            last_energy_regen_time: now_ms,
            session_start_time: now_ms,
            last_offline_reward_time: 0,
            unclaimed_offline_rewards: 0.0,
            offline_efficiency_bonus: 0.0,
            high_score: 0.0,
            all_time_high_score: 0.0,
            version: schema_version(),
        }
    }

    /// Raises both high scores to the current balance if it is a new maximum.
    pub fn record_high_score(&mut self) {
        if self.points > self.high_score {
            self.high_score = self.points;
        }
        if self.points > self.all_time_high_score {
            self.all_time_high_score = self.points;
        }
    }

    pub fn clamp_energy(&mut self) {
        self.current_energy = self.current_energy.clamp(0.0, self.max_energy.max(0.0));
    }
}
