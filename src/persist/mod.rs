mod load;
pub mod record;
mod save;
pub mod storage;

pub use load::{LoadSource, LoadedGame, load_game, load_record, load_upgrades};
pub use record::{RecordError, SaveRecord};
pub use save::{
    SaveError, backup_upgrades, save_backup, save_primary, save_snapshot, save_upgrades,
};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

use crate::sim::game::Game;
use crate::sim::upgrades::UpgradeProgress;

pub const ANONYMOUS: &str = "anonymous";

/// The individually stored high-value counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalField {
    Points,
    AllTimeHighScore,
    TotalPointsEarned,
}

impl CriticalField {
    pub const ALL: [CriticalField; 3] = [
        CriticalField::Points,
        CriticalField::AllTimeHighScore,
        CriticalField::TotalPointsEarned,
    ];

    fn suffix(self) -> &'static str {
        match self {
            CriticalField::Points => "points",
            CriticalField::AllTimeHighScore => "all_time_high_score",
            CriticalField::TotalPointsEarned => "total_points_earned",
        }
    }
}

/// Storage key layout for one player. A missing or unusable user id maps to
/// the shared anonymous namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keys {
    namespace: String,
}

impl Keys {
    pub fn new(user_id: Option<&str>) -> Self {
        let namespace: String = user_id
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
            .collect();
        if namespace.is_empty() {
            Self::anonymous()
        } else {
            Self { namespace }
        }
    }

    pub fn anonymous() -> Self {
        Self {
            namespace: ANONYMOUS.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn primary(&self) -> String {
        format!("{}.save.primary", self.namespace)
    }

    pub fn backup(&self) -> String {
        format!("{}.save.backup", self.namespace)
    }

    pub fn upgrades(&self) -> String {
        format!("{}.upgrades", self.namespace)
    }

    pub fn upgrades_backup(&self) -> String {
        format!("{}.upgrades.backup", self.namespace)
    }

    pub fn critical(&self, field: CriticalField) -> String {
        format!("{}.critical.{}", self.namespace, field.suffix())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Pending,
    Saved { at: i64 },
    Failed { reason: String },
}

/// Owned copy of everything a save writes, taken without holding the game.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSnapshot {
    pub record: SaveRecord,
    pub upgrades: Vec<UpgradeProgress>,
}

/// Stamps `last_save_time` and copies the game out for the writer.
pub fn snapshot(game: &mut Game, now_ms: i64) -> SaveSnapshot {
    game.state.last_save_time = now_ms;
    game.state.version = crate::sim::state::SCHEMA_VERSION.to_string();
    SaveSnapshot {
        record: SaveRecord {
            state: game.state.clone(),
            achievements: game.achievements.progress(),
            milestone_watermark: game.milestone_watermark(),
        },
        upgrades: game.upgrades.progress(),
    }
}
