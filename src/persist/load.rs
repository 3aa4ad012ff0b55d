use super::record::{self, SaveRecord};
use super::storage::Storage;
use super::{CriticalField, Keys};
use crate::sim::achievements::{Achievements, MilestoneDetection, MilestoneTracker};
use crate::sim::events::RecoverySource;
use crate::sim::game::Game;
use crate::sim::offline::OfflineCredit;
use crate::sim::state::ResourceState;
use crate::sim::upgrades::{UpgradeProgress, UpgradeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    CriticalMirror,
    Fresh,
}

pub struct LoadedGame {
    pub game: Game,
    pub source: LoadSource,
    pub offline: OfflineCredit,
}

fn read_record(storage: &dyn Storage, key: &str) -> Option<SaveRecord> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "load.read.failed");
            return None;
        }
    };
    match record::decode(&raw) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(key, error = %err, "load.record.rejected");
            None
        }
    }
}

fn read_scalar(storage: &dyn Storage, key: &str) -> Option<f64> {
    let raw = storage.get(key).ok().flatten()?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Rebuilds a minimal record from the mirrored counters. Timestamps are set
/// to `now` so no offline credit is paid on top of a reconstruction.
fn reconstruct_from_mirror(storage: &dyn Storage, keys: &Keys, now_ms: i64) -> Option<SaveRecord> {
    let points = read_scalar(storage, &keys.critical(CriticalField::Points));
    let high = read_scalar(storage, &keys.critical(CriticalField::AllTimeHighScore));
    let earned = read_scalar(storage, &keys.critical(CriticalField::TotalPointsEarned));
    if points.is_none() && high.is_none() && earned.is_none() {
        return None;
    }
    let mut state = ResourceState::new(now_ms);
    state.points = points.unwrap_or(0.0);
    state.total_points_earned = earned.unwrap_or(0.0).max(state.points);
    state.all_time_high_score = high.unwrap_or(0.0).max(state.points);
    state.high_score = state.points;
    Some(SaveRecord {
        state,
        achievements: Vec::new(),
        milestone_watermark: 0.0,
    })
}

/// Primary slot, then backup, then the critical mirror. `None` means a
/// brand-new player.
pub fn load_record(storage: &dyn Storage, keys: &Keys, now_ms: i64) -> (Option<SaveRecord>, LoadSource) {
    if let Some(record) = read_record(storage, &keys.primary()) {
        return (Some(record), LoadSource::Primary);
    }
    if let Some(record) = read_record(storage, &keys.backup()) {
        return (Some(record), LoadSource::Backup);
    }
    if let Some(record) = reconstruct_from_mirror(storage, keys, now_ms) {
        return (Some(record), LoadSource::CriticalMirror);
    }
    (None, LoadSource::Fresh)
}

/// Upgrade document, then its backup. Whatever entries survive are merged
/// with catalog defaults by the caller.
pub fn load_upgrades(storage: &dyn Storage, keys: &Keys) -> Vec<UpgradeProgress> {
    for key in [keys.upgrades(), keys.upgrades_backup()] {
        match storage.get(&key) {
            Ok(Some(raw)) => match record::decode_upgrades(&raw) {
                Ok(upgrades) if !upgrades.is_empty() => return upgrades,
                Ok(_) => tracing::warn!(key = %key, "load.upgrades.empty"),
                Err(err) => tracing::warn!(key = %key, error = %err, "load.upgrades.rejected"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, error = %err, "load.read.failed"),
        }
    }
    Vec::new()
}

pub fn load_game(
    storage: &dyn Storage,
    keys: &Keys,
    now_ms: i64,
    milestone_detection: MilestoneDetection,
) -> LoadedGame {
    let (record, source) = load_record(storage, keys, now_ms);
    let upgrades = UpgradeSet::reconcile(&load_upgrades(storage, keys));
    tracing::info!(
        namespace = keys.namespace(),
        source = ?source,
        owned_upgrades = upgrades.owned_count(),
        "load.source.selected"
    );

    let Some(record) = record else {
        let mut game = Game::from_parts(
            ResourceState::new(now_ms),
            upgrades,
            Achievements::default(),
            MilestoneTracker::new(milestone_detection, 0.0),
        );
        game.refresh_progress(now_ms);
        game.add_message("Welcome to the mine.");
        return LoadedGame {
            game,
            source,
            offline: OfflineCredit::default(),
        };
    };

    let achievements = Achievements::restore(&record.achievements);
    let milestones = MilestoneTracker::new(milestone_detection, record.milestone_watermark);
    let (mut game, offline) = Game::resume(record.state, upgrades, achievements, milestones, now_ms);
    match source {
        LoadSource::Backup => {
            game.note_recovery(RecoverySource::Backup);
        }
        LoadSource::CriticalMirror => {
            game.note_recovery(RecoverySource::CriticalMirror);
        }
        LoadSource::Primary | LoadSource::Fresh => game.add_message("Loaded save state."),
    }
    LoadedGame {
        game,
        source,
        offline,
    }
}
