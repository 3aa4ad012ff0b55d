use super::record::{self, SaveRecord};
use super::storage::{Storage, StorageError};
use super::{CriticalField, Keys, SaveSnapshot};
use crate::sim::upgrades::UpgradeProgress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to encode save: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("read-back of {key} did not match what was written")]
    VerifyMismatch { key: String },
}

/// Writes `payload` and reads it straight back. A mismatch is reported, not
/// retried; the next scheduled save tries again.
fn write_verified(storage: &mut dyn Storage, key: &str, payload: &str) -> Result<(), SaveError> {
    storage.set(key, payload)?;
    match storage.get(key)? {
        Some(stored) if stored.as_bytes() == payload.as_bytes() => Ok(()),
        _ => {
            tracing::warn!(key, "save.verify.mismatch");
            Err(SaveError::VerifyMismatch {
                key: key.to_string(),
            })
        }
    }
}

fn mirror_critical(storage: &mut dyn Storage, keys: &Keys, record: &SaveRecord) -> Result<(), SaveError> {
    for field in CriticalField::ALL {
        let value = match field {
            CriticalField::Points => record.state.points,
            CriticalField::AllTimeHighScore => record.state.all_time_high_score,
            CriticalField::TotalPointsEarned => record.state.total_points_earned,
        };
        storage.set(&keys.critical(field), &value.to_string())?;
    }
    Ok(())
}

/// Full record to the primary slot, verified, plus the critical scalars.
pub fn save_primary(storage: &mut dyn Storage, keys: &Keys, record: &SaveRecord) -> Result<(), SaveError> {
    let payload = record::encode(record)?;
    write_verified(storage, &keys.primary(), &payload)?;
    mirror_critical(storage, keys, record)?;
    tracing::debug!(key = %keys.primary(), bytes = payload.len(), "save.primary.verified");
    Ok(())
}

pub fn save_backup(storage: &mut dyn Storage, keys: &Keys, record: &SaveRecord) -> Result<(), SaveError> {
    let payload = record::encode(record)?;
    write_verified(storage, &keys.backup(), &payload)?;
    tracing::debug!(key = %keys.backup(), "save.backup.verified");
    Ok(())
}

pub fn save_upgrades(
    storage: &mut dyn Storage,
    keys: &Keys,
    upgrades: &[UpgradeProgress],
) -> Result<(), SaveError> {
    let payload = record::encode_upgrades(upgrades)?;
    write_verified(storage, &keys.upgrades(), &payload)
}

pub fn backup_upgrades(
    storage: &mut dyn Storage,
    keys: &Keys,
    upgrades: &[UpgradeProgress],
) -> Result<(), SaveError> {
    let payload = record::encode_upgrades(upgrades)?;
    write_verified(storage, &keys.upgrades_backup(), &payload)
}

/// The regular save: main record and the upgrade document.
pub fn save_snapshot(storage: &mut dyn Storage, keys: &Keys, snapshot: &SaveSnapshot) -> Result<(), SaveError> {
    save_primary(storage, keys, &snapshot.record)?;
    save_upgrades(storage, keys, &snapshot.upgrades)
}
