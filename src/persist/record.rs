//! On-disk schema for the main save and the upgrade document.
//!
//! Decoding is two-pass: the raw JSON object is checked and normalised
//! first, then handed to serde. Anything that fails here drops the record
//! into the load fallback chain instead of surfacing as an error.

use crate::sim::achievements::AchievementProgress;
use crate::sim::state::ResourceState;
use crate::sim::upgrades::UpgradeProgress;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const REQUIRED_NUMBERS: [&str; 6] = [
    "points",
    "totalPointsEarned",
    "pointsPerSecond",
    "currentEnergy",
    "maxEnergy",
    "lastSaveTime",
];

const OPTIONAL_NUMBERS: [&str; 8] = [
    "unclaimedOfflineRewards",
    "offlineEfficiencyBonus",
    "highScore",
    "allTimeHighScore",
    "lastEnergyRegenTime",
    "sessionStartTime",
    "lastOfflineRewardTime",
    "milestoneWatermark",
];

const TIMESTAMPS: [&str; 4] = [
    "lastSaveTime",
    "lastEnergyRegenTime",
    "sessionStartTime",
    "lastOfflineRewardTime",
];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("required field {0} is missing")]
    Missing(&'static str),
    #[error("field {0} is not a number")]
    NotANumber(&'static str),
    #[error("field {0} is negative")]
    Negative(&'static str),
    #[error("field isMining is not a boolean")]
    NotABool,
    #[error("upgrade document has no upgrade list")]
    NoUpgradeList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    #[serde(flatten)]
    pub state: ResourceState,
    #[serde(default)]
    pub achievements: Vec<AchievementProgress>,
    #[serde(default)]
    pub milestone_watermark: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDocument {
    pub version: String,
    pub upgrades: Vec<UpgradeProgress>,
}

pub fn encode(record: &SaveRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

pub fn decode(raw: &str) -> Result<SaveRecord, RecordError> {
    let mut value: Value = serde_json::from_str(raw)?;
    let object = value.as_object_mut().ok_or(RecordError::NotAnObject)?;
    normalize(object)?;
    let mut record: SaveRecord = serde_json::from_value(value)?;
    record.state.offline_efficiency_bonus = record
        .state
        .offline_efficiency_bonus
        .min(crate::sim::offline::MAX_OFFLINE_BONUS);
    Ok(record)
}

/// Rejects records with missing, non-numeric or negative required fields.
/// Negative optional fields are clamped to zero and fractional timestamps
/// truncated, so cosmetic damage doesn't cost the player a whole save.
fn normalize(object: &mut Map<String, Value>) -> Result<(), RecordError> {
    for field in REQUIRED_NUMBERS {
        let number = object
            .get(field)
            .ok_or(RecordError::Missing(field))?
            .as_f64()
            .ok_or(RecordError::NotANumber(field))?;
        if number < 0.0 {
            return Err(RecordError::Negative(field));
        }
    }
    match object.get("isMining") {
        Some(Value::Bool(_)) => {}
        Some(_) => return Err(RecordError::NotABool),
        None => return Err(RecordError::Missing("isMining")),
    }

    for field in OPTIONAL_NUMBERS {
        match object.get(field).map(|value| (value.is_null(), value.as_f64())) {
            None => {}
            Some((true, _)) => {
                object.remove(field);
            }
            Some((false, Some(number))) if number < 0.0 => {
                tracing::warn!(field, number, "record.field.clamped");
                object.insert(field.to_string(), Value::from(0));
            }
            Some((false, Some(_))) => {}
            Some((false, None)) => {
                tracing::warn!(field, "record.field.discarded");
                object.remove(field);
            }
        }
    }

    if object.get("version").is_some_and(|value| !value.is_string()) {
        tracing::warn!(field = "version", "record.field.discarded");
        object.remove("version");
    }
    match object.remove("achievements") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            let total = entries.len();
            let kept: Vec<Value> = entries
                .into_iter()
                .filter(|entry| AchievementProgress::deserialize(entry).is_ok())
                .collect();
            if kept.len() < total {
                tracing::warn!(
                    kept = kept.len(),
                    dropped = total - kept.len(),
                    "record.achievements.discarded"
                );
            }
            object.insert("achievements".to_string(), Value::Array(kept));
        }
        Some(_) => tracing::warn!(field = "achievements", "record.field.discarded"),
    }

    for field in TIMESTAMPS {
        let fractional = object
            .get(field)
            .filter(|value| !value.is_i64())
            .and_then(Value::as_f64);
        if let Some(number) = fractional {
            object.insert(field.to_string(), Value::from(number.trunc() as i64));
        }
    }
    Ok(())
}

pub fn encode_upgrades(upgrades: &[UpgradeProgress]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&UpgradeDocument {
        version: crate::sim::state::SCHEMA_VERSION.to_string(),
        upgrades: upgrades.to_vec(),
    })
}

/// Keeps every upgrade entry that still parses, even if its neighbours don't.
/// Accepts the wrapped document or a bare list.
pub fn decode_upgrades(raw: &str) -> Result<Vec<UpgradeProgress>, RecordError> {
    let value: Value = serde_json::from_str(raw)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("upgrades") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(RecordError::NoUpgradeList),
        },
        _ => return Err(RecordError::NoUpgradeList),
    };
    let total = entries.len();
    let upgrades: Vec<UpgradeProgress> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if upgrades.len() < total {
        tracing::warn!(
            kept = upgrades.len(),
            dropped = total - upgrades.len(),
            "upgrades.entries.discarded"
        );
    }
    Ok(upgrades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_record() -> SaveRecord {
        let mut state = ResourceState::new(1_700_000_000_000);
        state.points = 1_234.5;
        state.total_points_earned = 9_876.25;
        state.points_per_second = 7.5;
        state.is_mining = true;
        state.current_energy = 321.0;
        state.max_energy = 1_300.0;
        state.unclaimed_offline_rewards = 4_200.0;
        state.offline_efficiency_bonus = 0.3;
        state.high_score = 2_000.0;
        state.all_time_high_score = 5_000.0;
        state.last_offline_reward_time = 1_699_000_000_000;
        SaveRecord {
            state,
            achievements: vec![AchievementProgress {
                id: "tooled_up".to_string(),
                unlocked_at: 1_698_000_000_000,
            }],
            milestone_watermark: 1_000.0,
        }
    }

    #[test]
    fn encoded_record_decodes_to_the_same_state() {
        let record = sample_record();
        let raw = encode(&record).expect("encodes");
        assert_eq!(decode(&raw).expect("decodes"), record);
    }

    #[test]
    fn record_is_a_flat_object() {
        let raw = encode(&sample_record()).expect("encodes");
        let value: Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["isMining"], json!(true));
        assert_eq!(value["version"], json!("2.0"));
        assert!(value.get("state").is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value.as_object_mut().expect("object").remove("currentEnergy");
        assert!(matches!(
            decode(&value.to_string()),
            Err(RecordError::Missing("currentEnergy"))
        ));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["points"] = json!("lots");
        assert!(matches!(
            decode(&value.to_string()),
            Err(RecordError::NotANumber("points"))
        ));

        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["isMining"] = json!(1);
        assert!(matches!(decode(&value.to_string()), Err(RecordError::NotABool)));
    }

    #[test]
    fn negative_required_field_is_rejected() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["totalPointsEarned"] = json!(-3.0);
        assert!(matches!(
            decode(&value.to_string()),
            Err(RecordError::Negative("totalPointsEarned"))
        ));
    }

    #[test]
    fn negative_optional_fields_are_clamped() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["highScore"] = json!(-10.0);
        value["unclaimedOfflineRewards"] = json!(-1);
        value["offlineEfficiencyBonus"] = json!(9.0);
        let record = decode(&value.to_string()).expect("lenient");
        assert_eq!(record.state.high_score, 0.0);
        assert_eq!(record.state.unclaimed_offline_rewards, 0.0);
        assert_eq!(record.state.offline_efficiency_bonus, 1.4);
    }

    #[test]
    fn older_records_fill_in_defaults() {
        let raw = json!({
            "points": 10.0,
            "totalPointsEarned": 10.0,
            "pointsPerSecond": 1.0,
            "isMining": false,
            "currentEnergy": 500.0,
            "maxEnergy": 1000.0,
            "lastSaveTime": 1_700_000_000_000.0_f64,
        })
        .to_string();
        let record = decode(&raw).expect("decodes");
        assert_eq!(record.state.last_save_time, 1_700_000_000_000);
        assert_eq!(record.state.version, "2.0");
        assert!(record.achievements.is_empty());
        assert_eq!(record.milestone_watermark, 0.0);
    }

    #[test]
    fn mistyped_optional_fields_keep_the_record() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["achievements"] = json!("x");
        value["version"] = json!(2);
        let record = decode(&value.to_string()).expect("lenient");
        assert!(record.achievements.is_empty());
        assert_eq!(record.state.version, "2.0");
        assert_eq!(record.state.points, 1_234.5);
    }

    #[test]
    fn broken_achievement_entries_are_dropped_individually() {
        let mut value = serde_json::to_value(sample_record()).expect("json");
        value["achievements"] = json!([
            {"id": "first_strike", "unlockedAt": 5},
            {"id": "hoarder"},
            7,
        ]);
        let record = decode(&value.to_string()).expect("lenient");
        assert_eq!(
            record.achievements,
            vec![AchievementProgress {
                id: "first_strike".to_string(),
                unlocked_at: 5,
            }]
        );
    }

    proptest! {
        #[test]
        fn any_finite_values_survive_a_save_cycle(
            counters in proptest::array::uniform5(0.0f64..1e15),
            scores in proptest::array::uniform4(0.0f64..1e15),
            bonus in 0.0f64..=1.4,
            last_save in 0i64..4_102_444_800_000,
            is_mining in any::<bool>(),
        ) {
            let mut record = sample_record();
            let state = &mut record.state;
            state.points = counters[0];
            state.total_points_earned = counters[1];
            state.points_per_second = counters[2];
            state.current_energy = counters[3];
            state.max_energy = counters[4];
            state.unclaimed_offline_rewards = scores[0];
            state.high_score = scores[1];
            state.all_time_high_score = scores[2];
            state.offline_efficiency_bonus = bonus;
            state.last_save_time = last_save;
            state.is_mining = is_mining;
            record.milestone_watermark = scores[3];

            let raw = encode(&record).expect("encodes");
            prop_assert_eq!(decode(&raw).expect("decodes"), record);
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(decode("{not json"), Err(RecordError::Json(_))));
        assert!(matches!(decode("[1,2]"), Err(RecordError::NotAnObject)));
    }

    #[test]
    fn upgrade_document_keeps_surviving_entries() {
        let raw = json!({
            "version": "2.0",
            "upgrades": [
                {"id": "sharp_pickaxe", "level": 3},
                {"id": "miner_gloves", "level": "broken"},
                {"level": 2},
                {"id": "coffee_thermos", "level": 1},
            ]
        })
        .to_string();
        let upgrades = decode_upgrades(&raw).expect("partially decodes");
        let ids: Vec<_> = upgrades.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["sharp_pickaxe", "coffee_thermos"]);
    }

    #[test]
    fn upgrade_document_accepts_a_bare_list() {
        let upgrades = decode_upgrades(r#"[{"id":"steam_drill","level":2}]"#).expect("decodes");
        assert_eq!(upgrades.len(), 1);
        assert!(matches!(
            decode_upgrades(r#"{"version":"2.0"}"#),
            Err(RecordError::NoUpgradeList)
        ));
    }
}
