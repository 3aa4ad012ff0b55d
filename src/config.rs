use crate::sim::achievements::MilestoneDetection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "ore-engine.ron";
pub const CONFIG_ENV: &str = "ORE_ENGINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub mining_tick_ms: u64,
    pub regen_tick_ms: u64,
    pub autosave_secs: u64,
    /// Rolling backup of the full record; slower than the primary save.
    pub backup_secs: u64,
    /// Extra copy of upgrade levels; faster than the general backup.
    pub upgrade_backup_secs: u64,
    pub data_dir: PathBuf,
    pub user_id: Option<String>,
    pub milestone_detection: MilestoneDetection,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mining_tick_ms: 500,
            regen_tick_ms: 1_000,
            autosave_secs: 30,
            backup_secs: 300,
            upgrade_backup_secs: 60,
            data_dir: PathBuf::from("save"),
            user_id: None,
            milestone_detection: MilestoneDetection::Window,
        }
    }
}

impl GameConfig {
    pub fn mining_tick(&self) -> Duration {
        Duration::from_millis(self.mining_tick_ms.max(1))
    }

    pub fn regen_tick(&self) -> Duration {
        Duration::from_millis(self.regen_tick_ms.max(1))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_secs.max(1))
    }

    pub fn upgrade_backup_interval(&self) -> Duration {
        Duration::from_secs(self.upgrade_backup_secs.max(1))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

/// Reads the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(GameConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: GameConfig =
            ron::from_str("(autosave_secs: 10, user_id: Some(\"miner-7\"))").expect("parses");
        assert_eq!(config.autosave_secs, 10);
        assert_eq!(config.user_id.as_deref(), Some("miner-7"));
        assert_eq!(config.mining_tick_ms, 500);
        assert_eq!(config.milestone_detection, MilestoneDetection::Window);
    }

    #[test]
    fn milestone_mode_parses_from_ron() {
        let config: GameConfig =
            ron::from_str("(milestone_detection: watermark)").expect("parses");
        assert_eq!(config.milestone_detection, MilestoneDetection::Watermark);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("definitely/not/here.ron")).expect("defaults");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn backup_cadences_are_ordered() {
        let config = GameConfig::default();
        assert!(config.backup_interval() > config.autosave_interval());
        assert!(config.upgrade_backup_interval() < config.backup_interval());
    }
}
