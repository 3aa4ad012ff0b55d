#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Player,
    OutOfEnergy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    Backup,
    CriticalMirror,
}

/// Notifications for the host application. Delivery is its business.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    MiningStarted { automatic: bool },
    MiningStopped { reason: StopReason },
    UpgradePurchased { id: &'static str, level: u32, cost: f64 },
    AchievementUnlocked { id: &'static str, name: &'static str, at: i64 },
    MilestoneCrossed { threshold: f64 },
    OfflineRewardsAvailable { amount: f64, elapsed_ms: i64, bonus: f64 },
    OfflineRewardsClaimed { amount: f64 },
    RecoveredFromBackup { source: RecoverySource },
}
