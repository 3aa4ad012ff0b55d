use anyhow::{Context, Result};
use ore_engine::clock::{Clock, SystemClock};
use ore_engine::config::{config_path, load_config};
use ore_engine::persist::{FileStorage, Keys, LoadSource, load_game};
use ore_engine::session::{Session, SessionParts, spawn_timers};
use ore_engine::sim::boosts::NoBoosts;
use ore_engine::sim::events::GameEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = config_path();
    let config = load_config(&path).with_context(|| format!("loading {}", path.display()))?;
    let storage = FileStorage::open(&config.data_dir)
        .with_context(|| format!("opening save directory {}", config.data_dir.display()))?;
    let keys = Keys::new(config.user_id.as_deref());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let loaded = load_game(&storage, &keys, clock.now_ms(), config.milestone_detection);
    if matches!(loaded.source, LoadSource::Backup | LoadSource::CriticalMirror) {
        tracing::warn!(source = ?loaded.source, "startup.recovered");
    }
    if loaded.offline.has_earnings() {
        tracing::info!(
            hours = loaded.offline.elapsed_ms as f64 / 3_600_000.0,
            earnings = loaded.offline.earnings,
            bonus = loaded.offline.bonus,
            "startup.offline"
        );
    }
    for message in loaded.game.messages() {
        tracing::info!("{message}");
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let parts = SessionParts {
        storage: Box::new(storage),
        keys,
        clock,
        boosts: Arc::new(NoBoosts),
        events: Some(events_tx),
    };
    let session = Session::spawn(loaded.game, parts, &config);
    let timers = spawn_timers(&session, &config);

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            log_event(&event);
        }
    });

    let view = session.view().await?;
    if view.state.unclaimed_offline_rewards > 0.0 {
        let claimed = session.claim_offline_rewards().await?;
        tracing::info!(claimed, "offline.claimed");
    }
    if !view.state.is_mining {
        session.toggle_mining().await?;
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    for timer in &timers {
        timer.abort();
    }
    session.shutdown().await.context("final save")?;
    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::MiningStarted { automatic } => tracing::info!(automatic, "mining.started"),
        GameEvent::MiningStopped { reason } => tracing::info!(reason = ?reason, "mining.stopped"),
        GameEvent::UpgradePurchased { id, level, cost } => {
            tracing::info!(id, level, cost, "upgrade.purchased")
        }
        GameEvent::AchievementUnlocked { id, name, .. } => {
            tracing::info!(id, name, "achievement.unlocked")
        }
        GameEvent::MilestoneCrossed { threshold } => tracing::info!(threshold, "milestone.crossed"),
        GameEvent::OfflineRewardsAvailable { amount, .. } => {
            tracing::info!(amount, "offline.available")
        }
        GameEvent::OfflineRewardsClaimed { amount } => tracing::info!(amount, "offline.claimed"),
        GameEvent::RecoveredFromBackup { source } => {
            tracing::warn!(source = ?source, "save.recovered")
        }
    }
}
