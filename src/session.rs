//! Runs one game session as a single-owner actor.
//!
//! The `Game` lives inside one tokio task. Timers and callers post commands
//! to it; nothing else touches the state. Saves are taken as owned snapshots
//! and handed to a separate writer task, which runs storage I/O on tokio's
//! blocking pool.

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::persist::{self, Keys, SaveError, SaveSnapshot, SaveStatus, Storage};
use crate::sim::boosts::BoostSource;
use crate::sim::events::GameEvent;
use crate::sim::game::{Game, Purchase, PurchaseError, UpgradeView};
use crate::sim::state::ResourceState;
use crate::sim::upgrades::UpgradeProgress;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

const COMMAND_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has shut down")]
    Closed,
    #[error(transparent)]
    Save(#[from] SaveError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: ResourceState,
    pub upgrades: Vec<UpgradeView>,
    pub messages: Vec<String>,
}

enum Command {
    ToggleMining(oneshot::Sender<bool>),
    Purchase {
        id: String,
        reply: oneshot::Sender<Result<Purchase, PurchaseError>>,
    },
    ClaimOffline(oneshot::Sender<f64>),
    View(oneshot::Sender<SessionView>),
    MiningTick,
    RegenTick,
    Autosave,
    Backup,
    UpgradeBackup,
    Shutdown(oneshot::Sender<Result<(), SessionError>>),
}

enum PersistJob {
    Save(SaveSnapshot),
    Backup(SaveSnapshot),
    UpgradeBackup(Vec<UpgradeProgress>),
    Final(SaveSnapshot, oneshot::Sender<Result<(), SaveError>>),
}

/// Collaborators a session needs besides the game itself.
pub struct SessionParts {
    pub storage: Box<dyn Storage>,
    pub keys: Keys,
    pub clock: Arc<dyn Clock>,
    pub boosts: Arc<dyn BoostSource>,
    pub events: Option<mpsc::UnboundedSender<GameEvent>>,
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SaveStatus>,
}

pub struct Session;

impl Session {
    /// Starts the actor and its persistence writer. Timers are separate, see
    /// [`spawn_timers`].
    pub fn spawn(game: Game, parts: SessionParts, config: &GameConfig) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Pending);

        tokio::spawn(run_writer(
            parts.storage,
            parts.keys,
            parts.clock.clone(),
            persist_rx,
            status_tx,
        ));
        let actor = Actor {
            game,
            clock: parts.clock,
            boosts: parts.boosts,
            events: parts.events,
            persist: persist_tx,
            mining_tick: config.mining_tick(),
            regen_tick: config.regen_tick(),
        };
        tokio::spawn(actor.run(command_rx));

        SessionHandle {
            commands: command_tx,
            status: status_rx,
        }
    }
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    async fn post(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn toggle_mining(&self) -> Result<bool, SessionError> {
        self.request(Command::ToggleMining).await
    }

    pub async fn purchase(&self, id: &str) -> Result<Result<Purchase, PurchaseError>, SessionError> {
        let id = id.to_string();
        self.request(|reply| Command::Purchase { id, reply }).await
    }

    pub async fn claim_offline_rewards(&self) -> Result<f64, SessionError> {
        self.request(Command::ClaimOffline).await
    }

    pub async fn view(&self) -> Result<SessionView, SessionError> {
        self.request(Command::View).await
    }

    pub async fn mining_tick(&self) -> Result<(), SessionError> {
        self.post(Command::MiningTick).await
    }

    pub async fn regen_tick(&self) -> Result<(), SessionError> {
        self.post(Command::RegenTick).await
    }

    pub async fn autosave(&self) -> Result<(), SessionError> {
        self.post(Command::Autosave).await
    }

    pub async fn backup(&self) -> Result<(), SessionError> {
        self.post(Command::Backup).await
    }

    pub async fn backup_upgrades(&self) -> Result<(), SessionError> {
        self.post(Command::UpgradeBackup).await
    }

    pub fn save_status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Flushes a final save and stops the session. Returns once the save has
    /// been written (or has failed).
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(Command::Shutdown).await?
    }
}

/// Mining tick, regen tick and the three save cadences, each on its own
/// interval. The tasks end once the session is gone.
pub fn spawn_timers(handle: &SessionHandle, config: &GameConfig) -> Vec<JoinHandle<()>> {
    let schedule = [
        (config.mining_tick(), TimerKind::Mining),
        (config.regen_tick(), TimerKind::Regen),
        (config.autosave_interval(), TimerKind::Autosave),
        (config.backup_interval(), TimerKind::Backup),
        (config.upgrade_backup_interval(), TimerKind::UpgradeBackup),
    ];
    schedule
        .into_iter()
        .map(|(period, kind)| tokio::spawn(run_timer(handle.commands.clone(), period, kind)))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Mining,
    Regen,
    Autosave,
    Backup,
    UpgradeBackup,
}

async fn run_timer(commands: mpsc::Sender<Command>, period: Duration, kind: TimerKind) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let command = match kind {
            TimerKind::Mining => Command::MiningTick,
            TimerKind::Regen => Command::RegenTick,
            TimerKind::Autosave => Command::Autosave,
            TimerKind::Backup => Command::Backup,
            TimerKind::UpgradeBackup => Command::UpgradeBackup,
        };
        if commands.send(command).await.is_err() {
            break;
        }
    }
}

struct Actor {
    game: Game,
    clock: Arc<dyn Clock>,
    boosts: Arc<dyn BoostSource>,
    events: Option<mpsc::UnboundedSender<GameEvent>>,
    persist: mpsc::UnboundedSender<PersistJob>,
    mining_tick: Duration,
    regen_tick: Duration,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.forward_events();
        while let Some(command) = commands.recv().await {
            let now = self.clock.now_ms();
            match command {
                Command::ToggleMining(reply) => {
                    let mining = self.game.toggle_mining();
                    if !mining {
                        self.enqueue_save(now);
                    }
                    let _ = reply.send(mining);
                }
                Command::Purchase { id, reply } => {
                    let result = self.game.purchase(&id, now);
                    if result.is_ok() {
                        self.enqueue_save(now);
                    }
                    let _ = reply.send(result);
                }
                Command::ClaimOffline(reply) => {
                    let claimed = self.game.claim_offline_rewards(now);
                    if claimed > 0.0 {
                        self.enqueue_save(now);
                    }
                    let _ = reply.send(claimed);
                }
                Command::View(reply) => {
                    let _ = reply.send(SessionView {
                        state: self.game.state.clone(),
                        upgrades: self.game.upgrade_views(),
                        messages: self.game.messages().cloned().collect(),
                    });
                }
                Command::MiningTick => {
                    let boosts = self.boosts.boosts();
                    let was_mining = self.game.is_mining();
                    self.game.mining_tick(self.mining_tick, &boosts, now);
                    if was_mining && !self.game.is_mining() {
                        self.enqueue_save(now);
                    }
                }
                Command::RegenTick => {
                    let boosts = self.boosts.boosts();
                    self.game.regen_tick(self.regen_tick, &boosts, now);
                }
                Command::Autosave => self.enqueue_save(now),
                Command::Backup => {
                    let snapshot = persist::snapshot(&mut self.game, now);
                    self.send_job(PersistJob::Backup(snapshot));
                }
                Command::UpgradeBackup => {
                    self.send_job(PersistJob::UpgradeBackup(self.game.upgrades.progress()));
                }
                Command::Shutdown(reply) => {
                    let snapshot = persist::snapshot(&mut self.game, now);
                    let (ack, written) = oneshot::channel();
                    self.send_job(PersistJob::Final(snapshot, ack));
                    let result = match written.await {
                        Ok(saved) => saved.map_err(SessionError::from),
                        Err(_) => Err(SessionError::Closed),
                    };
                    self.forward_events();
                    tracing::info!(saved = result.is_ok(), "session.shutdown");
                    let _ = reply.send(result);
                    break;
                }
            }
            self.forward_events();
        }
    }

    fn enqueue_save(&mut self, now: i64) {
        let snapshot = persist::snapshot(&mut self.game, now);
        self.send_job(PersistJob::Save(snapshot));
    }

    fn send_job(&self, job: PersistJob) {
        if self.persist.send(job).is_err() {
            tracing::warn!("session.writer.gone");
        }
    }

    fn forward_events(&mut self) {
        let events = self.game.drain_events();
        if let Some(sink) = &self.events {
            for event in events {
                if sink.send(event).is_err() {
                    break;
                }
            }
        }
    }
}

/// Runs one job to completion. Storage backends are free to block.
fn write_job(storage: &mut dyn Storage, keys: &Keys, job: &PersistJob) -> Result<(), SaveError> {
    match job {
        PersistJob::Save(snapshot) | PersistJob::Final(snapshot, _) => {
            persist::save_snapshot(storage, keys, snapshot)
        }
        PersistJob::Backup(snapshot) => {
            persist::save_backup(storage, keys, &snapshot.record)?;
            persist::backup_upgrades(storage, keys, &snapshot.upgrades)
        }
        PersistJob::UpgradeBackup(upgrades) => persist::backup_upgrades(storage, keys, upgrades),
    }
}

/// Owns the storage. Each write runs on the blocking pool and hands the
/// storage back when it is done.
async fn run_writer(
    mut storage: Box<dyn Storage>,
    keys: Keys,
    clock: Arc<dyn Clock>,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
    status: watch::Sender<SaveStatus>,
) {
    while let Some(job) = jobs.recv().await {
        let (job, ack) = match job {
            PersistJob::Final(snapshot, ack) => (PersistJob::Save(snapshot), Some(ack)),
            other => (other, None),
        };
        let is_primary = matches!(job, PersistJob::Save(_));
        let job_keys = keys.clone();
        let written = task::spawn_blocking(move || {
            let result = write_job(storage.as_mut(), &job_keys, &job);
            (storage, result)
        })
        .await;
        let result = match written {
            Ok((returned, result)) => {
                storage = returned;
                result
            }
            Err(err) => {
                tracing::error!(error = %err, "save.writer.crashed");
                status.send_replace(SaveStatus::Failed {
                    reason: err.to_string(),
                });
                break;
            }
        };

        match &result {
            Ok(()) if is_primary => {
                status.send_replace(SaveStatus::Saved {
                    at: clock.now_ms(),
                });
            }
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(error = %err, "save.failed");
                status.send_replace(SaveStatus::Failed {
                    reason: err.to_string(),
                });
            }
        }

        if let Some(ack) = ack {
            let _ = ack.send(result);
            break;
        }
    }
}
