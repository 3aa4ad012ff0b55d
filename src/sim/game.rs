use super::achievements::{Achievements, MilestoneDetection, MilestoneTracker, Progress};
use super::boosts::{self, Boost};
use super::catalog::Category;
use super::economy;
use super::events::{GameEvent, RecoverySource, StopReason};
use super::offline::{self, OfflineCredit, OfflineInput};
use super::state::ResourceState;
use super::upgrades::UpgradeSet;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

const MAX_MESSAGES: usize = 8;
const MAX_EVENTS: usize = 64;
pub const MIN_ENERGY_TO_MINE: f64 = 1.0;
/// Auto-mining waits for this many ticks' worth of energy before restarting.
pub const AUTO_MINE_RESTART_TICKS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Idle,
    Mined { points: f64, energy_cost: f64 },
    Exhausted { energy_cost: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Purchase {
    pub id: &'static str,
    pub level: u32,
    pub cost: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PurchaseError {
    #[error("not enough points (requires {cost:.0})")]
    InsufficientFunds { cost: f64 },
    #[error("{id} is already at its maximum level")]
    MaxLevelReached { id: &'static str },
    #[error("unknown upgrade {id}")]
    UnknownUpgrade { id: String },
    #[error("{id} has not been unlocked yet")]
    Locked { id: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeView {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub level: u32,
    pub max_level: u32,
    pub cost: Option<f64>,
    pub unlocked: bool,
}

pub struct Game {
    pub state: ResourceState,
    pub upgrades: UpgradeSet,
    pub achievements: Achievements,
    milestones: MilestoneTracker,
    events: VecDeque<GameEvent>,
    messages: VecDeque<String>,
}

impl Game {
    pub fn fresh(now_ms: i64) -> Self {
        Self::from_parts(
            ResourceState::new(now_ms),
            UpgradeSet::from_catalog(),
            Achievements::default(),
            MilestoneTracker::new(MilestoneDetection::default(), 0.0),
        )
    }

    pub fn from_parts(
        state: ResourceState,
        upgrades: UpgradeSet,
        achievements: Achievements,
        milestones: MilestoneTracker,
    ) -> Self {
        let mut game = Self {
            state,
            upgrades,
            achievements,
            milestones,
            events: VecDeque::with_capacity(MAX_EVENTS),
            messages: VecDeque::with_capacity(MAX_MESSAGES),
        };
        game.refresh_derived();
        game
    }

    /// Brings a loaded save up to `now`: credits offline earnings computed from
    /// the rate stored at save time, regenerates energy for the gap, then
    /// re-derives rates from the reconciled upgrades.
    pub fn resume(
        state: ResourceState,
        upgrades: UpgradeSet,
        achievements: Achievements,
        milestones: MilestoneTracker,
        now_ms: i64,
    ) -> (Self, OfflineCredit) {
        let input = OfflineInput {
            last_save_time: state.last_save_time,
            now: now_ms,
            was_mining: state.is_mining,
            points_per_second: state.points_per_second,
            regen_per_second: economy::regen_per_second(&upgrades),
        };
        let mut game = Self::from_parts(state, upgrades, achievements, milestones);
        let credit = offline::reconcile(input);
        game.apply_offline_credit(&credit, now_ms);
        game.observe(now_ms);
        (game, credit)
    }

    /// Recomputes the cached rate and energy capacity from owned upgrades.
    /// Energy is clamped down to a smaller capacity but never topped up.
    pub fn refresh_derived(&mut self) {
        self.state.points_per_second = economy::points_per_second(&self.upgrades);
        self.state.max_energy = economy::max_energy(&self.upgrades);
        self.state.clamp_energy();
        self.state.offline_efficiency_bonus = self
            .state
            .offline_efficiency_bonus
            .clamp(0.0, offline::MAX_OFFLINE_BONUS);
    }

    pub fn is_mining(&self) -> bool {
        self.state.is_mining
    }

    pub fn boosted_rate(&self, boosts: &[Boost], now_ms: i64) -> f64 {
        let resonance = economy::resonance_bonus(&self.upgrades);
        self.state.points_per_second * boosts::boost_multiplier(boosts, resonance, now_ms)
    }

    pub fn energy_cost(&self, boosts: &[Boost], now_ms: i64) -> f64 {
        let boosted = self.boosted_rate(boosts, now_ms);
        let scaling = economy::speed_scaling(boosted, self.state.points_per_second);
        economy::energy_cost(scaling, economy::efficiency_bonus(&self.upgrades))
    }

    pub fn start_mining(&mut self) -> bool {
        if self.state.is_mining {
            return true;
        }
        if self.state.current_energy < MIN_ENERGY_TO_MINE {
            self.push_message("Too tired to mine. Wait for energy to recover.".to_string());
            return false;
        }
        self.state.is_mining = true;
        self.push_event(GameEvent::MiningStarted { automatic: false });
        true
    }

    pub fn stop_mining(&mut self) {
        if self.state.is_mining {
            self.halt(StopReason::Player);
        }
    }

    /// Returns whether the machine is mining afterwards.
    pub fn toggle_mining(&mut self) -> bool {
        if self.state.is_mining {
            self.stop_mining();
            false
        } else {
            self.start_mining()
        }
    }

    pub fn mining_tick(&mut self, delta: Duration, boosts: &[Boost], now_ms: i64) -> TickOutcome {
        if !self.state.is_mining {
            return TickOutcome::Idle;
        }
        let boosted = self.boosted_rate(boosts, now_ms);
        let energy_cost = self.energy_cost(boosts, now_ms);
        if self.state.current_energy < energy_cost {
            tracing::debug!(
                energy = self.state.current_energy,
                energy_cost,
                "mining.stopped.exhausted"
            );
            self.halt(StopReason::OutOfEnergy);
            return TickOutcome::Exhausted { energy_cost };
        }

        let earned = boosted * delta.as_secs_f64();
        self.state.points += earned;
        self.state.total_points_earned += earned;
        self.state.current_energy -= energy_cost;
        self.observe(now_ms);
        TickOutcome::Mined {
            points: earned,
            energy_cost,
        }
    }

    pub fn regen_tick(&mut self, delta: Duration, boosts: &[Boost], now_ms: i64) {
        if self.state.current_energy < self.state.max_energy {
            let regen = economy::regen_per_second(&self.upgrades) * delta.as_secs_f64();
            self.state.current_energy =
                (self.state.current_energy + regen).min(self.state.max_energy);
        }
        self.state.last_energy_regen_time = now_ms;
        self.try_auto_mine(boosts, now_ms);
    }

    fn try_auto_mine(&mut self, boosts: &[Boost], now_ms: i64) {
        if self.state.is_mining || !economy::has_auto_mining(&self.upgrades) {
            return;
        }
        let threshold = AUTO_MINE_RESTART_TICKS * self.energy_cost(boosts, now_ms);
        if self.state.current_energy >= threshold.max(MIN_ENERGY_TO_MINE) {
            self.state.is_mining = true;
            self.push_event(GameEvent::MiningStarted { automatic: true });
        }
    }

    pub fn purchase_cost(&self, id: &str) -> Option<f64> {
        let upgrade = self.upgrades.get(id)?;
        if upgrade.is_maxed() {
            None
        } else {
            Some(economy::purchase_cost(upgrade))
        }
    }

    pub fn purchase(&mut self, id: &str, now_ms: i64) -> Result<Purchase, PurchaseError> {
        let upgrade = *self
            .upgrades
            .get(id)
            .ok_or_else(|| PurchaseError::UnknownUpgrade { id: id.to_string() })?;
        if upgrade.is_maxed() {
            return Err(PurchaseError::MaxLevelReached { id: upgrade.id() });
        }
        if !self
            .upgrades
            .is_unlocked(&upgrade, self.state.total_points_earned)
        {
            return Err(PurchaseError::Locked { id: upgrade.id() });
        }
        let cost = economy::purchase_cost(&upgrade);
        if self.state.points < cost {
            return Err(PurchaseError::InsufficientFunds { cost });
        }

        let level = match self.upgrades.get_mut(id) {
            Some(owned) => {
                owned.level += 1;
                owned.level
            }
            None => return Err(PurchaseError::UnknownUpgrade { id: id.to_string() }),
        };
        self.state.points -= cost;
        self.refresh_derived();

        let purchase = Purchase {
            id: upgrade.id(),
            level,
            cost,
        };
        self.push_event(GameEvent::UpgradePurchased {
            id: purchase.id,
            level,
            cost,
        });
        self.push_message(format!(
            "Purchased {} level {level} (-{cost:.0} pts)",
            upgrade.def.name
        ));
        self.observe(now_ms);
        Ok(purchase)
    }

    /// Stages offline earnings for claiming and credits regenerated energy
    /// straight away.
    pub fn apply_offline_credit(&mut self, credit: &OfflineCredit, now_ms: i64) {
        if credit.energy > 0.0 {
            self.state.current_energy =
                (self.state.current_energy + credit.energy).min(self.state.max_energy);
        }
        self.state.last_energy_regen_time = now_ms;
        self.state.session_start_time = now_ms;
        if credit.has_earnings() {
            self.state.unclaimed_offline_rewards += credit.earnings;
            self.state.offline_efficiency_bonus = credit.bonus;
            tracing::info!(
                elapsed_ms = credit.elapsed_ms,
                credited_ms = credit.credited_ms,
                bonus = credit.bonus,
                earnings = credit.earnings,
                "offline.credit.staged"
            );
            self.push_event(GameEvent::OfflineRewardsAvailable {
                amount: self.state.unclaimed_offline_rewards,
                elapsed_ms: credit.elapsed_ms,
                bonus: credit.bonus,
            });
            self.push_message(format!(
                "Your crew kept digging: {:.0} pts waiting to be claimed.",
                credit.earnings
            ));
        }
    }

    /// Moves all pending offline earnings into the balance. Returns the
    /// amount claimed.
    pub fn claim_offline_rewards(&mut self, now_ms: i64) -> f64 {
        let amount = self.state.unclaimed_offline_rewards;
        if amount <= 0.0 {
            return 0.0;
        }
        self.state.points += amount;
        self.state.total_points_earned += amount;
        self.state.unclaimed_offline_rewards = 0.0;
        self.state.last_offline_reward_time = now_ms;
        self.push_event(GameEvent::OfflineRewardsClaimed { amount });
        self.push_message(format!("Claimed {amount:.0} offline pts."));
        self.observe(now_ms);
        amount
    }

    pub fn upgrade_views(&self) -> Vec<UpgradeView> {
        self.upgrades
            .iter()
            .map(|upgrade| UpgradeView {
                id: upgrade.id(),
                name: upgrade.def.name,
                category: upgrade.category(),
                level: upgrade.level,
                max_level: upgrade.def.max_level,
                cost: if upgrade.is_maxed() {
                    None
                } else {
                    Some(economy::purchase_cost(upgrade))
                },
                unlocked: self
                    .upgrades
                    .is_unlocked(upgrade, self.state.total_points_earned),
            })
            .collect()
    }

    pub fn note_recovery(&mut self, source: RecoverySource) {
        let label = match source {
            RecoverySource::Backup => "backup save",
            RecoverySource::CriticalMirror => "mirrored counters",
        };
        self.push_message(format!("Main save was damaged; restored from {label}."));
        self.push_event(GameEvent::RecoveredFromBackup { source });
    }

    /// Re-reads high scores, achievements and milestones against the current
    /// state. `resume` already does this.
    pub fn refresh_progress(&mut self, now_ms: i64) {
        self.observe(now_ms);
    }

    pub fn milestone_watermark(&self) -> f64 {
        self.milestones.watermark()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn messages(&self) -> impl Iterator<Item = &String> {
        self.messages.iter()
    }

    pub fn add_message<S: Into<String>>(&mut self, message: S) {
        self.push_message(message.into());
    }

    fn halt(&mut self, reason: StopReason) {
        self.state.is_mining = false;
        if reason == StopReason::OutOfEnergy {
            self.push_message("Out of energy. Mining stopped.".to_string());
        }
        self.push_event(GameEvent::MiningStopped { reason });
    }

    /// Runs after every state change: high scores, achievements, milestones.
    fn observe(&mut self, now_ms: i64) {
        self.state.record_high_score();
        let unlocked = self.achievements.evaluate(
            &Progress {
                state: &self.state,
                upgrades: &self.upgrades,
            },
            now_ms,
        );
        for def in unlocked {
            self.push_message(format!("Achievement unlocked: {}", def.name));
            self.push_event(GameEvent::AchievementUnlocked {
                id: def.id,
                name: def.name,
                at: now_ms,
            });
        }
        for threshold in self.milestones.observe(self.state.total_points_earned) {
            self.push_event(GameEvent::MilestoneCrossed { threshold });
        }
    }

    fn push_event(&mut self, event: GameEvent) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn push_message(&mut self, message: String) {
        if self.messages.len() >= MAX_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }
}
