//! Earnings accrued between sessions.
//!
//! Runs once at load time. All gap math uses the client clock, so credited
//! time is capped to keep skewed or tampered clocks from paying out forever.

pub const DAY_MS: i64 = 86_400_000;
pub const OFFLINE_CAP_DAYS: f64 = 14.0;
pub const OFFLINE_CAP_MS: i64 = 14 * DAY_MS;
pub const BONUS_PER_DAY: f64 = 0.10;
pub const MAX_OFFLINE_BONUS: f64 = 1.40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineInput {
    pub last_save_time: i64,
    pub now: i64,
    pub was_mining: bool,
    pub points_per_second: f64,
    pub regen_per_second: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OfflineCredit {
    /// Raw wall-clock gap; zero when the clock went backwards.
    pub elapsed_ms: i64,
    /// Gap used for earnings, clamped to the offline cap.
    pub credited_ms: i64,
    pub bonus: f64,
    pub base_earnings: f64,
    pub earnings: f64,
    pub energy: f64,
}

impl OfflineCredit {
    pub fn has_earnings(&self) -> bool {
        self.earnings > 0.0
    }
}

pub fn offline_bonus(elapsed_ms: i64) -> f64 {
    let days = (elapsed_ms.max(0) as f64 / DAY_MS as f64).min(OFFLINE_CAP_DAYS);
    (days * BONUS_PER_DAY).min(MAX_OFFLINE_BONUS)
}

pub fn reconcile(input: OfflineInput) -> OfflineCredit {
    let elapsed_ms = input.now - input.last_save_time;
    if elapsed_ms <= 0 {
        return OfflineCredit::default();
    }

    let energy = input.regen_per_second.max(0.0) * (elapsed_ms as f64 / 1000.0);
    if !input.was_mining || input.points_per_second <= 0.0 {
        return OfflineCredit {
            elapsed_ms,
            energy,
            ..OfflineCredit::default()
        };
    }

    let credited_ms = elapsed_ms.min(OFFLINE_CAP_MS);
    let bonus = offline_bonus(credited_ms);
    let base_earnings = input.points_per_second * (credited_ms as f64 / 1000.0);
    OfflineCredit {
        elapsed_ms,
        credited_ms,
        bonus,
        base_earnings,
        earnings: base_earnings * (1.0 + bonus),
        energy,
    }
}
