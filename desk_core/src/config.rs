//! Configuration types for the motion core.
//!
//! These are the runtime configuration structs used by `Desk` and its tasks.
//! They are separate from the TOML-deserialized config in `desk_config`.

use std::time::Duration;

/// Travel range, speed limits and approach behavior.
#[derive(Debug, Clone)]
pub struct MotionCfg {
    /// Lowest position the desk may be persisted at (encoder degrees).
    pub min_pos: i32,
    /// Position that maps to 100%.
    pub max_pos: i32,
    /// Lowest duty the actuator is driven at.
    pub min_speed: u8,
    /// Highest duty the actuator is driven at.
    pub max_speed: u8,
    /// Per-controller-tick ramp step when speeding up.
    pub accel: u8,
    /// Per-controller-tick ramp step when slowing down.
    pub decel: u8,
    /// Duty used for the final approach.
    pub crawl_speed: u8,
    /// Percentage the `switch ON` command drives to.
    pub on_pos: u8,
    /// Overshoot buffer and dead-band half-width, in degrees.
    pub buffer_deg: i32,
    /// Beyond this remaining distance the planner asks for `max_speed`.
    pub coarse_threshold_deg: i32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            min_pos: 0,
            max_pos: 1800,
            min_speed: 30,
            max_speed: 100,
            accel: 10,
            decel: 20,
            crawl_speed: 40,
            on_pos: 100,
            buffer_deg: 20,
            coarse_threshold_deg: 400,
        }
    }
}

impl MotionCfg {
    /// Height percentage for a raw position, rounded to nearest and clamped to [0, 100].
    pub fn percent_of(&self, position: i32) -> u8 {
        let span = i64::from(self.max_pos.max(1));
        let scaled = i64::from(position.max(0)) * 100;
        let rounded = (scaled + span / 2) / span;
        // Clamped to [0, 100] above, the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = rounded.clamp(0, 100) as u8;
        pct
    }

    /// Raw position for a percentage, clamped to [min_pos, max_pos].
    pub fn raw_of(&self, percent: u8) -> i32 {
        let raw = i64::from(percent.min(100)) * i64::from(self.max_pos) / 100;
        #[allow(clippy::cast_possible_truncation)]
        let raw = raw.clamp(i64::from(self.min_pos), i64::from(self.max_pos)) as i32;
        raw
    }
}

/// Sample fusion and stall detection.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    /// Raw samples fused into one filtered angle.
    pub window: usize,
    /// A fused step smaller than this (degrees) counts as "not moving".
    pub stall_delta_deg: u16,
    /// Stall is declared once the low-motion count exceeds this.
    pub stall_ticks: u32,
    /// Reset the low-motion count whenever a fused step shows real motion.
    pub stall_reset_on_motion: bool,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            window: 5,
            stall_delta_deg: 5,
            stall_ticks: 8,
            stall_reset_on_motion: true,
        }
    }
}

/// Task periods.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    pub estimator_fast: Duration,
    pub estimator_slow: Duration,
    pub planner_fast: Duration,
    pub planner_slow: Duration,
    pub controller_fast: Duration,
    pub controller_slow: Duration,
    /// Inbound command polling.
    pub inbox: Duration,
    /// Transport keepalive.
    pub keepalive: Duration,
    /// Periodic status re-publish.
    pub status_interval: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            estimator_fast: Duration::from_millis(25),
            estimator_slow: Duration::from_millis(1000),
            planner_fast: Duration::from_millis(10),
            planner_slow: Duration::from_millis(1000),
            controller_fast: Duration::from_millis(100),
            controller_slow: Duration::from_millis(1000),
            inbox: Duration::from_millis(20),
            keepalive: Duration::from_secs(10),
            status_interval: Duration::from_secs(300),
        }
    }
}

/// Startup encoder probing.
#[derive(Debug, Clone)]
pub struct StartupCfg {
    pub read_attempts: u32,
    pub retry: Duration,
}

impl Default for StartupCfg {
    fn default() -> Self {
        Self {
            read_attempts: 10,
            retry: Duration::from_millis(100),
        }
    }
}
