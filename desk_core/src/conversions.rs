//! `From` implementations bridging `desk_config` types to `desk_core` types.

use std::time::Duration;

use crate::config::{EstimatorCfg, MotionCfg, StartupCfg, TimingCfg};

// ── MotionCfg ────────────────────────────────────────────────────────────────

impl From<&desk_config::Motion> for MotionCfg {
    fn from(c: &desk_config::Motion) -> Self {
        Self {
            min_pos: c.min_pos,
            max_pos: c.max_pos,
            min_speed: c.min_speed,
            max_speed: c.max_speed,
            accel: c.accel,
            decel: c.decel,
            crawl_speed: c.crawl_speed,
            on_pos: c.on_pos,
            buffer_deg: c.buffer_deg,
            coarse_threshold_deg: c.coarse_threshold_deg,
        }
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&desk_config::Estimator> for EstimatorCfg {
    fn from(c: &desk_config::Estimator) -> Self {
        Self {
            window: c.window,
            stall_delta_deg: c.stall_delta_deg,
            stall_ticks: c.stall_ticks,
            stall_reset_on_motion: c.stall_reset_on_motion,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

/// Task periods come from `[timing]`; keepalive and status cadence live in
/// `[mqtt]` and `[status]`, so this converts from the whole document.
impl From<&desk_config::Config> for TimingCfg {
    fn from(c: &desk_config::Config) -> Self {
        let t = &c.timing;
        Self {
            estimator_fast: Duration::from_millis(t.estimator_fast_ms),
            estimator_slow: Duration::from_millis(t.estimator_slow_ms),
            planner_fast: Duration::from_millis(t.planner_fast_ms),
            planner_slow: Duration::from_millis(t.planner_slow_ms),
            controller_fast: Duration::from_millis(t.controller_fast_ms),
            controller_slow: Duration::from_millis(t.controller_slow_ms),
            inbox: Duration::from_millis(t.inbox_ms),
            keepalive: Duration::from_secs(c.mqtt.keepalive_sec),
            status_interval: Duration::from_secs(c.status.interval_sec),
        }
    }
}

// ── StartupCfg ───────────────────────────────────────────────────────────────

impl From<&desk_config::Startup> for StartupCfg {
    fn from(c: &desk_config::Startup) -> Self {
        Self {
            read_attempts: c.read_attempts,
            retry: Duration::from_millis(c.retry_ms),
        }
    }
}
