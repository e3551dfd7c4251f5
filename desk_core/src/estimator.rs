//! Position estimator: fuses raw encoder angles into a cumulative position.
//!
//! While idle the estimator only tracks the resting angle. While driving it
//! collects `window` raw samples, fuses them into one filtered angle, and
//! folds the difference from the previous angle into `position`, treating a
//! jump across 0/360 in the direction of travel as a revolution boundary.
//! Repeated near-zero steps while driving are reported as a stall.

use std::time::Duration;

use desk_traits::Encoder;

use crate::config::{EstimatorCfg, MotionCfg, TimingCfg};
use crate::error::DeskError;
use crate::hw_error::map_hw_error;
use crate::state::DriverState;

pub(crate) const FULL_REV: i32 = 360;
pub(crate) const HALF_REV: i32 = 180;

/// What the runtime must do after a tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorReport {
    /// Filtered angle produced this tick, if a window completed.
    pub fused: Option<u16>,
    /// Status and position should be published.
    pub publish: bool,
    /// Motion stalled: the actuator must be halted and the position persisted.
    pub stalled: bool,
}

pub struct Estimator {
    encoder: Box<dyn Encoder>,
    cfg: EstimatorCfg,
    status_interval_ms: u64,
    scratch: Vec<i32>,
}

impl core::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Estimator")
            .field("cfg", &self.cfg)
            .field("status_interval_ms", &self.status_interval_ms)
            .finish_non_exhaustive()
    }
}

impl Estimator {
    pub fn new(encoder: Box<dyn Encoder>, cfg: EstimatorCfg, status_interval: Duration) -> Self {
        let window = cfg.window.max(1);
        Self {
            encoder,
            cfg,
            status_interval_ms: u64::try_from(status_interval.as_millis()).unwrap_or(u64::MAX),
            scratch: Vec::with_capacity(window),
        }
    }

    pub fn cfg(&self) -> &EstimatorCfg {
        &self.cfg
    }

    /// One raw angle in [0, 360).
    pub fn read(&mut self) -> Result<u16, DeskError> {
        match self.encoder.read_angle() {
            Ok(a) => Ok(a % 360),
            Err(e) => Err(map_hw_error(&*e)),
        }
    }

    /// Read the encoder and fold the sample into `state`.
    ///
    /// A failed read only advances the status timer; poll `status_due`
    /// afterwards so an encoder outage does not silence periodic status.
    pub fn tick(
        &mut self,
        state: &mut DriverState,
        motion: &MotionCfg,
        elapsed_ms: u64,
    ) -> Result<EstimatorReport, DeskError> {
        match self.read() {
            Ok(angle) => Ok(self.ingest(state, motion, angle, elapsed_ms)),
            Err(e) => {
                state.ms_since_status_update =
                    state.ms_since_status_update.saturating_add(elapsed_ms);
                Err(e)
            }
        }
    }

    /// Whether the periodic status interval has elapsed; restarts the timer when it has.
    pub fn status_due(&self, state: &mut DriverState) -> bool {
        if state.ms_since_status_update >= self.status_interval_ms {
            state.ms_since_status_update = 0;
            true
        } else {
            false
        }
    }

    /// Fold one raw sample into `state`.
    pub fn ingest(
        &mut self,
        state: &mut DriverState,
        motion: &MotionCfg,
        angle: u16,
        elapsed_ms: u64,
    ) -> EstimatorReport {
        let mut report = EstimatorReport::default();
        state.ms_since_status_update = state.ms_since_status_update.saturating_add(elapsed_ms);

        if state.driving {
            state.sample_buffer.push(angle % 360);
            if state.sample_buffer.len() >= self.cfg.window.max(1) {
                let filtered = self.fuse(state.last_sensor_angle, &state.sample_buffer);
                state.sample_buffer.clear();
                report.fused = Some(filtered);
                self.apply(state, motion, filtered, &mut report);
            }
        } else {
            state.last_sensor_angle = angle % 360;
            state.sample_buffer.clear();
        }

        if self.status_due(state) {
            report.publish = true;
        } else if report.publish {
            state.ms_since_status_update = 0;
        }
        report
    }

    /// Tick period for the current state.
    pub fn period(state: &DriverState, timing: &TimingCfg) -> Duration {
        if state.driving {
            timing.estimator_fast
        } else {
            timing.estimator_slow
        }
    }

    /// Pick the sample just above the median of `samples`, each unwrapped to
    /// within half a revolution of `reference` so a window straddling 0/360
    /// sorts by physical order.
    fn fuse(&mut self, reference: u16, samples: &[u16]) -> u16 {
        let r = i32::from(reference);
        self.scratch.clear();
        self.scratch
            .extend(samples.iter().map(|&s| r + shortest_arc(i32::from(s) - r)));
        self.scratch.sort_unstable();
        let n = self.scratch.len();
        let idx = (n / 2 + 1).min(n.saturating_sub(1));
        let picked = self.scratch.get(idx).copied().unwrap_or(r);
        // rem_euclid(360) is in [0, 360).
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wrapped = picked.rem_euclid(FULL_REV) as u16;
        wrapped
    }

    fn apply(
        &self,
        state: &mut DriverState,
        motion: &MotionCfg,
        filtered: u16,
        report: &mut EstimatorReport,
    ) {
        let delta = i32::from(filtered) - i32::from(state.last_sensor_angle);

        if shortest_arc(delta).unsigned_abs() < u32::from(self.cfg.stall_delta_deg) {
            state.stall_ticks = state.stall_ticks.saturating_add(1);
        } else if self.cfg.stall_reset_on_motion {
            state.stall_ticks = 0;
        }

        if state.stall_ticks > self.cfg.stall_ticks {
            tracing::warn!(
                position = state.position,
                target = state.target_position,
                angle = filtered,
                "stall detected; halting and re-homing to 0"
            );
            state.driving = false;
            state.target_speed = 0;
            state.stall_ticks = 0;
            state.position = 0;
            state.last_sensor_angle = filtered;
            report.stalled = true;
            report.publish = true;
            return;
        }

        let before = state.percent(motion);
        state.refresh_direction();
        let step = travel(delta, state.direction);
        state.position = state.position.saturating_add(step);
        state.last_sensor_angle = filtered;
        tracing::trace!(
            angle = filtered,
            delta,
            step,
            position = state.position,
            stall_ticks = state.stall_ticks,
            "fused sample"
        );

        if state.percent(motion) != before {
            report.publish = true;
        }
    }
}

/// Map a difference of two angles in [0, 360) onto (-180, 180].
pub(crate) fn shortest_arc(delta: i32) -> i32 {
    let d = delta.rem_euclid(FULL_REV);
    if d > HALF_REV { d - FULL_REV } else { d }
}

/// Position change for a filtered-angle difference while moving `up` (or down).
///
/// A large counter-direction difference is a revolution boundary; a small one
/// is jitter and is applied as-is.
pub(crate) fn travel(delta: i32, up: bool) -> i32 {
    if up && delta < -HALF_REV {
        delta + FULL_REV
    } else if !up && delta > HALF_REV {
        delta - FULL_REV
    } else {
        delta
    }
}
