//! Speed controller: ramps the drive duty toward the planner's request.
//!
//! This is the only component that talks to the actuator.

use std::time::Duration;

use desk_traits::Actuator;

use crate::config::{MotionCfg, TimingCfg};
use crate::hw_error::map_hw_error;
use crate::state::DriverState;

pub struct SpeedController {
    actuator: Box<dyn Actuator>,
    /// The actuator may be moving. Unknown at startup, so the first idle
    /// tick issues a stop.
    engaged: bool,
}

impl core::fmt::Debug for SpeedController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpeedController")
            .field("engaged", &self.engaged)
            .finish_non_exhaustive()
    }
}

impl SpeedController {
    pub fn new(actuator: Box<dyn Actuator>) -> Self {
        Self {
            actuator,
            engaged: true,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Ramp `current_speed` one step and drive the actuator; returns the next period.
    pub fn tick(
        &mut self,
        state: &mut DriverState,
        motion: &MotionCfg,
        timing: &TimingCfg,
    ) -> Duration {
        if !state.driving && state.target_speed == 0 && !self.engaged {
            return timing.controller_slow;
        }

        state.current_speed = ramp(state.current_speed, state.target_speed, motion);

        if state.target_speed == 0 {
            self.stop();
        } else {
            let duty = state.current_speed.max(motion.min_speed).min(motion.max_speed);
            let res = if state.direction {
                self.actuator.drive_up(duty)
            } else {
                self.actuator.drive_down(duty)
            };
            match res {
                Ok(()) => self.engaged = true,
                Err(e) => {
                    let err = map_hw_error(&*e);
                    tracing::warn!(error = %err, duty, up = state.direction, "actuator drive failed");
                }
            }
        }
        timing.controller_fast
    }

    /// Stop the actuator now and drop the ramp to zero.
    pub fn halt(&mut self, state: &mut DriverState) {
        state.current_speed = 0;
        state.target_speed = 0;
        self.stop();
    }

    fn stop(&mut self) {
        if !self.engaged {
            return;
        }
        match self.actuator.stop() {
            Ok(()) => self.engaged = false,
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, "actuator stop failed; will retry");
            }
        }
    }
}

/// One ramp step from `current` toward `target`.
///
/// Speeding up is bounded by `accel` and `max_speed`. Slowing down is bounded
/// by `decel` and never goes below `min_speed` (nor rises while slowing).
pub fn ramp(current: u8, target: u8, motion: &MotionCfg) -> u8 {
    let target = target.min(motion.max_speed);
    if current < target {
        current.saturating_add(motion.accel).min(target)
    } else if current > target {
        let floor = target.max(motion.min_speed).min(current);
        current.saturating_sub(motion.decel).max(floor)
    } else {
        current
    }
}
