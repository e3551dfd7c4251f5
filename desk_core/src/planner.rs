//! Motion planner: turns the distance to target into a speed request.

use std::time::Duration;

use crate::config::{MotionCfg, TimingCfg};
use crate::state::DriverState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerOutcome {
    /// Nothing to do.
    Idle,
    /// Still outside the dead-band; `speed` requested.
    Approaching { speed: u8 },
    /// Entered the dead-band this tick; position should be persisted.
    Reached,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Planner;

impl Planner {
    /// One planning step.
    ///
    /// The move ends once the desk reads the requested percentage inside the
    /// dead-band. Landing in the dead-band on a neighbouring percentage
    /// retargets the exact goal, which is then approached at `min_speed`.
    pub fn tick(&mut self, state: &mut DriverState, motion: &MotionCfg) -> PlannerOutcome {
        if !state.driving {
            state.target_speed = 0;
            return PlannerOutcome::Idle;
        }

        let goal = motion.raw_of(state.target_percent);
        let settling = state.target_position == goal;
        let in_band = state.target_position.saturating_sub(state.position).unsigned_abs()
            <= motion.buffer_deg.unsigned_abs();
        // A goal clamped to `min_pos` may read as a higher percentage.
        let wanted = motion.percent_of(goal);
        let on_target = state.percent(motion) == wanted;

        if on_target && (in_band || settling) {
            state.target_speed = 0;
            state.driving = false;
            state.stall_ticks = 0;
            tracing::info!(
                position = state.position,
                target = state.target_position,
                percent = wanted,
                "target reached"
            );
            return PlannerOutcome::Reached;
        }
        if in_band && !settling {
            tracing::debug!(
                position = state.position,
                percent = state.percent(motion),
                wanted,
                goal,
                "dead-band entered off target; settling"
            );
            state.target_position = goal;
        }

        state.refresh_direction();
        let remaining = state.target_position.saturating_sub(state.position);
        let speed = if remaining.unsigned_abs() > motion.coarse_threshold_deg.unsigned_abs() {
            motion.max_speed
        } else if state.target_position == goal {
            motion.min_speed
        } else {
            motion.crawl_speed
        };
        if speed != state.target_speed {
            tracing::debug!(speed, remaining, "speed request changed");
        }
        state.target_speed = speed;
        PlannerOutcome::Approaching { speed }
    }

    pub fn period(state: &DriverState, timing: &TimingCfg) -> Duration {
        if state.driving {
            timing.planner_fast
        } else {
            timing.planner_slow
        }
    }
}
