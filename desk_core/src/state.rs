//! The single driver record shared by every task.
//!
//! Tasks run cooperatively on one thread, so the record needs no locking.
//! Each field has one writer:
//! - `position`, `last_sensor_angle`, `sample_buffer`, `ms_since_status_update`:
//!   estimator (plus dispatcher override and persistence clamp)
//! - `target_percent`: dispatcher
//! - `target_position`, `direction`: dispatcher, both refreshed by the planner while settling
//! - `driving`, `target_speed`, `stall_ticks`: planner, stall path of the estimator
//! - `current_speed`: speed controller

use crate::config::MotionCfg;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverState {
    /// Cumulative encoder degrees since the reference point.
    pub position: i32,
    /// Where the planner is steering to, overshoot buffer included.
    pub target_position: i32,
    /// Percentage the current move must end on.
    pub target_percent: u8,
    pub driving: bool,
    /// `true` moves toward larger positions.
    pub direction: bool,
    /// Duty percent the planner asks for; 0 means stop.
    pub target_speed: u8,
    /// Duty percent after ramping; 0 only before the first move and after a halt.
    pub current_speed: u8,
    /// Last fused angle in [0, 360).
    pub last_sensor_angle: u16,
    /// Raw samples awaiting fusion.
    pub sample_buffer: Vec<u16>,
    /// Consecutive low-motion fused updates.
    pub stall_ticks: u32,
    pub ms_since_status_update: u64,
}

impl DriverState {
    /// Fresh record at a persisted `position` with the encoder reading `angle`.
    pub fn new(position: i32, angle: u16, window: usize) -> Self {
        Self {
            position,
            target_position: position,
            target_percent: 0,
            driving: false,
            direction: true,
            target_speed: 0,
            current_speed: 0,
            last_sensor_angle: angle % 360,
            sample_buffer: Vec::with_capacity(window),
            stall_ticks: 0,
            ms_since_status_update: 0,
        }
    }

    pub fn percent(&self, motion: &MotionCfg) -> u8 {
        motion.percent_of(self.position)
    }

    /// Clamp the in-memory position to `min_pos` and return the value to persist.
    pub fn clamp_for_storage(&mut self, motion: &MotionCfg) -> i32 {
        if self.position < motion.min_pos {
            self.position = motion.min_pos;
        }
        self.position
    }

    /// Recompute `direction` from target vs position.
    pub(crate) fn refresh_direction(&mut self) {
        self.direction = self.target_position > self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_idle_at_target() {
        let s = DriverState::new(420, 725, 5);
        assert_eq!(s.target_position, 420);
        assert!(!s.driving);
        assert_eq!(s.current_speed, 0);
        assert_eq!(s.last_sensor_angle, 5);
        assert!(s.sample_buffer.capacity() >= 5);
    }

    #[test]
    fn storage_clamp_raises_negative_positions() {
        let m = MotionCfg::default();
        let mut s = DriverState::new(-37, 0, 5);
        assert_eq!(s.clamp_for_storage(&m), 0);
        assert_eq!(s.position, 0);

        let mut s = DriverState::new(812, 0, 5);
        assert_eq!(s.clamp_for_storage(&m), 812);
    }
}
