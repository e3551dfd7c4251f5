//! Simulated desk: a single-axis plant with hard end stops, driven by a
//! simulated actuator and observed through a simulated encoder.
//!
//! Both halves share one `Plant` and integrate motion lazily against the
//! injected clock, so a `ManualClock` gives fully deterministic runs.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use desk_traits::{Actuator, BoxError, Clock, Encoder};

use crate::error::HwError;

/// Physical parameters of the simulated desk.
#[derive(Debug, Clone)]
pub struct PlantCfg {
    /// Upper end stop in shaft degrees (lower end stop is 0).
    pub travel_deg: f64,
    /// Shaft speed at 100% duty.
    pub deg_per_sec_at_full: f64,
    /// Initial shaft position.
    pub start_deg: f64,
    /// Angle the encoder reports when the shaft sits at 0.
    pub angle_offset: u16,
    /// Per-read jitter in degrees, cycled through in order.
    pub jitter: Vec<i16>,
}

impl Default for PlantCfg {
    fn default() -> Self {
        Self {
            travel_deg: 2000.0,
            deg_per_sec_at_full: 360.0,
            start_deg: 0.0,
            angle_offset: 0,
            jitter: Vec::new(),
        }
    }
}

/// Last command the actuator received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    Up(u8),
    Down(u8),
    Stop,
}

struct Plant {
    cfg: PlantCfg,
    pos_deg: f64,
    velocity: f64,
    last: Instant,
    jitter_idx: usize,
    fail_reads: u32,
    encoder_dead: bool,
    commands: Vec<ActuatorCommand>,
}

impl Plant {
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.pos_deg = (self.pos_deg + self.velocity * dt).clamp(0.0, self.cfg.travel_deg);
    }

    fn command(&mut self, now: Instant, cmd: ActuatorCommand) {
        self.advance(now);
        let full = self.cfg.deg_per_sec_at_full;
        self.velocity = match cmd {
            ActuatorCommand::Up(s) => full * f64::from(s.min(100)) / 100.0,
            ActuatorCommand::Down(s) => -full * f64::from(s.min(100)) / 100.0,
            ActuatorCommand::Stop => 0.0,
        };
        self.commands.push(cmd);
    }

    fn angle(&mut self) -> u16 {
        let jitter = if self.cfg.jitter.is_empty() {
            0
        } else {
            let j = self.cfg.jitter[self.jitter_idx % self.cfg.jitter.len()];
            self.jitter_idx = self.jitter_idx.wrapping_add(1);
            j
        };
        let raw = self.pos_deg.floor() as i64 + i64::from(self.cfg.angle_offset) + i64::from(jitter);
        raw.rem_euclid(360) as u16
    }
}

/// Shared handle to the simulated desk. Clone it freely; all clones observe
/// the same plant.
#[derive(Clone)]
pub struct SimulatedDesk {
    plant: Rc<RefCell<Plant>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedDesk {
    pub fn new(cfg: PlantCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let now = clock.now();
        let start = cfg.start_deg.clamp(0.0, cfg.travel_deg);
        Self {
            plant: Rc::new(RefCell::new(Plant {
                cfg,
                pos_deg: start,
                velocity: 0.0,
                last: now,
                jitter_idx: 0,
                fail_reads: 0,
                encoder_dead: false,
                commands: Vec::new(),
            })),
            clock,
        }
    }

    pub fn encoder(&self) -> SimulatedEncoder {
        SimulatedEncoder { desk: self.clone() }
    }

    pub fn actuator(&self) -> SimulatedActuator {
        SimulatedActuator { desk: self.clone() }
    }

    /// True shaft position in degrees (integrated up to now).
    pub fn position_deg(&self) -> f64 {
        let mut p = self.plant.borrow_mut();
        p.advance(self.clock.now());
        p.pos_deg
    }

    /// Move the shaft by hand (the desk is idle and someone pushes it).
    pub fn nudge(&self, deg: f64) {
        let mut p = self.plant.borrow_mut();
        p.advance(self.clock.now());
        p.pos_deg = (p.pos_deg + deg).clamp(0.0, p.cfg.travel_deg);
    }

    pub fn is_moving(&self) -> bool {
        self.plant.borrow().velocity != 0.0
    }

    pub fn last_command(&self) -> Option<ActuatorCommand> {
        self.plant.borrow().commands.last().copied()
    }

    pub fn commands(&self) -> Vec<ActuatorCommand> {
        self.plant.borrow().commands.clone()
    }

    /// Make the next `n` encoder reads fail.
    pub fn fail_next_reads(&self, n: u32) {
        self.plant.borrow_mut().fail_reads = n;
    }

    /// Permanently disconnect (or reconnect) the encoder.
    pub fn set_encoder_dead(&self, dead: bool) {
        self.plant.borrow_mut().encoder_dead = dead;
    }
}

pub struct SimulatedEncoder {
    desk: SimulatedDesk,
}

impl Encoder for SimulatedEncoder {
    fn read_angle(&mut self) -> Result<u16, BoxError> {
        let mut p = self.desk.plant.borrow_mut();
        if p.encoder_dead {
            return Err(Box::new(HwError::Timeout));
        }
        if p.fail_reads > 0 {
            p.fail_reads -= 1;
            return Err(Box::new(HwError::Timeout));
        }
        p.advance(self.desk.clock.now());
        let angle = p.angle();
        tracing::trace!(angle, pos_deg = p.pos_deg, "sim encoder read");
        Ok(angle)
    }
}

pub struct SimulatedActuator {
    desk: SimulatedDesk,
}

impl SimulatedActuator {
    fn apply(&mut self, cmd: ActuatorCommand) {
        let now = self.desk.clock.now();
        self.desk.plant.borrow_mut().command(now, cmd);
    }
}

impl Actuator for SimulatedActuator {
    fn drive_up(&mut self, speed: u8) -> Result<(), BoxError> {
        self.apply(ActuatorCommand::Up(speed));
        Ok(())
    }
    fn drive_down(&mut self, speed: u8) -> Result<(), BoxError> {
        self.apply(ActuatorCommand::Down(speed));
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.apply(ActuatorCommand::Stop);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_traits::ManualClock;
    use std::time::Duration;

    fn desk(cfg: PlantCfg) -> (SimulatedDesk, ManualClock) {
        let clock = ManualClock::new();
        (SimulatedDesk::new(cfg, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn drive_up_moves_at_commanded_duty() {
        let (d, clock) = desk(PlantCfg::default());
        let mut act = d.actuator();
        act.drive_up(50).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!((d.position_deg() - 180.0).abs() < 1e-6);
        act.stop().unwrap();
        clock.advance(Duration::from_secs(1));
        assert!((d.position_deg() - 180.0).abs() < 1e-6);
    }

    #[test]
    fn encoder_wraps_every_revolution() {
        let (d, clock) = desk(PlantCfg::default());
        let mut enc = d.encoder();
        let mut act = d.actuator();
        act.drive_up(100).unwrap();
        clock.advance(Duration::from_millis(1100)); // 396 degrees
        assert_eq!(enc.read_angle().unwrap(), 36);
    }

    #[test]
    fn end_stop_holds_position() {
        let (d, clock) = desk(PlantCfg {
            start_deg: 100.0,
            ..PlantCfg::default()
        });
        let mut act = d.actuator();
        act.drive_down(100).unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(d.position_deg(), 0.0);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let (d, _clock) = desk(PlantCfg::default());
        let mut enc = d.encoder();
        d.fail_next_reads(2);
        assert!(enc.read_angle().is_err());
        assert!(enc.read_angle().is_err());
        assert!(enc.read_angle().is_ok());
    }

    #[test]
    fn jitter_is_applied_in_order() {
        let (d, _clock) = desk(PlantCfg {
            start_deg: 10.0,
            jitter: vec![0, 2, -3],
            ..PlantCfg::default()
        });
        let mut enc = d.encoder();
        let seq: Vec<u16> = (0..4).map(|_| enc.read_angle().unwrap()).collect();
        assert_eq!(seq, vec![10, 12, 7, 10]);
    }

    #[test]
    fn commands_are_recorded() {
        let (d, _clock) = desk(PlantCfg::default());
        let mut act = d.actuator();
        act.drive_up(40).unwrap();
        act.drive_down(30).unwrap();
        act.stop().unwrap();
        assert_eq!(
            d.commands(),
            vec![
                ActuatorCommand::Up(40),
                ActuatorCommand::Down(30),
                ActuatorCommand::Stop
            ]
        );
        assert!(!d.is_moving());
    }
}
