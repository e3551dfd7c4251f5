//! Type-state builder for `Desk`.
//!
//! The builder enforces at compile time that an encoder and an actuator are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks. Building performs startup: it restores the persisted
//! position, probes the encoder, subscribes and publishes the initial status.

use std::marker::PhantomData;
use std::sync::Arc;

use desk_traits::clock::{Clock, MonotonicClock};
use desk_traits::{Actuator, Encoder, PositionStore, Transport};

use crate::config::{EstimatorCfg, MotionCfg, StartupCfg, TimingCfg};
use crate::controller::SpeedController;
use crate::error::{BuildError, DeskError, Result};
use crate::estimator::Estimator;
use crate::persist;
use crate::runtime::Desk;
use crate::state::DriverState;
use crate::topics::Topics;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Desk`. All fields are validated on `build()`.
pub struct DeskBuilder<E, A> {
    encoder: Option<Box<dyn Encoder>>,
    actuator: Option<Box<dyn Actuator>>,
    transport: Option<Box<dyn Transport>>,
    store: Option<Box<dyn PositionStore>>,
    motion: Option<MotionCfg>,
    estimator: Option<EstimatorCfg>,
    timing: Option<TimingCfg>,
    startup: Option<StartupCfg>,
    base_topic: Option<String>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _e: PhantomData<E>,
    _a: PhantomData<A>,
}

impl Default for DeskBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            encoder: None,
            actuator: None,
            transport: None,
            store: None,
            motion: None,
            estimator: None,
            timing: None,
            startup: None,
            base_topic: None,
            clock: None,
            _e: PhantomData,
            _a: PhantomData,
        }
    }
}

impl Desk {
    /// Start building a Desk.
    pub fn builder() -> DeskBuilder<Missing, Missing> {
        DeskBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(
    motion: &MotionCfg,
    estimator: &EstimatorCfg,
    timing: &TimingCfg,
    startup: &StartupCfg,
) -> Result<()> {
    if motion.max_pos <= motion.min_pos {
        return Err(invalid("max_pos must be > min_pos"));
    }
    if motion.min_speed == 0 || motion.max_speed > 100 {
        return Err(invalid("speeds must be within 1..=100"));
    }
    if !(motion.min_speed <= motion.crawl_speed && motion.crawl_speed <= motion.max_speed) {
        return Err(invalid("min_speed <= crawl_speed <= max_speed must hold"));
    }
    if motion.accel == 0 || motion.decel == 0 {
        return Err(invalid("accel and decel must be > 0"));
    }
    if motion.buffer_deg < 0 || motion.coarse_threshold_deg < 0 {
        return Err(invalid("buffer_deg and coarse_threshold_deg must be >= 0"));
    }
    if estimator.window == 0 {
        return Err(invalid("estimator window must be >= 1"));
    }
    let periods = [
        timing.estimator_fast,
        timing.estimator_slow,
        timing.planner_fast,
        timing.planner_slow,
        timing.controller_fast,
        timing.controller_slow,
        timing.inbox,
        timing.keepalive,
        timing.status_interval,
    ];
    if periods.iter().any(|p| p.is_zero()) {
        return Err(invalid("task periods must be > 0"));
    }
    if startup.read_attempts == 0 {
        return Err(invalid("read_attempts must be >= 1"));
    }
    Ok(())
}

/// First encoder reading, retried `read_attempts` times.
fn probe_encoder(estimator: &mut Estimator, clock: &dyn Clock, startup: &StartupCfg) -> Result<u16> {
    for attempt in 1..=startup.read_attempts {
        match estimator.read() {
            Ok(angle) => {
                tracing::info!(angle, attempt, "encoder responding");
                return Ok(angle);
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "encoder read failed at startup");
                if attempt < startup.read_attempts {
                    clock.sleep(startup.retry);
                }
            }
        }
    }
    Err(eyre::Report::new(DeskError::EncoderUnresponsive {
        attempts: startup.read_attempts,
    }))
}

impl<E, A> DeskBuilder<E, A> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Desk> {
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let transport = self
            .transport
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTransport))?;
        let mut store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;

        let motion = self.motion.unwrap_or_default();
        let est_cfg = self.estimator.unwrap_or_default();
        let timing = self.timing.unwrap_or_default();
        let startup = self.startup.unwrap_or_default();
        validate(&motion, &est_cfg, &timing, &startup)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let topics = Topics::new(self.base_topic.as_deref().unwrap_or("desk"));

        let window = est_cfg.window;
        let mut estimator = Estimator::new(encoder, est_cfg, timing.status_interval);
        let position = persist::load_position(&mut *store);
        let angle = probe_encoder(&mut estimator, &*clock, &startup)?;

        Ok(Desk::assemble(
            DriverState::new(position, angle, window),
            motion,
            timing,
            estimator,
            SpeedController::new(actuator),
            topics,
            transport,
            store,
            clock,
        ))
    }
}

/// Chainable setters that do not affect type-state.
impl<E, A> DeskBuilder<E, A> {
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }
    pub fn with_store(mut self, store: impl PositionStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }
    pub fn with_estimator(mut self, estimator: EstimatorCfg) -> Self {
        self.estimator = Some(estimator);
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_startup(mut self, startup: StartupCfg) -> Self {
        self.startup = Some(startup);
        self
    }
    /// Prefix for every topic; defaults to `desk`.
    pub fn with_base_topic(mut self, base: impl Into<String>) -> Self {
        self.base_topic = Some(base.into());
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    /// Apply every section of a loaded configuration document.
    pub fn with_config(self, cfg: &desk_config::Config) -> Self {
        self.with_motion(MotionCfg::from(&cfg.motion))
            .with_estimator(EstimatorCfg::from(&cfg.estimator))
            .with_timing(TimingCfg::from(cfg))
            .with_startup(StartupCfg::from(&cfg.startup))
            .with_base_topic(cfg.mqtt.base_topic.clone())
    }
}

// Setters that advance type-state
impl<A> DeskBuilder<Missing, A> {
    pub fn with_encoder(self, encoder: impl Encoder + 'static) -> DeskBuilder<Set, A> {
        DeskBuilder {
            encoder: Some(Box::new(encoder)),
            actuator: self.actuator,
            transport: self.transport,
            store: self.store,
            motion: self.motion,
            estimator: self.estimator,
            timing: self.timing,
            startup: self.startup,
            base_topic: self.base_topic,
            clock: self.clock,
            _e: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<E> DeskBuilder<E, Missing> {
    pub fn with_actuator(self, actuator: impl Actuator + 'static) -> DeskBuilder<E, Set> {
        DeskBuilder {
            encoder: self.encoder,
            actuator: Some(Box::new(actuator)),
            transport: self.transport,
            store: self.store,
            motion: self.motion,
            estimator: self.estimator,
            timing: self.timing,
            startup: self.startup,
            base_topic: self.base_topic,
            clock: self.clock,
            _e: PhantomData,
            _a: PhantomData,
        }
    }
}

impl DeskBuilder<Set, Set> {
    /// Validate, run startup and return the ready desk.
    pub fn build(self) -> Result<Desk> {
        self.try_build()
    }
}
